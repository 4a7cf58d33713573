//! Manifest loading and package resolution broken into focused submodules for easier testing.

mod loading;
mod resolution;
mod scanning;

pub use loading::{load_manifest, parse_manifest};
pub use resolution::{resolve_entry, resolve_packages};
pub use scanning::{collect_files_recursively, expand_glob, glob_to_regex, join_relative};
