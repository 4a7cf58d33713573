//! Helpers for resolving and normalising stylesheet asset references.
//!
//! Filtering references that must stay untouched and mapping the rest onto root-absolute
//! public paths are split so each can be tested independently.

mod filters;
mod public_path;

pub use filters::should_ignore_asset_reference;
pub use public_path::{resolve_public_path, split_reference_suffix};
