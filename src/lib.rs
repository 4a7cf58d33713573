#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset_paths;
pub mod builder;
pub mod bundle;
pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod models;
pub mod output;
pub mod project;
pub mod selection;

pub use builder::{AssetPackager, BundleFailure, PackageReport, WrittenBundle};
pub use config::{BuildOptions, PackagerConfig};
pub use error::{PackagerError, PackagerResult};
pub use models::{AssetType, Manifest};
pub use project::ProjectLayout;
pub use selection::{AllBundles, BundleInclusion, BundleSelection};
