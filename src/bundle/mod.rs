//! Building bundle content: transforms, `url()` rewriting, asset hosts and inlining.

mod builder;
mod command;
mod embed;
mod hosts;
mod references;
mod transform;

pub use builder::BundleBuilder;
pub use command::{CommandTransform, INDENT_WIDTH_ENV, MINIFY_ENV, SOURCE_ENV};
pub use embed::{EmbedPolicy, mime_type_for};
pub use hosts::AssetHosts;
pub use references::{ReferenceRewriter, RewrittenSource};
pub use transform::{ContentTransform, TransformOptions, TransformRegistry};
