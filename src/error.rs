//! Error kinds reported by the packaging pipeline.

use std::path::PathBuf;

use crate::models::AssetType;

/// Convenience alias used throughout the crate.
pub type PackagerResult<T> = Result<T, PackagerError>;

/// Errors raised while resolving, building and writing bundles.
///
/// `Config` and `CacheWrite` abort the whole run. The bundle-scoped variants only
/// abort the bundle they name, and `CacheRead` is recovered from by starting with an
/// empty cache.
#[derive(Debug, thiserror::Error)]
pub enum PackagerError {
  /// The manifest or options are inconsistent.
  #[error("configuration error: {reason}")]
  Config {
    /// What is wrong with the configuration.
    reason: String,
  },

  /// A source file listed for a bundle does not exist.
  #[error("{asset_type} bundle '{bundle}': source {} not found", .path.display())]
  MissingSource {
    /// Bundle being built.
    bundle: String,
    /// Asset type of the bundle.
    asset_type: AssetType,
    /// Missing source path.
    path: PathBuf,
  },

  /// A stylesheet references an asset that is not on disk.
  #[error(
    "{asset_type} bundle '{bundle}': referenced asset '{reference}' not found at {}",
    .path.display()
  )]
  MissingAssetReference {
    /// Bundle being built.
    bundle: String,
    /// Asset type of the bundle.
    asset_type: AssetType,
    /// Reference as written in the source.
    reference: String,
    /// Path the reference resolved to.
    path: PathBuf,
  },

  /// The persisted cache file could not be read or parsed.
  #[error("failed to read cache file {}: {reason}", .path.display())]
  CacheRead {
    /// Cache file path.
    path: PathBuf,
    /// Description of the failure.
    reason: String,
  },

  /// The cache file could not be written back.
  #[error("failed to write cache file {}: {source}", .path.display())]
  CacheWrite {
    /// Cache file path.
    path: PathBuf,
    /// Underlying I/O error.
    source: std::io::Error,
  },

  /// An injected content transform rejected a source file.
  #[error("{asset_type} bundle '{bundle}': transform of {} failed: {reason}", .path.display())]
  Transform {
    /// Bundle being built.
    bundle: String,
    /// Asset type of the bundle.
    asset_type: AssetType,
    /// Source file being transformed.
    path: PathBuf,
    /// Error reported by the transform.
    reason: String,
  },

  /// Any other filesystem failure.
  #[error("I/O error at {}: {source}", .path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Underlying I/O error.
    source: std::io::Error,
  },
}

impl PackagerError {
  pub(crate) fn config(reason: impl Into<String>) -> Self {
    Self::Config {
      reason: reason.into(),
    }
  }

  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  /// Returns `true` for errors that abort the run rather than a single bundle.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Self::Config { .. } | Self::CacheWrite { .. })
  }
}
