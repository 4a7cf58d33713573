//! Filesystem layout of a packaged project.

use std::path::{Path, PathBuf};

use crate::models::AssetType;

/// Default name of the directory bundles are written to, inside each type directory.
pub const DEFAULT_BUNDLED_DIR: &str = "bundled";

/// Where sources live, where bundles go and where fingerprints are remembered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
  /// Public root; asset references are resolved against it.
  pub root: PathBuf,
  /// Directory name (below each type directory) receiving bundles.
  pub bundled_dir_name: String,
  /// Directory name (below the root) holding stylesheet sources.
  pub stylesheets_dir: String,
  /// Directory name (below the root) holding script sources.
  pub javascripts_dir: String,
  /// Persisted fingerprint cache file.
  pub cache_path: PathBuf,
}

impl ProjectLayout {
  /// Layout with the conventional directory names below `root`.
  pub fn new(root: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      bundled_dir_name: DEFAULT_BUNDLED_DIR.into(),
      stylesheets_dir: AssetType::Stylesheets.manifest_key().into(),
      javascripts_dir: AssetType::Javascripts.manifest_key().into(),
      cache_path: cache_path.into(),
    }
  }

  /// Directory holding sources of an asset type.
  pub fn source_dir(&self, asset_type: AssetType) -> PathBuf {
    let name = match asset_type {
      AssetType::Stylesheets => &self.stylesheets_dir,
      AssetType::Javascripts => &self.javascripts_dir,
    };
    self.root.join(name)
  }

  /// Directory receiving bundles of an asset type.
  pub fn bundled_dir(&self, asset_type: AssetType) -> PathBuf {
    self
      .source_dir(asset_type)
      .join(&self.bundled_dir_name)
  }

  /// Absolute location of a root-relative public path such as `/images/one.png`.
  pub fn public_file(&self, public_path: &str) -> PathBuf {
    let mut path = self.root.clone();
    for segment in public_path.split('/').filter(|segment| !segment.is_empty()) {
      path.push(segment);
    }
    path
  }
}

/// Cache file remembered next to a manifest: `assets.yml` becomes `.assets.yml.json`.
pub fn default_cache_path(manifest_path: &Path) -> PathBuf {
  let file_name = manifest_path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| "assets.yml".to_string());
  let cache_name = format!(".{file_name}.json");
  match manifest_path.parent() {
    Some(parent) => parent.join(cache_name),
    None => PathBuf::from(cache_name),
  }
}
