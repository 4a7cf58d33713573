//! Project configuration loader and the option surface honoured by the pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::bundle::{CommandTransform, TransformOptions, TransformRegistry};
use crate::project::{DEFAULT_BUNDLED_DIR, ProjectLayout, default_cache_path};

const DEFAULT_CONFIG_FILE: &str = "assetspkg.config.json";

/// Largest asset inlined as a data URI unless configured otherwise.
pub const DEFAULT_EMBED_MAX_BYTES: u64 = 32 * 1024;

/// Switches controlling a packaging run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
  /// Write a gzip sibling next to every written variant.
  pub compress: bool,
  /// Also emit the `-noembed` stylesheet variant.
  pub noembed_variant: bool,
  /// Stamp bundles and referenced assets with content digests.
  pub cache_boost: bool,
  /// Inline small assets as data URIs in the plain variant.
  pub embed_inline: bool,
  /// Size limit for inlined assets.
  pub embed_max_bytes: u64,
  /// Asset host pattern such as `assets[0,3].example.com`.
  pub asset_hosts: Option<String>,
  /// Comma separated selection filter such as `all.css,*.js`.
  pub only: Option<String>,
  /// Indentation handed to content transforms.
  pub indent_width: usize,
  /// Whether content transforms should minify.
  pub minify: bool,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      compress: false,
      noembed_variant: false,
      cache_boost: false,
      embed_inline: false,
      embed_max_bytes: DEFAULT_EMBED_MAX_BYTES,
      asset_hosts: None,
      only: None,
      indent_width: 4,
      minify: true,
    }
  }
}

impl BuildOptions {
  /// Options forwarded to the injected content transforms.
  pub fn transform_options(&self) -> TransformOptions {
    TransformOptions {
      indent_width: self.indent_width,
      minify: self.minify,
    }
  }
}

/// Discoverable project configuration describing directory names and default options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackagerConfig {
  /// Directory name (below each type directory) receiving bundles.
  pub bundled_dir: String,
  /// Directory name holding stylesheet sources.
  pub stylesheets_dir: String,
  /// Directory name holding script sources.
  pub javascripts_dir: String,
  /// Cache file path relative to the manifest directory.
  pub cache_file: Option<String>,
  /// Defaults for the build switches; command line flags take precedence.
  pub options: BuildOptions,
  /// Commands transforming sources by extension, e.g. `"less": ["lessc", "-"]`.
  pub transforms: BTreeMap<String, Vec<String>>,
}

impl Default for PackagerConfig {
  fn default() -> Self {
    Self {
      bundled_dir: DEFAULT_BUNDLED_DIR.into(),
      stylesheets_dir: "stylesheets".into(),
      javascripts_dir: "javascripts".into(),
      cache_file: None,
      options: BuildOptions::default(),
      transforms: BTreeMap::new(),
    }
  }
}

impl PackagerConfig {
  /// Attempt to load configuration from the provided directory.
  ///
  /// A missing or unparsable file yields the defaults so a bare manifest is enough to run.
  pub fn discover(manifest_dir: &Path) -> Self {
    let candidate = manifest_dir.join(DEFAULT_CONFIG_FILE);
    Self::from_path(&candidate).unwrap_or_default()
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Option<Self> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
  }

  /// Registry running the configured transform commands. Empty argv lists are skipped.
  pub fn transform_registry(&self) -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    for (extension, argv) in &self.transforms {
      if let Some(transform) = CommandTransform::from_argv(argv) {
        registry.register(extension, transform);
      }
    }
    registry
  }

  /// Build the project layout for a public root and the manifest the run was started with.
  pub fn to_layout(&self, root: &Path, manifest_path: &Path) -> ProjectLayout {
    let cache_path = match &self.cache_file {
      Some(file) => manifest_path
        .parent()
        .map(|dir| dir.join(file))
        .unwrap_or_else(|| PathBuf::from(file)),
      None => default_cache_path(manifest_path),
    };

    ProjectLayout {
      root: root.to_path_buf(),
      bundled_dir_name: self.bundled_dir.clone(),
      stylesheets_dir: self.stylesheets_dir.clone(),
      javascripts_dir: self.javascripts_dir.clone(),
      cache_path,
    }
  }
}
