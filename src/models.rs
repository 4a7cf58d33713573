//! Data structures shared by the resolver, the bundle builder and the output writer.

use std::fmt;
use std::path::PathBuf;

/// Asset families a manifest can declare bundles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetType {
  /// Stylesheets, bundled into `.css` files.
  Stylesheets,
  /// Scripts, bundled into `.js` files.
  Javascripts,
}

impl AssetType {
  /// Every asset type understood by the packager.
  pub const ALL: [AssetType; 2] = [AssetType::Stylesheets, AssetType::Javascripts];

  /// Resolve the top-level manifest key (`stylesheets`, `javascripts`) into an asset type.
  pub fn from_manifest_key(key: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|kind| kind.manifest_key() == key)
  }

  /// Resolve a bundle extension (`css`, `js`) into an asset type.
  pub fn from_extension(extension: &str) -> Option<Self> {
    let extension = extension.trim_start_matches('.');
    Self::ALL
      .into_iter()
      .find(|kind| kind.extension().eq_ignore_ascii_case(extension))
  }

  /// Key used for this type in manifests and cache entries.
  pub fn manifest_key(self) -> &'static str {
    match self {
      Self::Stylesheets => "stylesheets",
      Self::Javascripts => "javascripts",
    }
  }

  /// Extension of bundles produced for this type.
  pub fn extension(self) -> &'static str {
    match self {
      Self::Stylesheets => "css",
      Self::Javascripts => "js",
    }
  }
}

impl fmt::Display for AssetType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.manifest_key())
  }
}

/// One source entry of a manifest bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
  /// A single file, relative to the asset type's source directory.
  Literal(String),
  /// A glob pattern expanded against the asset type's source directory.
  Glob(String),
  /// Every file of the asset type below its source directory.
  Wildcard,
}

impl SourceSpec {
  /// Classify a raw manifest string into a source spec.
  pub fn classify(raw: &str) -> Self {
    let value = raw.trim();
    if value == "*" {
      Self::Wildcard
    } else if value.contains(['*', '?', '[']) {
      Self::Glob(value.to_string())
    } else {
      Self::Literal(value.to_string())
    }
  }
}

/// A named bundle as declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
  /// Bundle name, possibly containing `/` for nested output directories.
  pub bundle_name: String,
  /// Asset type section the bundle was declared in.
  pub asset_type: AssetType,
  /// Ordered source entries composing the bundle.
  pub sources: Vec<SourceSpec>,
}

/// In-memory manifest: declared asset types and their bundles, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
  /// Asset type sections in the order they were declared.
  pub asset_types: Vec<AssetType>,
  /// Every declared bundle in declaration order.
  pub entries: Vec<ManifestEntry>,
}

impl Manifest {
  /// Returns `true` when the manifest has a section for the asset type.
  pub fn declares(&self, asset_type: AssetType) -> bool {
    self.asset_types.contains(&asset_type)
  }

  /// Bundles declared for one asset type, in declaration order.
  pub fn bundles_of(&self, asset_type: AssetType) -> impl Iterator<Item = &ManifestEntry> {
    self
      .entries
      .iter()
      .filter(move |entry| entry.asset_type == asset_type)
  }
}

/// A bundle whose sources have been expanded into an ordered file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
  /// Bundle name from the manifest.
  pub bundle_name: String,
  /// Asset type of the bundle.
  pub asset_type: AssetType,
  /// Source files in concatenation order.
  pub files: Vec<PathBuf>,
}

impl ResolvedPackage {
  /// Fingerprint cache key for the bundle, e.g. `stylesheets/all`.
  pub fn cache_key(&self) -> String {
    format!("{}/{}", self.asset_type.manifest_key(), self.bundle_name)
  }

  /// Name used on the command line to select the bundle, e.g. `all.css`.
  pub fn output_name(&self) -> String {
    format!("{}.{}", self.bundle_name, self.asset_type.extension())
  }
}

/// Content variants a bundle can be emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variant {
  /// Default output, with small assets inlined when embedding is enabled.
  Plain,
  /// Output that always references assets externally.
  NoEmbed,
}

impl Variant {
  /// Both variants, plain first.
  pub const ALL: [Variant; 2] = [Variant::Plain, Variant::NoEmbed];

  /// Filename suffix inserted before the extension.
  pub fn suffix(self) -> &'static str {
    match self {
      Self::Plain => "",
      Self::NoEmbed => "-noembed",
    }
  }
}

/// Concatenated, rewritten content of one bundle variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleContent {
  /// Bundle name from the manifest.
  pub bundle_name: String,
  /// Asset type of the bundle.
  pub asset_type: AssetType,
  /// Which variant the bytes represent.
  pub variant: Variant,
  /// Final bytes to write.
  pub bytes: Vec<u8>,
}
