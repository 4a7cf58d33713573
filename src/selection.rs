//! Helpers used to restrict a run to a subset of the declared bundles.

use std::collections::BTreeSet;

use tracing::debug;

use crate::models::AssetType;

/// Trait describing selection filters for a packaging run.
pub trait BundleInclusion {
  /// Returns `true` when the bundle should be built in this run.
  fn is_included(&self, asset_type: AssetType, bundle_name: &str) -> bool;
}

/// Selection parsed from a comma separated list such as `all.css,subset.css,*.js`.
///
/// Entries that match no declared bundle, or whose extension names no asset type, are
/// ignored without error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleSelection {
  restricted: bool,
  whole_types: BTreeSet<AssetType>,
  bundles: BTreeSet<(AssetType, String)>,
}

impl BundleSelection {
  /// Parse a raw selection list. An empty list selects everything.
  pub fn parse(raw: &str) -> Self {
    let mut selection = Self::default();

    for value in normalise_list(raw.split(',').map(str::to_string)) {
      selection.restricted = true;

      let Some((name, extension)) = value.rsplit_once('.') else {
        debug!(entry = %value, "ignoring selection entry without extension");
        continue;
      };
      let Some(asset_type) = AssetType::from_extension(extension) else {
        debug!(entry = %value, "ignoring selection entry with unknown extension");
        continue;
      };

      if name == "*" {
        selection.whole_types.insert(asset_type);
      } else {
        selection.bundles.insert((asset_type, name.to_string()));
      }
    }

    selection
  }

  /// Parse an optional list, treating `None` as "select everything".
  pub fn from_option(raw: Option<&str>) -> Self {
    raw.map(Self::parse).unwrap_or_default()
  }

  /// Returns true when no filtering rules are active.
  pub fn is_unfiltered(&self) -> bool {
    !self.restricted
  }

  /// Determine whether a bundle should be built in this run.
  pub fn is_included(&self, asset_type: AssetType, bundle_name: &str) -> bool {
    if !self.restricted {
      return true;
    }

    self.whole_types.contains(&asset_type)
      || self
        .bundles
        .contains(&(asset_type, bundle_name.to_string()))
  }
}

impl BundleInclusion for BundleSelection {
  fn is_included(&self, asset_type: AssetType, bundle_name: &str) -> bool {
    BundleSelection::is_included(self, asset_type, bundle_name)
  }
}

/// Selection that includes every bundle.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllBundles;

impl BundleInclusion for AllBundles {
  fn is_included(&self, _asset_type: AssetType, _bundle_name: &str) -> bool {
    true
  }
}

/// Convert a list of raw entries into a sorted, de-duplicated set.
///
/// Values are trimmed and empty entries are discarded to simplify downstream filtering logic.
fn normalise_list(values: impl IntoIterator<Item = String>) -> BTreeSet<String> {
  values
    .into_iter()
    .map(|value| value.trim().trim_start_matches('/').to_string())
    .filter(|value| !value.is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_to_including_all_bundles() {
    let selection = BundleSelection::default();
    assert!(selection.is_included(AssetType::Stylesheets, "all"));
    assert!(selection.is_unfiltered());
    assert!(BundleSelection::parse(" , ").is_unfiltered());
  }

  #[test]
  fn matches_exact_bundle_and_extension() {
    let selection = BundleSelection::parse("all.css");

    assert!(selection.is_included(AssetType::Stylesheets, "all"));
    assert!(!selection.is_included(AssetType::Stylesheets, "subset"));
    assert!(!selection.is_included(AssetType::Javascripts, "all"));
  }

  #[test]
  fn selects_whole_types_with_wildcards() {
    let selection = BundleSelection::parse("*.js, subset.css");

    assert!(selection.is_included(AssetType::Javascripts, "all"));
    assert!(selection.is_included(AssetType::Javascripts, "vendor/extra"));
    assert!(selection.is_included(AssetType::Stylesheets, "subset"));
    assert!(!selection.is_included(AssetType::Stylesheets, "all"));
  }

  #[test]
  fn keeps_nested_bundle_names() {
    let selection = BundleSelection::parse("desktop/all.css");
    assert!(selection.is_included(AssetType::Stylesheets, "desktop/all"));
    assert!(!selection.is_included(AssetType::Stylesheets, "all"));
  }

  #[test]
  fn ignores_unknown_entries_without_widening() {
    let selection = BundleSelection::parse("missing.txt,noext");

    assert!(!selection.is_unfiltered());
    assert!(!selection.is_included(AssetType::Stylesheets, "all"));
    assert!(!selection.is_included(AssetType::Javascripts, "all"));
  }

  #[test]
  fn normalises_whitespace_and_duplicates() {
    let normalised: Vec<String> = normalise_list(vec![
      "  all.css  ".into(),
      "/all.css".into(),
      String::new(),
      "a.js".into(),
    ])
    .into_iter()
    .collect();

    assert_eq!(normalised, vec![String::from("a.js"), String::from("all.css")]);
  }
}
