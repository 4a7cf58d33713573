//! Expansion of manifest entries into ordered per-bundle file lists.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{PackagerError, PackagerResult};
use crate::manifest::scanning::{expand_glob, join_relative};
use crate::models::{AssetType, Manifest, ManifestEntry, ResolvedPackage, SourceSpec};
use crate::project::ProjectLayout;
use crate::selection::BundleInclusion;

/// Validate the manifest and resolve every selected bundle.
///
/// Packages come out grouped by asset type in manifest order, bundles in declaration
/// order. Validation covers the whole manifest, selected or not, so configuration
/// mistakes surface before anything is written. `source_extensions` lists the
/// extensions a content transform handles, see [`resolve_entry`].
pub fn resolve_packages<S: BundleInclusion>(
  layout: &ProjectLayout,
  manifest: &Manifest,
  selection: &S,
  source_extensions: &[String],
) -> PackagerResult<Vec<ResolvedPackage>> {
  validate_manifest(manifest)?;

  let mut packages = Vec::new();
  for &asset_type in &manifest.asset_types {
    for entry in manifest.bundles_of(asset_type) {
      if !selection.is_included(asset_type, &entry.bundle_name) {
        continue;
      }
      packages.push(resolve_entry(layout, entry, source_extensions)?);
    }
  }

  Ok(packages)
}

/// Expand a single manifest entry into its ordered file list.
///
/// Literals keep declaration order, glob matches are sorted lexicographically and
/// a file listed twice is kept at its first position. A literal without extension
/// names `<path>.<type extension>`; when that file does not exist, the first existing
/// `<path>.<ext>` among `source_extensions` (sorted) is used instead.
pub fn resolve_entry(
  layout: &ProjectLayout,
  entry: &ManifestEntry,
  source_extensions: &[String],
) -> PackagerResult<ResolvedPackage> {
  let asset_type = entry.asset_type;
  let source_dir = layout.source_dir(asset_type);
  let skip_dir = layout.bundled_dir(asset_type);
  let extension = asset_type.extension();

  let mut seen = BTreeSet::new();
  let mut files = Vec::new();

  for spec in &entry.sources {
    let expanded = match spec {
      SourceSpec::Literal(path) => {
        vec![resolve_literal(&source_dir, path, extension, source_extensions)]
      }
      SourceSpec::Glob(pattern) => {
        expand_glob(&source_dir, &with_extension(pattern, extension), Some(&skip_dir))
          .map_err(|err| invalid_glob(entry, pattern, err))?
      }
      SourceSpec::Wildcard => {
        let pattern = format!("**/*.{extension}");
        expand_glob(&source_dir, &pattern, Some(&skip_dir))
          .map_err(|err| invalid_glob(entry, &pattern, err))?
      }
    };

    for path in expanded {
      if seen.insert(path.clone()) {
        files.push(path);
      }
    }
  }

  Ok(ResolvedPackage {
    bundle_name: entry.bundle_name.clone(),
    asset_type,
    files,
  })
}

fn validate_manifest(manifest: &Manifest) -> PackagerResult<()> {
  let mut names = BTreeSet::new();

  for entry in &manifest.entries {
    if !manifest.declares(entry.asset_type) {
      return Err(PackagerError::config(format!(
        "bundle '{}' references asset type '{}' which the manifest does not declare",
        entry.bundle_name, entry.asset_type
      )));
    }

    validate_bundle_name(entry)?;

    if !names.insert((entry.asset_type, entry.bundle_name.as_str())) {
      return Err(PackagerError::config(format!(
        "{} bundle '{}' declared twice",
        entry.asset_type, entry.bundle_name
      )));
    }

    for spec in &entry.sources {
      if let SourceSpec::Literal(path) = spec {
        validate_literal_type(entry, path)?;
      }
    }
  }

  Ok(())
}

fn validate_bundle_name(entry: &ManifestEntry) -> PackagerResult<()> {
  let name = entry.bundle_name.as_str();
  let invalid = name.is_empty()
    || name.starts_with('/')
    || name.contains('\\')
    || name
      .split('/')
      .any(|segment| segment.is_empty() || segment == "." || segment == "..");

  if invalid {
    return Err(PackagerError::config(format!(
      "{} bundle name '{}' is not a valid relative path",
      entry.asset_type, name
    )));
  }
  Ok(())
}

/// A literal naming a file of another asset type (`app.js` inside `stylesheets`) is
/// a manifest mistake rather than a missing file.
fn validate_literal_type(entry: &ManifestEntry, path: &str) -> PackagerResult<()> {
  let Some(extension) = last_segment_extension(path) else {
    return Ok(());
  };

  match AssetType::from_extension(extension) {
    Some(declared) if declared != entry.asset_type => Err(PackagerError::config(format!(
      "{} bundle '{}' lists '{}', which is a {} source",
      entry.asset_type, entry.bundle_name, path, declared
    ))),
    _ => Ok(()),
  }
}

fn last_segment_extension(path: &str) -> Option<&str> {
  let segment = path.rsplit('/').next().unwrap_or(path);
  segment
    .rsplit_once('.')
    .map(|(_, extension)| extension)
    .filter(|extension| !extension.is_empty())
}

fn resolve_literal(
  source_dir: &Path,
  path: &str,
  extension: &str,
  source_extensions: &[String],
) -> PathBuf {
  let primary = join_relative(source_dir, &with_extension(path, extension));
  if last_segment_extension(path).is_some() || primary.is_file() {
    return primary;
  }

  source_extensions
    .iter()
    .map(|candidate| join_relative(source_dir, &with_extension(path, candidate)))
    .find(|candidate| candidate.is_file())
    .unwrap_or(primary)
}

/// Append the bundle extension when the last path segment carries none.
fn with_extension(path: &str, extension: &str) -> String {
  let trimmed = path.trim_start_matches('/');
  if last_segment_extension(trimmed).is_some() {
    trimmed.to_string()
  } else {
    format!("{trimmed}.{extension}")
  }
}

fn invalid_glob(entry: &ManifestEntry, pattern: &str, err: regex::Error) -> PackagerError {
  PackagerError::config(format!(
    "{} bundle '{}' has invalid pattern '{}': {}",
    entry.asset_type, entry.bundle_name, pattern, err
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::selection::{AllBundles, BundleSelection};
  use std::fs;
  use std::path::Path;
  use tempfile::tempdir;

  fn layout(root: &Path) -> ProjectLayout {
    ProjectLayout::new(root, root.join(".assets.yml.json"))
  }

  fn entry(asset_type: AssetType, name: &str, sources: Vec<SourceSpec>) -> ManifestEntry {
    ManifestEntry {
      bundle_name: name.into(),
      asset_type,
      sources,
    }
  }

  fn write(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, relative).unwrap();
  }

  #[test]
  fn literals_keep_declaration_order_and_gain_extensions() {
    let dir = tempdir().unwrap();
    let layout = layout(dir.path());
    let package = resolve_entry(
      &layout,
      &entry(AssetType::Stylesheets, "all", vec![
        SourceSpec::Literal("two".into()),
        SourceSpec::Literal("one.less".into()),
      ]),
      &[],
    )
    .unwrap();

    let css_dir = dir.path().join("stylesheets");
    assert_eq!(package.files, vec![
      css_dir.join("two.css"),
      css_dir.join("one.less")
    ]);
  }

  #[test]
  fn globs_are_sorted_and_deduplicated_after_literals() {
    let dir = tempdir().unwrap();
    write(dir.path(), "javascripts/lib/b.js");
    write(dir.path(), "javascripts/lib/a.js");
    write(dir.path(), "javascripts/lib/c.js");
    let layout = layout(dir.path());

    let package = resolve_entry(
      &layout,
      &entry(AssetType::Javascripts, "all", vec![
        SourceSpec::Literal("lib/c".into()),
        SourceSpec::Glob("lib/*".into()),
      ]),
      &[],
    )
    .unwrap();

    let js_dir = dir.path().join("javascripts").join("lib");
    assert_eq!(package.files, vec![
      js_dir.join("c.js"),
      js_dir.join("a.js"),
      js_dir.join("b.js"),
    ]);
  }

  #[test]
  fn wildcard_covers_type_files_but_not_bundled_output() {
    let dir = tempdir().unwrap();
    write(dir.path(), "stylesheets/one.css");
    write(dir.path(), "stylesheets/nested/two.css");
    write(dir.path(), "stylesheets/notes.txt");
    write(dir.path(), "stylesheets/bundled/all.css");
    let layout = layout(dir.path());

    let package = resolve_entry(
      &layout,
      &entry(AssetType::Stylesheets, "all", vec![SourceSpec::Wildcard]),
      &[],
    )
    .unwrap();

    let css_dir = dir.path().join("stylesheets");
    assert_eq!(package.files, vec![
      css_dir.join("nested").join("two.css"),
      css_dir.join("one.css"),
    ]);
  }

  #[test]
  fn extensionless_literals_fall_back_to_transform_extensions() {
    let dir = tempdir().unwrap();
    write(dir.path(), "stylesheets/theme.sass");
    write(dir.path(), "stylesheets/theme.scss");
    write(dir.path(), "stylesheets/base.css");
    write(dir.path(), "stylesheets/base.less");
    let layout = layout(dir.path());
    let transforms = vec!["less".to_string(), "scss".to_string()];

    let package = resolve_entry(
      &layout,
      &entry(AssetType::Stylesheets, "all", vec![
        SourceSpec::Literal("theme".into()),
        SourceSpec::Literal("base".into()),
        SourceSpec::Literal("gone".into()),
      ]),
      &transforms,
    )
    .unwrap();

    let css_dir = dir.path().join("stylesheets");
    assert_eq!(package.files, vec![
      css_dir.join("theme.scss"),
      css_dir.join("base.css"),
      css_dir.join("gone.css"),
    ]);
  }

  #[test]
  fn selection_narrows_packages_in_manifest_order() {
    let dir = tempdir().unwrap();
    let manifest = Manifest {
      asset_types: vec![AssetType::Stylesheets, AssetType::Javascripts],
      entries: vec![
        entry(AssetType::Stylesheets, "all", vec![SourceSpec::Literal("one".into())]),
        entry(AssetType::Stylesheets, "subset", vec![SourceSpec::Literal("one".into())]),
        entry(AssetType::Javascripts, "all", vec![SourceSpec::Literal("one".into())]),
      ],
    };

    let selected = resolve_packages(
      &layout(dir.path()),
      &manifest,
      &BundleSelection::parse("all.js,subset.css,ghost.css"),
      &[],
    )
    .unwrap();
    let names: Vec<String> = selected.iter().map(ResolvedPackage::output_name).collect();
    assert_eq!(names, vec!["subset.css", "all.js"]);

    let everything = resolve_packages(&layout(dir.path()), &manifest, &AllBundles, &[]).unwrap();
    assert_eq!(everything.len(), 3);
  }

  #[test]
  fn rejects_undeclared_asset_types() {
    let dir = tempdir().unwrap();
    let manifest = Manifest {
      asset_types: vec![AssetType::Stylesheets],
      entries: vec![entry(AssetType::Javascripts, "all", vec![SourceSpec::Wildcard])],
    };

    let err = resolve_packages(&layout(dir.path()), &manifest, &AllBundles, &[]).unwrap_err();
    assert!(matches!(err, PackagerError::Config { .. }));
  }

  #[test]
  fn rejects_literals_of_another_asset_type() {
    let dir = tempdir().unwrap();
    let manifest = Manifest {
      asset_types: vec![AssetType::Stylesheets],
      entries: vec![entry(AssetType::Stylesheets, "all", vec![SourceSpec::Literal(
        "app.js".into(),
      )])],
    };

    let err = resolve_packages(
      &layout(dir.path()),
      &manifest,
      &BundleSelection::parse("x.css"),
      &[],
    )
    .unwrap_err();
    assert!(err.to_string().contains("javascripts source"));
  }

  #[test]
  fn rejects_escaping_bundle_names() {
    let dir = tempdir().unwrap();
    let manifest = Manifest {
      asset_types: vec![AssetType::Stylesheets],
      entries: vec![entry(AssetType::Stylesheets, "../all", vec![SourceSpec::Wildcard])],
    };
    assert!(resolve_packages(&layout(dir.path()), &manifest, &AllBundles, &[]).is_err());
  }
}
