//! Packaging orchestrator: resolve, compile, fingerprint, write and flush.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::bundle::{AssetHosts, BundleBuilder, EmbedPolicy, ReferenceRewriter, TransformRegistry};
use crate::cache::{Fingerprint, FingerprintCache};
use crate::config::BuildOptions;
use crate::error::{PackagerError, PackagerResult};
use crate::manifest::resolve_packages;
use crate::models::{AssetType, BundleContent, Manifest, ResolvedPackage, Variant};
use crate::output::{OutputWriter, WrittenFile};
use crate::project::ProjectLayout;
use crate::selection::BundleInclusion;

/// Outcome of one packaging run.
#[derive(Debug, Default)]
pub struct PackageReport {
  /// Asset types that had at least one selected bundle, in manifest order.
  pub processed_types: Vec<AssetType>,
  /// Bundles whose variants are in place on disk.
  pub written: Vec<WrittenBundle>,
  /// Bundles that failed; other bundles of the run are unaffected.
  pub failures: Vec<BundleFailure>,
}

impl PackageReport {
  /// Returns `true` when every selected bundle was packaged.
  pub fn is_success(&self) -> bool {
    self.failures.is_empty()
  }
}

/// A bundle that was packaged successfully.
#[derive(Debug)]
pub struct WrittenBundle {
  /// Bundle name as declared in the manifest.
  pub bundle_name: String,
  /// Asset type of the bundle.
  pub asset_type: AssetType,
  /// Digest stamped into the file names, when cache-busting is enabled.
  pub digest: Option<String>,
  /// Variant files and their gzip siblings.
  pub files: Vec<WrittenFile>,
}

/// A bundle that could not be packaged.
#[derive(Debug)]
pub struct BundleFailure {
  /// Bundle name as declared in the manifest.
  pub bundle_name: String,
  /// Asset type of the bundle.
  pub asset_type: AssetType,
  /// Why the bundle failed.
  pub error: PackagerError,
}

/// High-level entry point packaging the bundles of a manifest.
#[derive(Debug)]
pub struct AssetPackager<'a> {
  layout: &'a ProjectLayout,
  options: BuildOptions,
  transforms: TransformRegistry,
}

impl<'a> AssetPackager<'a> {
  /// Packager for a project layout, without any content transforms.
  pub fn new(layout: &'a ProjectLayout, options: BuildOptions) -> Self {
    Self {
      layout,
      options,
      transforms: TransformRegistry::new(),
    }
  }

  /// Use the given per-extension transforms while reading sources.
  pub fn with_transforms(mut self, transforms: TransformRegistry) -> Self {
    self.transforms = transforms;
    self
  }

  /// Package every bundle accepted by `selection`.
  ///
  /// Configuration problems abort the run before anything is written. Failures of a
  /// single bundle are reported and the remaining bundles still run. With
  /// cache-busting enabled the fingerprint cache is flushed at the end, keeping the
  /// entries of bundles this run did not touch.
  pub fn package<S: BundleInclusion>(
    &self,
    manifest: &Manifest,
    selection: &S,
  ) -> PackagerResult<PackageReport> {
    let hosts = AssetHosts::parse(self.options.asset_hosts.as_deref().unwrap_or_default())?;
    let packages = resolve_packages(
      self.layout,
      manifest,
      selection,
      &self.transforms.extensions(),
    )?;

    let cache = self
      .options
      .cache_boost
      .then(|| FingerprintCache::load(&self.layout.cache_path));
    let embed = EmbedPolicy {
      enabled: self.options.embed_inline,
      max_bytes: self.options.embed_max_bytes,
    };
    let rewriter = ReferenceRewriter::new(self.layout, cache.as_ref(), &hosts, embed);
    let bundler = BundleBuilder::new(
      &self.transforms,
      self.options.transform_options(),
      &rewriter,
      self.options.noembed_variant,
    );
    let writer = OutputWriter::new(self.layout, self.options.compress);

    let mut report = PackageReport::default();

    for &asset_type in &manifest.asset_types {
      let group: Vec<&ResolvedPackage> = packages
        .iter()
        .filter(|package| package.asset_type == asset_type)
        .collect();
      if group.is_empty() {
        continue;
      }

      info!("Processing type '{asset_type}'");
      report.processed_types.push(asset_type);

      let built: Vec<PackagerResult<Vec<BundleContent>>> = group
        .par_iter()
        .map(|package| bundler.build(package))
        .collect();

      for (package, result) in group.into_iter().zip(built) {
        let committed =
          result.and_then(|contents| commit(&writer, cache.as_ref(), package, &contents));
        match committed {
          Ok(bundle) => report.written.push(bundle),
          Err(err) if err.is_fatal() => return Err(err),
          Err(err) => {
            warn!("{err}");
            report.failures.push(BundleFailure {
              bundle_name: package.bundle_name.clone(),
              asset_type,
              error: err,
            });
          }
        }
      }
    }

    if let Some(cache) = &cache {
      cache.flush()?;
      debug!(path = %cache.path().display(), "fingerprint cache flushed");
    }

    Ok(report)
  }
}

fn commit(
  writer: &OutputWriter<'_>,
  cache: Option<&FingerprintCache>,
  package: &ResolvedPackage,
  contents: &[BundleContent],
) -> PackagerResult<WrittenBundle> {
  let key = package.cache_key();
  let plain = contents
    .iter()
    .find(|content| content.variant == Variant::Plain)
    .map(|content| content.bytes.as_slice())
    .unwrap_or_default();
  let fingerprint: Option<Fingerprint> = cache.map(|cache| cache.lookup(&key, plain));

  let files = writer.write(package, contents, fingerprint.as_ref())?;
  if let (Some(cache), Some(fingerprint)) = (cache, &fingerprint) {
    cache.assign(&key, &fingerprint.digest);
  }

  for file in &files {
    if file.written {
      info!("Wrote {}", file.path.display());
    } else {
      debug!(path = %file.path.display(), "unchanged");
    }
  }

  Ok(WrittenBundle {
    bundle_name: package.bundle_name.clone(),
    asset_type: package.asset_type,
    digest: fingerprint.map(|fingerprint| fingerprint.digest),
    files,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::parse_manifest;
  use crate::selection::AllBundles;
  use std::fs;
  use tempfile::tempdir;

  #[test]
  fn configuration_errors_abort_before_writing() {
    let dir = tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path(), dir.path().join(".assets.yml.json"));
    fs::create_dir_all(dir.path().join("stylesheets")).unwrap();
    fs::write(dir.path().join("stylesheets/one.css"), "a{}").unwrap();

    let manifest = parse_manifest("stylesheets:\n  all: [one, app.js]\n").unwrap();
    let packager = AssetPackager::new(&layout, BuildOptions::default());

    let err = packager.package(&manifest, &AllBundles).unwrap_err();
    assert!(matches!(err, PackagerError::Config { .. }));
    assert!(!dir.path().join("stylesheets/bundled").exists());
  }

  #[test]
  fn reports_failed_bundles_and_keeps_going() {
    let dir = tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path(), dir.path().join(".assets.yml.json"));
    fs::create_dir_all(dir.path().join("javascripts")).unwrap();
    fs::write(dir.path().join("javascripts/one.js"), "var a;").unwrap();

    let manifest = parse_manifest("javascripts:\n  broken: [missing]\n  all: [one]\n").unwrap();
    let options = BuildOptions {
      cache_boost: true,
      ..BuildOptions::default()
    };
    let report = AssetPackager::new(&layout, options)
      .package(&manifest, &AllBundles)
      .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.processed_types, vec![AssetType::Javascripts]);
    assert_eq!(report.failures[0].bundle_name, "broken");
    assert_eq!(report.written[0].bundle_name, "all");

    let cache = FingerprintCache::load(&layout.cache_path);
    assert!(cache.get("javascripts/all").is_some());
    assert_eq!(cache.get("javascripts/broken"), None);
  }

  #[test]
  fn unwritable_cache_aborts_the_run() {
    let dir = tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path(), dir.path().join(".assets.yml.json"));
    fs::create_dir_all(dir.path().join("javascripts")).unwrap();
    fs::write(dir.path().join("javascripts/one.js"), "var a;").unwrap();
    fs::create_dir_all(&layout.cache_path).unwrap();

    let manifest = parse_manifest("javascripts:\n  all: [one]\n").unwrap();
    let options = BuildOptions {
      cache_boost: true,
      ..BuildOptions::default()
    };
    let err = AssetPackager::new(&layout, options)
      .package(&manifest, &AllBundles)
      .unwrap_err();

    assert!(matches!(err, PackagerError::CacheWrite { .. }));
    assert!(err.is_fatal());
  }

  #[test]
  fn rejects_malformed_host_patterns() {
    let dir = tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path(), dir.path().join(".assets.yml.json"));
    let options = BuildOptions {
      asset_hosts: Some("assets[3,0].example.com".into()),
      ..BuildOptions::default()
    };
    let manifest = parse_manifest("stylesheets:\n  all: '*'\n").unwrap();

    let err = AssetPackager::new(&layout, options)
      .package(&manifest, &AllBundles)
      .unwrap_err();
    assert!(err.is_fatal());
  }
}
