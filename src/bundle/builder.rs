//! Concatenating the sources of one bundle into its variants.

use std::fs;
use std::io::ErrorKind;

use crate::bundle::{ReferenceRewriter, TransformOptions, TransformRegistry};
use crate::error::{PackagerError, PackagerResult};
use crate::models::{AssetType, BundleContent, ResolvedPackage, Variant};

/// Reads, transforms and rewrites the sources of a bundle.
#[derive(Debug)]
pub struct BundleBuilder<'a> {
  transforms: &'a TransformRegistry,
  transform_options: TransformOptions,
  rewriter: &'a ReferenceRewriter<'a>,
  noembed_variant: bool,
}

impl<'a> BundleBuilder<'a> {
  /// Builder producing a no-embed stylesheet variant when `noembed_variant` is set.
  pub fn new(
    transforms: &'a TransformRegistry,
    transform_options: TransformOptions,
    rewriter: &'a ReferenceRewriter<'a>,
    noembed_variant: bool,
  ) -> Self {
    Self {
      transforms,
      transform_options,
      rewriter,
      noembed_variant,
    }
  }

  /// Build every variant of a bundle, plain first.
  ///
  /// Sources are joined with a newline in the order they were resolved.
  pub fn build(&self, package: &ResolvedPackage) -> PackagerResult<Vec<BundleContent>> {
    let stylesheet = package.asset_type == AssetType::Stylesheets;
    let with_noembed = stylesheet && self.noembed_variant;

    let mut plain_parts = Vec::with_capacity(package.files.len());
    let mut noembed_parts = Vec::new();

    for file in &package.files {
      let raw = fs::read_to_string(file).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
          PackagerError::MissingSource {
            bundle: package.bundle_name.clone(),
            asset_type: package.asset_type,
            path: file.clone(),
          }
        } else {
          PackagerError::io(file, err)
        }
      })?;

      let transformed = self
        .transforms
        .apply(file, raw, &self.transform_options)
        .map_err(|err| PackagerError::Transform {
          bundle: package.bundle_name.clone(),
          asset_type: package.asset_type,
          path: file.clone(),
          reason: format!("{err:#}"),
        })?;

      if stylesheet {
        let rewritten = self
          .rewriter
          .rewrite(package, file, &transformed, with_noembed)?;
        plain_parts.push(rewritten.plain);
        noembed_parts.extend(rewritten.noembed);
      } else {
        plain_parts.push(transformed);
      }
    }

    let mut contents = vec![content(package, Variant::Plain, plain_parts.join("\n"))];
    if with_noembed {
      contents.push(content(package, Variant::NoEmbed, noembed_parts.join("\n")));
    }
    Ok(contents)
  }
}

fn content(package: &ResolvedPackage, variant: Variant, text: String) -> BundleContent {
  BundleContent {
    bundle_name: package.bundle_name.clone(),
    asset_type: package.asset_type,
    variant,
    bytes: text.into_bytes(),
  }
}
