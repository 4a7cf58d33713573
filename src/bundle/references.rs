//! Rewriting `url()` references inside stylesheets.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use tracing::debug;

use crate::asset_paths::{resolve_public_path, should_ignore_asset_reference, split_reference_suffix};
use crate::bundle::{AssetHosts, EmbedPolicy};
use crate::cache::FingerprintCache;
use crate::error::{PackagerError, PackagerResult};
use crate::models::ResolvedPackage;
use crate::output::{remove_if_exists, stamped_file_name, write_stamped_copy};
use crate::project::ProjectLayout;

/// A stylesheet source after reference rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenSource {
  /// Content for the plain variant; eligible assets may be inlined.
  pub plain: String,
  /// Content for the no-embed variant, when requested. Every reference stays external.
  pub noembed: Option<String>,
}

/// Rewrites asset references to root-absolute, optionally stamped and host-sharded URLs.
///
/// Stamped copies of referenced assets are installed next to their originals the first
/// time a reference is seen during a run; later references to the same asset reuse the
/// result.
#[derive(Debug)]
pub struct ReferenceRewriter<'a> {
  layout: &'a ProjectLayout,
  cache: Option<&'a FingerprintCache>,
  hosts: &'a AssetHosts,
  embed: EmbedPolicy,
  stamped: Mutex<BTreeMap<String, String>>,
}

struct ResolvedReference {
  external: String,
  inline: Option<String>,
}

impl<'a> ReferenceRewriter<'a> {
  /// Rewriter stamping assets through `cache` when one is given.
  pub fn new(
    layout: &'a ProjectLayout,
    cache: Option<&'a FingerprintCache>,
    hosts: &'a AssetHosts,
    embed: EmbedPolicy,
  ) -> Self {
    Self {
      layout,
      cache,
      hosts,
      embed,
      stamped: Mutex::new(BTreeMap::new()),
    }
  }

  /// Rewrite every `url()` in one stylesheet source of `package`.
  ///
  /// Remote, protocol-relative, data and fragment-only references are kept as written.
  /// A reference to a file that does not exist under the root fails the bundle.
  pub fn rewrite(
    &self,
    package: &ResolvedPackage,
    source: &Path,
    css: &str,
    with_noembed: bool,
  ) -> PackagerResult<RewrittenSource> {
    let source_dir = source.parent().unwrap_or(self.layout.root.as_path());
    let mut plain = String::with_capacity(css.len());
    let mut noembed = with_noembed.then(|| String::with_capacity(css.len()));
    let mut last = 0;

    for caps in url_regex().captures_iter(css) {
      let Some(whole) = caps.get(0) else {
        continue;
      };
      let reference = caps.get(2).map_or("", |m| m.as_str()).trim();
      if should_ignore_asset_reference(reference) {
        continue;
      }

      let quote = caps.get(1).map_or("", |m| m.as_str());
      let resolved = self.resolve(package, source_dir, reference)?;
      let untouched = &css[last..whole.start()];

      let plain_target = resolved.inline.as_deref().unwrap_or(&resolved.external);
      plain.push_str(untouched);
      plain.push_str(&format!("url({quote}{plain_target}{quote})"));

      if let Some(noembed) = noembed.as_mut() {
        noembed.push_str(untouched);
        noembed.push_str(&format!("url({quote}{}{quote})", resolved.external));
      }

      last = whole.end();
    }

    plain.push_str(&css[last..]);
    if let Some(noembed) = noembed.as_mut() {
      noembed.push_str(&css[last..]);
    }

    Ok(RewrittenSource { plain, noembed })
  }

  fn resolve(
    &self,
    package: &ResolvedPackage,
    source_dir: &Path,
    reference: &str,
  ) -> PackagerResult<ResolvedReference> {
    let (path_part, suffix) = split_reference_suffix(reference);
    let missing = |path| PackagerError::MissingAssetReference {
      bundle: package.bundle_name.clone(),
      asset_type: package.asset_type,
      reference: reference.to_string(),
      path,
    };

    let Some(public_path) = resolve_public_path(&self.layout.root, source_dir, path_part) else {
      return Err(missing(source_dir.join(path_part)));
    };
    let file = self.layout.public_file(&public_path);
    if !file.is_file() {
      return Err(missing(file));
    }

    let bytes = if self.cache.is_some() || self.embed.enabled {
      fs::read(&file).map_err(|err| PackagerError::io(&file, err))?
    } else {
      Vec::new()
    };

    let target = match self.cache {
      Some(cache) => self.stamp(cache, &public_path, &file, &bytes)?,
      None => public_path.clone(),
    };

    Ok(ResolvedReference {
      external: format!("{}{target}{suffix}", self.hosts.origin_for(&public_path)),
      inline: self.embed.data_uri(&file, &bytes),
    })
  }

  /// Stamp an asset with its content digest and install the stamped copy.
  ///
  /// When the digest changed, the copy stamped with the previous digest is removed.
  /// A selective run that skips a bundle still referencing that name leaves the
  /// skipped bundle pointing at a missing file until it is rebuilt.
  fn stamp(
    &self,
    cache: &FingerprintCache,
    public_path: &str,
    file: &Path,
    bytes: &[u8],
  ) -> PackagerResult<String> {
    let mut stamped = self
      .stamped
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(existing) = stamped.get(public_path) {
      return Ok(existing.clone());
    }

    let fingerprint = cache.lookup(public_path, bytes);
    if let Some(stale) = fingerprint.stale_digest() {
      let stale_file = self
        .layout
        .public_file(&stamped_file_name(public_path, stale));
      if remove_if_exists(&stale_file)? {
        debug!(path = %stale_file.display(), "removed stale asset copy");
      }
    }

    let stamped_path = stamped_file_name(public_path, &fingerprint.digest);
    let destination = self.layout.public_file(&stamped_path);
    if write_stamped_copy(file, &destination, bytes)
      .map_err(|err| PackagerError::io(&destination, err))?
    {
      debug!(path = %destination.display(), "wrote stamped asset copy");
    }
    cache.assign(public_path, &fingerprint.digest);

    stamped.insert(public_path.to_string(), stamped_path.clone());
    Ok(stamped_path)
  }
}

fn url_regex() -> &'static Regex {
  static URL: OnceLock<Regex> = OnceLock::new();
  URL.get_or_init(|| {
    Regex::new(r#"(?i)url\(\s*(['"]?)([^'")]*?)(['"]?)\s*\)"#).expect("invalid url() regex")
  })
}
