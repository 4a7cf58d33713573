//! Writing bundle variants to disk, pruning stale fingerprinted files and compressing.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use same_file::is_same_file;
use tracing::debug;

use crate::cache::Fingerprint;
use crate::error::{PackagerError, PackagerResult};
use crate::manifest::join_relative;
use crate::models::{BundleContent, ResolvedPackage, Variant};
use crate::project::ProjectLayout;

/// A file the writer produced or confirmed during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
  /// Location of the file.
  pub path: PathBuf,
  /// `false` when an identical file was already in place and left untouched.
  pub written: bool,
}

/// Writes bundle variants below each type's bundled directory.
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter<'a> {
  layout: &'a ProjectLayout,
  compress: bool,
}

impl<'a> OutputWriter<'a> {
  /// Writer for a layout; `compress` adds a `.gz` sibling per variant.
  pub fn new(layout: &'a ProjectLayout, compress: bool) -> Self {
    Self { layout, compress }
  }

  /// Destination of a bundle variant, nested when the bundle name contains `/`.
  pub fn output_path(
    &self,
    package: &ResolvedPackage,
    digest: Option<&str>,
    variant: Variant,
  ) -> PathBuf {
    let file_name = output_file_name(
      &package.bundle_name,
      digest,
      variant,
      package.asset_type.extension(),
    );
    join_relative(&self.layout.bundled_dir(package.asset_type), &file_name)
  }

  /// Write every variant of a bundle.
  ///
  /// With a fingerprint, files are stamped with its digest and the files stamped with
  /// the stale digest are removed first. Variants already on disk with identical bytes
  /// are not rewritten, and their gzip sibling is only created when missing.
  pub fn write(
    &self,
    package: &ResolvedPackage,
    contents: &[BundleContent],
    fingerprint: Option<&Fingerprint>,
  ) -> PackagerResult<Vec<WrittenFile>> {
    if let Some(stale) = fingerprint.and_then(Fingerprint::stale_digest) {
      self.remove_stale(package, stale)?;
    }

    let digest = fingerprint.map(|fingerprint| fingerprint.digest.as_str());
    let mut files = Vec::new();

    for content in contents {
      let path = self.output_path(package, digest, content.variant);
      if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| PackagerError::io(parent, err))?;
      }

      let written =
        write_if_changed(&path, &content.bytes).map_err(|err| PackagerError::io(&path, err))?;

      if self.compress {
        let gz_path = gzip_path(&path);
        let needs_gzip = written || !gz_path.is_file();
        if needs_gzip {
          let compressed =
            gzip_bytes(&content.bytes).map_err(|err| PackagerError::io(&gz_path, err))?;
          fs::write(&gz_path, compressed).map_err(|err| PackagerError::io(&gz_path, err))?;
        }
        files.push(WrittenFile { path, written });
        files.push(WrittenFile {
          path: gz_path,
          written: needs_gzip,
        });
      } else {
        files.push(WrittenFile { path, written });
      }
    }

    Ok(files)
  }

  fn remove_stale(&self, package: &ResolvedPackage, stale_digest: &str) -> PackagerResult<()> {
    for variant in Variant::ALL {
      let path = self.output_path(package, Some(stale_digest), variant);
      for candidate in [gzip_path(&path), path] {
        if remove_if_exists(&candidate)? {
          debug!(path = %candidate.display(), "removed stale bundle");
        }
      }
    }
    Ok(())
  }
}

/// `{bundle}[-{digest}][-noembed].{ext}`, keeping any directories in the bundle name.
pub fn output_file_name(
  bundle_name: &str,
  digest: Option<&str>,
  variant: Variant,
  extension: &str,
) -> String {
  let stamp = digest.map(|digest| format!("-{digest}")).unwrap_or_default();
  format!("{bundle_name}{stamp}{}.{extension}", variant.suffix())
}

/// Insert a digest before the extension of the last path segment.
///
/// `/images/one.png` becomes `/images/one-<digest>.png`.
pub fn stamped_file_name(path: &str, digest: &str) -> String {
  let (dir, file) = match path.rfind('/') {
    Some(index) => path.split_at(index + 1),
    None => ("", path),
  };

  match file.rfind('.') {
    Some(dot) if dot > 0 => format!("{dir}{}-{digest}{}", &file[..dot], &file[dot..]),
    _ => format!("{dir}{file}-{digest}"),
  }
}

/// Sibling path receiving the compressed copy of a file.
pub fn gzip_path(path: &Path) -> PathBuf {
  let mut name = path.as_os_str().to_os_string();
  name.push(".gz");
  PathBuf::from(name)
}

/// Gzip-compress bytes.
pub fn gzip_bytes(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
  let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
  encoder.write_all(bytes)?;
  encoder.finish()
}

/// Write an independent copy of `source` holding `bytes` to `destination`.
///
/// A destination that is the same file as `source`, such as a hard link left behind
/// by an earlier run, is replaced so later edits of the source never reach it.
/// Returns `false` when an identical independent copy was already in place.
pub fn write_stamped_copy(source: &Path, destination: &Path, bytes: &[u8]) -> std::io::Result<bool> {
  if destination.exists() && is_same_file(source, destination)? {
    fs::remove_file(destination)?;
  }
  write_if_changed(destination, bytes)
}

/// Remove a file, reporting whether it existed.
pub(crate) fn remove_if_exists(path: &Path) -> PackagerResult<bool> {
  match fs::remove_file(path) {
    Ok(()) => Ok(true),
    Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
    Err(err) => Err(PackagerError::io(path, err)),
  }
}

fn write_if_changed(path: &Path, bytes: &[u8]) -> std::io::Result<bool> {
  match fs::read(path) {
    Ok(existing) if existing == bytes => return Ok(false),
    Ok(_) => {}
    Err(err) if err.kind() == ErrorKind::NotFound => {}
    Err(err) => return Err(err),
  }
  fs::write(path, bytes)?;
  Ok(true)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::AssetType;
  use flate2::read::GzDecoder;
  use std::io::Read;
  use tempfile::tempdir;

  fn package(name: &str) -> ResolvedPackage {
    ResolvedPackage {
      bundle_name: name.into(),
      asset_type: AssetType::Stylesheets,
      files: Vec::new(),
    }
  }

  fn content(name: &str, variant: Variant, bytes: &[u8]) -> BundleContent {
    BundleContent {
      bundle_name: name.into(),
      asset_type: AssetType::Stylesheets,
      variant,
      bytes: bytes.to_vec(),
    }
  }

  fn gunzip(path: &Path) -> Vec<u8> {
    let mut decoder = GzDecoder::new(fs::File::open(path).unwrap());
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).unwrap();
    out
  }

  #[test]
  fn names_outputs_with_digest_and_variant() {
    assert_eq!(output_file_name("all", None, Variant::Plain, "css"), "all.css");
    assert_eq!(
      output_file_name("all", Some("abc"), Variant::NoEmbed, "css"),
      "all-abc-noembed.css"
    );
    assert_eq!(
      output_file_name("desktop/all", None, Variant::NoEmbed, "js"),
      "desktop/all-noembed.js"
    );
  }

  #[test]
  fn stamps_asset_names_before_extension() {
    assert_eq!(stamped_file_name("/images/one.png", "ff"), "/images/one-ff.png");
    assert_eq!(stamped_file_name("/fonts/LICENSE", "ff"), "/fonts/LICENSE-ff");
    assert_eq!(stamped_file_name("/a.b/.hidden", "ff"), "/a.b/.hidden-ff");
  }

  #[test]
  fn writes_nested_bundles_with_gzip_siblings() {
    let dir = tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path(), dir.path().join("cache.json"));
    let writer = OutputWriter::new(&layout, true);

    let files = writer
      .write(
        &package("desktop/all"),
        &[content("desktop/all", Variant::Plain, b"a{}")],
        None,
      )
      .unwrap();

    let css = dir.path().join("stylesheets/bundled/desktop/all.css");
    assert_eq!(files.len(), 2);
    assert_eq!(fs::read(&css).unwrap(), b"a{}");
    assert_eq!(gunzip(&gzip_path(&css)), b"a{}");
  }

  #[test]
  fn skips_identical_content_and_restores_missing_gzip() {
    let dir = tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path(), dir.path().join("cache.json"));
    let writer = OutputWriter::new(&layout, true);
    let contents = [content("all", Variant::Plain, b"a{}")];

    writer.write(&package("all"), &contents, None).unwrap();
    let css = dir.path().join("stylesheets/bundled/all.css");
    fs::remove_file(gzip_path(&css)).unwrap();

    let files = writer.write(&package("all"), &contents, None).unwrap();
    assert!(!files[0].written);
    assert!(files[1].written);
    assert!(gzip_path(&css).is_file());
  }

  #[test]
  fn removes_files_stamped_with_stale_digest() {
    let dir = tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path(), dir.path().join("cache.json"));
    let writer = OutputWriter::new(&layout, true);
    let pkg = package("all");

    let old = Fingerprint {
      digest: "old".into(),
      previous: None,
    };
    writer
      .write(
        &pkg,
        &[
          content("all", Variant::Plain, b"a{}"),
          content("all", Variant::NoEmbed, b"a{}"),
        ],
        Some(&old),
      )
      .unwrap();

    let new = Fingerprint {
      digest: "new".into(),
      previous: Some("old".into()),
    };
    writer
      .write(&pkg, &[content("all", Variant::Plain, b"b{}")], Some(&new))
      .unwrap();

    let bundled = dir.path().join("stylesheets/bundled");
    let mut names: Vec<String> = fs::read_dir(&bundled)
      .unwrap()
      .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    names.sort();
    assert_eq!(names, vec!["all-new.css", "all-new.css.gz"]);
  }

  #[test]
  fn stamped_copies_do_not_follow_source_edits() -> std::io::Result<()> {
    let temp = tempdir()?;
    let source = temp.path().join("one.png");
    fs::write(&source, b"png")?;
    let destination = temp.path().join("one-ff.png");

    assert!(write_stamped_copy(&source, &destination, b"png")?);
    assert!(!same_file::is_same_file(&source, &destination)?);
    assert!(!write_stamped_copy(&source, &destination, b"png")?);

    fs::write(&source, b"edited")?;
    assert_eq!(fs::read(&destination)?, b"png");
    Ok(())
  }

  #[test]
  fn replaces_hard_linked_stamped_copies() -> std::io::Result<()> {
    let temp = tempdir()?;
    let source = temp.path().join("one.png");
    fs::write(&source, b"png")?;
    let destination = temp.path().join("one-ff.png");
    fs::hard_link(&source, &destination)?;

    assert!(write_stamped_copy(&source, &destination, b"png")?);
    assert!(!same_file::is_same_file(&source, &destination)?);
    fs::write(&source, b"edited")?;
    assert_eq!(fs::read(&destination)?, b"png");
    Ok(())
  }
}
