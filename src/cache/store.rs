//! Persistent key to digest store with selective-run merging.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::cache::digest::digest;
use crate::error::{PackagerError, PackagerResult};

/// Outcome of comparing fresh content against the remembered digest for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
  /// Digest of the current content.
  pub digest: String,
  /// Digest remembered for the key before this comparison, if any.
  pub previous: Option<String>,
}

impl Fingerprint {
  /// Returns `true` when the content differs from what was remembered.
  pub fn changed(&self) -> bool {
    self.previous.as_deref() != Some(self.digest.as_str())
  }

  /// Digest whose stamped artifacts are now stale.
  pub fn stale_digest(&self) -> Option<&str> {
    self
      .previous
      .as_deref()
      .filter(|previous| *previous != self.digest)
  }
}

#[derive(Debug, Default)]
struct CacheState {
  persisted: BTreeMap<String, Value>,
  assigned: BTreeMap<String, String>,
}

/// Fingerprint store shared by the bundle builder and the output writer.
///
/// Lifecycle is `load → lookup/assign → flush`. Keys assigned during the run replace
/// their persisted values at flush time; every other persisted key is written back
/// untouched, so a selective run never drops entries for bundles it skipped.
#[derive(Debug)]
pub struct FingerprintCache {
  path: PathBuf,
  state: Mutex<CacheState>,
}

impl FingerprintCache {
  /// Start with no remembered digests.
  pub fn empty(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      state: Mutex::new(CacheState::default()),
    }
  }

  /// Load the store from disk.
  ///
  /// A missing file is an empty store. A malformed one is logged and also treated as
  /// empty; the next flush replaces it.
  pub fn load(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let persisted = match read_entries(&path) {
      Ok(entries) => entries,
      Err(err) => {
        warn!("{err}; starting with an empty cache");
        BTreeMap::new()
      }
    };

    Self {
      path,
      state: Mutex::new(CacheState {
        persisted,
        assigned: BTreeMap::new(),
      }),
    }
  }

  /// Location the store flushes to.
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Digest currently remembered for a key.
  ///
  /// Non-string values written by other tools are kept on disk but never count as a
  /// digest.
  pub fn get(&self, key: &str) -> Option<String> {
    let state = self.lock();
    current_digest(&state, key)
  }

  /// Compare content against the remembered digest without recording anything.
  pub fn lookup(&self, key: &str, bytes: &[u8]) -> Fingerprint {
    Fingerprint {
      digest: digest(bytes),
      previous: self.get(key),
    }
  }

  /// Record a digest for a key; it replaces the persisted value on flush.
  pub fn assign(&self, key: &str, digest: &str) {
    self
      .lock()
      .assigned
      .insert(key.to_string(), digest.to_string());
  }

  /// Compare content against the remembered digest and record the new one.
  pub fn lookup_or_assign(&self, key: &str, bytes: &[u8]) -> Fingerprint {
    let digest = digest(bytes);
    let mut state = self.lock();
    let previous = current_digest(&state, key);
    state.assigned.insert(key.to_string(), digest.clone());
    Fingerprint { digest, previous }
  }

  /// Persisted entries overlaid with everything assigned during this run.
  pub fn snapshot(&self) -> BTreeMap<String, Value> {
    let state = self.lock();
    let mut merged = state.persisted.clone();
    for (key, digest) in &state.assigned {
      merged.insert(key.clone(), Value::String(digest.clone()));
    }
    merged
  }

  /// Write the merged store back to disk as a complete replacement.
  ///
  /// The file is written to a temporary sibling and renamed into place, so readers see
  /// either the previous or the new mapping. An unchanged mapping is not rewritten.
  pub fn flush(&self) -> PackagerResult<()> {
    let mut content = serde_json::to_string_pretty(&self.snapshot()).map_err(|err| {
      PackagerError::CacheWrite {
        path: self.path.clone(),
        source: std::io::Error::other(err),
      }
    })?;
    content.push('\n');

    if fs::read_to_string(&self.path).is_ok_and(|existing| existing == content) {
      debug!(path = %self.path.display(), "cache unchanged");
      return Ok(());
    }

    write_atomically(&self.path, content.as_bytes()).map_err(|source| PackagerError::CacheWrite {
      path: self.path.clone(),
      source,
    })
  }

  fn lock(&self) -> MutexGuard<'_, CacheState> {
    self
      .state
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

fn current_digest(state: &CacheState, key: &str) -> Option<String> {
  if let Some(digest) = state.assigned.get(key) {
    return Some(digest.clone());
  }
  state
    .persisted
    .get(key)
    .and_then(Value::as_str)
    .map(str::to_string)
}

/// Read the persisted mapping. A missing file is an empty mapping.
pub fn read_entries(path: &Path) -> PackagerResult<BTreeMap<String, Value>> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
    Err(err) => {
      return Err(PackagerError::CacheRead {
        path: path.to_path_buf(),
        reason: err.to_string(),
      });
    }
  };

  match serde_json::from_str::<Value>(&content) {
    Ok(Value::Object(map)) => Ok(map.into_iter().collect()),
    Ok(_) => Err(PackagerError::CacheRead {
      path: path.to_path_buf(),
      reason: "expected a JSON object".into(),
    }),
    Err(err) => Err(PackagerError::CacheRead {
      path: path.to_path_buf(),
      reason: err.to_string(),
    }),
  }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  fs::create_dir_all(dir)?;

  let mut tmp = NamedTempFile::new_in(dir)?;
  tmp.write_all(bytes)?;
  tmp.as_file().sync_all()?;
  tmp.persist(path).map_err(|err| err.error)?;
  Ok(())
}
