//! Inlining small assets as data URIs.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};

/// Policy deciding which referenced assets are inlined into the plain variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedPolicy {
  /// Inline eligible assets at all.
  pub enabled: bool,
  /// Largest asset size that is still inlined.
  pub max_bytes: u64,
}

impl EmbedPolicy {
  /// Data URI for the asset, or `None` when the policy keeps it external.
  pub fn data_uri(&self, path: &Path, bytes: &[u8]) -> Option<String> {
    if !self.enabled || bytes.len() as u64 > self.max_bytes {
      return None;
    }
    let mime = mime_type_for(path)?;
    Some(format!(
      "data:{mime};base64,{}",
      general_purpose::STANDARD.encode(bytes)
    ))
  }
}

/// MIME type for the asset kinds that may be embedded.
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
  let extension = path.extension()?.to_string_lossy().to_ascii_lowercase();
  let mime = match extension.as_str() {
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "svg" => "image/svg+xml",
    "webp" => "image/webp",
    "woff" => "font/woff",
    "woff2" => "font/woff2",
    "ttf" => "font/ttf",
    "otf" => "font/otf",
    "eot" => "application/vnd.ms-fontobject",
    _ => return None,
  };
  Some(mime)
}
