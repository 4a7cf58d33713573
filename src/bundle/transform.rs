//! Per-extension content transforms injected into the bundle builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::Result;

/// Formatting switches handed to every transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
  /// Indentation width for transforms that pretty-print.
  pub indent_width: usize,
  /// Whether transforms should minify their output.
  pub minify: bool,
}

impl Default for TransformOptions {
  fn default() -> Self {
    Self {
      indent_width: 4,
      minify: true,
    }
  }
}

/// Pure `content -> content` transformation for one kind of source file.
pub trait ContentTransform: Send + Sync {
  /// Transform the content of `source`.
  fn transform(&self, source: &Path, content: &str, options: &TransformOptions) -> Result<String>;
}

impl<F> ContentTransform for F
where
  F: Fn(&Path, &str, &TransformOptions) -> Result<String> + Send + Sync,
{
  fn transform(&self, source: &Path, content: &str, options: &TransformOptions) -> Result<String> {
    self(source, content, options)
  }
}

/// Transforms keyed by source file extension. Unknown extensions pass through unchanged.
#[derive(Default)]
pub struct TransformRegistry {
  transforms: BTreeMap<String, Box<dyn ContentTransform>>,
}

impl TransformRegistry {
  /// Registry without any transforms.
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a transform for an extension such as `less`, replacing any previous one.
  pub fn register<T>(&mut self, extension: &str, transform: T) -> &mut Self
  where
    T: ContentTransform + 'static,
  {
    self
      .transforms
      .insert(normalise_extension(extension), Box::new(transform));
    self
  }

  /// Builder-style variant of [`TransformRegistry::register`].
  pub fn with<T>(mut self, extension: &str, transform: T) -> Self
  where
    T: ContentTransform + 'static,
  {
    self.register(extension, transform);
    self
  }

  /// Returns `true` when a transform handles the extension.
  pub fn handles(&self, extension: &str) -> bool {
    self
      .transforms
      .contains_key(&normalise_extension(extension))
  }

  /// Handled extensions in sorted order, without the leading dot.
  pub fn extensions(&self) -> Vec<String> {
    self.transforms.keys().cloned().collect()
  }

  /// Run the transform registered for the file's extension, if any.
  pub fn apply(&self, source: &Path, content: String, options: &TransformOptions) -> Result<String> {
    let extension = source
      .extension()
      .map(|extension| normalise_extension(&extension.to_string_lossy()));

    match extension.and_then(|extension| self.transforms.get(&extension)) {
      Some(transform) => transform.transform(source, &content, options),
      None => Ok(content),
    }
  }
}

impl fmt::Debug for TransformRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TransformRegistry")
      .field("extensions", &self.transforms.keys().collect::<Vec<_>>())
      .finish()
  }
}

fn normalise_extension(extension: &str) -> String {
  extension.trim_start_matches('.').to_ascii_lowercase()
}
