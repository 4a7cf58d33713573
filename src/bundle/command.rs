//! Content transforms backed by an external command.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow};

use crate::bundle::{ContentTransform, TransformOptions};

/// Environment variable carrying [`TransformOptions::indent_width`].
pub const INDENT_WIDTH_ENV: &str = "ASSETSPKG_INDENT_WIDTH";
/// Environment variable carrying [`TransformOptions::minify`] as `1` or `0`.
pub const MINIFY_ENV: &str = "ASSETSPKG_MINIFY";
/// Environment variable carrying the path of the source being transformed.
pub const SOURCE_ENV: &str = "ASSETSPKG_SOURCE";

/// Runs a program with the source content on stdin and takes its stdout as output.
///
/// A `{source}` argument is replaced by the source path. The transform options are
/// exported through [`INDENT_WIDTH_ENV`] and [`MINIFY_ENV`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTransform {
  program: String,
  args: Vec<String>,
}

impl CommandTransform {
  /// Transform running `program` with `args`.
  pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
    Self {
      program: program.into(),
      args,
    }
  }

  /// Build from an argv list such as `["lessc", "-"]`; `None` when empty.
  pub fn from_argv(argv: &[String]) -> Option<Self> {
    let (program, args) = argv.split_first()?;
    Some(Self::new(program.clone(), args.to_vec()))
  }
}

impl ContentTransform for CommandTransform {
  fn transform(&self, source: &Path, content: &str, options: &TransformOptions) -> Result<String> {
    let source_arg = source.to_string_lossy();
    let args = self
      .args
      .iter()
      .map(|arg| arg.replace("{source}", &source_arg));

    let mut child = Command::new(&self.program)
      .args(args)
      .env(INDENT_WIDTH_ENV, options.indent_width.to_string())
      .env(MINIFY_ENV, if options.minify { "1" } else { "0" })
      .env(SOURCE_ENV, source)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .with_context(|| format!("failed to run `{}`", self.program))?;

    let mut stdin = child
      .stdin
      .take()
      .ok_or_else(|| anyhow!("stdin of `{}` is unavailable", self.program))?;

    // stdin is written from its own thread while stdout is drained here.
    let (output, fed) = thread::scope(|scope| {
      let feeder = scope.spawn(move || stdin.write_all(content.as_bytes()));
      let output = child.wait_with_output();
      let fed = feeder
        .join()
        .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
      (output, fed)
    });
    let output = output.with_context(|| format!("failed to wait for `{}`", self.program))?;

    if !output.status.success() {
      return Err(anyhow!(
        "`{}` failed with status {}: {}",
        self.program,
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
      ));
    }
    if let Err(err) = fed
      && err.kind() != std::io::ErrorKind::BrokenPipe
    {
      return Err(err).with_context(|| format!("failed to write to `{}`", self.program));
    }

    String::from_utf8(output.stdout)
      .with_context(|| format!("`{}` produced non UTF-8 output", self.program))
  }
}
