//! `assetspkg`: package stylesheets and scripts declared in an assets manifest.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use asset_packager::manifest::load_manifest;
use asset_packager::{AssetPackager, BuildOptions, BundleSelection, PackagerConfig};

#[derive(Parser)]
#[command(name = "assetspkg")]
#[command(about = "Bundle, fingerprint and compress stylesheets and scripts")]
#[command(version, disable_version_flag = true)]
struct Cli {
  /// Public root holding the asset type directories
  #[arg(short, long, default_value = ".")]
  root: PathBuf,

  /// Manifest declaring the bundles
  #[arg(short, long, default_value = "assets.yml")]
  config: PathBuf,

  /// Write a gzip copy of every bundle
  #[arg(short = 'g', long)]
  gzip: bool,

  /// Also write stylesheet bundles without inlined assets
  #[arg(short = 'n', long)]
  noembed: bool,

  /// Stamp bundles and referenced assets with content digests
  #[arg(short = 'b', long = "cache-boosters")]
  cache_boosters: bool,

  /// Inline small assets as data URIs
  #[arg(short = 'e', long)]
  embed: bool,

  /// Asset host pattern, e.g. assets[0,3].example.com
  #[arg(short = 'a', long = "asset-hosts")]
  asset_hosts: Option<String>,

  /// Only build these outputs, e.g. all.css,*.js
  #[arg(short = 'o', long)]
  only: Option<String>,

  /// Indentation width passed to the transform commands of the config file
  #[arg(short = 'i', long = "indent")]
  indent: Option<usize>,

  /// Disable minification in the transform commands of the config file
  #[arg(long = "nm")]
  no_minify: bool,

  /// Verbose output
  #[arg(long)]
  verbose: bool,

  /// Print version
  #[arg(short = 'v', long, action = clap::ArgAction::Version)]
  version: (),
}

impl Cli {
  /// Command line flags layered over the configured defaults.
  fn merge_options(&self, mut options: BuildOptions) -> BuildOptions {
    options.compress |= self.gzip;
    options.noembed_variant |= self.noembed;
    options.cache_boost |= self.cache_boosters;
    options.embed_inline |= self.embed;
    if self.no_minify {
      options.minify = false;
    }
    if let Some(indent) = self.indent {
      options.indent_width = indent;
    }
    if self.asset_hosts.is_some() {
      options.asset_hosts = self.asset_hosts.clone();
    }
    if self.only.is_some() {
      options.only = self.only.clone();
    }
    options
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_env("ASSETSPKG_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)),
    )
    .with_target(false)
    .without_time()
    .init();

  if !cli.root.is_dir() {
    eprintln!("\"{}\" could not be found", cli.root.display());
    return ExitCode::FAILURE;
  }
  if !cli.config.is_file() {
    eprintln!("\"{}\" is missing", cli.config.display());
    return ExitCode::FAILURE;
  }

  match run(&cli) {
    Ok(true) => ExitCode::SUCCESS,
    Ok(false) => ExitCode::FAILURE,
    Err(err) => {
      eprintln!("error: {err:#}");
      ExitCode::FAILURE
    }
  }
}

fn run(cli: &Cli) -> Result<bool> {
  let manifest_dir = cli
    .config
    .parent()
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("."));
  let config = PackagerConfig::discover(&manifest_dir);
  let options = cli.merge_options(config.options.clone());
  let layout = config.to_layout(&cli.root, &cli.config);

  let manifest = load_manifest(&cli.config)
    .with_context(|| format!("failed to load manifest {}", cli.config.display()))?;
  let selection = BundleSelection::from_option(options.only.as_deref());

  let report = AssetPackager::new(&layout, options)
    .with_transforms(config.transform_registry())
    .package(&manifest, &selection)
    .context("packaging aborted")?;

  if report.is_success() {
    info!("Packaged {} bundle(s)", report.written.len());
  } else {
    for failure in &report.failures {
      eprintln!(
        "failed: {} bundle '{}': {}",
        failure.asset_type, failure.bundle_name, failure.error
      );
    }
  }

  Ok(report.is_success())
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;
  use clap::error::ErrorKind;

  #[test]
  fn command_definition_is_consistent() {
    Cli::command().debug_assert();
  }

  #[test]
  fn short_v_prints_the_version() {
    let err = Cli::try_parse_from(["assetspkg", "-v"])
      .err()
      .map(|err| err.kind());
    assert_eq!(err, Some(ErrorKind::DisplayVersion));
  }

  #[test]
  fn verbose_is_long_only() {
    let cli = Cli::try_parse_from(["assetspkg", "--verbose", "-i", "2", "--nm"]).unwrap();
    assert!(cli.verbose);

    let options = cli.merge_options(BuildOptions::default());
    assert_eq!(options.indent_width, 2);
    assert!(!options.minify);
  }
}
