//! Loading the YAML package manifest into ordered bundle entries.

use std::fs;
use std::path::Path;

use serde_yaml::Value;

use crate::error::{PackagerError, PackagerResult};
use crate::models::{AssetType, Manifest, ManifestEntry, SourceSpec};

/// Load and parse a manifest file from disk.
pub fn load_manifest(path: &Path) -> PackagerResult<Manifest> {
  let content = fs::read_to_string(path).map_err(|err| PackagerError::io(path, err))?;
  parse_manifest(&content)
}

/// Parse manifest text such as
///
/// ```yaml
/// stylesheets:
///   all: [one, two]
///   admin: 'admin/**/*'
/// javascripts:
///   all: '*'
/// ```
///
/// Declaration order of types and bundles is preserved.
pub fn parse_manifest(content: &str) -> PackagerResult<Manifest> {
  let document: Value = serde_yaml::from_str(content)
    .map_err(|err| PackagerError::config(format!("failed to parse manifest: {err}")))?;

  let sections = match document {
    Value::Null => return Ok(Manifest::default()),
    Value::Mapping(sections) => sections,
    _ => {
      return Err(PackagerError::config(
        "manifest must map asset types to bundles",
      ));
    }
  };

  let mut manifest = Manifest::default();
  for (type_key, bundles) in &sections {
    let type_name = scalar_string(type_key)
      .ok_or_else(|| PackagerError::config("asset type keys must be strings"))?;
    let asset_type = AssetType::from_manifest_key(&type_name)
      .ok_or_else(|| PackagerError::config(format!("unknown asset type '{type_name}'")))?;
    if manifest.declares(asset_type) {
      return Err(PackagerError::config(format!(
        "asset type '{type_name}' declared twice"
      )));
    }
    manifest.asset_types.push(asset_type);

    let bundles = match bundles {
      Value::Null => continue,
      Value::Mapping(bundles) => bundles,
      _ => {
        return Err(PackagerError::config(format!(
          "'{type_name}' must map bundle names to sources"
        )));
      }
    };

    for (name_key, sources) in bundles {
      let bundle_name = scalar_string(name_key).ok_or_else(|| {
        PackagerError::config(format!("bundle names in '{type_name}' must be strings"))
      })?;
      let sources = parse_sources(asset_type, &bundle_name, sources)?;
      manifest.entries.push(ManifestEntry {
        bundle_name,
        asset_type,
        sources,
      });
    }
  }

  Ok(manifest)
}

fn parse_sources(
  asset_type: AssetType,
  bundle_name: &str,
  value: &Value,
) -> PackagerResult<Vec<SourceSpec>> {
  let raw_values: Vec<&Value> = match value {
    Value::Sequence(items) => items.iter().collect(),
    other => vec![other],
  };

  raw_values
    .into_iter()
    .map(|raw| {
      let text = scalar_string(raw)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
          PackagerError::config(format!(
            "{asset_type} bundle '{bundle_name}' has an invalid source entry"
          ))
        })?;
      Ok(SourceSpec::classify(&text))
    })
    .collect()
}

fn scalar_string(value: &Value) -> Option<String> {
  match value {
    Value::String(text) => Some(text.clone()),
    Value::Number(number) => Some(number.to_string()),
    _ => None,
  }
}
