//! Directory scanning and glob matching for manifest source entries.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

/// Translate a glob pattern into an anchored regular expression over `/` separated paths.
///
/// Supports `**` (any number of directories), `*` (within one segment), `?` and
/// bracket classes, with `[!...]` negation.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
  let chars: Vec<char> = pattern.replace('\\', "/").chars().collect();
  let mut expr = String::from("^");
  let mut index = 0;

  while index < chars.len() {
    match chars[index] {
      '*' if chars.get(index + 1) == Some(&'*') => {
        if chars.get(index + 2) == Some(&'/') {
          expr.push_str("(?:.*/)?");
          index += 3;
        } else {
          expr.push_str(".*");
          index += 2;
        }
      }
      '*' => {
        expr.push_str("[^/]*");
        index += 1;
      }
      '?' => {
        expr.push_str("[^/]");
        index += 1;
      }
      '[' => match chars[index + 1..].iter().position(|c| *c == ']') {
        Some(offset) if offset > 0 => {
          let class: String = chars[index + 1..index + 1 + offset].iter().collect();
          let class = match class.strip_prefix('!') {
            Some(rest) => format!("^{rest}"),
            None => class,
          };
          expr.push('[');
          expr.push_str(&class.replace('\\', "\\\\"));
          expr.push(']');
          index += offset + 2;
        }
        _ => {
          expr.push_str(r"\[");
          index += 1;
        }
      },
      other => {
        expr.push_str(&regex::escape(&other.to_string()));
        index += 1;
      }
    }
  }

  expr.push('$');
  Regex::new(&expr)
}

/// Walk `dir` collecting every file as a `/` separated path relative to `dir`.
///
/// Hidden entries and the `skip` directory are not visited. The result is sorted so
/// the outcome never depends on directory iteration order.
pub fn collect_files_recursively(dir: &Path, skip: Option<&Path>) -> Vec<String> {
  let mut files = Vec::new();
  collect_into(dir, Path::new(""), skip, &mut files);
  files.sort();
  files
}

fn collect_into(dir: &Path, relative_root: &Path, skip: Option<&Path>, files: &mut Vec<String>) {
  let Ok(entries) = fs::read_dir(dir) else {
    return;
  };

  for entry in entries.flatten() {
    let file_name = entry.file_name();
    let name_str = file_name.to_string_lossy();
    if name_str.starts_with('.') {
      continue;
    }

    let path = entry.path();
    let next_relative = if relative_root.as_os_str().is_empty() {
      PathBuf::from(&file_name)
    } else {
      relative_root.join(&file_name)
    };

    let Ok(file_type) = entry.file_type() else {
      continue;
    };

    if file_type.is_dir() {
      if skip.is_some_and(|skip| skip == path.as_path()) {
        continue;
      }
      collect_into(&path, &next_relative, skip, files);
    } else if file_type.is_file() {
      files.push(next_relative.to_string_lossy().replace('\\', "/"));
    }
  }
}

/// Expand a glob below `base`, returning matches in lexicographic order.
///
/// A pattern that matches nothing yields an empty list.
pub fn expand_glob(
  base: &Path,
  pattern: &str,
  skip: Option<&Path>,
) -> Result<Vec<PathBuf>, regex::Error> {
  let matcher = glob_to_regex(pattern.trim_start_matches('/'))?;
  Ok(
    collect_files_recursively(base, skip)
      .into_iter()
      .filter(|relative| matcher.is_match(relative))
      .map(|relative| join_relative(base, &relative))
      .collect(),
  )
}

/// Join a `/` separated relative path onto `base`.
pub fn join_relative(base: &Path, relative: &str) -> PathBuf {
  let mut path = base.to_path_buf();
  for segment in relative.split('/').filter(|segment| !segment.is_empty()) {
    path.push(segment);
  }
  path
}
