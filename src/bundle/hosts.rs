//! Asset host patterns and deterministic host selection.

use regex::Regex;

use crate::cache::digest_u64;
use crate::error::{PackagerError, PackagerResult};

/// Largest number of hosts a range pattern may expand to.
pub const MAX_ASSET_HOSTS: u32 = 64;

/// Hosts that asset references are spread across.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetHosts {
  hosts: Vec<String>,
}

impl AssetHosts {
  /// Expand a host pattern.
  ///
  /// `assets[0,3].example.com` yields `assets0.example.com` through
  /// `assets3.example.com`; a pattern without a range is a single host and an empty
  /// pattern disables sharding. Ranges spanning more than [`MAX_ASSET_HOSTS`] hosts
  /// are rejected.
  pub fn parse(pattern: &str) -> PackagerResult<Self> {
    let pattern = pattern.trim().trim_end_matches('/');
    if pattern.is_empty() {
      return Ok(Self::default());
    }

    let range = Regex::new(r"^(.*)\[(\d+),\s*(\d+)\](.*)$").expect("invalid host range regex");
    let Some(caps) = range.captures(pattern) else {
      return Ok(Self {
        hosts: vec![pattern.to_string()],
      });
    };

    let bound = |index: usize| -> PackagerResult<u32> {
      caps[index].parse().map_err(|_| {
        PackagerError::config(format!("asset host range in '{pattern}' is out of bounds"))
      })
    };
    let (start, end) = (bound(2)?, bound(3)?);
    if start > end {
      return Err(PackagerError::config(format!(
        "asset host range in '{pattern}' is reversed"
      )));
    }
    if end - start >= MAX_ASSET_HOSTS {
      return Err(PackagerError::config(format!(
        "asset host range in '{pattern}' spans more than {MAX_ASSET_HOSTS} hosts"
      )));
    }

    let hosts = (start..=end)
      .map(|index| format!("{}{index}{}", &caps[1], &caps[4]))
      .collect();
    Ok(Self { hosts })
  }

  /// Number of configured hosts.
  pub fn len(&self) -> usize {
    self.hosts.len()
  }

  /// Returns `true` when sharding is disabled.
  pub fn is_empty(&self) -> bool {
    self.hosts.is_empty()
  }

  /// Host serving a public path. The same path always maps to the same host while the
  /// host list is unchanged.
  pub fn host_for(&self, public_path: &str) -> Option<&str> {
    if self.hosts.is_empty() {
      return None;
    }
    let index = digest_u64(public_path.as_bytes()) % self.hosts.len() as u64;
    self.hosts.get(index as usize).map(String::as_str)
  }

  /// Protocol-relative origin (`//host`) for a public path, empty without sharding.
  ///
  /// The origin is chosen from the unstamped path, so a stamped name served for new
  /// content stays on the same host.
  pub fn origin_for(&self, public_path: &str) -> String {
    self
      .host_for(public_path)
      .map(|host| format!("//{host}"))
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expands_numeric_ranges() {
    let hosts = AssetHosts::parse("assets[0,3].example.com").unwrap();
    assert_eq!(hosts.hosts, vec![
      "assets0.example.com",
      "assets1.example.com",
      "assets2.example.com",
      "assets3.example.com",
    ]);
  }

  #[test]
  fn treats_plain_pattern_as_single_host() {
    let hosts = AssetHosts::parse("cdn.example.com/").unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts.origin_for("/images/one.png"), "//cdn.example.com");
  }

  #[test]
  fn empty_pattern_leaves_paths_alone() {
    let hosts = AssetHosts::parse("  ").unwrap();
    assert!(hosts.is_empty());
    assert_eq!(hosts.origin_for("/images/one.png"), "");
  }

  #[test]
  fn rejects_reversed_ranges() {
    assert!(AssetHosts::parse("assets[3,1].example.com").is_err());
  }

  #[test]
  fn rejects_oversized_ranges() {
    assert!(AssetHosts::parse("a[0,4000000000].example.com").is_err());
    assert!(AssetHosts::parse("a[1,64].example.com").is_ok_and(|hosts| hosts.len() == 64));
    assert!(AssetHosts::parse("a[0,64].example.com").is_err());
  }

  #[test]
  fn selection_is_stable_per_path() {
    let first = AssetHosts::parse("assets[0,3].example.com").unwrap();
    let second = AssetHosts::parse("assets[0,3].example.com").unwrap();

    for path in ["/images/one.png", "/images/two.png", "/fonts/a.woff"] {
      assert_eq!(first.host_for(path), second.host_for(path));
      assert!(first.origin_for(path).starts_with("//assets"));
    }
  }
}
