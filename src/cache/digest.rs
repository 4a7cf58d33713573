//! Content digests used for fingerprinted names and change detection.

/// Number of hex characters kept from the full digest.
pub const DIGEST_LEN: usize = 32;

/// Stable content identifier: BLAKE3 of the bytes as lowercase hex, truncated.
///
/// Only the bytes feed the hash, so identical content yields identical names across
/// runs, machines and process restarts.
pub fn digest(bytes: &[u8]) -> String {
  let hex = blake3::hash(bytes).to_hex();
  hex.as_str()[..DIGEST_LEN].to_string()
}

/// 64-bit projection of the content digest, used to spread references over hosts.
pub fn digest_u64(bytes: &[u8]) -> u64 {
  let hash = blake3::hash(bytes);
  let mut prefix = [0u8; 8];
  prefix.copy_from_slice(&hash.as_bytes()[..8]);
  u64::from_le_bytes(prefix)
}
