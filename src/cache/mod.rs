//! Content fingerprints and their persisted store.

mod digest;
mod store;

pub use digest::{DIGEST_LEN, digest, digest_u64};
pub use store::{Fingerprint, FingerprintCache, read_entries};
