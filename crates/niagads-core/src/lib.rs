// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use md5::Md5;
use sha2::{Digest, Sha256};

pub mod cache_key;
pub mod canonical;
pub mod constants;

pub use cache_key::{CacheKey, CacheKeyError, CacheKeyQualifier, CacheNamespace};

pub const CRATE_NAME: &str = "niagads-core";

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hex digest used for every cache key; shared with deployments that read the same cache.
#[must_use]
pub fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_hex_matches_known_digest() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn sha256_hex_matches_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
