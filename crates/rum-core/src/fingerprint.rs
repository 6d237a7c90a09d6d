//! Content fingerprints for resume identity.
//!
//! A fingerprint is `"{size}-{hex(sha256(leading bytes))}"`. Hashing is
//! bounded to the leading 256 KiB so multi-GiB files stay cheap to
//! fingerprint; the size component alone already rejects most mismatches.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Number of leading bytes hashed into the fingerprint.
pub const FINGERPRINT_PREFIX_BYTES: u64 = 256 * 1024;

/// Compute the content fingerprint of a file: size plus the SHA-256 of its
/// leading bytes, as `"{size}-{hex}"`.
pub fn fingerprint_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let size = f
        .metadata()
        .with_context(|| format!("stat {}", path.display()))?
        .len();

    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    let mut remaining = FINGERPRINT_PREFIX_BYTES;
    while remaining > 0 {
        let want = (remaining as usize).min(BUF_SIZE);
        let n = f
            .read(&mut buf[..want])
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        remaining -= n as u64;
    }
    let digest = hasher.finalize();
    Ok(format!("{}-{}", size, hex::encode(digest)))
}

/// True if the file at `path` currently has the given fingerprint.
pub fn fingerprint_matches(path: &Path, expected: &str) -> Result<bool> {
    Ok(fingerprint_path(path)? == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fingerprint_known_content() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let fp = fingerprint_path(f.path()).unwrap();
        assert_eq!(
            fp,
            "6-5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn fingerprint_empty_file() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let fp = fingerprint_path(f.path()).unwrap();
        assert_eq!(
            fp,
            "0-e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn fingerprint_differs_with_size() {
        let mut a = tempfile::NamedTempFile::new().unwrap();
        a.write_all(b"abc").unwrap();
        a.flush().unwrap();
        let mut b = tempfile::NamedTempFile::new().unwrap();
        b.write_all(b"abcd").unwrap();
        b.flush().unwrap();
        assert_ne!(
            fingerprint_path(a.path()).unwrap(),
            fingerprint_path(b.path()).unwrap()
        );
    }

    #[test]
    fn fingerprint_matches_roundtrip() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"episode bytes").unwrap();
        f.flush().unwrap();
        let fp = fingerprint_path(f.path()).unwrap();
        assert!(fingerprint_matches(f.path(), &fp).unwrap());
        assert!(!fingerprint_matches(f.path(), "1-deadbeef").unwrap());
    }

    #[test]
    fn only_leading_bytes_are_hashed() {
        // Two files that agree on the first 256 KiB but differ past it share
        // a hash component; the size component still tells them apart.
        let prefix = vec![0x5au8; FINGERPRINT_PREFIX_BYTES as usize];
        let mut a = tempfile::NamedTempFile::new().unwrap();
        a.write_all(&prefix).unwrap();
        a.write_all(b"tail-a").unwrap();
        a.flush().unwrap();
        let mut b = tempfile::NamedTempFile::new().unwrap();
        b.write_all(&prefix).unwrap();
        b.write_all(b"tail-bb").unwrap();
        b.flush().unwrap();

        let fp_a = fingerprint_path(a.path()).unwrap();
        let fp_b = fingerprint_path(b.path()).unwrap();
        assert_ne!(fp_a, fp_b);
        let hash_a = fp_a.split('-').nth(1).unwrap().to_string();
        let hash_b = fp_b.split('-').nth(1).unwrap().to_string();
        assert_eq!(hash_a, hash_b);
    }
}
