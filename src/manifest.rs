//! Integrity Manifest (§4.B): pinned SHA-256 checksums for upstream archives.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::config::IntegrityMode;
use crate::error::{Error, Result};

/// Key into the manifest: a vintage year plus a provider-defined file key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManifestKey {
    /// Vintage year of the archive.
    pub vintage: u16,
    /// Provider-defined key (e.g. a TIGER shapefile's basename).
    pub file_key: String,
}

impl ManifestKey {
    /// Construct a key.
    pub fn new(vintage: u16, file_key: impl Into<String>) -> Self {
        Self {
            vintage,
            file_key: file_key.into(),
        }
    }
}

/// A single manifest entry: where to fetch an archive, and what it must hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Upstream URL.
    pub url: String,
    /// Expected SHA-256 hex digest. Empty means "not yet pinned".
    pub expected_sha256: String,
    /// Expected size in bytes, for a cheap pre-check before hashing.
    pub expected_size: u64,
}

/// A well-formed checksum is 64 lowercase hex characters (§4.B).
pub fn is_valid_checksum(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Static `(vintage, file_key) -> (url, sha256, size)` map consulted by the
/// Extraction Engine before parsing an archive (§4.E step 3).
#[derive(Debug, Clone, Default)]
pub struct IntegrityManifest {
    entries: BTreeMap<ManifestKey, ManifestEntry>,
}

impl IntegrityManifest {
    /// An empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an entry.
    pub fn insert(&mut self, key: ManifestKey, entry: ManifestEntry) {
        self.entries.insert(key, entry);
    }

    /// Look up an entry.
    pub fn get(&self, key: &ManifestKey) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }

    /// Keys for a given vintage with an empty (unpinned) checksum.
    pub fn missing(&self, vintage: u16) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(k, v)| k.vintage == vintage && v.expected_sha256.is_empty())
            .map(|(k, _)| k.file_key.clone())
            .collect()
    }

    /// Verify archive bytes against the manifest entry for `key`.
    ///
    /// In `Strict` mode, an unpinned (empty-checksum) entry is a refusal.
    /// In `Permissive` mode it is accepted with a logged warning. A missing
    /// entry entirely (no key in the manifest) is always a configuration
    /// error — the Extraction Engine should not be fetching files it never
    /// declared.
    pub fn verify(&self, key: &ManifestKey, bytes: &[u8], mode: IntegrityMode) -> Result<()> {
        let entry = self.entries.get(key).ok_or_else(|| Error::Configuration {
            message: format!(
                "no integrity manifest entry for vintage {} file {}",
                key.vintage, key.file_key
            ),
        })?;

        if entry.expected_sha256.is_empty() {
            return match mode {
                IntegrityMode::Strict => Err(Error::Configuration {
                    message: format!(
                        "vintage {} file {} has no pinned checksum; refusing in strict mode",
                        key.vintage, key.file_key
                    ),
                }),
                IntegrityMode::Permissive => {
                    tracing::warn!(
                        vintage = key.vintage,
                        file_key = %key.file_key,
                        "accepting unpinned archive in permissive mode"
                    );
                    Ok(())
                }
            };
        }

        if bytes.len() as u64 != entry.expected_size {
            tracing::debug!(
                expected = entry.expected_size,
                actual = bytes.len(),
                "archive size mismatch, proceeding to hash check"
            );
        }

        let actual = hex::encode(Sha256::digest(bytes));
        if actual != entry.expected_sha256 {
            return Err(Error::IntegrityFailure {
                file_key: key.file_key.clone(),
                vintage: key.vintage,
                expected: entry.expected_sha256.clone(),
                actual,
            });
        }
        Ok(())
    }
}
