//! Content fingerprints for cache keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::migration::MigrationDefinition;
use crate::policy::IgnoreReason;
use crate::rules::RuleCatalog;

/// Hex-encoded SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprints raw bytes. Any byte change changes the result.
#[must_use]
pub fn of_source(bytes: &[u8]) -> Fingerprint {
    Fingerprint(hex::encode(Sha256::digest(bytes)))
}

/// Fingerprints a migration's serialized source.
pub fn of_migration(migration: &MigrationDefinition) -> Result<Fingerprint> {
    Ok(of_source(&migration.source_bytes()?))
}

/// Fingerprints the analysis context of one migration.
///
/// Covers the ignore-policy rules matching the migration and the rule
/// catalog settings, so a policy change only invalidates the migrations whose
/// matches actually changed.
pub fn of_context(reasons: &[IgnoreReason], catalog: &RuleCatalog) -> Result<Fingerprint> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(reasons)?);
    hasher.update(b"\n");
    hasher.update(serde_json::to_vec(catalog)?);
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::NotNullPolicy;

    #[test]
    fn test_of_source_is_sha256_hex() {
        assert_eq!(
            of_source(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(of_source(b"a = 1\n"), of_source(b"a = 1\n# comment\n"));
    }

    #[test]
    fn test_context_depends_on_matches_only() {
        let catalog = RuleCatalog::new();
        let unaffected = of_context(&[], &catalog).unwrap();
        assert_eq!(unaffected, of_context(&[], &catalog).unwrap());

        let ignored = of_context(&[IgnoreReason::NameContains("0001".to_string())], &catalog)
            .unwrap();
        assert_ne!(unaffected, ignored);
    }

    #[test]
    fn test_context_depends_on_catalog() {
        let wide = of_context(&[], &RuleCatalog::new()).unwrap();
        let narrow = of_context(
            &[],
            &RuleCatalog::new().with_not_null_policy(NotNullPolicy::within(1)),
        )
        .unwrap();
        assert_ne!(wide, narrow);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let fingerprint = of_source(b"x");
        assert_eq!(
            serde_json::to_string(&fingerprint).unwrap(),
            format!("\"{fingerprint}\"")
        );
    }
}
