//! Cache key definitions.
//!
//! Header entries and build entries share one store; `CacheKey` tags each key
//! with its keyspace so the two can never collide.

use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

const KEY_SEPARATOR: &str = "\0";

/// Identifies the joined header text of one version directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeaderKey(PathBuf);

impl HeaderKey {
    pub fn new(version_base: &Path) -> Self {
        Self(version_base.to_path_buf())
    }

    pub fn version_base(&self) -> &Path {
        &self.0
    }
}

/// SHA-256 digest (lowercase hex) of a build request.
///
/// Modules are sorted before hashing so `a,b` and `b,a` share a key. Fields
/// are separated by NUL, which no valid name contains, so distinct requests
/// never share key material.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildKey(String);

impl BuildKey {
    pub fn derive(version: &str, preset: &str, modules: &[String]) -> Self {
        let mut sorted: Vec<&str> = modules.iter().map(String::as_str).collect();
        sorted.sort_unstable();

        let material = format!(
            "{version}{KEY_SEPARATOR}{preset}{KEY_SEPARATOR}{}",
            sorted.join(KEY_SEPARATOR)
        );
        let digest = Sha256::digest(material.as_bytes());
        Self(hex::encode(&digest[..]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unified cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Header(HeaderKey),
    Build(BuildKey),
}

impl From<HeaderKey> for CacheKey {
    fn from(key: HeaderKey) -> Self {
        CacheKey::Header(key)
    }
}

impl From<BuildKey> for CacheKey {
    fn from(key: BuildKey) -> Self {
        CacheKey::Build(key)
    }
}
