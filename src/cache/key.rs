//! Cache Key Module
//!
//! Derives the storage bucket and key for a request path.

use std::fmt;
use std::str::FromStr;

use crate::error::{ProxyError, Result};

/// Bucket used when the whole path is the key.
pub const DEFAULT_BUCKET: &str = "default";

// == Cache Key ==
/// Storage address of a cached response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub bucket: String,
    pub key: String,
}

impl CacheKey {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

// == Key Mode ==
/// Addressing scheme used to turn a path into a `CacheKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// The entire path is the key, stored under `DEFAULT_BUCKET`.
    Flat,
    /// `/{bucket}/{key...}`; segments after the bucket are rejoined with `/`.
    Segmented,
}

impl KeyMode {
    /// Resolves a request path into a cache key.
    ///
    /// Segmented mode rejects paths with an empty bucket or key.
    pub fn resolve(&self, path: &str) -> Result<CacheKey> {
        match self {
            KeyMode::Flat => {
                let key = if path.is_empty() { "/" } else { path };
                Ok(CacheKey::new(DEFAULT_BUCKET, key))
            }
            KeyMode::Segmented => {
                let trimmed = path.strip_prefix('/').unwrap_or(path);
                match trimmed.split_once('/') {
                    Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                        Ok(CacheKey::new(bucket, key))
                    }
                    _ => Err(ProxyError::MalformedPath(format!(
                        "expected /{{bucket}}/{{key}}, got `{path}`"
                    ))),
                }
            }
        }
    }
}

impl FromStr for KeyMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(KeyMode::Flat),
            "segmented" => Ok(KeyMode::Segmented),
            other => Err(format!("expected `flat` or `segmented`, got `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segmented_two_segments() {
        let key = KeyMode::Segmented.resolve("/pages/home").unwrap();
        assert_eq!(key, CacheKey::new("pages", "home"));
        assert_eq!(key.to_string(), "pages/home");
    }

    #[test]
    fn test_segmented_preserves_sub_path() {
        let key = KeyMode::Segmented.resolve("/assets/css/site/main.css").unwrap();
        assert_eq!(key.bucket, "assets");
        assert_eq!(key.key, "css/site/main.css");
    }

    #[test]
    fn test_segmented_rejects_short_paths() {
        for path in ["", "/", "/pages", "/pages/", "//home"] {
            let result = KeyMode::Segmented.resolve(path);
            assert!(
                matches!(result, Err(ProxyError::MalformedPath(_))),
                "{path:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_flat_uses_default_bucket() {
        let key = KeyMode::Flat.resolve("/pages/home").unwrap();
        assert_eq!(key, CacheKey::new(DEFAULT_BUCKET, "/pages/home"));

        let root = KeyMode::Flat.resolve("/").unwrap();
        assert_eq!(root.key, "/");
    }

    #[test]
    fn test_distinct_paths_do_not_collide() {
        let a = KeyMode::Segmented.resolve("/a/b/c").unwrap();
        let b = KeyMode::Segmented.resolve("/a/b%2Fc").unwrap();
        let c = KeyMode::Segmented.resolve("/a/b").unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_key_mode_from_str() {
        assert_eq!("flat".parse::<KeyMode>().unwrap(), KeyMode::Flat);
        assert_eq!("Segmented".parse::<KeyMode>().unwrap(), KeyMode::Segmented);
        assert!("nested".parse::<KeyMode>().is_err());
    }
}
