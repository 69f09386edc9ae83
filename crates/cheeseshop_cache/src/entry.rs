//! Cache entries and keys.

use crate::CachePolicy;
use cheeseshop_error::{CheeseshopResult, JsonError};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::time::Instant;

/// Cached value with its lifetime.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    value: JsonValue,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    pub(crate) fn new(value: JsonValue, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry is expired.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// Identity of one cached call.
///
/// The digest covers the function id, the serialized arguments and the
/// policy's empty-skipping flag, so the same call under a different policy
/// never shares an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters)]
pub struct CacheKey {
    function: String,
    digest: String,
}

impl CacheKey {
    /// Derive the key for calling `policy`'s function with `args`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cheeseshop_cache::{CacheKey, CachePolicy, MINUTE};
    ///
    /// let policy = CachePolicy::new("lookup", MINUTE);
    /// let a = CacheKey::derive(&policy, &("requests", 1)).unwrap();
    /// let b = CacheKey::derive(&policy, &("requests", 1)).unwrap();
    /// let c = CacheKey::derive(&policy, &("flask", 1)).unwrap();
    /// assert_eq!(a, b);
    /// assert_ne!(a, c);
    /// ```
    pub fn derive<A: Serialize + ?Sized>(policy: &CachePolicy, args: &A) -> CheeseshopResult<Self> {
        let args = serde_json::to_value(args).map_err(|e| JsonError::new(e.to_string()))?;
        let material = serde_json::json!({
            "fn": policy.id(),
            "args": args,
            "streaming": policy.skip_empty(),
        });
        let bytes = serde_json::to_vec(&material).map_err(|e| JsonError::new(e.to_string()))?;

        Ok(Self {
            function: policy.id().clone(),
            digest: hex::encode(Sha256::digest(&bytes)),
        })
    }
}

/// On-disk form of a persisted entry.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CacheFile {
    pub(crate) function: String,
    /// Unix seconds
    pub(crate) created_at: u64,
    pub(crate) value: JsonValue,
}

/// Empty results (`null`, `false`, `0`, `""`, `[]`, `{}`).
pub(crate) fn is_falsy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
    }
}
