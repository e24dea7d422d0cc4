//! Context Fingerprinting
//!
//! Produces a stable hash of a semi-structured context value (typically a
//! page snapshot: URL, title, interactive elements) so cache lookups can be
//! scoped to "the same situation". Fields known to be volatile between
//! otherwise-identical calls, such as synthetic per-call element identifiers
//! or pixel geometry, are stripped before hashing.
//!
//! The denylists are caller-supplied configuration, not hard-coded: reuse in
//! a different domain only requires a different [`FingerprintConfig`].
//!
//! Two contexts fingerprint equal iff they are structurally identical after
//! pruning. A field outside the denylists that varies between calls will
//! cause a spurious mismatch; that is a documented limitation, not something
//! the fingerprinter guesses around.
//!
//! # Example
//!
//! ```
//! use semcache::fingerprint::{ContextFingerprinter, FingerprintConfig};
//! use serde_json::json;
//!
//! let fp = ContextFingerprinter::new(FingerprintConfig::default());
//! let a = fp.fingerprint(&json!({"url": "https://example.com", "autowingId": "x1"}));
//! let b = fp.fingerprint(&json!({"url": "https://example.com", "autowingId": "x2"}));
//! assert_eq!(a, b); // differs only in a volatile field
//! ```

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Denylist configuration for context fingerprinting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    /// Top-level keys dropped entirely before hashing
    pub volatile_keys: Vec<String>,
    /// Key holding the collection of interactive elements
    pub elements_key: String,
    /// Keys dropped from each element in the elements collection
    pub volatile_element_keys: Vec<String>,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            volatile_keys: vec!["elementMarkers".to_string(), "autowingId".to_string()],
            elements_key: "elements".to_string(),
            volatile_element_keys: vec!["autowingId".to_string(), "boundingBox".to_string()],
        }
    }
}

impl FingerprintConfig {
    /// Set the top-level volatile keys
    #[must_use]
    pub fn with_volatile_keys(mut self, keys: Vec<String>) -> Self {
        self.volatile_keys = keys;
        self
    }

    /// Set the key naming the interactive-elements collection
    #[must_use]
    pub fn with_elements_key(mut self, key: impl Into<String>) -> Self {
        self.elements_key = key.into();
        self
    }

    /// Set the per-element volatile keys
    #[must_use]
    pub fn with_volatile_element_keys(mut self, keys: Vec<String>) -> Self {
        self.volatile_element_keys = keys;
        self
    }
}

/// Stable context hasher with configurable volatile-field denylists
#[derive(Debug, Clone, Default)]
pub struct ContextFingerprinter {
    config: FingerprintConfig,
}

impl ContextFingerprinter {
    /// Create a fingerprinter with the given denylist configuration
    pub fn new(config: FingerprintConfig) -> Self {
        Self { config }
    }

    /// Compute the fingerprint of a context value as a hex digest
    ///
    /// Volatile fields are pruned, the remainder is serialized with all
    /// object keys sorted lexicographically (insertion order never affects
    /// the hash), and the canonical bytes are hashed with SHA-256.
    pub fn fingerprint(&self, context: &Value) -> String {
        let stable = self.prune(context);
        let mut canonical = Vec::new();
        write_canonical(&stable, &mut canonical);

        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }

    /// Drop denylisted fields, keeping everything else verbatim
    fn prune(&self, context: &Value) -> Value {
        let obj = match context.as_object() {
            Some(obj) => obj,
            // Non-object contexts hash as-is
            None => return context.clone(),
        };

        let mut stable = serde_json::Map::new();
        for (key, value) in obj {
            if self.config.volatile_keys.iter().any(|k| k == key) {
                continue;
            }
            if key == &self.config.elements_key {
                if let Value::Array(elements) = value {
                    // Only object-shaped elements carry stable structure;
                    // stray scalar members are dropped outright
                    let stable_elements: Vec<Value> = elements
                        .iter()
                        .filter_map(Value::as_object)
                        .map(|fields| {
                            Value::Object(
                                fields
                                    .iter()
                                    .filter(|(k, _)| {
                                        !self
                                            .config
                                            .volatile_element_keys
                                            .iter()
                                            .any(|vk| vk == *k)
                                    })
                                    .map(|(k, v)| (k.clone(), v.clone()))
                                    .collect(),
                            )
                        })
                        .collect();
                    stable.insert(key.clone(), Value::Array(stable_elements));
                    continue;
                }
            }
            stable.insert(key.clone(), value.clone());
        }

        Value::Object(stable)
    }
}

/// Serialize a JSON value to canonical bytes: object keys sorted
/// lexicographically at every depth, arrays in order, scalars via serde_json
fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(obj) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                // Key serialized as a JSON string, then its value
                out.extend_from_slice(
                    serde_json::to_string(key)
                        .unwrap_or_default()
                        .as_bytes(),
                );
                out.push(b':');
                write_canonical(&obj[*key], out);
            }
            out.push(b'}');
        }
        Value::Array(arr) => {
            out.push(b'[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        scalar => {
            out.extend_from_slice(
                serde_json::to_string(scalar).unwrap_or_default().as_bytes(),
            );
        }
    }
}
