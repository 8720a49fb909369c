use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::audit::{AuditLog, AuditLogEntry};
use crate::config::SequenceConfig;
use crate::data::FeatureSchema;
use crate::error::Result;
use crate::types::Split;

/// SHA-256 hex digest of the canonical JSON form of `value`.
///
/// Objects are emitted with sorted keys and no whitespace, so equal values
/// hash equally regardless of field or insertion order.
pub fn compute_hash<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let canonical = canonicalize(serde_json::to_value(value)?);
    let encoded = serde_json::to_string(&canonical)?;

    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

// Rebuild objects with sorted keys so the encoding does not depend on the
// map implementation serde_json was compiled with.
fn canonicalize(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: BTreeMap<String, serde_json::Value> =
                map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
            serde_json::Value::Object(sorted.into_iter().collect())
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Reproducibility record for one dataset-preparation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub schema_hash: String,
    pub config_hash: String,
    pub splits: Vec<Split>,
    pub audit: Vec<AuditLogEntry>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl DatasetManifest {
    pub fn new(schema: &FeatureSchema, config: &SequenceConfig, splits: Vec<Split>, audit: AuditLog) -> Result<Self> {
        Ok(Self {
            schema_hash: compute_hash(schema)?,
            config_hash: compute_hash(config)?,
            splits,
            audit: audit.into_entries(),
            metadata: BTreeMap::new(),
        })
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
