//! Model metadata: best model name and per-variant metrics
//!
//! The metadata document looks like
//! `{"best_model": "XGBoost", "xgboost": {"rmse": 6.1, "r2": 0.71, "cv_r2": 0.68}, ...}`.
//! Variant keys are normalized (lowercase, spaces to underscores) on both
//! sides of a lookup.

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Name reported when the metadata has no `best_model` entry
pub const UNKNOWN_MODEL: &str = "Unknown";

/// Metrics key consulted when the best model has no entry of its own
pub const DEFAULT_FALLBACK_KEY: &str = "xgboost";

const BEST_MODEL_FIELD: &str = "best_model";

/// Evaluation metrics of one model variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsRecord {
    pub rmse: f64,
    pub r2: f64,
    pub cv_r2: f64,
}

/// Normalized model variant key, e.g. "Random Forest" -> "random_forest"
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelKey(String);

impl ModelKey {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase().replace(' ', "_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsed metadata document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    best_model: Option<String>,
    variants: BTreeMap<ModelKey, MetricsRecord>,
}

impl Metadata {
    /// Parse a metadata document. Entries that are not objects (training
    /// dates, notes) are ignored.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut metadata = Metadata::default();

        let serde_json::Value::Object(entries) = value else {
            return Err(serde::de::Error::custom("metadata must be a JSON object"));
        };

        for (key, entry) in entries {
            if key == BEST_MODEL_FIELD {
                metadata.best_model = entry.as_str().map(str::to_string);
                continue;
            }
            if entry.is_object() {
                let record: MetricsRecord = serde_json::from_value(entry)?;
                metadata.variants.insert(ModelKey::new(&key), record);
            }
        }

        Ok(metadata)
    }

    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content)
            .and_then(Self::from_value)
            .map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn best_model(&self) -> Option<&str> {
        self.best_model.as_deref()
    }

    /// Best model name, or "Unknown"
    pub fn model_name(&self) -> &str {
        self.best_model().unwrap_or(UNKNOWN_MODEL)
    }

    pub fn metrics(&self, key: &ModelKey) -> Option<&MetricsRecord> {
        self.variants.get(key)
    }

    pub fn variants(&self) -> impl Iterator<Item = (&ModelKey, &MetricsRecord)> {
        self.variants.iter()
    }
}

/// Resolves the metrics to report for a model name.
///
/// Lookup order: the normalized model name, then each fallback key in the
/// order given, then an all-zero record.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsLookup {
    fallback_keys: Vec<ModelKey>,
}

impl Default for MetricsLookup {
    fn default() -> Self {
        Self::with_fallbacks([DEFAULT_FALLBACK_KEY])
    }
}

impl MetricsLookup {
    pub fn with_fallbacks<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fallback_keys: keys
                .into_iter()
                .map(|k| ModelKey::new(k.as_ref()))
                .filter(|k| !k.as_str().is_empty())
                .collect(),
        }
    }

    pub fn fallback_keys(&self) -> &[ModelKey] {
        &self.fallback_keys
    }

    /// Key whose metrics would be reported, if any
    pub fn resolve_key(&self, metadata: &Metadata, model_name: &str) -> Option<ModelKey> {
        std::iter::once(ModelKey::new(model_name))
            .chain(self.fallback_keys.iter().cloned())
            .find(|key| metadata.metrics(key).is_some())
    }

    pub fn resolve(&self, metadata: &Metadata, model_name: &str) -> MetricsRecord {
        self.resolve_key(metadata, model_name)
            .and_then(|key| metadata.metrics(&key).copied())
            .unwrap_or_default()
    }
}
