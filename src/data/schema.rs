use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::traits::ConfigSection;
use crate::error::{Result, SliceError};

/// Semantic dtype of a feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureDtype {
    #[default]
    Float,
    Integer,
    Boolean,
    Categorical,
}

impl FeatureDtype {
    pub fn polars_dtype(&self) -> DataType {
        match self {
            Self::Float => DataType::Float64,
            Self::Integer => DataType::Int64,
            Self::Boolean => DataType::Boolean,
            Self::Categorical => DataType::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    #[serde(default)]
    pub dtype: FeatureDtype,
}

/// Columns missing from / not declared by a schema
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaReport {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl SchemaReport {
    pub fn is_exact(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Ordered feature declaration that windows are shaped against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    #[serde(default = "default_schema_name")]
    pub name: String,
    pub features: Vec<FeatureColumn>,
}

fn default_schema_name() -> String {
    "default".to_string()
}

impl FeatureSchema {
    /// Schema of float features in the given order.
    pub fn new<S: Into<String>>(features: impl IntoIterator<Item = S>) -> Result<Self> {
        let schema = Self {
            name: default_schema_name(),
            features: features
                .into_iter()
                .map(|name| FeatureColumn {
                    name: name.into(),
                    dtype: FeatureDtype::Float,
                })
                .collect(),
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn with_columns(name: impl Into<String>, features: Vec<FeatureColumn>) -> Result<Self> {
        let schema = Self {
            name: name.into(),
            features,
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn input_dim(&self) -> usize {
        self.features.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }

    /// Compare a frame's columns against the schema without touching it.
    pub fn validate_df(&self, df: &DataFrame) -> SchemaReport {
        let columns: Vec<String> = df.get_column_names().iter().map(|c| c.to_string()).collect();

        let missing = self
            .names()
            .filter(|name| !columns.iter().any(|c| c == name))
            .map(str::to_string)
            .collect();
        let extra = columns
            .iter()
            .filter(|c| !self.names().any(|name| name == c.as_str()))
            .cloned()
            .collect();

        SchemaReport { missing, extra }
    }

    /// Return the frame in schema order and dtypes, filling absent columns with
    /// `fill_value`. Undeclared columns are dropped.
    pub fn apply_df(&self, df: &DataFrame, fill_value: f64) -> Result<DataFrame> {
        let height = df.height();
        let mut columns: Vec<Column> = Vec::with_capacity(self.features.len());

        for feature in &self.features {
            let column = match df.column(&feature.name) {
                Ok(existing) => existing.clone(),
                Err(_) => Column::new(feature.name.as_str().into(), vec![fill_value; height]),
            };
            columns.push(column.cast(&feature.dtype.polars_dtype())?);
        }

        Ok(DataFrame::new(columns)?)
    }
}

impl ConfigSection for FeatureSchema {
    fn section_name() -> &'static str {
        "schema"
    }

    fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(SliceError::Configuration(format!(
                "Feature schema '{}' must declare at least one column",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for feature in &self.features {
            if feature.name.is_empty() {
                return Err(SliceError::Configuration("Feature names must be non-empty".to_string()));
            }
            if !seen.insert(feature.name.as_str()) {
                return Err(SliceError::Configuration(format!(
                    "Duplicate feature '{}' in schema '{}'",
                    feature.name, self.name
                )));
            }
        }
        Ok(())
    }
}
