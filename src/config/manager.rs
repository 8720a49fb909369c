use super::{holdout::HoldoutConfig, sequence::SequenceConfig, traits::ConfigSection};
use crate::audit::AuditLog;
use crate::data::{FeatureSchema, TimeIndex};
use crate::engines::splitters::EmbargoSplitBuilder;
use crate::error::{Result, SliceError};
use crate::types::{Boundary, RawBoundary, Split};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hand-specified split as it appears in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_id: Option<String>,
    pub train: RawBoundary,
    pub validate: RawBoundary,
    pub test: RawBoundary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lockbox: Option<RawBoundary>,
}

impl SplitSpec {
    pub fn new(train: &Boundary, validate: &Boundary, test: &Boundary) -> Self {
        Self {
            slice_id: None,
            train: train.into(),
            validate: validate.into(),
            test: test.into(),
            lockbox: None,
        }
    }

    pub fn with_lockbox(mut self, lockbox: &Boundary) -> Self {
        self.lockbox = Some(lockbox.into());
        self
    }

    pub fn boundaries(&self) -> Result<[Boundary; 3]> {
        Ok([
            Boundary::try_from(self.train.clone())?,
            Boundary::try_from(self.validate.clone())?,
            Boundary::try_from(self.test.clone())?,
        ])
    }

    pub fn lockbox_boundary(&self) -> Result<Option<Boundary>> {
        self.lockbox.clone().map(Boundary::try_from).transpose()
    }
}

/// Everything one dataset-preparation call is configured with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub sequence: SequenceConfig,
    pub schema: FeatureSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holdout: Option<HoldoutConfig>,
    #[serde(default)]
    pub splits: Vec<SplitSpec>,
}

impl DatasetConfig {
    pub fn new(sequence: SequenceConfig, schema: FeatureSchema) -> Self {
        Self {
            sequence,
            schema,
            holdout: None,
            splits: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.sequence.validate()?;
        self.schema.validate()?;
        if let Some(holdout) = &self.holdout {
            holdout.validate()?;
        }
        for manual in &self.splits {
            manual.boundaries()?;
            manual.lockbox_boundary()?;
        }
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: DatasetConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SliceError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: DatasetConfig = toml::from_str(&contents)
            .map_err(|e| SliceError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        log::debug!("Loaded dataset config with {} manual splits", config.splits.len());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SliceError::Configuration(format!("Failed to serialize: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_str = self.to_toml_string()?;

        std::fs::write(path, toml_str)
            .map_err(|e| SliceError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Resolve every manual split against `index`, failing on the first bad one.
    pub fn build_manual_splits(&self, index: &TimeIndex, audit: &mut AuditLog) -> Result<Vec<Split>> {
        let builder = EmbargoSplitBuilder::new(self.sequence.embargo_bars, self.sequence.label_lookahead_bars);

        let mut splits = Vec::with_capacity(self.splits.len());
        for manual in &self.splits {
            let ([train, validate, test], lockbox) = manual
                .boundaries()
                .and_then(|boundaries| Ok((boundaries, manual.lockbox_boundary()?)))
                .map_err(|err| audit.record_rejection(format!("manual split {:?}", manual.slice_id), err))?;

            let split = match lockbox {
                Some(lockbox) => builder.build_with_lockbox(&train, &validate, &test, &lockbox, index, audit)?,
                None => builder.build(&train, &validate, &test, index, audit)?,
            };
            splits.push(match &manual.slice_id {
                Some(id) => split.with_slice_id(id.clone()),
                None => split,
            });
        }
        Ok(splits)
    }
}
