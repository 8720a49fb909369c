//! Leakage-safe train/validate/test splits and fixed-length windows over a
//! timestamp-indexed sequence.

pub mod audit;
pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod types;

pub use audit::{AuditLog, AuditLogEntry, AuditOperation};
pub use config::{ConfigSection, DatasetConfig, HoldoutConfig, SequenceConfig, SequenceSummary, SplitSpec};
pub use data::{DatasetManifest, FeatureSchema, TimeIndex};
pub use engines::{
    BoundaryResolver, DataSplitter, EmbargoSplitBuilder, HoldoutSplitter, WalkForwardPlanner, WindowDescriptor,
    WindowMode, WindowingEngine,
};
pub use error::{ErrorKind, Result, SliceError};
pub use types::{Boundary, RawBoundary, ResolvedRange, Segment, Split, Timestamp};
