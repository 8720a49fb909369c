pub mod bundle;
pub mod schema;
pub mod time_index;

pub use bundle::{compute_hash, DatasetManifest};
pub use schema::{FeatureColumn, FeatureDtype, FeatureSchema, SchemaReport};
pub use time_index::TimeIndex;
