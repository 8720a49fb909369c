pub mod traits;
pub mod sequence;
pub mod holdout;
pub mod manager;

pub use traits::ConfigSection;
pub use sequence::{SequenceConfig, SequenceSummary};
pub use holdout::HoldoutConfig;
pub use manager::{DatasetConfig, SplitSpec};
