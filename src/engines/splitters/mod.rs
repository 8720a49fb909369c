pub mod base;
pub mod embargo;
pub mod holdout;
pub mod resolver;
pub mod wfo;

pub use base::DataSplitter;
pub use embargo::EmbargoSplitBuilder;
pub use holdout::HoldoutSplitter;
pub use resolver::BoundaryResolver;
pub use wfo::{Splits, WalkForwardPlan, WalkForwardPlanner};
