pub mod splitters;
pub mod windowing;

pub use splitters::{BoundaryResolver, DataSplitter, EmbargoSplitBuilder, HoldoutSplitter, WalkForwardPlanner};
pub use windowing::{MaterializedWindow, MultiviewWindows, SplitWindows, WindowDescriptor, WindowMode, Windows, WindowingEngine};
