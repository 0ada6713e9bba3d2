pub mod billing;
pub mod completion;
pub mod maintenance;
pub mod meter;
pub mod reconcile;
pub mod schedule;
