pub mod analysis;
pub mod contract;
pub mod rule;
pub mod snapshot;
