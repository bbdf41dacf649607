//! Health module - Probing, on-demand aggregation, and background monitoring

pub mod aggregator;
pub mod monitor;
pub mod probe;
