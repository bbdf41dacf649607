//! Gateway module - Opaque forwarding engine and failover handling

pub mod engine;
pub mod failover;
