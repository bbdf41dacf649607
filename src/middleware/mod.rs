//! Middleware module - Tower layers wrapped around the gateway pipeline

pub mod cache;
