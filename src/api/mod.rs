//! API module - Route definitions and request handlers

pub mod handlers;
pub mod routes;
