//! HTTP transport for the forecast service
//!
//! Exposes the prediction endpoints of both domains next to the health,
//! readiness and metrics probes.

pub mod api;
pub mod config;
