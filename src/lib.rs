//! # VerifyGlobal
//!
//! Core of the VerifyGlobal Salt Edge dashboard: the internal proxy service
//! with its upstream adapter, and the resilient client library the dashboard
//! and the `vglobal` CLI are built on.

pub mod body;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod telemetry;
pub mod upstream;
