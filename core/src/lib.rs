//! Shared building blocks for the Channex bridge.
//!
//! - [`ari`]: availability/rate/inventory parameter normalization
//! - [`shaping`]: response size governor (bounded truncation)
//! - [`error`]: wire-level error envelope shared by the HTTP and MCP surfaces
//! - [`auth`]: API key hashing helpers

pub mod ari;
pub mod auth;
pub mod error;
pub mod shaping;
