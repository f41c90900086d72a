//! Core of the QQ bot's attachment upload path (Rust port).
//!
//! This crate is intentionally transport-agnostic. The remote object store
//! (Microsoft Graph today) lives behind ports (traits) implemented in adapter
//! crates; the chunk transfer loop only ever talks to those traits.

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod upload;

pub use errors::{Error, Result};
