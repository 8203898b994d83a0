//! Core logic for the Parser Pro collection engine.
//!
//! Framework-agnostic: the messaging platform and result storage live behind
//! ports (traits); the gateway adapter and the CLI live in their own crates.

pub mod collect;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod paginate;
pub mod platform;
pub mod security;
pub mod service;
pub mod store;
pub mod utils;

pub use errors::{Error, Result};
