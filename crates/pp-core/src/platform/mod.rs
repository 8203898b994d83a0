//! Messaging-platform abstractions consumed by the collectors.
//!
//! The platform client itself lives behind [`port::PlatformClient`]; adapters
//! implement it, the core only layers retry and throttling on top.

pub mod governor;
pub mod identifier;
pub mod port;
pub mod throttled;
pub mod types;
