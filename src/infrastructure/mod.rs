//! # Infrastructure Layer
//!
//! Implements the domain traits against external systems: the platform's REST API,
//! an in-memory stand-in, and the console gateway.

pub mod console;
pub mod http;
pub mod memory;
pub mod retry;
