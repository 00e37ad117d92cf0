//! # Interface Layer
//!
//! The handlers this binary ships and the console gateway that drives the runtime.

pub mod gateway;
pub mod handlers;
