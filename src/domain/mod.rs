//! # Domain Layer
//!
//! Core definitions, types, and traits that define the runtime's contract.
//! Independent of any concrete platform, serving as the contract for the other layers.

pub mod config;
pub mod error;
pub mod paths;
pub mod traits;
pub mod types;
