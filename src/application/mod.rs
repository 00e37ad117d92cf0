//! # Application Layer
//!
//! Module loading, the command/event/validation collections built from it, command
//! synchronization, the reactive core, and the runtime that ties them together.

pub mod catalog;
pub mod commands;
pub mod events;
pub mod loader;
pub mod logging;
pub mod reactive;
pub mod registry;
pub mod runtime;
pub mod validation;
