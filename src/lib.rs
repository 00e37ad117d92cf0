//! # botkit
//!
//! Runtime for a chat bot's commands, events, and validations: discovers module
//! files, keeps the platform's registered commands in sync with them, and routes
//! inbound interactions and events through validation and handler chains.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod strings;

pub use application::catalog::HandlerCatalog;
pub use application::runtime::{InteractionOutcome, Phase, Runtime};
pub use domain::config::AppConfig;
pub use domain::error::{Category, LoadError, RuntimeError};
