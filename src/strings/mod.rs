//! # Strings Module
//!
//! Centralizes log lines and user-facing replies.

pub mod logs;
pub mod messages;
