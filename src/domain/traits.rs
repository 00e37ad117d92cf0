//! # Domain Traits
//!
//! Abstract interfaces for the external platform: the command registration API and
//! the channel a response to an interaction travels back through.
//! Allows for pluggable implementations in the Infrastructure layer.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::types::{CommandData, RemoteCommand, Scope};

/// Abstract interface for the platform's command registration API.
#[async_trait]
pub trait CommandPlatform: Send + Sync {
    /// Whether the client has finished connecting and may issue registration calls.
    fn is_ready(&self) -> bool;

    /// Fetch every command currently registered in `scope`.
    async fn fetch_commands(&self, scope: &Scope) -> Result<Vec<RemoteCommand>>;

    /// Replace every command in `scope` with `commands`.
    async fn overwrite_commands(&self, scope: &Scope, commands: &[CommandData]) -> Result<()>;

    async fn create_command(&self, scope: &Scope, command: &CommandData) -> Result<()>;

    async fn edit_command(&self, scope: &Scope, id: &str, command: &CommandData) -> Result<()>;

    async fn delete_command(&self, scope: &Scope, id: &str) -> Result<()>;
}

/// Abstract interface for answering the user who triggered an interaction.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    async fn reply(&self, content: &str, ephemeral: bool) -> Result<()>;
}
