//! # Handler Catalog
//!
//! Module files on disk describe commands, events, and validations declaratively; the
//! code they run is looked up here by id. The application registers every callable
//! it ships once at startup, and loaders resolve references against this table on
//! every (re)load.

use anyhow::Result;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::application::commands::CommandDescriptor;
use crate::domain::types::{ChainControl, Interaction};

/// Context handed to command, autocomplete, and validation callables.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub interaction: Interaction,
    pub command: Arc<CommandDescriptor>,
}

/// Context handed to event handlers.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub event: String,
    pub payload: Value,
}

pub type CommandFn = Arc<dyn Fn(CommandContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;
pub type EventFn =
    Arc<dyn Fn(EventContext) -> BoxFuture<'static, Result<ChainControl>> + Send + Sync>;
pub type ValidationFn =
    Arc<dyn Fn(CommandContext) -> BoxFuture<'static, Result<ChainControl>> + Send + Sync>;

/// Boxes an async function into a [`CommandFn`].
pub fn command_fn<F, Fut>(handler: F) -> CommandFn
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |ctx: CommandContext| handler(ctx).boxed())
}

pub fn event_fn<F, Fut>(handler: F) -> EventFn
where
    F: Fn(EventContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ChainControl>> + Send + 'static,
{
    Arc::new(move |ctx: EventContext| handler(ctx).boxed())
}

pub fn validation_fn<F, Fut>(handler: F) -> ValidationFn
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ChainControl>> + Send + 'static,
{
    Arc::new(move |ctx: CommandContext| handler(ctx).boxed())
}

/// Named callables that module files may reference.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    commands: HashMap<String, CommandFn>,
    events: HashMap<String, EventFn>,
    validations: HashMap<String, ValidationFn>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command or autocomplete callable.
    pub fn command<F, Fut>(&mut self, id: &str, handler: F) -> &mut Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.commands.insert(id.to_string(), command_fn(handler));
        self
    }

    pub fn event<F, Fut>(&mut self, id: &str, handler: F) -> &mut Self
    where
        F: Fn(EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ChainControl>> + Send + 'static,
    {
        self.events.insert(id.to_string(), event_fn(handler));
        self
    }

    pub fn validation<F, Fut>(&mut self, id: &str, handler: F) -> &mut Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ChainControl>> + Send + 'static,
    {
        self.validations.insert(id.to_string(), validation_fn(handler));
        self
    }

    pub fn resolve_command(&self, id: &str) -> Option<CommandFn> {
        self.commands.get(id).cloned()
    }

    pub fn resolve_event(&self, id: &str) -> Option<EventFn> {
        self.events.get(id).cloned()
    }

    pub fn resolve_validation(&self, id: &str) -> Option<ValidationFn> {
        self.validations.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.commands.len() + self.events.len() + self.validations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads a callable reference out of a module export: either the export itself is
/// the handler id, or it is a mapping carrying one under `key`.
pub fn handler_ref<'a>(export: &'a Value, key: &str) -> Option<&'a str> {
    match export {
        Value::String(id) => Some(id.as_str()),
        Value::Object(map) => map.get(key).and_then(Value::as_str),
        _ => None,
    }
}
