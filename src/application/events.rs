//! # Event Bus
//!
//! Event modules live in one subdirectory per event name; every file under it adds a
//! handler to that event's chain, in discovery order. The bus keeps exactly one
//! listener per event name and runs its chain sequentially, stopping as soon as a
//! handler asks it to.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::application::catalog::{EventContext, EventFn, HandlerCatalog, handler_ref};
use crate::application::loader::ModuleLoader;
use crate::domain::types::ChainControl;
use crate::strings::logs;

/// One resolved handler in an event chain.
#[derive(Clone)]
pub struct EventHandler {
    pub id: String,
    pub path: PathBuf,
    handler: EventFn,
}

impl EventHandler {
    pub fn new(id: impl Into<String>, handler: EventFn) -> Self {
        Self {
            id: id.into(),
            path: PathBuf::new(),
            handler,
        }
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// An event name and its ordered handler chain.
#[derive(Debug, Clone)]
pub struct EventDescriptor {
    pub name: String,
    pub handlers: Vec<EventHandler>,
}

/// Result of pushing one event through its chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// How many handlers ran.
    pub invoked: usize,
    /// `Continue` when the chain ran to the end, otherwise what stopped it.
    pub control: ChainControl,
}

type ListenerTable = HashMap<String, Arc<[EventHandler]>>;

#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Arc<ListenerTable>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Arc<ListenerTable> {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn swap(&self, table: ListenerTable) {
        *self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(table);
    }

    /// Attaches the listener for `event`, replacing any listener already bound to it.
    pub fn bind(&self, event: &str, handlers: Vec<EventHandler>) {
        let mut table = (*self.snapshot()).clone();
        table.insert(event.to_string(), handlers.into());
        self.swap(table);
    }

    /// Drops every bound listener, then binds one per descriptor.
    pub fn rebuild(&self, descriptors: Vec<EventDescriptor>) {
        let mut table = ListenerTable::new();
        for descriptor in descriptors {
            table.insert(descriptor.name, descriptor.handlers.into());
        }
        self.swap(table);
    }

    pub fn listener_count(&self) -> usize {
        self.snapshot().len()
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.snapshot().get(event).map(|h| h.len()).unwrap_or(0)
    }

    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot().keys().cloned().collect();
        names.sort();
        names
    }

    /// Runs the chain bound to `event`. Handlers run one after another; a handler
    /// returning anything but `Continue`, or failing, ends the chain.
    pub async fn dispatch(&self, event: &str, payload: Value) -> DispatchOutcome {
        let Some(handlers) = self.snapshot().get(event).cloned() else {
            return DispatchOutcome {
                invoked: 0,
                control: ChainControl::Continue,
            };
        };

        let mut invoked = 0;
        for entry in handlers.iter() {
            invoked += 1;
            let ctx = EventContext {
                event: event.to_string(),
                payload: payload.clone(),
            };
            let control = match (entry.handler)(ctx).await {
                Ok(control) => control,
                Err(e) => {
                    tracing::error!("{}", logs::event_handler_fail(event, &entry.id, &format!("{e:#}")));
                    ChainControl::Reject(e.to_string())
                }
            };
            if control.is_stop() {
                tracing::debug!("Event {} stopped by handler {}", event, entry.id);
                return DispatchOutcome { invoked, control };
            }
        }

        DispatchOutcome {
            invoked,
            control: ChainControl::Continue,
        }
    }
}

/// Loads every event directory under `root` into descriptors.
pub fn load_events(loader: &mut ModuleLoader, root: &Path, catalog: &HandlerCatalog) -> Vec<EventDescriptor> {
    let mut descriptors = Vec::new();
    for dir in ModuleLoader::discover_dirs(root) {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };

        let mut handlers = Vec::new();
        for module in loader.load_all(&dir, true) {
            let path = module.path.display().to_string();
            let Some(id) = handler_ref(&module.export, "handler") else {
                tracing::warn!("{}", logs::event_skipped(&path, "export is not a handler reference"));
                continue;
            };
            let Some(handler) = catalog.resolve_event(id) else {
                tracing::warn!("{}", logs::event_skipped(&path, &format!("handler `{id}` is not registered")));
                continue;
            };
            handlers.push(EventHandler {
                id: id.to_string(),
                path: module.path.clone(),
                handler,
            });
        }

        if !handlers.is_empty() {
            descriptors.push(EventDescriptor { name, handlers });
        }
    }
    tracing::info!("{}", logs::events_loaded(descriptors.len()));
    descriptors
}
