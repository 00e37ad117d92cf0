//! # In-Memory Platform
//!
//! A `CommandPlatform` that keeps registered commands in process memory and records
//! every call made against it. Backs `--dry-run` and the test suites.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::domain::traits::CommandPlatform;
use crate::domain::types::{CommandData, RemoteCommand, Scope};

/// One call received by the platform, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Fetch(Scope),
    Overwrite(Scope, Vec<String>),
    Create(Scope, String),
    Edit(Scope, String),
    Delete(Scope, String),
}

impl PlatformCall {
    /// Whether the call changes remote state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Fetch(_))
    }
}

pub struct MemoryPlatform {
    ready: AtomicBool,
    next_id: AtomicU64,
    registered: Mutex<HashMap<Scope, Vec<RemoteCommand>>>,
    calls: Mutex<Vec<PlatformCall>>,
    failing: Mutex<HashSet<String>>,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlatform {
    /// Creates a ready platform with nothing registered.
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            registered: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Seeds `scope` with already registered commands.
    pub fn with_commands(self, scope: Scope, commands: Vec<RemoteCommand>) -> Self {
        lock(&self.registered).insert(scope, commands);
        self
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Makes every create/edit/delete touching `name` fail.
    pub fn fail_on(&self, name: &str) {
        lock(&self.failing).insert(name.to_string());
    }

    pub fn commands(&self, scope: &Scope) -> Vec<RemoteCommand> {
        lock(&self.registered).get(scope).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        lock(&self.calls).clone()
    }

    pub fn mutations(&self) -> Vec<PlatformCall> {
        self.calls().into_iter().filter(PlatformCall::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, call: PlatformCall) {
        lock(&self.calls).push(call);
    }

    fn check_failing(&self, name: &str) -> Result<()> {
        if lock(&self.failing).contains(name) {
            return Err(anyhow!("simulated failure for {name}"));
        }
        Ok(())
    }

    fn to_remote(&self, command: &CommandData) -> RemoteCommand {
        RemoteCommand {
            id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
            name: command.name.clone(),
            description: command.description.clone(),
            options: command.options.clone(),
        }
    }

    fn name_of(&self, scope: &Scope, id: &str) -> Option<String> {
        lock(&self.registered)
            .get(scope)
            .and_then(|list| list.iter().find(|c| c.id == id))
            .map(|c| c.name.clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CommandPlatform for MemoryPlatform {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn fetch_commands(&self, scope: &Scope) -> Result<Vec<RemoteCommand>> {
        self.record(PlatformCall::Fetch(scope.clone()));
        Ok(self.commands(scope))
    }

    async fn overwrite_commands(&self, scope: &Scope, commands: &[CommandData]) -> Result<()> {
        let names = commands.iter().map(|c| c.name.clone()).collect();
        self.record(PlatformCall::Overwrite(scope.clone(), names));
        let remote = commands.iter().map(|c| self.to_remote(c)).collect();
        lock(&self.registered).insert(scope.clone(), remote);
        Ok(())
    }

    async fn create_command(&self, scope: &Scope, command: &CommandData) -> Result<()> {
        self.record(PlatformCall::Create(scope.clone(), command.name.clone()));
        self.check_failing(&command.name)?;
        let remote = self.to_remote(command);
        lock(&self.registered).entry(scope.clone()).or_default().push(remote);
        Ok(())
    }

    async fn edit_command(&self, scope: &Scope, id: &str, command: &CommandData) -> Result<()> {
        self.record(PlatformCall::Edit(scope.clone(), command.name.clone()));
        self.check_failing(&command.name)?;
        let mut registered = lock(&self.registered);
        let target = registered
            .get_mut(scope)
            .and_then(|list| list.iter_mut().find(|c| c.id == id))
            .ok_or_else(|| anyhow!("unknown command id {id} in {scope}"))?;
        target.description = command.description.clone();
        target.options = command.options.clone();
        Ok(())
    }

    async fn delete_command(&self, scope: &Scope, id: &str) -> Result<()> {
        let name = self.name_of(scope, id).unwrap_or_else(|| id.to_string());
        self.record(PlatformCall::Delete(scope.clone(), name.clone()));
        self.check_failing(&name)?;
        if let Some(list) = lock(&self.registered).get_mut(scope) {
            list.retain(|c| c.id != id);
        }
        Ok(())
    }
}
