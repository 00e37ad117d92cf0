//! # Runtime
//!
//! Owns the loaded command table, event listeners, and validation pipeline, and
//! drives them through the startup phases:
//!
//! ```text
//! Uninitialized → ValidationsLoaded → EventsBound → CommandsSynced → Ready
//! ```
//!
//! Each collection is replaced by swapping an `Arc`, so an interaction that is
//! already running keeps the snapshot it started with while a reload installs the
//! next one.

use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use tokio::sync::Mutex;

use crate::application::catalog::{CommandContext, HandlerCatalog};
use crate::application::commands::{CommandTable, load_commands};
use crate::application::events::{DispatchOutcome, EventBus, load_events};
use crate::application::loader::ModuleLoader;
use crate::application::registry::{CommandRegistry, SyncReport};
use crate::application::validation::{DevAccess, ValidationPipeline, load_validations};
use crate::domain::config::RuntimeConfig;
use crate::domain::error::{Category, RuntimeError};
use crate::domain::traits::CommandPlatform;
use crate::domain::types::{Interaction, ReloadScope};
use crate::strings::{logs, messages};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Uninitialized,
    ValidationsLoaded,
    EventsBound,
    CommandsSynced,
    Ready,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::ValidationsLoaded => "validations-loaded",
            Self::EventsBound => "events-bound",
            Self::CommandsSynced => "commands-synced",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// How an inbound interaction was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    UnknownCommand,
    Vetoed,
    Completed,
    /// Autocomplete requested for a command that has no autocomplete callable.
    NoAutocomplete,
    Failed,
}

pub struct Runtime {
    config: RuntimeConfig,
    catalog: HandlerCatalog,
    platform: Arc<dyn CommandPlatform>,
    loader: Mutex<ModuleLoader>,
    registry: Mutex<CommandRegistry>,
    commands: RwLock<Arc<CommandTable>>,
    validations: RwLock<Arc<ValidationPipeline>>,
    events: EventBus,
    phase: RwLock<Phase>,
    last_sync: StdMutex<Option<SyncReport>>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig, catalog: HandlerCatalog, platform: Arc<dyn CommandPlatform>) -> Self {
        let registry = CommandRegistry::new(platform.clone(), config.dev_guild_ids.clone(), config.comparison);
        Self {
            config,
            catalog,
            platform,
            loader: Mutex::new(ModuleLoader::new()),
            registry: Mutex::new(registry),
            commands: RwLock::new(Arc::new(CommandTable::default())),
            validations: RwLock::new(Arc::new(ValidationPipeline::default())),
            events: EventBus::new(),
            phase: RwLock::new(Phase::Uninitialized),
            last_sync: StdMutex::new(None),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn platform(&self) -> &Arc<dyn CommandPlatform> {
        &self.platform
    }

    pub fn phase(&self) -> Phase {
        *self.phase.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Snapshot of the current command table.
    pub fn commands(&self) -> Arc<CommandTable> {
        self.commands.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn validations(&self) -> Arc<ValidationPipeline> {
        self.validations.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Report of the most recent command synchronization, if one ran.
    pub fn last_sync(&self) -> Option<SyncReport> {
        self.last_sync.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn enter(&self, phase: Phase) {
        *self.phase.write().unwrap_or_else(|p| p.into_inner()) = phase;
        tracing::info!("{}", logs::phase_entered(&phase.to_string()));
    }

    fn require_path(path: Option<&PathBuf>, category: Category) -> Result<PathBuf, RuntimeError> {
        path.cloned().ok_or(RuntimeError::NotConfigured(category))
    }

    fn require_ready(&self) -> Result<(), RuntimeError> {
        if self.phase() != Phase::Ready {
            return Err(RuntimeError::NotInitialized);
        }
        Ok(())
    }

    /// Runs every phase in order. A category without a configured path is skipped.
    ///
    /// Fails with `NotReady` if commands are configured but the platform client is not
    /// connected; the phases before it stay in effect.
    pub async fn init(&self) -> Result<(), RuntimeError> {
        self.load_validations_phase().await;
        self.enter(Phase::ValidationsLoaded);

        match &self.config.events_path {
            Some(path) => self.bind_events(path.clone()).await,
            None => tracing::info!("{}", logs::phase_skipped(&Category::Events.to_string())),
        }
        self.enter(Phase::EventsBound);

        match &self.config.commands_path {
            Some(path) => {
                if !self.platform.is_ready() {
                    return Err(RuntimeError::NotReady);
                }
                self.load_and_sync_commands(path.clone(), ReloadScope::All).await;
            }
            None => tracing::info!("{}", logs::phase_skipped(&Category::Commands.to_string())),
        }
        self.enter(Phase::CommandsSynced);

        self.enter(Phase::Ready);
        tracing::info!(
            "{}",
            logs::runtime_ready(self.commands().len(), self.events.listener_count(), self.validations().len())
        );
        Ok(())
    }

    /// Reloads command modules and re-synchronizes the given group with the platform.
    pub async fn reload_commands(&self, scope: ReloadScope) -> Result<SyncReport, RuntimeError> {
        let path = Self::require_path(self.config.commands_path.as_ref(), Category::Commands)?;
        self.require_ready()?;
        if !self.platform.is_ready() {
            return Err(RuntimeError::NotReady);
        }
        Ok(self.load_and_sync_commands(path, scope).await)
    }

    /// Re-reads event modules and rebinds every listener. Returns the listener count.
    pub async fn reload_events(&self) -> Result<usize, RuntimeError> {
        let path = Self::require_path(self.config.events_path.as_ref(), Category::Events)?;
        self.require_ready()?;
        self.bind_events(path).await;
        Ok(self.events.listener_count())
    }

    /// Re-reads validation modules. Returns the number of checks in the new pipeline.
    pub async fn reload_validations(&self) -> Result<usize, RuntimeError> {
        Self::require_path(self.config.validations_path.as_ref(), Category::Validations)?;
        self.require_ready()?;
        self.load_validations_phase().await;
        Ok(self.validations().len())
    }

    async fn load_validations_phase(&self) {
        let user = match &self.config.validations_path {
            Some(path) => {
                let mut loader = self.loader.lock().await;
                load_validations(&mut loader, path, &self.catalog)
            }
            None => {
                tracing::info!("{}", logs::phase_skipped(&Category::Validations.to_string()));
                Vec::new()
            }
        };
        let builtins = (!self.config.skip_builtin_validations).then(|| DevAccess::from_config(&self.config));
        let pipeline = ValidationPipeline::new(builtins, user);
        *self.validations.write().unwrap_or_else(|p| p.into_inner()) = Arc::new(pipeline);
    }

    async fn bind_events(&self, path: PathBuf) {
        let descriptors = {
            let mut loader = self.loader.lock().await;
            load_events(&mut loader, &path, &self.catalog)
        };
        self.events.rebuild(descriptors);
    }

    async fn load_and_sync_commands(&self, path: PathBuf, scope: ReloadScope) -> SyncReport {
        let table = {
            let mut loader = self.loader.lock().await;
            Arc::new(load_commands(&mut loader, &path, &self.catalog))
        };
        *self.commands.write().unwrap_or_else(|p| p.into_inner()) = table.clone();

        let report = {
            let mut registry = self.registry.lock().await;
            registry.declare(table.as_slice().to_vec());
            registry.sync(self.config.sync, scope).await
        };
        tracing::info!(
            "{}",
            logs::sync_summary(report.created.len(), report.edited.len(), report.deleted.len(), report.failed.len())
        );
        *self.last_sync.lock().unwrap_or_else(|p| p.into_inner()) = Some(report.clone());
        report
    }

    /// Routes an interaction to its command: validations first, then the command's
    /// `run` or `autocomplete` callable.
    pub async fn handle_interaction(&self, interaction: Interaction) -> InteractionOutcome {
        let table = self.commands();
        let Some(command) = table.get(&interaction.command_name).filter(|c| !c.is_deleted()) else {
            tracing::debug!("{}", logs::unknown_command(&interaction.command_name));
            return InteractionOutcome::UnknownCommand;
        };

        let ctx = CommandContext { interaction, command };
        if !self.validations().run(&ctx).await {
            return InteractionOutcome::Vetoed;
        }

        let command = ctx.command.clone();
        if ctx.interaction.is_autocomplete() {
            return match command.autocomplete(ctx).await {
                Ok(true) => InteractionOutcome::Completed,
                Ok(false) => InteractionOutcome::NoAutocomplete,
                Err(e) => {
                    tracing::error!("{}", logs::autocomplete_fail(command.name(), &format!("{e:#}")));
                    InteractionOutcome::Failed
                }
            };
        }

        let interaction = ctx.interaction.clone();
        match command.run(ctx).await {
            Ok(()) => InteractionOutcome::Completed,
            Err(e) => {
                tracing::error!("{}", logs::command_fail(command.name(), &format!("{e:#}")));
                if let Err(e) = interaction.reply(messages::COMMAND_FAILED, true).await {
                    tracing::warn!("{}", logs::reply_fail(&format!("{e:#}")));
                }
                InteractionOutcome::Failed
            }
        }
    }

    /// Pushes a platform event through its handler chain.
    pub async fn dispatch_event(&self, event: &str, payload: Value) -> DispatchOutcome {
        self.events.dispatch(event, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::InteractionResponder;
    use crate::domain::types::{ChainControl, InteractionKind, PermissionSet, Scope};
    use crate::infrastructure::memory::{MemoryPlatform, PlatformCall};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex as TestMutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        replies: TestMutex<Vec<(String, bool)>>,
    }

    #[async_trait]
    impl InteractionResponder for Recorder {
        async fn reply(&self, content: &str, ephemeral: bool) -> Result<()> {
            self.replies.lock().unwrap().push((content.to_string(), ephemeral));
            Ok(())
        }
    }

    struct Fixture {
        temp: TempDir,
        log: Arc<TestMutex<Vec<String>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let fixture = Self {
                temp: TempDir::new().unwrap(),
                log: Arc::new(TestMutex::new(Vec::new())),
            };
            fixture.write("commands/ping.yaml", "data: {name: ping, description: Pong}\nrun: ping.run");
            fixture.write(
                "commands/admin/ban.yaml",
                "data: {name: ban, description: Ban}\nrun: ban.run\noptions: {dev_only: true}",
            );
            fixture.write("commands/broken.yaml", "run: ping.run");
            fixture.write("events/ready/a.yaml", "events.first");
            fixture.write("events/ready/b.yaml", "events.second");
            fixture.write("validations/maintenance.yaml", "handler: guard.maintenance");
            fixture
        }

        fn root(&self) -> &Path {
            self.temp.path()
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.root().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn config(&self) -> RuntimeConfig {
            RuntimeConfig {
                commands_path: Some(self.root().join("commands")),
                events_path: Some(self.root().join("events")),
                validations_path: Some(self.root().join("validations")),
                dev_guild_ids: vec!["dev-guild".into()],
                dev_user_ids: vec!["dev".into()],
                ..Default::default()
            }
        }

        fn catalog(&self) -> HandlerCatalog {
            let mut catalog = HandlerCatalog::new();
            let log = self.log.clone();
            catalog.command("ping.run", move |ctx| {
                let log = log.clone();
                async move {
                    ctx.interaction.reply("pong", false).await?;
                    log.lock().unwrap().push("ping".into());
                    Ok(())
                }
            });
            catalog.command("ban.run", |_ctx| async { Err(anyhow::anyhow!("no database")) });
            for id in ["events.first", "events.second"] {
                let log = self.log.clone();
                catalog.event(id, move |_ctx| {
                    let log = log.clone();
                    async move {
                        log.lock().unwrap().push(id.to_string());
                        Ok(ChainControl::Continue)
                    }
                });
            }
            catalog.validation("guard.maintenance", |ctx| async move {
                if ctx.interaction.options.get("maintenance").is_some() {
                    return Ok(ChainControl::Reject("down for maintenance".into()));
                }
                Ok(ChainControl::Continue)
            });
            catalog
        }

        fn runtime(&self, platform: Arc<MemoryPlatform>) -> Runtime {
            Runtime::new(self.config(), self.catalog(), platform)
        }
    }

    fn interaction(kind: InteractionKind, name: &str, user: &str, recorder: &Arc<Recorder>) -> Interaction {
        Interaction::new(kind, name, user, recorder.clone())
    }

    #[tokio::test]
    async fn test_init_runs_every_phase() {
        let fixture = Fixture::new();
        let platform = Arc::new(MemoryPlatform::new());
        let runtime = fixture.runtime(platform.clone());
        assert_eq!(runtime.phase(), Phase::Uninitialized);

        runtime.init().await.unwrap();

        assert_eq!(runtime.phase(), Phase::Ready);
        assert_eq!(runtime.commands().names(), vec!["ban", "ping"]);
        assert_eq!(runtime.events().handler_count("ready"), 2);
        assert_eq!(
            runtime.validations().ids(),
            vec!["builtin.dev_only", "builtin.permissions", "guard.maintenance"]
        );

        let global: Vec<String> = platform.commands(&Scope::Global).into_iter().map(|c| c.name).collect();
        let dev: Vec<String> = platform
            .commands(&Scope::Guild("dev-guild".into()))
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(global, vec!["ping"]);
        assert_eq!(dev, vec!["ban"]);
        assert!(runtime.last_sync().unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_init_skips_unconfigured_phases() {
        let fixture = Fixture::new();
        let config = RuntimeConfig {
            events_path: Some(fixture.root().join("events")),
            skip_builtin_validations: true,
            ..Default::default()
        };
        let platform = Arc::new(MemoryPlatform::new());
        let runtime = Runtime::new(config, fixture.catalog(), platform.clone());

        runtime.init().await.unwrap();

        assert_eq!(runtime.phase(), Phase::Ready);
        assert!(runtime.commands().is_empty());
        assert!(runtime.validations().is_empty());
        assert!(platform.calls().is_empty());
        assert!(matches!(
            runtime.reload_commands(ReloadScope::All).await,
            Err(RuntimeError::NotConfigured(Category::Commands))
        ));
        assert!(matches!(
            runtime.reload_validations().await,
            Err(RuntimeError::NotConfigured(Category::Validations))
        ));
    }

    #[tokio::test]
    async fn test_reload_before_init_is_rejected() {
        let fixture = Fixture::new();
        let runtime = fixture.runtime(Arc::new(MemoryPlatform::new()));
        assert!(matches!(runtime.reload_events().await, Err(RuntimeError::NotInitialized)));
        assert!(matches!(
            runtime.reload_commands(ReloadScope::Global).await,
            Err(RuntimeError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_reload_commands_requires_ready_platform() {
        let fixture = Fixture::new();
        let platform = Arc::new(MemoryPlatform::new());
        let runtime = fixture.runtime(platform.clone());
        runtime.init().await.unwrap();

        platform.set_ready(false);
        assert!(matches!(
            runtime.reload_commands(ReloadScope::All).await,
            Err(RuntimeError::NotReady)
        ));
    }

    #[tokio::test]
    async fn test_init_fails_when_platform_not_ready() {
        let fixture = Fixture::new();
        let platform = Arc::new(MemoryPlatform::new());
        platform.set_ready(false);
        let runtime = fixture.runtime(platform);

        assert!(matches!(runtime.init().await, Err(RuntimeError::NotReady)));
        assert_eq!(runtime.phase(), Phase::EventsBound);
    }

    #[tokio::test]
    async fn test_reload_commands_syncs_only_new_command() {
        let fixture = Fixture::new();
        let platform = Arc::new(MemoryPlatform::new());
        let runtime = fixture.runtime(platform.clone());
        runtime.init().await.unwrap();
        let before = runtime.commands();

        fixture.write("commands/echo.yaml", "data: {name: echo, description: Echo}\nrun: ping.run");
        platform.clear_calls();
        let report = runtime.reload_commands(ReloadScope::Global).await.unwrap();

        assert_eq!(report.created, vec![(Scope::Global, "echo".to_string())]);
        assert_eq!(report.unchanged, vec![(Scope::Global, "ping".to_string())]);
        assert_eq!(
            platform.mutations(),
            vec![PlatformCall::Create(Scope::Global, "echo".into())]
        );
        assert!(before.get("echo").is_none());
        assert!(runtime.commands().get("echo").is_some());
    }

    #[tokio::test]
    async fn test_reload_events_twice_fires_each_handler_once() {
        let fixture = Fixture::new();
        let runtime = fixture.runtime(Arc::new(MemoryPlatform::new()));
        runtime.init().await.unwrap();

        runtime.reload_events().await.unwrap();
        runtime.reload_events().await.unwrap();
        let outcome = runtime.dispatch_event("ready", Value::Null).await;

        assert_eq!(outcome.invoked, 2);
        assert_eq!(*fixture.log.lock().unwrap(), vec!["events.first", "events.second"]);
    }

    #[tokio::test]
    async fn test_handle_interaction_outcomes() {
        let fixture = Fixture::new();
        let runtime = fixture.runtime(Arc::new(MemoryPlatform::new()));
        runtime.init().await.unwrap();
        let recorder = Arc::new(Recorder::default());

        let outcome = runtime
            .handle_interaction(interaction(InteractionKind::Command, "ping", "u", &recorder))
            .await;
        assert_eq!(outcome, InteractionOutcome::Completed);
        assert_eq!(recorder.replies.lock().unwrap().pop(), Some(("pong".to_string(), false)));

        let outcome = runtime
            .handle_interaction(interaction(InteractionKind::Command, "missing", "u", &recorder))
            .await;
        assert_eq!(outcome, InteractionOutcome::UnknownCommand);

        let outcome = runtime
            .handle_interaction(interaction(InteractionKind::Autocomplete, "ping", "u", &recorder))
            .await;
        assert_eq!(outcome, InteractionOutcome::NoAutocomplete);

        let maintenance = interaction(InteractionKind::Command, "ping", "u", &recorder)
            .with_options(serde_json::json!({"maintenance": true}));
        assert_eq!(runtime.handle_interaction(maintenance).await, InteractionOutcome::Vetoed);
        assert_eq!(
            recorder.replies.lock().unwrap().pop(),
            Some(("down for maintenance".to_string(), true))
        );
        assert_eq!(*fixture.log.lock().unwrap(), vec!["ping"]);
    }

    #[tokio::test]
    async fn test_dev_command_vetoed_then_fails_for_developer() {
        let fixture = Fixture::new();
        let runtime = fixture.runtime(Arc::new(MemoryPlatform::new()));
        runtime.init().await.unwrap();
        let recorder = Arc::new(Recorder::default());

        let outsider = interaction(InteractionKind::Command, "ban", "someone", &recorder).in_guild(
            "dev-guild",
            PermissionSet::default(),
            PermissionSet::default(),
        );
        assert_eq!(runtime.handle_interaction(outsider).await, InteractionOutcome::Vetoed);
        assert_eq!(recorder.replies.lock().unwrap().pop().unwrap().0, messages::DEV_USER_ONLY);

        let developer = interaction(InteractionKind::Command, "ban", "dev", &recorder).in_guild(
            "dev-guild",
            PermissionSet::default(),
            PermissionSet::default(),
        );
        assert_eq!(runtime.handle_interaction(developer).await, InteractionOutcome::Failed);
        assert_eq!(
            recorder.replies.lock().unwrap().pop(),
            Some((messages::COMMAND_FAILED.to_string(), true))
        );
    }
}
