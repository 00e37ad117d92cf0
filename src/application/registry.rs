//! # Command Registry
//!
//! Pushes the locally declared command set to the platform, either by replacing
//! everything per scope or by diffing against what is already registered and
//! issuing one create/edit/delete per changed command.
//!
//! Commands flagged `dev_only` go to every configured dev guild; all others are
//! global. A failed call for one command is logged and the batch carries on.

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::commands::CommandDescriptor;
use crate::domain::traits::CommandPlatform;
use crate::domain::types::{CommandData, Comparison, ReloadScope, RemoteCommand, Scope, SyncMode};
use crate::strings::logs;

/// What a sync pass did, per scope and command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<(Scope, String)>,
    pub edited: Vec<(Scope, String)>,
    pub deleted: Vec<(Scope, String)>,
    pub unchanged: Vec<(Scope, String)>,
    /// Deleted commands that were never registered.
    pub skipped: Vec<(Scope, String)>,
    /// Bulk replacements and how many commands each carried.
    pub overwritten: Vec<(Scope, usize)>,
    /// Failed calls: scope, command name (`*` for a whole-scope call), reason.
    pub failed: Vec<(Scope, String, String)>,
}

impl SyncReport {
    /// Number of state-changing calls that succeeded.
    pub fn remote_calls(&self) -> usize {
        self.created.len() + self.edited.len() + self.deleted.len() + self.overwritten.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct CommandRegistry {
    platform: Arc<dyn CommandPlatform>,
    dev_guild_ids: Vec<String>,
    comparison: Comparison,
    declared: Vec<Arc<CommandDescriptor>>,
}

impl CommandRegistry {
    pub fn new(
        platform: Arc<dyn CommandPlatform>,
        dev_guild_ids: Vec<String>,
        comparison: Comparison,
    ) -> Self {
        Self {
            platform,
            dev_guild_ids,
            comparison,
            declared: Vec::new(),
        }
    }

    pub fn platform(&self) -> &Arc<dyn CommandPlatform> {
        &self.platform
    }

    /// Replaces the locally declared command set.
    pub fn declare(&mut self, commands: Vec<Arc<CommandDescriptor>>) {
        self.declared = commands;
    }

    pub fn declared(&self) -> &[Arc<CommandDescriptor>] {
        &self.declared
    }

    /// Synchronizes the declared set with the given strategy.
    pub async fn sync(&self, mode: SyncMode, scope: ReloadScope) -> SyncReport {
        match mode {
            SyncMode::Full => self.sync_full(&self.declared, scope).await,
            SyncMode::Incremental => self.sync_incremental(&self.declared, scope).await,
        }
    }

    /// Replaces the registered set wholesale: one call for the global group and one
    /// per dev guild for the dev group. Deleted commands are simply left out.
    pub async fn sync_full(&self, commands: &[Arc<CommandDescriptor>], scope: ReloadScope) -> SyncReport {
        let mut report = SyncReport::default();
        let live: Vec<&Arc<CommandDescriptor>> = commands.iter().filter(|c| !c.is_deleted()).collect();
        let (dev, global): (Vec<_>, Vec<_>) = live.into_iter().partition(|c| c.is_dev_only());

        if scope.includes_global() {
            let data: Vec<CommandData> = global.iter().map(|c| c.data.clone()).collect();
            self.overwrite(&Scope::Global, &data, &mut report).await;
        }

        if scope.includes_dev() {
            let data: Vec<CommandData> = dev.iter().map(|c| c.data.clone()).collect();
            self.warn_missing_dev_guilds(data.len());
            for guild in &self.dev_guild_ids {
                self.overwrite(&Scope::Guild(guild.clone()), &data, &mut report).await;
            }
        }

        report
    }

    /// Diffs each command against the registered state and issues only the calls
    /// needed to bring the platform in line.
    pub async fn sync_incremental(
        &self,
        commands: &[Arc<CommandDescriptor>],
        scope: ReloadScope,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let (dev, global): (Vec<_>, Vec<_>) = commands.iter().partition(|c| c.is_dev_only());

        if scope.includes_global() {
            self.reconcile(&Scope::Global, &global, &mut report).await;
        }

        if scope.includes_dev() && !dev.is_empty() {
            self.warn_missing_dev_guilds(dev.len());
            for guild in &self.dev_guild_ids {
                self.reconcile(&Scope::Guild(guild.clone()), &dev, &mut report).await;
            }
        }

        report
    }

    async fn overwrite(&self, scope: &Scope, data: &[CommandData], report: &mut SyncReport) {
        match self.platform.overwrite_commands(scope, data).await {
            Ok(()) => {
                tracing::info!("{}", logs::bulk_registered(data.len(), &scope.to_string()));
                report.overwritten.push((scope.clone(), data.len()));
            }
            Err(e) => {
                tracing::error!("{}", logs::bulk_register_fail(&scope.to_string(), &format!("{e:#}")));
                report.failed.push((scope.clone(), "*".to_string(), format!("{e:#}")));
            }
        }
    }

    async fn reconcile(
        &self,
        scope: &Scope,
        commands: &[&Arc<CommandDescriptor>],
        report: &mut SyncReport,
    ) {
        let remote = match self.platform.fetch_commands(scope).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::error!("{}", logs::fetch_fail(&scope.to_string(), &format!("{e:#}")));
                report.failed.push((scope.clone(), "*".to_string(), format!("{e:#}")));
                return;
            }
        };
        let by_name: HashMap<&str, &RemoteCommand> =
            remote.iter().map(|c| (c.name.as_str(), c)).collect();

        for command in commands {
            let name = command.name();
            let existing = by_name.get(name).copied();
            let entry = (scope.clone(), name.to_string());

            if command.is_deleted() {
                let Some(target) = existing else {
                    tracing::info!("{}", logs::delete_skipped(name, &scope.to_string()));
                    report.skipped.push(entry);
                    continue;
                };
                match self.platform.delete_command(scope, &target.id).await {
                    Ok(()) => {
                        tracing::info!("{}", logs::command_deleted(name, &scope.to_string()));
                        report.deleted.push(entry);
                    }
                    Err(e) => self.record_failure(report, entry, "delete", &e),
                }
                continue;
            }

            match existing {
                Some(target) if self.differs(&command.data, target) => {
                    match self.platform.edit_command(scope, &target.id, &command.data).await {
                        Ok(()) => {
                            tracing::info!("{}", logs::command_edited(name, &scope.to_string()));
                            report.edited.push(entry);
                        }
                        Err(e) => self.record_failure(report, entry, "edit", &e),
                    }
                }
                Some(_) => {
                    tracing::debug!("Command {} unchanged in {}", name, scope);
                    report.unchanged.push(entry);
                }
                None => match self.platform.create_command(scope, &command.data).await {
                    Ok(()) => {
                        tracing::info!("{}", logs::command_created(name, &scope.to_string()));
                        report.created.push(entry);
                    }
                    Err(e) => self.record_failure(report, entry, "create", &e),
                },
            }
        }
    }

    /// Whether a registered command needs an edit to match the local schema.
    fn differs(&self, local: &CommandData, remote: &RemoteCommand) -> bool {
        if local.description != remote.description {
            return true;
        }
        match self.comparison {
            Comparison::Shallow => local.options.len() != remote.options.len(),
            Comparison::Deep => local.options != remote.options,
        }
    }

    fn record_failure(
        &self,
        report: &mut SyncReport,
        (scope, name): (Scope, String),
        action: &str,
        error: &anyhow::Error,
    ) {
        tracing::error!(
            "{}",
            logs::sync_call_fail(action, &name, &scope.to_string(), &format!("{error:#}"))
        );
        report.failed.push((scope, name, format!("{error:#}")));
    }

    fn warn_missing_dev_guilds(&self, dev_commands: usize) {
        if dev_commands > 0 && self.dev_guild_ids.is_empty() {
            tracing::warn!("{}", logs::NO_DEV_GUILDS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::catalog::{CommandFn, command_fn};
    use crate::domain::types::{CommandFlags, CommandOption};
    use crate::infrastructure::memory::{MemoryPlatform, PlatformCall};

    fn noop() -> CommandFn {
        command_fn(|_ctx| async { Ok(()) })
    }

    fn command(name: &str, description: &str) -> CommandDescriptor {
        CommandDescriptor::new(CommandData::new(name, description), noop())
    }

    fn flagged(name: &str, description: &str, dev_only: bool, deleted: bool) -> Arc<CommandDescriptor> {
        Arc::new(command(name, description).with_flags(CommandFlags {
            dev_only,
            deleted,
            ..CommandFlags::default()
        }))
    }

    fn remote(id: &str, name: &str, description: &str) -> RemoteCommand {
        RemoteCommand {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            options: Vec::new(),
        }
    }

    fn registry(platform: Arc<MemoryPlatform>, comparison: Comparison) -> CommandRegistry {
        CommandRegistry::new(platform, vec!["dev1".into(), "dev2".into()], comparison)
    }

    #[tokio::test]
    async fn test_incremental_one_call_per_change() {
        let platform = Arc::new(MemoryPlatform::new().with_commands(
            Scope::Global,
            vec![
                remote("1", "same", "unchanged"),
                remote("2", "changed", "old text"),
                remote("3", "gone", "to delete"),
            ],
        ));
        let registry = registry(platform.clone(), Comparison::Shallow);
        let commands = vec![
            flagged("same", "unchanged", false, false),
            flagged("changed", "new text", false, false),
            flagged("gone", "to delete", false, true),
            flagged("fresh", "brand new", false, false),
        ];

        let report = registry.sync_incremental(&commands, ReloadScope::Global).await;

        assert_eq!(
            platform.mutations(),
            vec![
                PlatformCall::Edit(Scope::Global, "changed".into()),
                PlatformCall::Delete(Scope::Global, "gone".into()),
                PlatformCall::Create(Scope::Global, "fresh".into()),
            ]
        );
        assert_eq!(report.remote_calls(), 3);
        assert_eq!(report.unchanged, vec![(Scope::Global, "same".to_string())]);

        // A second pass against the updated remote state is a no-op.
        platform.clear_calls();
        let again = registry.sync_incremental(&commands, ReloadScope::Global).await;
        assert!(platform.mutations().is_empty());
        assert_eq!(again.remote_calls(), 0);
        assert_eq!(again.skipped, vec![(Scope::Global, "gone".to_string())]);
    }

    #[tokio::test]
    async fn test_deleted_without_remote_is_skipped() {
        let platform = Arc::new(MemoryPlatform::new());
        let registry = registry(platform.clone(), Comparison::Shallow);

        let report = registry
            .sync_incremental(&[flagged("ghost", "x", false, true)], ReloadScope::All)
            .await;

        assert!(platform.mutations().is_empty());
        assert_eq!(report.skipped, vec![(Scope::Global, "ghost".to_string())]);
    }

    #[tokio::test]
    async fn test_shallow_comparison_ignores_option_contents() {
        let mut local = CommandData::new("pick", "Pick one");
        local.options.push(CommandOption::new("choice", "new wording", CommandOption::STRING));
        let mut registered = remote("1", "pick", "Pick one");
        registered
            .options
            .push(CommandOption::new("choice", "old wording", CommandOption::STRING));

        let commands = vec![Arc::new(CommandDescriptor::new(local, noop()))];

        let platform = Arc::new(MemoryPlatform::new().with_commands(Scope::Global, vec![registered.clone()]));
        let shallow = registry(platform.clone(), Comparison::Shallow)
            .sync_incremental(&commands, ReloadScope::Global)
            .await;
        assert_eq!(shallow.unchanged.len(), 1);
        assert!(platform.mutations().is_empty());

        let platform = Arc::new(MemoryPlatform::new().with_commands(Scope::Global, vec![registered]));
        let deep = registry(platform.clone(), Comparison::Deep)
            .sync_incremental(&commands, ReloadScope::Global)
            .await;
        assert_eq!(deep.edited.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let platform = Arc::new(MemoryPlatform::new());
        platform.fail_on("broken");
        let registry = registry(platform.clone(), Comparison::Shallow);
        let commands = vec![
            flagged("broken", "x", false, false),
            flagged("works", "y", false, false),
        ];

        let report = registry.sync_incremental(&commands, ReloadScope::Global).await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].1, "broken");
        assert_eq!(report.created, vec![(Scope::Global, "works".to_string())]);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_dev_commands_go_to_each_dev_guild() {
        let platform = Arc::new(MemoryPlatform::new());
        let registry = registry(platform.clone(), Comparison::Shallow);
        let commands = vec![flagged("debug", "Dev only", true, false), flagged("ping", "Pong", false, false)];

        let report = registry.sync_incremental(&commands, ReloadScope::Dev).await;

        assert_eq!(
            platform.mutations(),
            vec![
                PlatformCall::Create(Scope::Guild("dev1".into()), "debug".into()),
                PlatformCall::Create(Scope::Guild("dev2".into()), "debug".into()),
            ]
        );
        assert_eq!(report.created.len(), 2);
    }

    #[tokio::test]
    async fn test_full_sync_replaces_per_scope() {
        let platform = Arc::new(MemoryPlatform::new().with_commands(
            Scope::Global,
            vec![remote("9", "stale", "left over")],
        ));
        let mut registry = registry(platform.clone(), Comparison::Shallow);
        registry.declare(vec![
            flagged("ping", "Pong", false, false),
            flagged("old", "Deleted", false, true),
            flagged("debug", "Dev only", true, false),
        ]);

        let report = registry.sync(SyncMode::Full, ReloadScope::All).await;

        assert_eq!(
            platform.mutations(),
            vec![
                PlatformCall::Overwrite(Scope::Global, vec!["ping".into()]),
                PlatformCall::Overwrite(Scope::Guild("dev1".into()), vec!["debug".into()]),
                PlatformCall::Overwrite(Scope::Guild("dev2".into()), vec!["debug".into()]),
            ]
        );
        assert_eq!(report.overwritten.len(), 3);
        let names: Vec<_> = platform.commands(&Scope::Global).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["ping"]);
    }
}
