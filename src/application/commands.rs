//! # Command Descriptors
//!
//! Turns loaded command modules into descriptors and collects them into the table
//! the orchestrator routes interactions against. A module that does not satisfy the
//! command contract is skipped with a warning; its siblings still load.

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::application::catalog::{CommandContext, CommandFn, HandlerCatalog};
use crate::application::loader::{LoadedModule, ModuleLoader, absolute};
use crate::domain::paths::parent_label;
use crate::domain::types::{CommandData, CommandFlags};
use crate::strings::logs;

static NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

fn name_pattern() -> &'static Regex {
    NAME_PATTERN.get_or_init(|| {
        Regex::new(r"^[-_\p{Ll}\p{Lm}\p{Lo}\p{N}]{1,32}$").expect("command name pattern is valid")
    })
}

/// A loaded command: its platform schema, behaviour flags, and callables.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub data: CommandData,
    pub flags: CommandFlags,
    pub category: Option<String>,
    pub path: PathBuf,
    run: CommandFn,
    autocomplete: Option<CommandFn>,
}

impl CommandDescriptor {
    pub fn new(data: CommandData, run: CommandFn) -> Self {
        Self {
            data,
            flags: CommandFlags::default(),
            category: None,
            path: PathBuf::new(),
            run,
            autocomplete: None,
        }
    }

    pub fn with_flags(mut self, flags: CommandFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_autocomplete(mut self, autocomplete: CommandFn) -> Self {
        self.autocomplete = Some(autocomplete);
        self
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn is_dev_only(&self) -> bool {
        self.flags.dev_only
    }

    pub fn is_deleted(&self) -> bool {
        self.flags.deleted
    }

    pub fn has_autocomplete(&self) -> bool {
        self.autocomplete.is_some()
    }

    pub async fn run(&self, ctx: CommandContext) -> Result<()> {
        (self.run)(ctx).await
    }

    /// Runs the autocomplete callable; returns `Ok(false)` when the command has none.
    pub async fn autocomplete(&self, ctx: CommandContext) -> Result<bool> {
        match &self.autocomplete {
            Some(autocomplete) => autocomplete(ctx).await.map(|_| true),
            None => Ok(false),
        }
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.data.name)
            .field("flags", &self.flags)
            .field("category", &self.category)
            .field("path", &self.path)
            .field("autocomplete", &self.autocomplete.is_some())
            .finish()
    }
}

/// On-disk shape of a command module.
#[derive(Debug, Deserialize)]
struct CommandModule {
    data: Option<CommandData>,
    run: Option<String>,
    autocomplete: Option<String>,
    category: Option<String>,
    #[serde(default)]
    options: CommandFlags,
}

/// Builds a descriptor from one loaded module, or explains why it cannot.
pub fn parse_command(
    module: &LoadedModule,
    root: &Path,
    catalog: &HandlerCatalog,
) -> Result<CommandDescriptor, String> {
    let def: CommandModule = serde_json::from_value(module.export.clone())
        .map_err(|e| format!("invalid command module: {e}"))?;

    let data = def.data.ok_or("missing `data`")?;
    if data.name.is_empty() {
        return Err("missing `data.name`".to_string());
    }
    if !name_pattern().is_match(&data.name) {
        return Err(format!("invalid command name `{}`", data.name));
    }

    let run_id = def.run.ok_or("missing `run`")?;
    let run = catalog
        .resolve_command(&run_id)
        .ok_or_else(|| format!("`run` handler `{run_id}` is not registered"))?;

    let autocomplete = match def.autocomplete {
        Some(id) => Some(
            catalog
                .resolve_command(&id)
                .ok_or_else(|| format!("`autocomplete` handler `{id}` is not registered"))?,
        ),
        None => None,
    };

    Ok(CommandDescriptor {
        data,
        flags: def.options,
        category: def
            .category
            .or_else(|| parent_label(&absolute(root), &module.path)),
        path: module.path.clone(),
        run,
        autocomplete,
    })
}

/// The current generation of loaded commands, indexed by name.
#[derive(Debug, Default)]
pub struct CommandTable {
    commands: Vec<Arc<CommandDescriptor>>,
}

impl CommandTable {
    /// Builds a table; a name already present is skipped with a warning.
    pub fn from_descriptors(descriptors: Vec<CommandDescriptor>) -> Self {
        let mut seen = HashSet::new();
        let mut commands = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if !seen.insert(descriptor.data.name.clone()) {
                tracing::warn!(
                    "{}",
                    logs::duplicate_command(&descriptor.data.name, &descriptor.path.display().to_string())
                );
                continue;
            }
            commands.push(Arc::new(descriptor));
        }
        Self { commands }
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandDescriptor>> {
        self.commands.iter().find(|c| c.data.name == name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandDescriptor>> {
        self.commands.iter()
    }

    pub fn as_slice(&self) -> &[Arc<CommandDescriptor>] {
        &self.commands
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.data.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Loads every command module under `root` into a fresh table.
pub fn load_commands(loader: &mut ModuleLoader, root: &Path, catalog: &HandlerCatalog) -> CommandTable {
    let mut descriptors = Vec::new();
    for module in loader.load_all(root, true) {
        match parse_command(&module, root, catalog) {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(reason) => {
                tracing::warn!("{}", logs::command_skipped(&module.path.display().to_string(), &reason))
            }
        }
    }
    let table = CommandTable::from_descriptors(descriptors);
    tracing::info!("{}", logs::commands_loaded(table.len()));
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn catalog() -> HandlerCatalog {
        let mut catalog = HandlerCatalog::new();
        catalog
            .command("ping.run", |_ctx| async { Ok(()) })
            .command("ping.complete", |_ctx| async { Ok(()) });
        catalog
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_commands_skips_incomplete_modules() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "a_ping.yaml", "data: {name: ping, description: Pong}\nrun: ping.run");
        write(root, "b_norun.yaml", "data: {name: norun, description: No run}");
        write(root, "c_nodata.yaml", "run: ping.run");
        write(root, "d_unknown.yaml", "data: {name: ghost}\nrun: ghost.run");
        write(root, "e_badname.yaml", "data: {name: Bad Name}\nrun: ping.run");
        write(root, "utility/info.json", r#"{"data": {"name": "info"}, "run": "ping.run"}"#);

        let mut loader = ModuleLoader::new();
        let table = load_commands(&mut loader, root, &catalog());

        assert_eq!(table.names(), vec!["ping", "info"]);
        assert_eq!(table.get("info").unwrap().category.as_deref(), Some("utility"));
        assert_eq!(table.get("ping").unwrap().category, None);
        assert!(table.get("norun").is_none());
    }

    #[test]
    fn test_parse_flags_and_autocomplete() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(
            root,
            "ban.yaml",
            r#"
default:
  data:
    name: ban
    description: Ban someone
  run: ping.run
  autocomplete: ping.complete
  category: moderation
  options:
    dev_only: true
    user_permissions: [BanMembers]
"#,
        );

        let mut loader = ModuleLoader::new();
        let table = load_commands(&mut loader, root, &catalog());
        let ban = table.get("ban").unwrap();
        assert!(ban.is_dev_only());
        assert!(!ban.is_deleted());
        assert!(ban.has_autocomplete());
        assert_eq!(ban.category.as_deref(), Some("moderation"));
        assert!(ban.flags.user_permissions.contains("BanMembers"));
    }

    #[test]
    fn test_unregistered_autocomplete_skips_module() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "a.yaml",
            "data: {name: a}\nrun: ping.run\nautocomplete: nope",
        );
        let mut loader = ModuleLoader::new();
        assert!(load_commands(&mut loader, temp.path(), &catalog()).is_empty());
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.yaml", "data: {name: ping, description: first}\nrun: ping.run");
        write(temp.path(), "b.yaml", "data: {name: ping, description: second}\nrun: ping.run");
        let mut loader = ModuleLoader::new();
        let table = load_commands(&mut loader, temp.path(), &catalog());
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("ping").unwrap().data.description, "first");
    }
}
