//! # Domain Types
//!
//! Data structures shared by the loaders, the registry, and the orchestrator:
//! command schemas as the platform sees them, remote snapshots, interactions,
//! and the control value handlers use to steer a chain.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::domain::traits::InteractionResponder;

/// Declarative schema of a command, sent verbatim to the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    /// Platform metadata this runtime does not interpret (permissions, contexts, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CommandData {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }
}

/// A single command option (argument or subcommand).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub autocomplete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CommandOption {
    /// Option type code for a plain string argument.
    pub const STRING: u8 = 3;

    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: u8) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
            autocomplete: false,
            choices: Vec::new(),
            options: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionChoice {
    pub name: String,
    pub value: Value,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Behavioural flags declared next to a command's schema.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CommandFlags {
    #[serde(default, alias = "devOnly")]
    pub dev_only: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, alias = "userPermissions")]
    pub user_permissions: PermissionSet,
    #[serde(default, alias = "botPermissions")]
    pub bot_permissions: PermissionSet,
}

/// A set of named platform permissions (e.g. `ManageMessages`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(permissions.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    /// Entries of `required` this set does not hold, in sorted order.
    pub fn missing(&self, required: &PermissionSet) -> Vec<String> {
        required.0.difference(&self.0).cloned().collect()
    }
}

/// Audience boundary for a registered command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Guild(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Guild(id) => write!(f, "guild:{id}"),
        }
    }
}

/// A command as the platform currently has it registered.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteCommand {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

/// How the command set is pushed to the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Replace every registered command in one call per scope.
    Full,
    /// Diff against the registered commands and create/edit/delete individually.
    #[default]
    Incremental,
}

/// How a local command is compared with its remote counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// Description text and option count only.
    #[default]
    Shallow,
    /// Description text and full option equality.
    Deep,
}

/// Which command group a sync pass touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadScope {
    #[default]
    All,
    Dev,
    Global,
}

impl ReloadScope {
    pub fn includes_dev(self) -> bool {
        matches!(self, Self::All | Self::Dev)
    }

    pub fn includes_global(self) -> bool {
        matches!(self, Self::All | Self::Global)
    }
}

/// What a handler asks the surrounding chain to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainControl {
    /// Let the next handler run.
    Continue,
    /// Stop the chain; the handler has dealt with the input.
    Stop,
    /// Stop the chain and report the reason to the user.
    Reject(String),
}

impl ChainControl {
    pub fn is_stop(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Command,
    Autocomplete,
}

/// An inbound command interaction. Only `command_name` and `kind` matter for
/// routing; the rest is available to validations and handlers.
#[derive(Clone)]
pub struct Interaction {
    pub id: String,
    pub kind: InteractionKind,
    pub command_name: String,
    pub user_id: String,
    pub guild_id: Option<String>,
    pub member_roles: Vec<String>,
    pub member_permissions: Option<PermissionSet>,
    pub app_permissions: Option<PermissionSet>,
    pub options: Value,
    responder: Arc<dyn InteractionResponder>,
}

impl Interaction {
    pub fn new(
        kind: InteractionKind,
        command_name: impl Into<String>,
        user_id: impl Into<String>,
        responder: Arc<dyn InteractionResponder>,
    ) -> Self {
        Self {
            id: String::new(),
            kind,
            command_name: command_name.into(),
            user_id: user_id.into(),
            guild_id: None,
            member_roles: Vec::new(),
            member_permissions: None,
            app_permissions: None,
            options: Value::Null,
            responder,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Places the interaction inside a guild with the member's and the bot's permissions.
    pub fn in_guild(
        mut self,
        guild_id: impl Into<String>,
        member_permissions: PermissionSet,
        app_permissions: PermissionSet,
    ) -> Self {
        self.guild_id = Some(guild_id.into());
        self.member_permissions = Some(member_permissions);
        self.app_permissions = Some(app_permissions);
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.member_roles = roles;
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn is_autocomplete(&self) -> bool {
        self.kind == InteractionKind::Autocomplete
    }

    pub fn in_guild_context(&self) -> bool {
        self.guild_id.is_some()
    }

    /// Sends a response to whoever triggered the interaction.
    pub async fn reply(&self, content: &str, ephemeral: bool) -> anyhow::Result<()> {
        self.responder.reply(content, ephemeral).await
    }
}

impl fmt::Debug for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("command_name", &self.command_name)
            .field("user_id", &self.user_id)
            .field("guild_id", &self.guild_id)
            .finish_non_exhaustive()
    }
}
