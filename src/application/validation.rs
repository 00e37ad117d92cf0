//! # Validation Pipeline
//!
//! Guards that run before a command handler. The built-in developer and permission
//! checks go first, then user validations in discovery order. The first check that
//! does not return `Continue` vetoes the invocation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::catalog::{CommandContext, HandlerCatalog, ValidationFn, handler_ref, validation_fn};
use crate::application::loader::ModuleLoader;
use crate::domain::config::RuntimeConfig;
use crate::domain::types::ChainControl;
use crate::strings::{logs, messages};

/// Who counts as a developer, and where development commands may run.
#[derive(Debug, Clone, Default)]
pub struct DevAccess {
    pub guild_ids: Vec<String>,
    pub user_ids: Vec<String>,
    pub role_ids: Vec<String>,
}

impl DevAccess {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            guild_ids: config.dev_guild_ids.clone(),
            user_ids: config.dev_user_ids.clone(),
            role_ids: config.dev_role_ids.clone(),
        }
    }

    fn is_developer(&self, user_id: &str, roles: &[String]) -> bool {
        self.user_ids.iter().any(|id| id == user_id) || roles.iter().any(|r| self.role_ids.contains(r))
    }
}

/// One check in the pipeline.
#[derive(Clone)]
pub struct Validation {
    pub id: String,
    pub path: PathBuf,
    /// Whether the check also runs for autocomplete interactions.
    pub autocomplete: bool,
    check: ValidationFn,
}

impl Validation {
    pub fn new(id: impl Into<String>, check: ValidationFn) -> Self {
        Self {
            id: id.into(),
            path: PathBuf::new(),
            autocomplete: false,
            check,
        }
    }

    pub fn autocomplete_aware(mut self) -> Self {
        self.autocomplete = true;
        self
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validation")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("autocomplete", &self.autocomplete)
            .finish_non_exhaustive()
    }
}

/// Rejects `dev_only` commands outside dev guilds or from non-developers.
pub fn dev_only_check(access: DevAccess) -> Validation {
    let access = Arc::new(access);
    let check = validation_fn(move |ctx: CommandContext| {
        let access = access.clone();
        async move {
            if !ctx.command.is_dev_only() {
                return Ok(ChainControl::Continue);
            }
            let interaction = &ctx.interaction;
            if let Some(guild_id) = &interaction.guild_id {
                if !access.guild_ids.contains(guild_id) {
                    return Ok(ChainControl::Reject(messages::DEV_GUILD_ONLY.to_string()));
                }
            }
            if !access.is_developer(&interaction.user_id, &interaction.member_roles) {
                return Ok(ChainControl::Reject(messages::DEV_USER_ONLY.to_string()));
            }
            Ok(ChainControl::Continue)
        }
    });
    Validation::new("builtin.dev_only", check)
}

/// Inside a guild, requires the member and the bot to hold the command's permissions.
pub fn permission_check() -> Validation {
    let check = validation_fn(|ctx: CommandContext| async move {
        let interaction = &ctx.interaction;
        if !interaction.in_guild_context() {
            return Ok(ChainControl::Continue);
        }
        let flags = &ctx.command.flags;

        let member = interaction.member_permissions.clone().unwrap_or_default();
        let missing = member.missing(&flags.user_permissions);
        if !missing.is_empty() {
            return Ok(ChainControl::Reject(messages::missing_user_permissions(&missing)));
        }

        let app = interaction.app_permissions.clone().unwrap_or_default();
        let missing = app.missing(&flags.bot_permissions);
        if !missing.is_empty() {
            return Ok(ChainControl::Reject(messages::missing_bot_permissions(&missing)));
        }
        Ok(ChainControl::Continue)
    });
    Validation::new("builtin.permissions", check)
}

#[derive(Debug, Default)]
pub struct ValidationPipeline {
    checks: Vec<Validation>,
}

impl ValidationPipeline {
    /// Built-in checks (unless `access` is `None`) followed by `user` in order.
    pub fn new(access: Option<DevAccess>, user: Vec<Validation>) -> Self {
        let mut checks = Vec::with_capacity(user.len() + 2);
        if let Some(access) = access {
            checks.push(dev_only_check(access));
            checks.push(permission_check());
        }
        checks.extend(user);
        Self { checks }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.id.as_str()).collect()
    }

    /// Returns `true` when the command may run. A rejecting check's reason is sent
    /// back to the user as an ephemeral reply; a failing check vetoes.
    pub async fn run(&self, ctx: &CommandContext) -> bool {
        let autocomplete = ctx.interaction.is_autocomplete();
        let command = ctx.command.name();

        for validation in &self.checks {
            if autocomplete && !validation.autocomplete {
                continue;
            }

            let reason = match (validation.check)(ctx.clone()).await {
                Ok(ChainControl::Continue) => continue,
                Ok(ChainControl::Stop) => None,
                Ok(ChainControl::Reject(reason)) => Some(reason),
                Err(e) => {
                    tracing::error!("{}", logs::validation_fail(&validation.id, command, &format!("{e:#}")));
                    Some(messages::COMMAND_FAILED.to_string())
                }
            };

            if let Some(reason) = reason {
                tracing::debug!("{}", logs::validation_rejected(&validation.id, command, &reason));
                if !autocomplete {
                    if let Err(e) = ctx.interaction.reply(&reason, true).await {
                        tracing::warn!("{}", logs::reply_fail(&format!("{e:#}")));
                    }
                }
            }
            return false;
        }
        true
    }
}

/// Loads every validation module under `root`, in discovery order.
pub fn load_validations(loader: &mut ModuleLoader, root: &Path, catalog: &HandlerCatalog) -> Vec<Validation> {
    let mut validations = Vec::new();
    for module in loader.load_all(root, true) {
        let path = module.path.display().to_string();
        let Some(id) = handler_ref(&module.export, "handler") else {
            tracing::warn!("{}", logs::validation_skipped(&path, "export is not a handler reference"));
            continue;
        };
        let Some(check) = catalog.resolve_validation(id) else {
            tracing::warn!("{}", logs::validation_skipped(&path, &format!("handler `{id}` is not registered")));
            continue;
        };
        let autocomplete = module
            .export
            .get("autocomplete")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        validations.push(Validation {
            id: id.to_string(),
            path: module.path.clone(),
            autocomplete,
            check,
        });
    }
    tracing::info!("{}", logs::validations_loaded(validations.len()));
    validations
}
