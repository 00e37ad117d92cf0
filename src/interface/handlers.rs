//! # Built-in Handlers
//!
//! The callables this binary ships. Module files under `data/` refer to them by id.

use anyhow::Result;
use serde_json::Value;

use crate::application::catalog::{CommandContext, EventContext, HandlerCatalog};
use crate::domain::types::ChainControl;
use crate::strings::messages;

const ECHO_SUGGESTIONS: [&str; 3] = ["hello", "hello world", "help"];

pub fn catalog() -> HandlerCatalog {
    let mut catalog = HandlerCatalog::new();
    catalog
        .command("ping.run", ping)
        .command("echo.run", echo)
        .command("echo.complete", echo_complete)
        .command("whois.run", whois)
        .command("debug.run", debug)
        .event("log.ready", log_ready)
        .event("log.message", log_message)
        .event("filter.bots", filter_bots)
        .validation("guard.guild_only", guild_only);
    catalog
}

async fn ping(ctx: CommandContext) -> Result<()> {
    ctx.interaction.reply(messages::PONG, false).await
}

fn text_option(options: &Value) -> Option<&str> {
    options.get("text").and_then(Value::as_str)
}

async fn echo(ctx: CommandContext) -> Result<()> {
    match text_option(&ctx.interaction.options) {
        Some(text) if !text.trim().is_empty() => ctx.interaction.reply(text, false).await,
        _ => ctx.interaction.reply(messages::ECHO_USAGE, true).await,
    }
}

async fn echo_complete(ctx: CommandContext) -> Result<()> {
    let typed = text_option(&ctx.interaction.options).unwrap_or_default();
    let choices: Vec<String> = ECHO_SUGGESTIONS
        .iter()
        .filter(|choice| choice.starts_with(typed))
        .map(|choice| choice.to_string())
        .collect();
    ctx.interaction.reply(&messages::suggestions(&choices), true).await
}

async fn whois(ctx: CommandContext) -> Result<()> {
    let target = ctx.interaction.options.get("user").and_then(Value::as_str);
    let Some(target) = target else {
        return ctx.interaction.reply(messages::WHOIS_USAGE, true).await;
    };
    let guild = ctx.interaction.guild_id.as_deref().unwrap_or("-");
    ctx.interaction.reply(&messages::whois(target, guild), true).await
}

async fn debug(ctx: CommandContext) -> Result<()> {
    let dump = format!("{:?}\noptions: {}", ctx.interaction, ctx.interaction.options);
    ctx.interaction.reply(&dump, true).await
}

async fn log_ready(ctx: EventContext) -> Result<ChainControl> {
    tracing::info!("Event {} received", ctx.event);
    Ok(ChainControl::Continue)
}

async fn log_message(ctx: EventContext) -> Result<ChainControl> {
    tracing::debug!("Event {}: {}", ctx.event, ctx.payload);
    Ok(ChainControl::Continue)
}

/// Ends the chain for messages written by bots.
async fn filter_bots(ctx: EventContext) -> Result<ChainControl> {
    let from_bot = ctx
        .payload
        .pointer("/author/bot")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(if from_bot { ChainControl::Stop } else { ChainControl::Continue })
}

/// Commands in the `moderation` category only make sense inside a server.
async fn guild_only(ctx: CommandContext) -> Result<ChainControl> {
    if ctx.command.category.as_deref() == Some("moderation") && !ctx.interaction.in_guild_context() {
        return Ok(ChainControl::Reject(messages::GUILD_ONLY.to_string()));
    }
    Ok(ChainControl::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::load_commands;
    use crate::application::events::load_events;
    use crate::application::loader::ModuleLoader;
    use crate::application::validation::load_validations;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn test_catalog_registers_every_handler() {
        let catalog = catalog();
        assert!(catalog.resolve_command("ping.run").is_some());
        assert!(catalog.resolve_command("echo.complete").is_some());
        assert!(catalog.resolve_event("filter.bots").is_some());
        assert!(catalog.resolve_validation("guard.guild_only").is_some());
        assert_eq!(catalog.len(), 9);
    }

    #[tokio::test]
    async fn test_filter_bots_stops_bot_messages() {
        let bot = EventContext {
            event: "messageCreate".into(),
            payload: json!({"author": {"bot": true}}),
        };
        let human = EventContext {
            event: "messageCreate".into(),
            payload: json!({"author": {"bot": false}}),
        };
        assert_eq!(filter_bots(bot).await.unwrap(), ChainControl::Stop);
        assert_eq!(filter_bots(human).await.unwrap(), ChainControl::Continue);
    }

    #[test]
    fn test_shipped_modules_resolve() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let catalog = catalog();
        let mut loader = ModuleLoader::new();

        let commands = load_commands(&mut loader, &root.join("commands"), &catalog);
        assert_eq!(commands.names(), vec!["whois", "debug", "echo", "ping"]);
        assert!(commands.get("echo").unwrap().has_autocomplete());
        assert!(commands.get("debug").unwrap().is_dev_only());

        let events = load_events(&mut loader, &root.join("events"), &catalog);
        let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["messageCreate", "ready"]);
        assert_eq!(events[0].handlers.len(), 2);

        let validations = load_validations(&mut loader, &root.join("validations"), &catalog);
        assert_eq!(validations.len(), 1);
    }
}
