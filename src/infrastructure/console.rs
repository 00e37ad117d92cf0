//! # Console Adapter
//!
//! A line-oriented stand-in for the platform gateway. Each stdin line is one JSON
//! frame: an interaction, an event, or a reload request. Replies go to stdout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::domain::error::Category;
use crate::domain::traits::InteractionResponder;
use crate::domain::types::{Interaction, InteractionKind, PermissionSet, ReloadScope};

/// Prints replies for one interaction to stdout.
pub struct ConsoleResponder {
    interaction_id: String,
}

impl ConsoleResponder {
    pub fn new(interaction_id: impl Into<String>) -> Self {
        Self {
            interaction_id: interaction_id.into(),
        }
    }
}

#[async_trait]
impl InteractionResponder for ConsoleResponder {
    async fn reply(&self, content: &str, ephemeral: bool) -> Result<()> {
        let visibility = if ephemeral { " (ephemeral)" } else { "" };
        println!("[{}]{visibility} {content}", self.interaction_id);
        Ok(())
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct InteractionFrame {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: InteractionKind,
    pub command: String,
    pub user_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub member_permissions: PermissionSet,
    #[serde(default)]
    pub app_permissions: PermissionSet,
    #[serde(default)]
    pub options: Value,
}

fn default_kind() -> InteractionKind {
    InteractionKind::Command
}

impl InteractionFrame {
    pub fn into_interaction(self, fallback_id: u64) -> Interaction {
        let id = self.id.unwrap_or_else(|| fallback_id.to_string());
        let responder = Arc::new(ConsoleResponder::new(id.clone()));
        let mut interaction = Interaction::new(self.kind, self.command, self.user_id, responder)
            .with_id(id)
            .with_roles(self.roles)
            .with_options(self.options);
        if let Some(guild) = self.guild_id {
            interaction = interaction.in_guild(guild, self.member_permissions, self.app_permissions);
        }
        interaction
    }
}

/// One line of gateway input.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    Interaction(InteractionFrame),
    Event {
        name: String,
        #[serde(default)]
        payload: Value,
    },
    Reload {
        category: Category,
        #[serde(default)]
        scope: ReloadScope,
    },
}

pub fn parse_frame(line: &str) -> Result<InboundFrame> {
    serde_json::from_str(line).context("Failed to parse frame")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_interaction_frame() {
        let frame = parse_frame(
            r#"{"type": "interaction", "command": "ban", "user_id": "7", "guild_id": "g1",
                "member_permissions": ["BanMembers"], "options": {"user": "9"}}"#,
        )
        .unwrap();
        let InboundFrame::Interaction(frame) = frame else {
            panic!("expected interaction frame");
        };
        assert_eq!(frame.kind, InteractionKind::Command);

        let interaction = frame.into_interaction(5);
        assert_eq!(interaction.id, "5");
        assert_eq!(interaction.guild_id.as_deref(), Some("g1"));
        assert!(interaction.member_permissions.unwrap().contains("BanMembers"));
        assert_eq!(interaction.options, json!({"user": "9"}));
    }

    #[test]
    fn test_parse_event_and_reload_frames() {
        assert_eq!(
            parse_frame(r#"{"type": "event", "name": "ready"}"#).unwrap(),
            InboundFrame::Event {
                name: "ready".into(),
                payload: Value::Null
            }
        );
        assert_eq!(
            parse_frame(r#"{"type": "reload", "category": "commands", "scope": "dev"}"#).unwrap(),
            InboundFrame::Reload {
                category: Category::Commands,
                scope: ReloadScope::Dev
            }
        );
    }

    #[test]
    fn test_dm_interaction_has_no_guild_permissions() {
        let frame = parse_frame(r#"{"type": "interaction", "kind": "autocomplete", "command": "echo", "user_id": "1"}"#)
            .unwrap();
        let InboundFrame::Interaction(frame) = frame else {
            panic!("expected interaction frame");
        };
        let interaction = frame.into_interaction(1);
        assert!(interaction.is_autocomplete());
        assert!(!interaction.in_guild_context());
        assert!(interaction.member_permissions.is_none());
    }

    #[test]
    fn test_malformed_frame_is_an_error() {
        assert!(parse_frame("not json").is_err());
        assert!(parse_frame(r#"{"type": "unknown"}"#).is_err());
    }
}
