//! # Messages
//!
//! User-facing replies sent back through interactions.

pub const DEV_GUILD_ONLY: &str = "🚫 This command is for development servers only.";
pub const DEV_USER_ONLY: &str = "🚫 This command is for developers only.";
pub const COMMAND_FAILED: &str = "❌ Something went wrong while running this command.";
pub const GUILD_ONLY: &str = "🚫 This command only works inside a server.";
pub const PONG: &str = "🏓 Pong!";
pub const ECHO_USAGE: &str = "Usage: /echo text:<message>";
pub const WHOIS_USAGE: &str = "Usage: /whois user:<member>";

pub fn whois(user: &str, guild: &str) -> String {
    format!("👤 Member {user} in server {guild}")
}

pub fn suggestions(choices: &[String]) -> String {
    format!("Suggestions: {}", choices.join(", "))
}

pub fn missing_user_permissions(missing: &[String]) -> String {
    format!("🚫 You are missing permissions: {}", missing.join(", "))
}

pub fn missing_bot_permissions(missing: &[String]) -> String {
    format!("🚫 I am missing permissions: {}", missing.join(", "))
}
