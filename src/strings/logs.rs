// Startup

pub fn config_loaded(path: &str) -> String {
    format!("Loaded configuration from {path}")
}

pub const DRY_RUN: &str = "Dry run: commands are synchronized against an in-memory platform";

pub fn platform_connected(application_id: &str) -> String {
    format!("Connected to platform as application {application_id}")
}

pub fn platform_connect_fail(err: &str) -> String {
    format!("Failed to connect to platform: {err}")
}

pub const GATEWAY_START: &str = "Reading interactions from stdin (one JSON frame per line)...";
pub const GATEWAY_CLOSED: &str = "Input closed";
pub const SHUTDOWN: &str = "Shutting down...";

pub fn shutdown_fail(err: &str) -> String {
    format!("Unable to listen for shutdown signal: {err}")
}

pub fn frame_invalid(err: &str) -> String {
    format!("Ignoring malformed frame: {err}")
}

// Phases

pub fn phase_entered(phase: &str) -> String {
    format!("Runtime phase: {phase}")
}

pub fn phase_skipped(category: &str) -> String {
    format!("No {category} path configured, skipping")
}

pub fn runtime_ready(commands: usize, events: usize, validations: usize) -> String {
    format!("Runtime ready: {commands} commands, {events} events, {validations} validations")
}

pub fn reload_rejected(category: &str, err: &str) -> String {
    format!("Reload of {category} rejected: {err}")
}

// Modules

pub fn module_load_fail(err: &str) -> String {
    format!("Skipping module: {err}")
}

pub fn command_skipped(path: &str, reason: &str) -> String {
    format!("Skipping command module {path}: {reason}")
}

pub fn duplicate_command(name: &str, path: &str) -> String {
    format!("Duplicate command name '{name}' in {path}, keeping the first definition")
}

pub fn commands_loaded(count: usize) -> String {
    format!("Loaded {count} commands")
}

pub fn event_skipped(path: &str, reason: &str) -> String {
    format!("Skipping event module {path}: {reason}")
}

pub fn events_loaded(count: usize) -> String {
    format!("Loaded {count} events")
}

pub fn validation_skipped(path: &str, reason: &str) -> String {
    format!("Skipping validation module {path}: {reason}")
}

pub fn validations_loaded(count: usize) -> String {
    format!("Loaded {count} validations")
}

// Dispatch

pub fn event_handler_fail(event: &str, handler: &str, err: &str) -> String {
    format!("Event handler {handler} for {event} failed: {err}")
}

pub fn validation_fail(validation: &str, command: &str, err: &str) -> String {
    format!("Validation {validation} failed on /{command}: {err}")
}

pub fn validation_rejected(validation: &str, command: &str, reason: &str) -> String {
    format!("Validation {validation} rejected /{command}: {reason}")
}

pub fn reply_fail(err: &str) -> String {
    format!("Failed to reply to interaction: {err}")
}

pub fn unknown_command(name: &str) -> String {
    format!("Interaction for unknown command /{name}")
}

pub fn command_fail(name: &str, err: &str) -> String {
    format!("Command /{name} failed: {err}")
}

pub fn autocomplete_fail(name: &str, err: &str) -> String {
    format!("Autocomplete for /{name} failed: {err}")
}

// Synchronization

pub const NO_DEV_GUILDS: &str =
    "Development commands exist but no dev_guild_ids are configured; they will not be registered";

pub fn bulk_registered(count: usize, scope: &str) -> String {
    format!("Registered {count} commands in {scope}")
}

pub fn bulk_register_fail(scope: &str, err: &str) -> String {
    format!("Failed to register commands in {scope}: {err}")
}

pub fn fetch_fail(scope: &str, err: &str) -> String {
    format!("Failed to fetch registered commands in {scope}: {err}")
}

pub fn delete_skipped(name: &str, scope: &str) -> String {
    format!("Command '{name}' is marked deleted in {scope} but was never registered, skipping")
}

pub fn command_deleted(name: &str, scope: &str) -> String {
    format!("Deleted command '{name}' from {scope}")
}

pub fn command_edited(name: &str, scope: &str) -> String {
    format!("Edited command '{name}' in {scope}")
}

pub fn command_created(name: &str, scope: &str) -> String {
    format!("Created command '{name}' in {scope}")
}

pub fn sync_call_fail(action: &str, name: &str, scope: &str, err: &str) -> String {
    format!("Failed to {action} command '{name}' in {scope}: {err}")
}

pub fn sync_summary(created: usize, edited: usize, deleted: usize, failed: usize) -> String {
    format!("Sync finished: {created} created, {edited} edited, {deleted} deleted, {failed} failed")
}

// Platform

pub fn request_retry(status: &str, attempt: u32, delay_ms: u64) -> String {
    format!("Platform returned {status}, retrying (attempt {attempt}) in {delay_ms}ms")
}
