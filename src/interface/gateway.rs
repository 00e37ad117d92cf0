//! # Console Gateway
//!
//! Feeds stdin frames into the runtime. Interactions and events run as their own
//! tasks; reloads are handled in line so later frames see the new collections.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::application::runtime::Runtime;
use crate::domain::error::Category;
use crate::infrastructure::console::{InboundFrame, parse_frame};
use crate::strings::logs;

/// Reads frames until the input closes.
pub async fn run<R>(runtime: Arc<Runtime>, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    tracing::info!("{}", logs::GATEWAY_START);
    let mut lines = input.lines();
    let mut counter = 0u64;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let frame = match parse_frame(line) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("{}", logs::frame_invalid(&format!("{e:#}")));
                continue;
            }
        };

        counter += 1;
        match frame {
            InboundFrame::Interaction(frame) => {
                let interaction = frame.into_interaction(counter);
                let runtime = runtime.clone();
                tokio::spawn(async move {
                    let outcome = runtime.handle_interaction(interaction).await;
                    tracing::debug!("Interaction outcome: {:?}", outcome);
                });
            }
            InboundFrame::Event { name, payload } => {
                let runtime = runtime.clone();
                tokio::spawn(async move {
                    runtime.dispatch_event(&name, payload).await;
                });
            }
            InboundFrame::Reload { category, scope } => {
                let result = match category {
                    Category::Commands => runtime.reload_commands(scope).await.map(|report| report.remote_calls()),
                    Category::Events => runtime.reload_events().await,
                    Category::Validations => runtime.reload_validations().await,
                };
                match result {
                    Ok(count) => tracing::info!("Reloaded {}: {}", category, count),
                    Err(e) => tracing::warn!("{}", logs::reload_rejected(&category.to_string(), &e.to_string())),
                }
            }
        }
    }

    tracing::info!("{}", logs::GATEWAY_CLOSED);
    Ok(())
}
