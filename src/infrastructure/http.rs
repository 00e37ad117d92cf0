//! # HTTP Platform
//!
//! `CommandPlatform` over the platform's REST application-commands API.
//! Global commands live at `/applications/{app}/commands`, guild commands at
//! `/applications/{app}/guilds/{guild}/commands`.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::Serialize;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::domain::config::PlatformConfig;
use crate::domain::traits::CommandPlatform;
use crate::domain::types::{CommandData, RemoteCommand, Scope};
use crate::infrastructure::retry::{RequestError, RetryPolicy};
use crate::strings::logs;

#[derive(Debug, Deserialize)]
struct Application {
    id: String,
}

pub struct HttpPlatform {
    client: Client,
    api_base: String,
    token: String,
    application_id: RwLock<String>,
    retry: RetryPolicy,
    ready: AtomicBool,
}

impl HttpPlatform {
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        let token = config.resolve_token()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
            application_id: RwLock::new(config.application_id.clone()),
            retry: RetryPolicy::from_config(config),
            ready: AtomicBool::new(false),
        })
    }

    /// Verifies the token against the platform and learns the application id when
    /// none was configured. The platform is ready once this succeeds.
    pub async fn connect(&self) -> Result<String> {
        let url = format!("{}/applications/@me", self.api_base);
        let response = self.send(Method::GET, &url, None::<&()>).await?;
        let application: Application = response
            .json()
            .await
            .context("Failed to decode application")?;

        let mut configured = self.application_id.write().unwrap_or_else(|p| p.into_inner());
        if configured.is_empty() {
            *configured = application.id.clone();
        } else if *configured != application.id {
            bail!(
                "Token belongs to application {}, configured application_id is {}",
                application.id,
                configured
            );
        }
        drop(configured);

        self.ready.store(true, Ordering::SeqCst);
        tracing::info!("{}", logs::platform_connected(&application.id));
        Ok(application.id)
    }

    fn application_id(&self) -> String {
        self.application_id.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn commands_url(&self, scope: &Scope) -> String {
        let app = self.application_id();
        match scope {
            Scope::Global => format!("{}/applications/{app}/commands", self.api_base),
            Scope::Guild(guild) => format!("{}/applications/{app}/guilds/{guild}/commands", self.api_base),
        }
    }

    fn command_url(&self, scope: &Scope, id: &str) -> String {
        format!("{}/{id}", self.commands_url(scope))
    }

    fn request<B: Serialize + ?Sized>(&self, method: Method, url: &str, body: Option<&B>) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bot {}", self.token));
        match body {
            Some(body) => request.json(body),
            None => request,
        }
    }

    async fn send<B: Serialize + ?Sized>(&self, method: Method, url: &str, body: Option<&B>) -> Result<Response> {
        let label = format!("{method} {url}");
        self.retry
            .execute(&label, || {
                let request = self.request(method.clone(), url, body);
                async move {
                    let response = request.send().await.map_err(|e| RequestError::Transport {
                        retryable: e.is_timeout() || e.is_connect() || e.is_request(),
                        message: e.to_string(),
                    })?;
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let retry_after_ms = retry_after_ms(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    Err(RequestError::Status {
                        status: status.as_u16(),
                        body,
                        retry_after_ms,
                    })
                }
            })
            .await
    }
}

/// `Retry-After` in seconds (possibly fractional) converted to milliseconds.
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let seconds: f64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| (seconds * 1000.0).ceil() as u64)
}

#[async_trait]
impl CommandPlatform for HttpPlatform {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn fetch_commands(&self, scope: &Scope) -> Result<Vec<RemoteCommand>> {
        let response = self.send(Method::GET, &self.commands_url(scope), None::<&()>).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to decode commands for {scope}"))
    }

    async fn overwrite_commands(&self, scope: &Scope, commands: &[CommandData]) -> Result<()> {
        self.send(Method::PUT, &self.commands_url(scope), Some(commands)).await?;
        Ok(())
    }

    async fn create_command(&self, scope: &Scope, command: &CommandData) -> Result<()> {
        self.send(Method::POST, &self.commands_url(scope), Some(command)).await?;
        Ok(())
    }

    async fn edit_command(&self, scope: &Scope, id: &str, command: &CommandData) -> Result<()> {
        self.send(Method::PATCH, &self.command_url(scope, id), Some(command)).await?;
        Ok(())
    }

    async fn delete_command(&self, scope: &Scope, id: &str) -> Result<()> {
        self.send(Method::DELETE, &self.command_url(scope, id), None::<&()>).await?;
        Ok(())
    }
}
