use crate::config::AppSettings;
use crate::github::parse_base_url;
use crate::models::{DiscordMessage, DiscordUser};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

/// Discord rejects message content longer than this
pub const MESSAGE_CHAR_LIMIT: usize = 2000;

#[derive(Error, Debug)]
pub enum DiscordError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Discord API error: {status} - {body}")]
    Api { status: StatusCode, body: String },
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Failed to deserialize response: {0}")]
    Deserialization(reqwest::Error),
    #[error("Slash commands require an application id")]
    MissingApplicationId,
}

/// Window of channel history to fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub before: Option<String>,
    pub after: Option<String>,
    pub limit: u8,
}

impl MessageQuery {
    pub fn before(message_id: &str, limit: u8) -> Self {
        Self {
            before: Some(message_id.to_string()),
            after: None,
            limit,
        }
    }

    pub fn after(message_id: Option<&str>, limit: u8) -> Self {
        Self {
            before: None,
            after: message_id.map(str::to_string),
            limit,
        }
    }
}

/// Outbound operations the bot needs from the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send_typing(&self, channel_id: &str) -> Result<(), DiscordError>;

    /// Messages matching `query`, newest first
    async fn fetch_messages(
        &self,
        channel_id: &str,
        query: &MessageQuery,
    ) -> Result<Vec<DiscordMessage>, DiscordError>;

    async fn reply(&self, channel_id: &str, message_id: &str, content: &str) -> Result<(), DiscordError>;

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), DiscordError>;

    async fn edit_original_response(&self, interaction_token: &str, content: &str) -> Result<(), DiscordError>;

    async fn create_followup(&self, interaction_token: &str, content: &str) -> Result<(), DiscordError>;
}

#[derive(Debug)]
pub struct DiscordApiClient {
    client: Client,
    base_url: Url,
    token: String,
    application_id: Option<String>,
}

impl DiscordApiClient {
    pub fn new(settings: &AppSettings) -> Result<Self, DiscordError> {
        Ok(Self {
            client: Client::new(),
            base_url: parse_base_url(&settings.discord_api_url)?,
            token: settings.discord_token.clone(),
            application_id: settings.discord_application_id.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, DiscordError> {
        let url = self.base_url.join(path)?;
        debug!("Discord {} {}", method, url);
        Ok(self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bot {}", self.token)))
    }

    fn application_id(&self) -> Result<&str, DiscordError> {
        self.application_id
            .as_deref()
            .ok_or(DiscordError::MissingApplicationId)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response, DiscordError> {
        let response = request.send().await.map_err(DiscordError::Request)?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
            error!("Discord API Error: {} - {}", status, body);
            return Err(DiscordError::Api { status, body });
        }
        Ok(response)
    }

    async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DiscordError> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(DiscordError::Deserialization)
    }

    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<DiscordUser, DiscordError> {
        let request = self.request(Method::GET, "users/@me")?;
        self.execute_json(request).await
    }

    /// Replaces the global command set of the application
    #[instrument(skip(self, commands))]
    pub async fn register_commands(&self, commands: &Value) -> Result<(), DiscordError> {
        let path = format!("applications/{}/commands", self.application_id()?);
        let request = self.request(Method::PUT, &path)?.json(commands);
        self.execute(request).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for DiscordApiClient {
    async fn send_typing(&self, channel_id: &str) -> Result<(), DiscordError> {
        let request = self.request(Method::POST, &format!("channels/{}/typing", channel_id))?;
        self.execute(request).await?;
        Ok(())
    }

    async fn fetch_messages(
        &self,
        channel_id: &str,
        query: &MessageQuery,
    ) -> Result<Vec<DiscordMessage>, DiscordError> {
        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(before) = &query.before {
            params.push(("before", before.clone()));
        }
        if let Some(after) = &query.after {
            params.push(("after", after.clone()));
        }
        let request = self
            .request(Method::GET, &format!("channels/{}/messages", channel_id))?
            .query(&params);
        self.execute_json(request).await
    }

    async fn reply(&self, channel_id: &str, message_id: &str, content: &str) -> Result<(), DiscordError> {
        let body = json!({
            "content": content,
            "message_reference": { "message_id": message_id, "fail_if_not_exists": false },
        });
        let request = self
            .request(Method::POST, &format!("channels/{}/messages", channel_id))?
            .json(&body);
        self.execute(request).await?;
        Ok(())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), DiscordError> {
        let request = self
            .request(Method::POST, &format!("channels/{}/messages", channel_id))?
            .json(&json!({ "content": content }));
        self.execute(request).await?;
        Ok(())
    }

    async fn edit_original_response(&self, interaction_token: &str, content: &str) -> Result<(), DiscordError> {
        let path = format!(
            "webhooks/{}/{}/messages/@original",
            self.application_id()?,
            interaction_token
        );
        let request = self
            .request(Method::PATCH, &path)?
            .json(&json!({ "content": content }));
        self.execute(request).await?;
        Ok(())
    }

    async fn create_followup(&self, interaction_token: &str, content: &str) -> Result<(), DiscordError> {
        let path = format!("webhooks/{}/{}", self.application_id()?, interaction_token);
        let request = self
            .request(Method::POST, &path)?
            .json(&json!({ "content": content }));
        self.execute(request).await?;
        Ok(())
    }
}
