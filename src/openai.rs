use crate::config::AppSettings;
use crate::github::parse_base_url;
use crate::models::{ConversationMessage, OpenAIChatRequest, OpenAIChatResponse};
use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

pub const OPENAI_CHAT_COMPLETIONS_PATH: &str = "chat/completions";

#[derive(Error, Debug)]
pub enum OpenAIError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {body}")]
    Api { status: StatusCode, body: String },
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Failed to deserialize response: {0}")]
    Deserialization(reqwest::Error),
    #[error("No response choices from OpenAI")]
    NoChoicesReturned,
    #[error("LLM response content is empty")]
    EmptyContent,
}

#[derive(Debug)]
pub struct OpenAIApiClient {
    client: Client,
    completions_url: Url,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAIApiClient {
    pub fn new(settings: &AppSettings) -> Result<Self, OpenAIError> {
        let completions_url =
            parse_base_url(&settings.openai_custom_url)?.join(OPENAI_CHAT_COMPLETIONS_PATH)?;
        Ok(Self {
            client: Client::new(),
            completions_url,
            api_key: settings.openai_api_key.clone(),
            model: settings.openai_model.clone(),
            temperature: settings.openai_temperature,
        })
    }

    #[instrument(skip(self, request_payload), fields(model = %request_payload.model))]
    pub async fn send_chat_completion(
        &self,
        request_payload: &OpenAIChatRequest,
    ) -> Result<OpenAIChatResponse, OpenAIError> {
        debug!("Sending chat completion request to: {}", self.completions_url);
        debug!("Request has {} messages", request_payload.messages.len());

        let response = self
            .client
            .post(self.completions_url.clone())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(request_payload)
            .send()
            .await
            .map_err(OpenAIError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
            error!("OpenAI API Error: {} - {}", status, body);
            return Err(OpenAIError::Api { status, body });
        }

        response
            .json::<OpenAIChatResponse>()
            .await
            .map_err(OpenAIError::Deserialization)
    }

    /// Sends `messages` with the configured model and returns the first choice's text
    pub async fn complete(&self, messages: Vec<ConversationMessage>) -> Result<String, OpenAIError> {
        let request = OpenAIChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
        };
        let response = self.send_chat_completion(&request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                total_tokens = usage.total_tokens,
                "Completion usage"
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(OpenAIError::NoChoicesReturned)?;
        match choice.message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(OpenAIError::EmptyContent),
        }
    }
}
