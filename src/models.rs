use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display format for commit and refresh dates
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

// --- GitHub wire types ---

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubRepository {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub default_branch: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubCommitAuthor {
    pub name: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubCommitData {
    pub message: String,
    pub author: GithubCommitAuthor,
}

/// Element of `GET /repos/{owner}/{repo}/commits`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubCommitSummary {
    pub sha: String,
    pub commit: GithubCommitData,
}

/// `GET /repos/{owner}/{repo}/commits/{ref}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubCommitDetail {
    pub sha: String,
    pub commit: GithubCommitData,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

/// `GET /repos/{owner}/{repo}/contents/{path}` for a file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub path: String,
    pub size: usize,
    pub encoding: Option<String>,
    pub content: Option<String>,
}

// --- Domain values ---

#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryInfo {
    pub name: String,
    pub description: Option<String>,
    pub default_branch: String,
    pub last_refreshed: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FileChange {
    pub filename: String,
    pub status: FileStatus,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
    // Absent for binary files and very large diffs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: DateTime<Utc>,
    pub files: Vec<FileChange>,
}

impl CommitRecord {
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }

    pub fn formatted_date(&self) -> String {
        self.date.format(DISPLAY_DATE_FORMAT).to_string()
    }
}

impl From<GithubCommitDetail> for CommitRecord {
    fn from(detail: GithubCommitDetail) -> Self {
        Self {
            sha: detail.sha,
            message: detail.commit.message,
            author: detail.commit.author.name,
            date: detail.commit.author.date,
            files: detail.files,
        }
    }
}

// --- Discord wire types ---

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscordMessage {
    pub id: String,
    pub channel_id: String,
    pub author: DiscordUser,
    #[serde(default)]
    pub content: String,
}

impl DiscordMessage {
    /// Snowflake ids grow with time; unparsable ids sort first
    pub fn snowflake(&self) -> u64 {
        self.id.parse().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InteractionOption {
    pub name: String,
    #[serde(rename = "type")]
    pub option_type: u8,
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InteractionData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
}

impl InteractionData {
    pub fn string_option(&self, name: &str) -> Option<String> {
        self.options
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_ref())
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Interaction {
    pub id: String,
    pub application_id: String,
    #[serde(rename = "type")]
    pub interaction_type: u8,
    pub token: String,
    pub channel_id: Option<String>,
    pub data: Option<InteractionData>,
}

// --- OpenAI wire types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One entry of the prompt sent to the completion API
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConversationMessage {
    pub role: ChatRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: String,
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            name: None,
            content: content.into(),
        }
    }

    pub fn user(name: Option<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            name,
            content: content.into(),
        }
    }

    pub fn assistant(name: Option<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            name,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIChatRequest {
    pub model: String,
    pub messages: Vec<ConversationMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIResponseMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIChatChoice {
    pub index: u32,
    pub message: OpenAIResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: Option<u32>,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIChatResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<OpenAIChatChoice>,
    pub usage: Option<OpenAIUsage>,
}
