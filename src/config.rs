use clap::{ArgAction, Parser};
use std::fmt::Debug;

#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "A Discord bot that answers questions about a GitHub repository using AI"
)]
pub struct AppSettings {
    /// Discord bot token
    #[arg(long, env = "GITBOT_DISCORD_TOKEN")]
    pub discord_token: String,

    /// Discord application ID (required for slash commands)
    #[arg(long, env = "GITBOT_DISCORD_APPLICATION_ID")]
    pub discord_application_id: Option<String>,

    /// Hex-encoded Ed25519 public key of the Discord application
    #[arg(long, env = "GITBOT_DISCORD_PUBLIC_KEY", default_value = "")]
    pub discord_public_key: String,

    /// Discord REST API base URL
    #[arg(
        long,
        env = "GITBOT_DISCORD_API_URL",
        default_value = "https://discord.com/api/v10"
    )]
    pub discord_api_url: String,

    /// Comma-separated list of channel IDs the bot listens to
    #[arg(long, env = "GITBOT_CHANNELS", value_delimiter = ',')]
    pub channels: Vec<String>,

    /// Messages starting with this prefix are ignored
    #[arg(long, env = "GITBOT_IGNORE_PREFIX", default_value = "!")]
    pub ignore_prefix: String,

    /// Number of previous channel messages included as conversation history
    #[arg(long, env = "GITBOT_HISTORY_LIMIT", default_value_t = 10)]
    pub history_limit: u8,

    /// How often to poll channels for new messages (in seconds)
    #[arg(long, env = "GITBOT_POLL_INTERVAL_SECONDS", default_value_t = 3)]
    pub poll_interval_seconds: u64,

    /// How often the typing indicator is refreshed while a reply is prepared (in seconds)
    #[arg(long, env = "GITBOT_TYPING_INTERVAL_SECONDS", default_value_t = 5)]
    pub typing_interval_seconds: u64,

    /// Register slash commands with Discord on startup
    #[arg(long, env = "GITBOT_REGISTER_COMMANDS", default_value_t = true, action = ArgAction::Set)]
    pub register_commands: bool,

    /// GitHub REST API base URL
    #[arg(long, env = "GITBOT_GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// GitHub API token
    #[arg(long, env = "GITBOT_GITHUB_TOKEN")]
    pub github_token: String,

    /// Owner (user or organisation) of the tracked repository
    #[arg(long, env = "GITBOT_GITHUB_OWNER")]
    pub github_owner: String,

    /// Name of the tracked repository
    #[arg(long, env = "GITBOT_GITHUB_REPO")]
    pub github_repo: String,

    /// Branch used when the repository information could not be loaded
    #[arg(long, env = "GITBOT_DEFAULT_BRANCH", default_value = "main")]
    pub default_branch: String,

    /// OpenAI API key
    #[arg(long, env = "GITBOT_OPENAI_API_KEY")]
    pub openai_api_key: String,

    /// Custom OpenAI API URL (if using a proxy or alternative endpoint)
    #[arg(
        long,
        env = "GITBOT_OPENAI_CUSTOM_URL",
        default_value = "https://api.openai.com/v1"
    )]
    pub openai_custom_url: String,

    /// OpenAI model to use
    #[arg(long, env = "GITBOT_OPENAI_MODEL", default_value = "gpt-4.1-mini")]
    pub openai_model: String,

    /// Optional temperature parameter for OpenAI API (0.0 to 2.0)
    #[arg(long, env = "GITBOT_OPENAI_TEMPERATURE")]
    pub openai_temperature: Option<f32>,

    /// Port of the HTTP server (health check and interactions endpoint)
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GITBOT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            discord_application_id: None,
            discord_public_key: String::new(),
            discord_api_url: "https://discord.com/api/v10".to_string(),
            channels: Vec::new(),
            ignore_prefix: "!".to_string(),
            history_limit: 10,
            poll_interval_seconds: 3,
            typing_interval_seconds: 5,
            register_commands: true,
            github_api_url: "https://api.github.com".to_string(),
            github_token: String::new(),
            github_owner: String::new(),
            github_repo: String::new(),
            default_branch: "main".to_string(),
            openai_api_key: String::new(),
            openai_custom_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4.1-mini".to_string(),
            openai_temperature: None,
            port: 3000,
            log_level: "info".to_string(),
        }
    }
}

impl AppSettings {
    /// `owner/repo` slug of the tracked repository
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.github_owner, self.github_repo)
    }
}

/// Discord accepts at most 100 messages per history request
fn validate_history_limit(value: u8) -> Result<u8, String> {
    const MIN_HISTORY: u8 = 1;
    const MAX_HISTORY: u8 = 100;

    if value < MIN_HISTORY {
        Err(format!(
            "history_limit must be at least {MIN_HISTORY}, got {value}"
        ))
    } else if value > MAX_HISTORY {
        Err(format!(
            "history_limit must be at most {MAX_HISTORY}, got {value}"
        ))
    } else {
        Ok(value)
    }
}

fn validate_ignore_prefix(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        Err("ignore_prefix must not be empty".to_string())
    } else {
        Ok(value.to_string())
    }
}

fn validate_intervals(poll_seconds: u64, typing_seconds: u64) -> Result<(), String> {
    if poll_seconds == 0 {
        return Err("poll_interval_seconds must be greater than 0".to_string());
    }
    if typing_seconds == 0 {
        return Err("typing_interval_seconds must be greater than 0".to_string());
    }
    Ok(())
}

pub fn load_config() -> anyhow::Result<AppSettings> {
    // Parse command line arguments and environment variables
    let mut app_settings = AppSettings::parse();

    app_settings.history_limit =
        validate_history_limit(app_settings.history_limit).map_err(|e| anyhow::anyhow!(e))?;
    app_settings.ignore_prefix =
        validate_ignore_prefix(&app_settings.ignore_prefix).map_err(|e| anyhow::anyhow!(e))?;
    validate_intervals(
        app_settings.poll_interval_seconds,
        app_settings.typing_interval_seconds,
    )
    .map_err(|e| anyhow::anyhow!(e))?;

    // Empty entries come from trailing commas in GITBOT_CHANNELS
    app_settings.channels = app_settings
        .channels
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    Ok(app_settings)
}
