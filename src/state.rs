use crate::config::AppSettings;
use crate::discord::ChatPlatform;
use crate::github::GithubApiClient;
use crate::models::{DiscordUser, RepositoryInfo};
use crate::openai::OpenAIApiClient;
use crate::repository::RepositoryService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Everything a handler needs, built once at startup and shared by every
/// in-flight pipeline.
pub struct BotState {
    pub settings: Arc<AppSettings>,
    pub platform: Arc<dyn ChatPlatform>,
    pub github: Arc<GithubApiClient>,
    pub openai: Arc<OpenAIApiClient>,
    pub bot_user: DiscordUser,
    repo_info: RwLock<Option<Arc<RepositoryInfo>>>,
}

impl BotState {
    pub fn new(
        settings: Arc<AppSettings>,
        platform: Arc<dyn ChatPlatform>,
        github: Arc<GithubApiClient>,
        openai: Arc<OpenAIApiClient>,
        bot_user: DiscordUser,
    ) -> Self {
        Self {
            settings,
            platform,
            github,
            openai,
            bot_user,
            repo_info: RwLock::new(None),
        }
    }

    /// Current repository snapshot, if one was ever loaded
    pub async fn repo_info(&self) -> Option<Arc<RepositoryInfo>> {
        self.repo_info.read().await.clone()
    }

    /// Replaces the snapshot wholesale
    pub async fn set_repo_info(&self, info: RepositoryInfo) -> Arc<RepositoryInfo> {
        let info = Arc::new(info);
        *self.repo_info.write().await = Some(info.clone());
        info
    }

    /// Repository access bound to the current default branch
    pub fn repository(&self, info: Option<&RepositoryInfo>) -> RepositoryService {
        let default_branch = info
            .map(|i| i.default_branch.clone())
            .unwrap_or_else(|| self.settings.default_branch.clone());
        RepositoryService::new(self.github.clone(), default_branch)
    }

    pub fn typing_interval(&self) -> Duration {
        Duration::from_secs(self.settings.typing_interval_seconds)
    }
}
