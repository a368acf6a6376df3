//! Test modules for the bot
//!
//! Client and pipeline tests live here; pure helpers keep their tests inline.


#[cfg(test)]
pub(crate) mod support {
    use crate::config::AppSettings;
    use crate::discord::{ChatPlatform, DiscordError, MessageQuery};
    use crate::github::GithubApiClient;
    use crate::models::{DiscordMessage, DiscordUser};
    use crate::openai::OpenAIApiClient;
    use crate::state::BotState;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    pub(crate) const TEST_OWNER: &str = "octo";
    pub(crate) const TEST_REPO: &str = "hello";
    pub(crate) const TEST_CHANNEL: &str = "1367412607518113853";
    pub(crate) const TEST_BOT_ID: &str = "900";
    pub(crate) const TEST_BOT_USERNAME: &str = "GitBot";

    pub(crate) fn test_settings(base_url: &str) -> AppSettings {
        AppSettings {
            discord_token: "discord_token".to_string(),
            discord_application_id: Some("app-1".to_string()),
            discord_api_url: base_url.to_string(),
            channels: vec![TEST_CHANNEL.to_string()],
            github_api_url: base_url.to_string(),
            github_token: "gh_token".to_string(),
            github_owner: TEST_OWNER.to_string(),
            github_repo: TEST_REPO.to_string(),
            openai_api_key: "test_api_key".to_string(),
            openai_custom_url: base_url.to_string(),
            log_level: "debug".to_string(),
            ..AppSettings::default()
        }
    }

    pub(crate) fn bot_user() -> DiscordUser {
        DiscordUser {
            id: TEST_BOT_ID.to_string(),
            username: TEST_BOT_USERNAME.to_string(),
            bot: true,
        }
    }

    pub(crate) fn user_message(id: &str, content: &str) -> DiscordMessage {
        DiscordMessage {
            id: id.to_string(),
            channel_id: TEST_CHANNEL.to_string(),
            author: DiscordUser {
                id: "42".to_string(),
                username: "alice".to_string(),
                bot: false,
            },
            content: content.to_string(),
        }
    }

    pub(crate) fn test_state_with(settings: AppSettings, platform: Arc<RecordingPlatform>) -> Arc<BotState> {
        let github = GithubApiClient::new(&settings).unwrap();
        let openai = OpenAIApiClient::new(&settings).unwrap();
        Arc::new(BotState::new(
            Arc::new(settings),
            platform,
            Arc::new(github),
            Arc::new(openai),
            bot_user(),
        ))
    }

    pub(crate) fn test_state(base_url: &str, platform: Arc<RecordingPlatform>) -> Arc<BotState> {
        test_state_with(test_settings(base_url), platform)
    }

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum PlatformEvent {
        Typing { channel_id: String },
        Reply { channel_id: String, message_id: String, content: String },
        Send { channel_id: String, content: String },
        EditOriginal { token: String, content: String },
        Followup { token: String, content: String },
    }

    impl PlatformEvent {
        pub(crate) fn content(&self) -> Option<&str> {
            match self {
                PlatformEvent::Typing { .. } => None,
                PlatformEvent::Reply { content, .. }
                | PlatformEvent::Send { content, .. }
                | PlatformEvent::EditOriginal { content, .. }
                | PlatformEvent::Followup { content, .. } => Some(content),
            }
        }
    }

    /// In-memory chat platform that records every outbound call
    #[derive(Default)]
    pub(crate) struct RecordingPlatform {
        events: Mutex<Vec<PlatformEvent>>,
        channels: Mutex<HashMap<String, Vec<DiscordMessage>>>,
        pub(crate) fail_replies: AtomicBool,
        pub(crate) fail_edits: AtomicBool,
        pub(crate) fail_followups: AtomicBool,
        pub(crate) fail_history: AtomicBool,
    }

    fn simulated_failure() -> DiscordError {
        DiscordError::Api {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "simulated failure".to_string(),
        }
    }

    impl RecordingPlatform {
        pub(crate) fn with_messages(messages: Vec<DiscordMessage>) -> Self {
            let platform = Self::default();
            for message in messages {
                platform.push_message(message);
            }
            platform
        }

        pub(crate) fn push_message(&self, message: DiscordMessage) {
            self.channels
                .lock()
                .unwrap()
                .entry(message.channel_id.clone())
                .or_default()
                .push(message);
        }

        pub(crate) fn events(&self) -> Vec<PlatformEvent> {
            self.events.lock().unwrap().clone()
        }

        /// Everything except typing signals
        pub(crate) fn deliveries(&self) -> Vec<PlatformEvent> {
            self.events()
                .into_iter()
                .filter(|e| !matches!(e, PlatformEvent::Typing { .. }))
                .collect()
        }

        pub(crate) fn typing_count(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| matches!(e, PlatformEvent::Typing { .. }))
                .count()
        }

        fn record(&self, event: PlatformEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl ChatPlatform for RecordingPlatform {
        async fn send_typing(&self, channel_id: &str) -> Result<(), DiscordError> {
            self.record(PlatformEvent::Typing {
                channel_id: channel_id.to_string(),
            });
            Ok(())
        }

        async fn fetch_messages(
            &self,
            channel_id: &str,
            query: &MessageQuery,
        ) -> Result<Vec<DiscordMessage>, DiscordError> {
            if self.fail_history.load(Ordering::SeqCst) {
                return Err(simulated_failure());
            }
            let snowflake = |id: &Option<String>| id.as_deref().and_then(|s| s.parse::<u64>().ok());
            let before = snowflake(&query.before);
            let after = snowflake(&query.after);

            let mut messages: Vec<DiscordMessage> = self
                .channels
                .lock()
                .unwrap()
                .get(channel_id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|m| before.map_or(true, |b| m.snowflake() < b))
                .filter(|m| after.map_or(true, |a| m.snowflake() > a))
                .collect();
            // Newest first, like Discord
            messages.sort_by_key(|m| std::cmp::Reverse(m.snowflake()));
            messages.truncate(query.limit as usize);
            Ok(messages)
        }

        async fn reply(&self, channel_id: &str, message_id: &str, content: &str) -> Result<(), DiscordError> {
            if self.fail_replies.load(Ordering::SeqCst) {
                return Err(simulated_failure());
            }
            self.record(PlatformEvent::Reply {
                channel_id: channel_id.to_string(),
                message_id: message_id.to_string(),
                content: content.to_string(),
            });
            Ok(())
        }

        async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), DiscordError> {
            self.record(PlatformEvent::Send {
                channel_id: channel_id.to_string(),
                content: content.to_string(),
            });
            Ok(())
        }

        async fn edit_original_response(&self, interaction_token: &str, content: &str) -> Result<(), DiscordError> {
            if self.fail_edits.load(Ordering::SeqCst) {
                return Err(simulated_failure());
            }
            self.record(PlatformEvent::EditOriginal {
                token: interaction_token.to_string(),
                content: content.to_string(),
            });
            Ok(())
        }

        async fn create_followup(&self, interaction_token: &str, content: &str) -> Result<(), DiscordError> {
            if self.fail_followups.load(Ordering::SeqCst) {
                return Err(simulated_failure());
            }
            self.record(PlatformEvent::Followup {
                token: interaction_token.to_string(),
                content: content.to_string(),
            });
            Ok(())
        }
    }
}
