use crate::discord::MessageQuery;
use crate::handlers::handle_message;
use crate::models::DiscordMessage;
use crate::state::BotState;
use anyhow::Result;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, warn};

/// Discord caps a single history request at 100 messages
const POLL_BATCH_SIZE: u8 = 100;
const MAX_CONCURRENT_CHANNEL_POLLS: usize = 4;

/// Cursor for an empty channel; every snowflake is greater
const EMPTY_CHANNEL_CURSOR: &str = "0";

fn newest_id(messages: &[DiscordMessage]) -> String {
    messages
        .iter()
        .max_by_key(|m| m.snowflake())
        .map(|m| m.id.clone())
        .unwrap_or_else(|| EMPTY_CHANNEL_CURSOR.to_string())
}

pub struct PollingService {
    state: Arc<BotState>,
    /// channel id -> id of the newest message already seen
    last_seen: DashMap<String, String>,
}

impl PollingService {
    pub fn new(state: Arc<BotState>) -> Self {
        Self {
            state,
            last_seen: DashMap::new(),
        }
    }

    /// Records the newest message of every channel so history is not answered on startup
    pub async fn prime(&self) {
        for channel_id in &self.state.settings.channels {
            let query = MessageQuery::after(None, 1);
            match self.state.platform.fetch_messages(channel_id, &query).await {
                Ok(messages) => {
                    self.last_seen.insert(channel_id.clone(), newest_id(&messages));
                    debug!(channel_id = %channel_id, "Channel cursor initialised");
                }
                Err(e) => warn!(channel_id = %channel_id, "Failed to prime channel cursor: {}", e),
            }
        }
    }

    pub async fn start_polling(&self) -> Result<()> {
        info!(
            "Starting polling service for channels: {:?}",
            self.state.settings.channels
        );
        self.prime().await;

        let interval_duration = Duration::from_secs(self.state.settings.poll_interval_seconds);
        let mut interval = time::interval(interval_duration);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.poll_channels().await;
        }
    }

    pub async fn poll_channels(&self) {
        stream::iter(self.state.settings.channels.iter())
            .for_each_concurrent(MAX_CONCURRENT_CHANNEL_POLLS, |channel_id| async move {
                match self.poll_channel(channel_id).await {
                    Ok(messages) => {
                        for message in messages {
                            self.dispatch(message);
                        }
                    }
                    Err(e) => error!("Error polling channel {}: {}", channel_id, e),
                }
            })
            .await;
    }

    /// New messages of `channel_id` in chronological order; advances the cursor
    pub async fn poll_channel(&self, channel_id: &str) -> Result<Vec<DiscordMessage>> {
        let last_seen = self.last_seen.get(channel_id).map(|entry| entry.value().clone());
        let Some(last_seen) = last_seen else {
            // Unprimed channel: start from its newest message
            let newest = self
                .state
                .platform
                .fetch_messages(channel_id, &MessageQuery::after(None, 1))
                .await?;
            self.last_seen.insert(channel_id.to_string(), newest_id(&newest));
            return Ok(Vec::new());
        };

        let query = MessageQuery::after(Some(&last_seen), POLL_BATCH_SIZE);
        let mut messages = self.state.platform.fetch_messages(channel_id, &query).await?;
        messages.sort_by_key(DiscordMessage::snowflake);

        if let Some(newest) = messages.last() {
            self.last_seen.insert(channel_id.to_string(), newest.id.clone());
            debug!("Found {} new messages in channel {}", messages.len(), channel_id);
        }
        Ok(messages)
    }

    fn dispatch(&self, message: DiscordMessage) {
        if message.author.bot {
            return;
        }
        let state = self.state.clone();
        // One task per message; pipelines never wait on each other
        tokio::spawn(async move {
            let message_id = message.id.clone();
            if let Err(e) = handle_message(state, message).await {
                error!("Error processing message {}: {}", message_id, e);
            }
        });
    }
}
