use super::{split_message, Notifier, MESSAGE_LIMIT};
use crate::config::Config;
use crate::error::{delivery_error, BotResult};
use async_trait::async_trait;
use serenity::builder::CreateMessage;
use serenity::http::Http;
use serenity::model::id::ChannelId;
use std::sync::Arc;
use tracing::{debug, info};

/// Posts notifications to a single Discord channel
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl DiscordNotifier {
    /// Create a notifier without contacting Discord
    pub fn new(token: &str, channel_id: u64) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
            channel_id: ChannelId::new(channel_id),
        }
    }

    /// Create a notifier from the configuration and verify the token
    pub async fn connect(config: &Config) -> BotResult<Self> {
        let notifier = Self::new(&config.discord_token, config.notification_channel_id);
        let user = notifier.http.get_current_user().await?;
        info!(
            "{} is connected, posting to channel {}",
            user.name, notifier.channel_id
        );
        Ok(notifier)
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, text: &str) -> BotResult<()> {
        for chunk in split_message(text, MESSAGE_LIMIT) {
            self.channel_id
                .send_message(&self.http, CreateMessage::new().content(chunk))
                .await
                .map_err(|e| delivery_error(&format!("Failed to post message: {}", e)))?;
        }
        debug!("Delivered message to channel {}", self.channel_id);
        Ok(())
    }
}
