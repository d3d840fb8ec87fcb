use super::models::CalendarEvent;
use super::parser::parse_feed;
use super::EventSource;
use crate::config::Config;
use crate::error::{fetch_error, BotResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Timeout for a single feed download
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Event source backed by an iCalendar feed reachable over HTTP
#[derive(Debug, Clone)]
pub struct IcsFeed {
    url: Url,
    client: Client,
}

impl IcsFeed {
    /// Create a feed client for a URL
    pub fn new(url: &str) -> BotResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| fetch_error(&format!("Failed to parse feed URL: {}", e)))?;
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| fetch_error(&format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { url, client })
    }

    /// Create a feed client from the configuration
    pub fn from_config(config: &Config) -> BotResult<Self> {
        Self::new(&config.ical_url)
    }

    /// Download the raw feed
    async fn download(&self) -> BotResult<String> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| fetch_error(&format!("Failed to fetch calendar feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(fetch_error(&format!(
                "Failed to fetch calendar feed: HTTP {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| fetch_error(&format!("Failed to read calendar feed: {}", e)))
    }
}

#[async_trait]
impl EventSource for IcsFeed {
    async fn fetch_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        tz: Tz,
    ) -> BotResult<Vec<CalendarEvent>> {
        let body = self.download().await?;
        let events = parse_feed(&body, from, to, tz)?;
        debug!("Fetched {} events between {} and {}", events.len(), from, to);
        Ok(events)
    }
}
