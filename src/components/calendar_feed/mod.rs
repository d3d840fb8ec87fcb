mod client;
pub mod links;
pub mod models;
pub mod parser;

pub use client::IcsFeed;
pub use models::CalendarEvent;

use crate::error::BotResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Source of calendar events
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Events overlapping `[from, to]`, ordered by ascending start, with
    /// unusable entries already removed. Times are expressed in `tz`.
    async fn fetch_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        tz: Tz,
    ) -> BotResult<Vec<CalendarEvent>>;
}
