#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use kalenterivahti::components::calendar_feed::{CalendarEvent, EventSource};
use kalenterivahti::components::calendar_watch::ScheduleSettings;
use kalenterivahti::components::notifier::Notifier;
use kalenterivahti::error::{delivery_error, fetch_error, BotResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Event source backed by an in-memory list that tests can swap or break
#[derive(Debug, Default)]
pub struct MockEventSource {
    events: Mutex<Vec<CalendarEvent>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockEventSource {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Default::default()
        }
    }

    pub fn set_events(&self, events: Vec<CalendarEvent>) {
        *self.events.lock().unwrap() = events;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn fetch_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        _tz: Tz,
    ) -> BotResult<Vec<CalendarEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(fetch_error("feed unavailable"));
        }

        let mut events: Vec<CalendarEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.overlaps(from, to))
            .cloned()
            .collect();
        events.sort_by_key(|event| event.start_utc());
        Ok(events)
    }
}

/// Notifier that keeps every delivered message
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` deliveries were attempted
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        for _ in 0..200 {
            if self.attempts() >= count {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.messages()
    }

    /// Give spawned deliveries a chance to run
    pub async fn settle(&self) -> Vec<String> {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        self.messages()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> BotResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(delivery_error("channel unavailable"));
        }
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Settings with every check enabled, reminders 30 minutes ahead and the
/// morning schedule at 09:00
pub fn settings(timezone: Tz) -> ScheduleSettings {
    ScheduleSettings {
        timezone,
        morning_schedule_time: "09:00".to_string(),
        reminder_minutes: 30,
        upcoming_days: 7,
        change_check_interval: std::time::Duration::from_secs(300),
        morning_schedule_enabled: true,
        reminders_enabled: true,
        change_alerts_enabled: true,
        week_ahead_enabled: true,
    }
}

/// Instant on Monday 2024-01-08 in UTC
pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 8, hour, minute, second).unwrap()
}

/// One-hour event starting at the given UTC instant
pub fn event(id: &str, title: &str, start: DateTime<Utc>) -> CalendarEvent {
    let start = start.with_timezone(&chrono_tz::UTC);
    CalendarEvent::new(id, title, start, Some(start + Duration::hours(1)))
}

pub fn all_day_event(id: &str, title: &str, start: DateTime<Utc>) -> CalendarEvent {
    let mut event = event(id, title, start);
    event.all_day = true;
    event.end = Some(event.start + Duration::days(1));
    event
}
