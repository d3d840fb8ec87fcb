use super::notifications::{format_change, format_day_schedule, format_reminder, format_week_ahead};
use super::reminders::ReminderTracker;
use super::state::{ChangeKind, EventChange, EventStateTracker, STALE_RETENTION_HOURS};
use crate::components::calendar_feed::{CalendarEvent, EventSource};
use crate::components::notifier::Notifier;
use crate::config::{checks, Config};
use crate::error::BotResult;
use crate::utils::time::{format_clock, local_day_bounds, tolerance_window, upcoming_window};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Interval of the morning schedule and reminder checks
pub const MINUTE_TICK: std::time::Duration = std::time::Duration::from_secs(60);

/// Half-width of the window around `now + lead time` in which reminders match
pub const REMINDER_TOLERANCE_SECONDS: i64 = 30;

/// Settings the scheduler reads once at startup
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub timezone: Tz,
    /// Local `HH:MM` at which the day schedule is sent
    pub morning_schedule_time: String,
    pub reminder_minutes: u32,
    pub upcoming_days: u32,
    pub change_check_interval: std::time::Duration,
    pub morning_schedule_enabled: bool,
    pub reminders_enabled: bool,
    pub change_alerts_enabled: bool,
    pub week_ahead_enabled: bool,
}

impl ScheduleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timezone: config.timezone,
            morning_schedule_time: config.morning_schedule_time.clone(),
            reminder_minutes: config.reminder_minutes,
            upcoming_days: config.upcoming_days,
            change_check_interval: std::time::Duration::from_secs(config.change_check_interval),
            morning_schedule_enabled: config.is_check_enabled(checks::MORNING_SCHEDULE),
            reminders_enabled: config.is_check_enabled(checks::REMINDERS),
            change_alerts_enabled: config.is_check_enabled(checks::CHANGE_ALERTS),
            week_ahead_enabled: config.is_check_enabled(checks::WEEK_AHEAD),
        }
    }
}

/// Mutable state shared by all checks, always accessed under one lock
#[derive(Debug, Default)]
pub struct SchedulerState {
    pub known: EventStateTracker,
    pub reminded: ReminderTracker,
    /// Whether `known` holds a baseline to diff against
    seeded: bool,
    /// Local day of the last morning schedule sent
    last_morning_schedule: Option<NaiveDate>,
}

impl SchedulerState {
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }
}

/// Drives the periodic checks and owns the shared state.
///
/// Cloning is cheap; clones share the same state, source and notifier.
#[derive(Clone)]
pub struct CalendarScheduler {
    settings: Arc<ScheduleSettings>,
    source: Arc<dyn EventSource>,
    notifier: Arc<dyn Notifier>,
    state: Arc<Mutex<SchedulerState>>,
}

impl CalendarScheduler {
    pub fn new(
        settings: ScheduleSettings,
        source: Arc<dyn EventSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            source,
            notifier,
            state: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    pub fn settings(&self) -> &ScheduleSettings {
        &self.settings
    }

    /// Seed the state, send the week-ahead summary and run the timer loop forever
    pub async fn run(self) {
        info!("Calendar scheduler started");

        if let Err(e) = self.seed_at(Utc::now()).await {
            error!("Failed to load initial events: {}", e);
        }

        if self.settings.week_ahead_enabled {
            let scheduler = self.clone();
            tokio::spawn(async move {
                if let Err(e) = scheduler.send_week_ahead_at(Utc::now()).await {
                    error!("Failed to send week-ahead summary: {}", e);
                }
            });
        }

        let change_interval = self.settings.change_check_interval;
        let mut minute_ticker = interval_at(Instant::now() + MINUTE_TICK, MINUTE_TICK);
        minute_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut change_ticker = interval_at(Instant::now() + change_interval, change_interval);
        change_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = minute_ticker.tick() => {
                    self.spawn_morning_schedule_check();
                    self.spawn_reminder_check();
                }
                _ = change_ticker.tick() => {
                    self.spawn_change_check();
                }
            }
        }
    }

    fn spawn_morning_schedule_check(&self) {
        if !self.settings.morning_schedule_enabled {
            return;
        }
        let scheduler = self.clone();
        tokio::spawn(async move {
            if let Err(e) = scheduler.check_morning_schedule_at(Utc::now()).await {
                error!("Morning schedule check failed: {}", e);
            }
        });
    }

    fn spawn_reminder_check(&self) {
        if !self.settings.reminders_enabled {
            return;
        }
        let scheduler = self.clone();
        tokio::spawn(async move {
            if let Err(e) = scheduler.check_reminders_at(Utc::now()).await {
                error!("Reminder check failed: {}", e);
            }
        });
    }

    fn spawn_change_check(&self) {
        if !self.settings.change_alerts_enabled {
            return;
        }
        let scheduler = self.clone();
        tokio::spawn(async move {
            if let Err(e) = scheduler.check_changes_at(Utc::now()).await {
                error!("Change check failed: {}", e);
            }
        });
    }

    /// Load the upcoming window as the diff baseline without notifying
    pub async fn seed_at(&self, now: DateTime<Utc>) -> BotResult<usize> {
        let events = self.fetch_upcoming(now).await?;

        let mut state = self.state.lock().await;
        let count = state.known.seed(events);
        state.seeded = true;
        info!(
            "Loaded {} events for the next {} days",
            count, self.settings.upcoming_days
        );
        Ok(count)
    }

    /// Send the day schedule when the local clock shows the configured minute.
    ///
    /// Returns whether a schedule was sent. A minute that passes without a
    /// check is not caught up.
    pub async fn check_morning_schedule_at(&self, now: DateTime<Utc>) -> BotResult<bool> {
        let tz = self.settings.timezone;
        if format_clock(now, tz) != self.settings.morning_schedule_time {
            return Ok(false);
        }

        let today = now.with_timezone(&tz).date_naive();
        if self.state.lock().await.last_morning_schedule == Some(today) {
            return Ok(false);
        }

        let (from, to) = local_day_bounds(today, tz);
        let events = self.source.fetch_events(from, to, tz).await?;

        {
            let mut state = self.state.lock().await;
            if state.last_morning_schedule == Some(today) {
                return Ok(false);
            }
            state.last_morning_schedule = Some(today);
        }

        info!("Sending morning schedule with {} events", events.len());
        self.dispatch(format_day_schedule(&events, today));
        Ok(true)
    }

    /// Remind about events starting around `now + lead time`, each at most once.
    ///
    /// Returns the events reminded by this invocation.
    pub async fn check_reminders_at(&self, now: DateTime<Utc>) -> BotResult<Vec<CalendarEvent>> {
        let lead = self.settings.reminder_minutes;
        let target = now + Duration::minutes(i64::from(lead));
        let (from, to) = tolerance_window(target, Duration::seconds(REMINDER_TOLERANCE_SECONDS));

        let events = self
            .source
            .fetch_events(from, to, self.settings.timezone)
            .await?;

        // Check-and-mark happens under the lock so overlapping runs cannot both send
        let due: Vec<CalendarEvent> = {
            let mut state = self.state.lock().await;
            events
                .into_iter()
                .filter(|event| !event.all_day && event.starts_within(from, to))
                .filter(|event| state.reminded.mark(event, lead))
                .collect()
        };

        for event in &due {
            info!("Reminder: {}", event.title);
            self.dispatch(format_reminder(event, lead));
        }
        Ok(due)
    }

    /// Diff the upcoming window against the known events and alert on changes.
    ///
    /// Returns the changes detected by this invocation.
    pub async fn check_changes_at(&self, now: DateTime<Utc>) -> BotResult<Vec<EventChange>> {
        let events = self.fetch_upcoming(now).await?;

        let changes = {
            let mut state = self.state.lock().await;
            if !state.seeded {
                let count = state.known.seed(events);
                state.seeded = true;
                info!("Loaded {} events on the first successful change check", count);
                return Ok(Vec::new());
            }

            let changes = state.known.apply(events, now);
            for change in changes.iter().filter(|c| c.kind == ChangeKind::Moved) {
                state
                    .reminded
                    .reschedule(&change.event.id, change.event.start_utc());
            }
            let pruned = state
                .reminded
                .prune_before(now - Duration::hours(STALE_RETENTION_HOURS));
            if pruned > 0 {
                debug!("Pruned {} reminders of past events", pruned);
            }
            changes
        };

        for change in &changes {
            match change.kind {
                ChangeKind::New => info!("New meeting: {}", change.event.title),
                ChangeKind::Moved => info!("Meeting moved: {}", change.event.title),
                ChangeKind::Cancelled => info!("Meeting cancelled: {}", change.event.title),
            }
            self.dispatch(format_change(change));
        }
        Ok(changes)
    }

    /// Send the summary of the upcoming window
    pub async fn send_week_ahead_at(&self, now: DateTime<Utc>) -> BotResult<()> {
        let events = self.fetch_upcoming(now).await?;
        info!("Sending week-ahead summary with {} events", events.len());
        self.notifier.send(&format_week_ahead(&events)).await
    }

    /// Number of events in the diff baseline
    pub async fn known_event_count(&self) -> usize {
        self.state.lock().await.known.len()
    }

    /// Last known snapshot of an event
    pub async fn known_event(&self, id: &str) -> Option<CalendarEvent> {
        self.state.lock().await.known.get(id).cloned()
    }

    /// Whether the reminder for an event and lead time was already sent
    pub async fn was_reminded(&self, id: &str, lead_minutes: u32) -> bool {
        self.state.lock().await.reminded.contains(id, lead_minutes)
    }

    pub async fn is_seeded(&self) -> bool {
        self.state.lock().await.is_seeded()
    }

    async fn fetch_upcoming(&self, now: DateTime<Utc>) -> BotResult<Vec<CalendarEvent>> {
        let (from, to) = upcoming_window(now, self.settings.upcoming_days);
        self.source
            .fetch_events(from, to, self.settings.timezone)
            .await
    }

    /// Fire-and-forget delivery; failures are logged and never retried
    fn dispatch(&self, text: String) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&text).await {
                error!("Failed to send notification: {}\nText: {}", e, text);
            }
        });
    }
}
