//! Periodic checks over the calendar feed: the morning schedule, reminders
//! ahead of each meeting and alerts about new, moved or cancelled meetings.

pub mod notifications;
pub mod reminders;
mod scheduler;
pub mod state;

pub use reminders::{ReminderKey, ReminderTracker};
pub use scheduler::{
    CalendarScheduler, ScheduleSettings, SchedulerState, MINUTE_TICK, REMINDER_TOLERANCE_SECONDS,
};
pub use state::{ChangeKind, EventChange, EventStateTracker};
