use crate::components::calendar_feed::CalendarEvent;
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Identity of a reminder: one per event and lead time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReminderKey {
    pub event_id: String,
    pub lead_minutes: u32,
}

impl ReminderKey {
    pub fn new(event_id: impl Into<String>, lead_minutes: u32) -> Self {
        Self {
            event_id: event_id.into(),
            lead_minutes,
        }
    }
}

/// Remembers which reminders were already sent
#[derive(Debug, Default)]
pub struct ReminderTracker {
    /// Reminded keys with the start of the event they were sent for
    reminded: HashMap<ReminderKey, DateTime<Utc>>,
}

impl ReminderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the reminder for an event; true only the first time
    pub fn mark(&mut self, event: &CalendarEvent, lead_minutes: u32) -> bool {
        match self.reminded.entry(ReminderKey::new(event.id.clone(), lead_minutes)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(event.start_utc());
                true
            }
        }
    }

    pub fn contains(&self, event_id: &str, lead_minutes: u32) -> bool {
        self.reminded
            .contains_key(&ReminderKey::new(event_id, lead_minutes))
    }

    /// Record a new start for every reminder of a moved event.
    ///
    /// The later of the stored and the new start is kept, so a reminded event
    /// that moves further ahead is not pruned before it happens.
    pub fn reschedule(&mut self, event_id: &str, new_start: DateTime<Utc>) -> usize {
        let mut updated = 0;
        for (key, start) in self.reminded.iter_mut() {
            if key.event_id == event_id && new_start > *start {
                *start = new_start;
                updated += 1;
            }
        }
        updated
    }

    /// Forget reminders for events that started before `cutoff`.
    ///
    /// Reminder windows always lie ahead of now, so an event that started
    /// before `cutoff <= now` can never be matched again.
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.reminded.len();
        self.reminded.retain(|_, start| *start >= cutoff);
        before - self.reminded.len()
    }

    pub fn len(&self) -> usize {
        self.reminded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminded.is_empty()
    }
}
