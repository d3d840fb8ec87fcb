//! Last-seen snapshot of every upcoming event and the diff that classifies
//! what changed between two polls.

use crate::components::calendar_feed::CalendarEvent;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// How long an event that left the feed after it started stays tracked
pub const STALE_RETENTION_HOURS: i64 = 24;

/// Kind of change detected between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    New,
    Moved,
    Cancelled,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::New => "new",
            ChangeKind::Moved => "moved",
            ChangeKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified change of one event
#[derive(Debug, Clone, PartialEq)]
pub struct EventChange {
    pub kind: ChangeKind,
    /// Current snapshot, or the last known one for cancellations
    pub event: CalendarEvent,
    /// Start before the move, only set for `Moved`
    pub previous_start: Option<DateTime<Tz>>,
}

impl EventChange {
    fn new(kind: ChangeKind, event: CalendarEvent) -> Self {
        Self {
            kind,
            event,
            previous_start: None,
        }
    }
}

/// Tracks the last observed snapshot of each event by identity
#[derive(Debug)]
pub struct EventStateTracker {
    known: HashMap<String, CalendarEvent>,
    retention: Duration,
}

impl Default for EventStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStateTracker {
    pub fn new() -> Self {
        Self {
            known: HashMap::new(),
            retention: Duration::hours(STALE_RETENTION_HOURS),
        }
    }

    /// Replace the snapshot without classifying anything
    pub fn seed(&mut self, events: Vec<CalendarEvent>) -> usize {
        self.known = events
            .into_iter()
            .map(|event| (event.id.clone(), event))
            .collect();
        self.known.len()
    }

    /// Diff a fresh fetch against the snapshot, update the snapshot and
    /// return the changes, new/moved first and cancellations after.
    ///
    /// Only a different start counts as a move; other field changes are
    /// absorbed silently. A missing event is cancelled only while its known
    /// start is still ahead of `now`. Missing events that already started stay
    /// tracked until they ended more than the retention period ago.
    pub fn apply(&mut self, fresh: Vec<CalendarEvent>, now: DateTime<Utc>) -> Vec<EventChange> {
        // Membership of the fetch is fixed before the map is touched
        let fresh_ids: HashSet<String> = fresh.iter().map(|e| e.id.clone()).collect();
        let mut changes = Vec::new();

        for event in fresh {
            match self.known.insert(event.id.clone(), event.clone()) {
                None => changes.push(EventChange::new(ChangeKind::New, event)),
                Some(previous) if previous.start != event.start => changes.push(EventChange {
                    kind: ChangeKind::Moved,
                    event,
                    previous_start: Some(previous.start),
                }),
                Some(_) => {}
            }
        }

        let mut missing: Vec<(String, DateTime<Utc>)> = self
            .known
            .iter()
            .filter(|(id, _)| !fresh_ids.contains(*id))
            .map(|(id, event)| (id.clone(), event.start_utc()))
            .collect();
        missing.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let stale_before = now - self.retention;
        for (id, start) in missing {
            if start > now {
                if let Some(previous) = self.known.remove(&id) {
                    changes.push(EventChange::new(ChangeKind::Cancelled, previous));
                }
            } else if self
                .known
                .get(&id)
                .is_some_and(|previous| previous.end_or_start_utc() < stale_before)
            {
                self.known.remove(&id);
            }
        }

        changes
    }

    pub fn get(&self, id: &str) -> Option<&CalendarEvent> {
        self.known.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.known.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
