use super::links::{extract_links, find_meeting_link};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Calendar event normalized from the feed
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    /// Stable identity, unique within the feed
    pub id: String,
    pub title: String,
    pub start: DateTime<Tz>,
    /// Absent for point-in-time entries
    pub end: Option<DateTime<Tz>>,
    pub all_day: bool,
    pub location: Option<String>,
    pub description: Option<String>,
    /// First recognized video-conference link
    pub meeting_link: Option<String>,
    /// Deduplicated links from the description
    pub links: Vec<String>,
    pub updated: Option<DateTime<Utc>>,
}

impl CalendarEvent {
    /// Create an event and derive its links from description and location
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Tz>,
        end: Option<DateTime<Tz>>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start,
            end,
            all_day: false,
            location: None,
            description: None,
            meeting_link: None,
            links: Vec::new(),
            updated: None,
        }
    }

    /// Set location and description and recompute the derived links
    pub fn with_details(mut self, location: Option<String>, description: Option<String>) -> Self {
        self.location = location.filter(|l| !l.trim().is_empty());
        self.description = description.filter(|d| !d.trim().is_empty());
        self.derive_links();
        self
    }

    /// Recompute `meeting_link` and `links`
    pub fn derive_links(&mut self) {
        self.meeting_link = [self.description.as_deref(), self.location.as_deref()]
            .into_iter()
            .flatten()
            .find_map(find_meeting_link);
        self.links = self
            .description
            .as_deref()
            .map(extract_links)
            .unwrap_or_default();
    }

    /// Start instant in UTC
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    /// End instant in UTC, the start for point-in-time entries
    pub fn end_or_start_utc(&self) -> DateTime<Utc> {
        self.end.unwrap_or(self.start).with_timezone(&Utc)
    }

    /// Whether the event overlaps the inclusive window `[from, to]`
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start_utc() <= to && self.end_or_start_utc() >= from
    }

    /// Whether the event starts inside the inclusive window `[from, to]`
    pub fn starts_within(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        let start = self.start_utc();
        start >= from && start <= to
    }

    /// Usable events have both an identity and a title
    pub fn is_usable(&self) -> bool {
        !self.id.trim().is_empty() && !self.title.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::UTC;

    fn at(h: u32, m: u32) -> DateTime<Tz> {
        UTC.with_ymd_and_hms(2024, 1, 8, h, m, 0).unwrap()
    }

    #[test]
    fn test_overlap_is_inclusive() {
        let event = CalendarEvent::new("a", "Standup", at(10, 0), Some(at(10, 15)));
        let utc = |h, m| at(h, m).with_timezone(&Utc);
        assert!(event.overlaps(utc(9, 0), utc(10, 0)));
        assert!(event.overlaps(utc(10, 15), utc(11, 0)));
        assert!(event.overlaps(utc(10, 5), utc(10, 6)));
        assert!(!event.overlaps(utc(10, 16), utc(11, 0)));
        assert!(!event.overlaps(utc(8, 0), utc(9, 59)));
    }

    #[test]
    fn test_point_in_time_event() {
        let event = CalendarEvent::new("a", "Deadline", at(12, 0), None);
        let utc = |h, m| at(h, m).with_timezone(&Utc);
        assert!(event.overlaps(utc(12, 0), utc(13, 0)));
        assert!(!event.overlaps(utc(12, 1), utc(13, 0)));
    }

    #[test]
    fn test_links_are_derived() {
        let event = CalendarEvent::new("a", "Sync", at(10, 0), None).with_details(
            Some("https://zoom.us/j/123".to_string()),
            Some("Agenda: https://docs.example.com/x, https://docs.example.com/x".to_string()),
        );
        assert_eq!(event.meeting_link.as_deref(), Some("https://zoom.us/j/123"));
        assert_eq!(event.links, vec!["https://docs.example.com/x".to_string()]);
    }

    #[test]
    fn test_usable() {
        assert!(CalendarEvent::new("a", "Sync", at(10, 0), None).is_usable());
        assert!(!CalendarEvent::new("", "Sync", at(10, 0), None).is_usable());
        assert!(!CalendarEvent::new("a", "  ", at(10, 0), None).is_usable());
    }
}
