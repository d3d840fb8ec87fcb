//! Rendering of notification texts as Discord markdown.
//!
//! Everything taken from the feed goes through [`escape_markdown`]; links are
//! wrapped in `<…>` so Discord does not unfurl previews for them.

use super::state::{ChangeKind, EventChange};
use crate::components::calendar_feed::CalendarEvent;
use chrono::{DateTime, Datelike, NaiveDate, Weekday};
use chrono_tz::Tz;
use rust_i18n::t;

/// Maximum description length shown in reminders
const DESCRIPTION_LIMIT: usize = 300;

/// Daily agenda for `date`, events numbered in start order
pub fn format_day_schedule(events: &[CalendarEvent], date: NaiveDate) -> String {
    let date_str = escape_markdown(&long_date(date));

    if events.is_empty() {
        return t!("day_schedule.empty", date = date_str).to_string();
    }

    let mut message = format!("{}\n\n", t!("day_schedule.title", date = date_str));
    for (index, event) in events.iter().enumerate() {
        message.push_str(&format!(
            "{}\\. **{}** ({})\n",
            index + 1,
            escape_markdown(&event.title),
            escape_markdown(&time_range(event, "–"))
        ));
        message.push_str(&format_links(event));
        message.push('\n');
    }
    message.push_str(&t!("day_schedule.total", count = events.len()));
    message
}

/// Reminder sent `minutes_before` the event starts
pub fn format_reminder(event: &CalendarEvent, minutes_before: u32) -> String {
    let mut message = format!(
        "{}\n\n",
        t!(
            "reminder.title",
            minutes = minutes_before,
            title = escape_markdown(&event.title)
        )
    );
    message.push_str(&format!(
        "🕐 {}\n",
        escape_markdown(&time_range(event, " – "))
    ));

    if let Some(location) = &event.location {
        message.push_str(&format!("📍 {}\n", escape_markdown(location)));
    }

    message.push_str(&format_links(event));

    if let Some(description) = &event.description {
        let description = truncate(&strip_html(description), DESCRIPTION_LIMIT);
        if !description.is_empty() {
            message.push_str(&format!("\n_{}_\n", escape_markdown(&description)));
        }
    }

    message
}

/// Alert for a new, moved or cancelled meeting
pub fn format_change(change: &EventChange) -> String {
    let event = &change.event;
    let title = escape_markdown(&event.title);
    let mut message = String::new();

    match change.kind {
        ChangeKind::New => {
            message.push_str(&format!("{}\n", t!("change.new", title = title)));
            message.push_str(&format!(
                "{}\n",
                t!("change.when", date = short_date(&event.start), time = clock(&event.start))
            ));
        }
        ChangeKind::Moved => {
            message.push_str(&format!("{}\n", t!("change.moved", title = title)));
            message.push_str(&format!(
                "{}\n",
                t!(
                    "change.new_time",
                    date = short_date(&event.start),
                    time = clock(&event.start)
                )
            ));
            if let Some(previous) = &change.previous_start {
                message.push_str(&format!(
                    "{}\n",
                    t!(
                        "change.previous_time",
                        date = short_date(previous),
                        time = clock(previous)
                    )
                ));
            }
        }
        ChangeKind::Cancelled => {
            message.push_str(&format!("{}\n", t!("change.cancelled", title = title)));
        }
    }

    message.push_str(&format_links(event));
    message
}

/// Startup summary of the upcoming window, grouped by day
pub fn format_week_ahead(events: &[CalendarEvent]) -> String {
    let mut message = format!(
        "{}\n\n{}\n\n",
        t!("week_ahead.title"),
        t!("week_ahead.subtitle")
    );

    if events.is_empty() {
        message.push_str(&t!("week_ahead.empty"));
        return message;
    }

    let mut current_day: Option<NaiveDate> = None;
    for event in events {
        let day = event.start.date_naive();
        if current_day != Some(day) {
            current_day = Some(day);
            message.push_str(&format!(
                "📅 **{}, {}**\n",
                escape_markdown(&weekday_name(day.weekday())),
                short_date(&event.start)
            ));
        }
        message.push_str(&format!(
            "  • {} ({})\n",
            escape_markdown(&event.title),
            escape_markdown(&time_range(event, "–"))
        ));
        if let Some(link) = &event.meeting_link {
            message.push_str(&format!("    📹 [{}](<{}>)\n", t!("links.meet"), link));
        }
    }
    message.push_str(&format!(
        "\n{}",
        t!("day_schedule.total", count = events.len())
    ));
    message
}

/// Escape Discord markdown and defuse mentions in user-provided text
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '*' | '_' | '~' | '`' | '|' | '>' | '<' | '#' | '-' | '[' | ']' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            '@' => {
                out.push('@');
                out.push('\u{200B}');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Remove HTML tags and collapse whitespace
pub fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let mut cut: String = text.chars().take(limit).collect();
        cut.push('…');
        cut
    } else {
        text.to_string()
    }
}

fn format_links(event: &CalendarEvent) -> String {
    let mut out = String::new();
    if let Some(link) = &event.meeting_link {
        out.push_str(&format!("   📹 [{}](<{}>)\n", t!("links.join"), link));
    }
    for link in &event.links {
        if Some(link) != event.meeting_link.as_ref() {
            out.push_str(&format!("   🔗 <{}>\n", link));
        }
    }
    out
}

fn time_range(event: &CalendarEvent, separator: &str) -> String {
    if event.all_day {
        return t!("all_day").to_string();
    }
    match &event.end {
        Some(end) => format!("{}{}{}", clock(&event.start), separator, clock(end)),
        None => clock(&event.start),
    }
}

fn clock(dt: &DateTime<Tz>) -> String {
    dt.format("%H:%M").to_string()
}

fn short_date(dt: &DateTime<Tz>) -> String {
    dt.format("%d.%m").to_string()
}

fn long_date(date: NaiveDate) -> String {
    format!("{} {} {}", date.day(), month_name(date.month()), date.year())
}

fn weekday_name(weekday: Weekday) -> String {
    let name = match weekday {
        Weekday::Mon => t!("weekday.mon"),
        Weekday::Tue => t!("weekday.tue"),
        Weekday::Wed => t!("weekday.wed"),
        Weekday::Thu => t!("weekday.thu"),
        Weekday::Fri => t!("weekday.fri"),
        Weekday::Sat => t!("weekday.sat"),
        Weekday::Sun => t!("weekday.sun"),
    };
    name.to_string()
}

fn month_name(month: u32) -> String {
    let name = match month {
        1 => t!("month.jan"),
        2 => t!("month.feb"),
        3 => t!("month.mar"),
        4 => t!("month.apr"),
        5 => t!("month.may"),
        6 => t!("month.jun"),
        7 => t!("month.jul"),
        8 => t!("month.aug"),
        9 => t!("month.sep"),
        10 => t!("month.oct"),
        11 => t!("month.nov"),
        _ => t!("month.dec"),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use chrono_tz::UTC;

    fn event(id: &str, title: &str, hour: u32) -> CalendarEvent {
        let start = UTC.with_ymd_and_hms(2024, 1, 8, hour, 0, 0).unwrap();
        CalendarEvent::new(id, title, start, Some(start + Duration::minutes(30)))
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a*b_c"), "a\\*b\\_c");
        assert_eq!(escape_markdown("Q1-plan (draft)"), "Q1\\-plan \\(draft\\)");
        assert_eq!(escape_markdown("@everyone"), "@\u{200B}everyone");
        assert_eq!(escape_markdown("plain text"), "plain text");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Hello <b>team</b></p>\n\n<br>Agenda"),
            "Hello team Agenda"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ääääää", 3), "äää…");
    }

    #[test]
    fn test_day_schedule_lists_events_in_order() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let events = vec![event("a", "Standup", 9), event("b", "Review", 14)];
        let message = format_day_schedule(&events, date);

        let standup = message.find("1\\. **Standup** (09:00–09:30)").unwrap();
        let review = message.find("2\\. **Review** (14:00–14:30)").unwrap();
        assert!(standup < review);
        assert!(message.contains("8 January 2024"));
        assert!(message.ends_with("_Meetings in total: 2_"));
    }

    #[test]
    fn test_empty_day_schedule() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let message = format_day_schedule(&[], date);
        assert!(message.contains("Free day"));
    }

    #[test]
    fn test_reminder_contains_details() {
        let e = event("a", "Design review", 10).with_details(
            Some("Room *4*".to_string()),
            Some("<p>Join https://meet.google.com/abc-defg-hij and read https://docs.example.com/x</p>"
                .to_string()),
        );
        let message = format_reminder(&e, 30);

        assert!(message.starts_with("⏰ **In 30 minutes:** Design review"));
        assert!(message.contains("🕐 10:00 – 10:30"));
        assert!(message.contains("📍 Room \\*4\\*"));
        assert!(message.contains("[Join the meeting](<https://meet.google.com/abc-defg-hij>)"));
        assert!(message.contains("🔗 <https://docs.example.com/x>"));
        assert_eq!(message.matches("meet.google.com").count(), 2);
    }

    #[test]
    fn test_reminder_truncates_description() {
        let e = event("a", "Sync", 10).with_details(None, Some("x".repeat(400)));
        let message = format_reminder(&e, 15);
        assert!(message.contains(&format!("_{}…_", "x".repeat(300))));
    }

    #[test]
    fn test_change_messages() {
        let moved = EventChange {
            kind: ChangeKind::Moved,
            event: event("a", "Sync", 15),
            previous_start: Some(event("a", "Sync", 10).start),
        };
        let message = format_change(&moved);
        assert!(message.contains("Meeting moved"));
        assert!(message.contains("**08.01 at 15:00**"));
        assert!(message.contains("Was: 08.01 at 10:00"));

        let cancelled = EventChange {
            kind: ChangeKind::Cancelled,
            event: event("a", "Sync", 15),
            previous_start: None,
        };
        assert!(format_change(&cancelled).starts_with("❌ **Meeting cancelled:** Sync"));

        let new = EventChange {
            kind: ChangeKind::New,
            event: event("b", "Kickoff", 11),
            previous_start: None,
        };
        let message = format_change(&new);
        assert!(message.contains("New meeting:** Kickoff"));
        assert!(message.contains("08.01 at 11:00"));
    }

    #[test]
    fn test_week_ahead_groups_by_day() {
        let mut tuesday = event("c", "Retro", 12);
        tuesday.start = tuesday.start + Duration::days(1);
        tuesday.end = tuesday.end.map(|end| end + Duration::days(1));
        let events = vec![event("a", "Standup", 9), event("b", "Review", 14), tuesday];

        let message = format_week_ahead(&events);

        assert_eq!(message.matches("📅 **Monday, 08.01**").count(), 1);
        assert_eq!(message.matches("📅 **Tuesday, 09.01**").count(), 1);
        assert!(message.contains("  • Retro (12:00–12:30)"));
        assert!(message.ends_with("_Meetings in total: 3_"));
    }

    #[test]
    fn test_week_ahead_without_events() {
        assert!(format_week_ahead(&[]).contains("_No meetings_"));
    }

    #[test]
    fn test_all_day_time_range() {
        let mut e = event("a", "Holiday", 0);
        e.all_day = true;
        assert_eq!(time_range(&e, "–"), "all day");
    }
}
