//! iCalendar feed parsing using the icalendar crate's parser.
//!
//! Turns a raw feed into the flat, window-filtered event list the scheduler
//! works with. Recurring events are expanded into one event per occurrence,
//! each with its own identity, and `RECURRENCE-ID` overrides replace the
//! occurrence they modify.

use super::models::CalendarEvent;
use crate::error::{fetch_error, BotResult};
use crate::utils::time::{local_midnight, resolve_local};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use icalendar::{
    parser::{read_calendar, unfold, Component, Property},
    CalendarDateTime, DatePerhapsTime,
};
use rrule::RRuleSet;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Upper bound of occurrences expanded per recurring event and window
const OCCURRENCE_LIMIT: u16 = 500;

const ICS_UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const ICS_LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Start or end of a feed entry
#[derive(Debug, Clone, Copy)]
struct EntryTime {
    instant: DateTime<Utc>,
    all_day: bool,
    /// Zone in which wall-clock recurrence is computed, `None` for UTC times
    zone: Option<Tz>,
}

/// Excluded occurrence of a recurring entry
#[derive(Debug, Clone, Copy, PartialEq)]
enum ExDate {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

/// One VEVENT as read from the feed
#[derive(Debug, Clone)]
struct FeedEntry {
    uid: String,
    summary: Option<String>,
    start: EntryTime,
    end: Option<EntryTime>,
    location: Option<String>,
    description: Option<String>,
    cancelled: bool,
    rrule: Option<String>,
    exdates: Vec<ExDate>,
    recurrence_id: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
}

impl FeedEntry {
    fn duration(&self) -> Duration {
        self.end
            .map(|end| end.instant - self.start.instant)
            .filter(|d| *d > Duration::zero())
            .unwrap_or_else(Duration::zero)
    }

    /// Build an event starting at `start`, keeping this entry's duration
    fn to_event(&self, id: String, start: DateTime<Utc>, tz: Tz) -> CalendarEvent {
        let end = self.end.map(|_| (start + self.duration()).with_timezone(&tz));
        let mut event = CalendarEvent::new(
            id,
            self.summary.clone().unwrap_or_default(),
            start.with_timezone(&tz),
            end,
        )
        .with_details(self.location.clone(), self.description.clone());
        event.all_day = self.start.all_day;
        event.updated = self.updated;
        event
    }
}

/// Identity of one occurrence of a recurring entry.
///
/// Keyed on the occurrence's original start, so a `RECURRENCE-ID` override
/// keeps the identity of the occurrence it moves. Changing the DTSTART of a
/// whole series yields new identities for every occurrence, which the diff
/// reports as cancelled plus new.
pub fn occurrence_id(uid: &str, original_start: DateTime<Utc>) -> String {
    format!("{}#{}", uid, original_start.format(ICS_UTC_FORMAT))
}

/// Parse feed content into events overlapping `[from, to]`, ordered by start
pub fn parse_feed(
    content: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    tz: Tz,
) -> BotResult<Vec<CalendarEvent>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded)
        .map_err(|e| fetch_error(&format!("Failed to parse calendar feed: {}", e)))?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let mut masters = Vec::new();
    let mut overrides: HashMap<(String, DateTime<Utc>), FeedEntry> = HashMap::new();
    for component in vevents {
        let Some(entry) = parse_entry(component, tz) else {
            debug!("Skipping VEVENT without UID or DTSTART");
            continue;
        };
        match entry.recurrence_id {
            Some(recurrence_id) => {
                overrides.insert((entry.uid.clone(), recurrence_id), entry);
            }
            None => masters.push(entry),
        }
    }

    let mut events = Vec::new();
    for master in &masters {
        match &master.rrule {
            Some(rule) => match expand_occurrences(master, rule, from, to, tz) {
                Ok(occurrences) => {
                    for occurrence in occurrences {
                        let id = occurrence_id(&master.uid, occurrence);
                        match overrides.remove(&(master.uid.clone(), occurrence)) {
                            Some(changed) if !changed.cancelled => {
                                events.push(changed.to_event(id, changed.start.instant, tz));
                            }
                            Some(_) => {}
                            None if !master.cancelled => {
                                events.push(master.to_event(id, occurrence, tz));
                            }
                            None => {}
                        }
                    }
                }
                Err(e) => warn!("Skipping recurring event {}: {}", master.uid, e),
            },
            None if !master.cancelled => {
                events.push(master.to_event(master.uid.clone(), master.start.instant, tz));
            }
            None => {}
        }
    }

    // Overrides whose original occurrence lies outside the window may still move into it
    for ((uid, recurrence_id), changed) in overrides {
        if !changed.cancelled {
            events.push(changed.to_event(occurrence_id(&uid, recurrence_id), changed.start.instant, tz));
        }
    }

    let mut seen = HashSet::new();
    let mut events: Vec<CalendarEvent> = events
        .into_iter()
        .filter(|event| event.is_usable() && event.overlaps(from, to))
        .filter(|event| seen.insert(event.id.clone()))
        .collect();
    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));

    Ok(events)
}

fn collect_vevents<'a, 'b>(components: &'b [Component<'a>], out: &mut Vec<&'b Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

fn parse_entry(vevent: &Component<'_>, tz: Tz) -> Option<FeedEntry> {
    let uid = vevent.find_prop("UID")?.val.to_string();
    let start = DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?)
        .ok()
        .map(|dpt| entry_time(dpt, tz))?;
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(|dpt| entry_time(dpt, tz));

    let text = |name: &str| {
        vevent
            .find_prop(name)
            .map(|p| unescape_text(p.val.as_ref()))
            .filter(|v| !v.trim().is_empty())
    };

    let cancelled = vevent
        .find_prop("STATUS")
        .map(|p| p.val.as_ref().eq_ignore_ascii_case("CANCELLED"))
        .unwrap_or(false);

    let recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(|dpt| entry_time(dpt, tz).instant);

    let exdates = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(|p| parse_exdate_property(p, tz))
        .collect();

    let updated = vevent
        .find_prop("LAST-MODIFIED")
        .and_then(|p| NaiveDateTime::parse_from_str(p.val.as_ref(), ICS_UTC_FORMAT).ok())
        .map(|dt| dt.and_utc());

    Some(FeedEntry {
        uid,
        summary: text("SUMMARY"),
        start,
        end,
        location: text("LOCATION"),
        description: text("DESCRIPTION"),
        cancelled,
        rrule: vevent.find_prop("RRULE").map(|p| p.val.to_string()),
        exdates,
        recurrence_id,
        updated,
    })
}

/// Convert icalendar's DatePerhapsTime into an instant, resolving zones
fn entry_time(dpt: DatePerhapsTime, tz: Tz) -> EntryTime {
    match dpt {
        DatePerhapsTime::Date(date) => EntryTime {
            instant: local_midnight(date, tz).with_timezone(&Utc),
            all_day: true,
            zone: Some(tz),
        },
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => EntryTime {
                instant: dt,
                all_day: false,
                zone: None,
            },
            CalendarDateTime::Floating(naive) => EntryTime {
                instant: resolve_local(tz, &naive).with_timezone(&Utc),
                all_day: false,
                zone: Some(tz),
            },
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                let zone = parse_tzid(&tzid).unwrap_or(tz);
                EntryTime {
                    instant: resolve_local(zone, &date_time).with_timezone(&Utc),
                    all_day: false,
                    zone: Some(zone),
                }
            }
        },
    }
}

fn parse_tzid(tzid: &str) -> Option<Tz> {
    let cleaned = tzid.trim().trim_matches('"').trim_start_matches('/');
    match cleaned.parse::<Tz>() {
        Ok(zone) => Some(zone),
        Err(_) => {
            debug!("Unknown TZID '{}', using configured timezone", tzid);
            None
        }
    }
}

/// Parse an EXDATE property, which may hold comma-separated values
fn parse_exdate_property(prop: &Property<'_>, tz: Tz) -> Vec<ExDate> {
    let zone = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()))
        .and_then(|tzid| parse_tzid(&tzid))
        .unwrap_or(tz);

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date || s.len() == 8 {
                NaiveDate::parse_from_str(s, "%Y%m%d").ok().map(ExDate::Day)
            } else if let Some(utc) = s.strip_suffix('Z') {
                NaiveDateTime::parse_from_str(utc, ICS_LOCAL_FORMAT)
                    .ok()
                    .map(|dt| ExDate::Instant(dt.and_utc()))
            } else {
                NaiveDateTime::parse_from_str(s, ICS_LOCAL_FORMAT)
                    .ok()
                    .map(|dt| ExDate::Instant(resolve_local(zone, &dt).with_timezone(&Utc)))
            }
        })
        .collect()
}

/// Build the rrule crate's input for an entry
fn rrule_input(start: &EntryTime, rule: &str) -> String {
    match start.zone {
        Some(zone) => {
            let local = start.instant.with_timezone(&zone).naive_local();
            format!(
                "DTSTART;TZID={}:{}\nRRULE:{}",
                zone.name(),
                local.format(ICS_LOCAL_FORMAT),
                normalize_until(rule, zone)
            )
        }
        None => format!(
            "DTSTART:{}\nRRULE:{}",
            start.instant.format(ICS_UTC_FORMAT),
            normalize_until(rule, chrono_tz::UTC)
        ),
    }
}

/// Rewrite a local or date-only UNTIL as UTC, which the rrule crate requires
fn normalize_until(rule: &str, zone: Tz) -> String {
    rule.split(';')
        .map(|part| {
            let Some(value) = part.strip_prefix("UNTIL=") else {
                return part.to_string();
            };
            if value.ends_with('Z') {
                return part.to_string();
            }
            let local = if value.len() == 8 {
                NaiveDate::parse_from_str(value, "%Y%m%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(23, 59, 59))
            } else {
                NaiveDateTime::parse_from_str(value, ICS_LOCAL_FORMAT).ok()
            };
            match local {
                Some(local) => format!(
                    "UNTIL={}",
                    resolve_local(zone, &local)
                        .with_timezone(&Utc)
                        .format(ICS_UTC_FORMAT)
                ),
                None => part.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Original start instants of a recurring entry's occurrences that can overlap `[from, to]`
fn expand_occurrences(
    master: &FeedEntry,
    rule: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    tz: Tz,
) -> BotResult<Vec<DateTime<Utc>>> {
    let rrule_set: RRuleSet = rrule_input(&master.start, rule)
        .parse()
        .map_err(|e| fetch_error(&format!("Failed to parse RRULE '{}': {}", rule, e)))?;

    // Subtract/add 1 second to make the range inclusive (after/before are exclusive)
    let rrule_tz = rrule::Tz::UTC;
    let after = (from - master.duration() - Duration::seconds(1)).with_timezone(&rrule_tz);
    let before = (to + Duration::seconds(1)).with_timezone(&rrule_tz);

    let result = rrule_set.after(after).before(before).all(OCCURRENCE_LIMIT);
    if result.limited {
        warn!(
            "Recurring event {} hit the occurrence limit of {}",
            master.uid, OCCURRENCE_LIMIT
        );
    }

    let zone = master.start.zone.unwrap_or(tz);
    Ok(result
        .dates
        .iter()
        .map(|dt| dt.with_timezone(&Utc))
        .filter(|occurrence| {
            !master.exdates.iter().any(|exdate| match exdate {
                ExDate::Instant(instant) => instant == occurrence,
                ExDate::Day(day) => *day == occurrence.with_timezone(&zone).date_naive(),
            })
        })
        .collect())
}

/// Undo iCalendar TEXT escaping
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
