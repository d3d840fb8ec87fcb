use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse time string in HH:MM format
pub fn parse_time(time_str: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let hour = parts[0].parse::<u32>().ok()?;
    let minute = parts[1].parse::<u32>().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// Normalize a time string to zero-padded `HH:MM` so it compares against `format_clock`
pub fn normalize_time(time_str: &str) -> Option<String> {
    let (hour, minute) = parse_time(time_str.trim())?;
    Some(format!("{:02}:{:02}", hour, minute))
}

/// Local wall-clock minute of an instant as `HH:MM`
pub fn format_clock(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%H:%M").to_string()
}

/// Resolve a local naive datetime in a zone, taking the earlier instant on DST overlaps
/// and skipping forward over DST gaps
pub fn resolve_local(tz: Tz, naive: &NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(naive).earliest() {
        Some(dt) => dt,
        None => {
            // Inside a DST gap: the wall-clock time does not exist, so shift past it
            let shifted = *naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(naive))
        }
    }
}

/// Local midnight of a date in a zone
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    resolve_local(tz, &date.and_time(chrono::NaiveTime::MIN))
}

/// Window covering one local calendar day, midnight to next midnight
pub fn local_day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(date, tz);
    let next = date.succ_opt().unwrap_or(date);
    let end = local_midnight(next, tz);
    (start.with_timezone(&Utc), end.with_timezone(&Utc))
}

/// Window from now over the given number of days
pub fn upcoming_window(now: DateTime<Utc>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::days(i64::from(days)))
}

/// Window of +/- tolerance around an instant
pub fn tolerance_window(
    target: DateTime<Utc>,
    tolerance: Duration,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (target - tolerance, target + tolerance)
}
