use chrono::{DateTime, Duration, Utc};

/// Render a last-seen timestamp relative to `now`.
///
/// Under an hour: `"N minutes ago"`; under a day: `"N hours ago"`; otherwise
/// the absolute UTC time `YYYY-MM-DD HH:MM`. Future timestamps (clock skew)
/// count as zero minutes.
pub fn format_last_seen(was_online: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<String> {
    let seen = was_online?;
    let age = (now - seen).max(Duration::zero());

    let text = if age < Duration::hours(1) {
        format!("{} minutes ago", age.num_minutes())
    } else if age < Duration::days(1) {
        format!("{} hours ago", age.num_hours())
    } else {
        seen.format("%Y-%m-%d %H:%M").to_string()
    };
    Some(text)
}

/// Fractional hours elapsed since `seen`.
pub fn hours_since(seen: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - seen).num_seconds() as f64 / 3600.0
}
