use chrono::NaiveTime;
use chrono::Timelike;

/// Parses a time of day in `HH:MM:SS` or `HH:MM` format.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Returns `true` if playback has to be suppressed at `now`.
///
/// Both bounds are exclusive.  When `start` is earlier than `end`, the quiet
/// window is `start < now < end`.  Otherwise the window is `end < now < start`
/// and an empty window (`start == end`) is never quiet.
///
/// A malformed bound never makes the evaluator fail; the moment is simply not
/// quiet.
pub fn is_quiet_now(now: NaiveTime, start: &str, end: &str) -> bool {
    let (start_time, end_time) = match (parse_time_of_day(start), parse_time_of_day(end)) {
        (Some(start_time), Some(end_time)) => (start_time, end_time),
        _ => {
            tracing::warn!(start, end, "Malformed quiet hours, not quiet");
            return false;
        }
    };

    // Compare in whole seconds like the configured bounds.
    let now = now.with_nanosecond(0).unwrap_or(now);

    let quiet = if start_time < end_time {
        start_time < now && now < end_time
    } else {
        end_time < now && now < start_time
    };
    tracing::trace!(%now, %start_time, %end_time, quiet);
    quiet
}

pub fn local_time_now() -> NaiveTime {
    chrono::Local::now().time()
}

// </coverage:exclude>
