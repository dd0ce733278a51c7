use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::PlayerState;
use crate::models::SnapshotUpdate;

const STATE_LABEL: &str = "state";
const INPUT_LABEL: &str = "input";
const TIME_LABEL: &str = "time";
const LENGTH_LABEL: &str = "length";

const NEW_INPUT_PREFIX: &str = "new input:";

static STATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"play state:\s*(\d+)").expect("valid regex"));

static STREAM_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/id/(.*)/source").expect("valid regex"));

/// Parses a status line sent from the player.
///
/// A line is matched by the labels it contains and may produce several
/// updates.  A label whose value cannot be parsed produces no update, so the
/// corresponding snapshot field keeps its value.
pub fn parse_line(line: &str) -> Vec<SnapshotUpdate> {
    let mut updates = vec![];

    if line.contains(STATE_LABEL) {
        match parse_state(line) {
            Some(state) => updates.push(SnapshotUpdate::State(state)),
            None => tracing::debug!(line, "No play state in line"),
        }
    }

    if line.contains(INPUT_LABEL) {
        match parse_input(line) {
            Some(media_ref) => {
                let stream_id = parse_stream_id(&media_ref).unwrap_or_default();
                updates.push(SnapshotUpdate::Input {
                    media_ref,
                    stream_id,
                });
            }
            None => tracing::debug!(line, "No new input in line"),
        }
    }

    if line.contains(TIME_LABEL) {
        match parse_seconds(line) {
            Some(secs) => updates.push(SnapshotUpdate::Position(secs)),
            None => tracing::debug!(line, "No time in line"),
        }
    }

    if line.contains(LENGTH_LABEL) {
        match parse_seconds(line) {
            Some(secs) => updates.push(SnapshotUpdate::Duration(secs)),
            None => tracing::debug!(line, "No length in line"),
        }
    }

    updates
}

fn parse_state(line: &str) -> Option<PlayerState> {
    let caps = STATE_REGEX.captures(line)?;
    caps[1].parse::<i64>().ok().map(PlayerState::from)
}

// The media reference ends at the first whitespace after the label.
fn parse_input(line: &str) -> Option<String> {
    let (_, rest) = line.split_once(NEW_INPUT_PREFIX)?;
    rest.split_whitespace().next().map(str::to_string)
}

fn parse_stream_id(media_ref: &str) -> Option<String> {
    let caps = STREAM_ID_REGEX.captures(media_ref)?;
    Some(caps[1].to_string())
}

fn parse_seconds(line: &str) -> Option<f64> {
    let (_, value) = line.split_once(": ")?;
    let value = value.trim_start();
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

// </coverage:exclude>
