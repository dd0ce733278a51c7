use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

/// Channel statuses keyed by the channel name, in config order.
pub type ChannelStatuses = IndexMap<String, ChannelStatus>;

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatus {
    pub is_live: bool,
    pub stream_id: String,
    pub title: String,
    pub thumbnail_url: String,
}

/// Playback state reported by the player.
///
/// `0` means stopped, any positive value means the player has something
/// loaded.  `5` is reported once the loaded media has ended.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct PlayerState(i64);

impl PlayerState {
    pub const STOPPED: PlayerState = PlayerState(0);
    pub const ENDED: PlayerState = PlayerState(5);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_active(&self) -> bool {
        self.0 > 0
    }

    pub fn is_playing(&self) -> bool {
        self.is_active() && *self != Self::ENDED
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state#{}", self.0)
    }
}

impl From<i64> for PlayerState {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// In-memory mirror of what the player last reported.
///
/// Fields are updated one at a time as status lines arrive, so a combination
/// of fields may be momentarily inconsistent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerSnapshot {
    pub state: PlayerState,
    pub media_ref: String,
    pub stream_id: String,
    pub position_seconds: f64,
    pub duration_seconds: f64,
}

impl PlayerSnapshot {
    pub fn apply(&mut self, update: SnapshotUpdate) {
        match update {
            SnapshotUpdate::State(state) => self.state = state,
            SnapshotUpdate::Input {
                media_ref,
                stream_id,
            } => {
                self.media_ref = media_ref;
                self.stream_id = stream_id;
            }
            SnapshotUpdate::Position(secs) => self.position_seconds = secs,
            SnapshotUpdate::Duration(secs) => self.duration_seconds = secs,
        }
    }

    pub fn is_local_file(&self) -> bool {
        self.media_ref.starts_with("file:")
    }
}

/// A single field update parsed from a status line.
#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotUpdate {
    State(PlayerState),
    Input { media_ref: String, stream_id: String },
    Position(f64),
    Duration(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlayerCommand {
    Status,
    Clear,
    Add(String),
}

impl fmt::Display for PlayerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerCommand::Status => write!(f, "status"),
            PlayerCommand::Clear => write!(f, "clear"),
            PlayerCommand::Add(target) => write!(f, "add {}", target),
        }
    }
}

// </coverage:exclude>
