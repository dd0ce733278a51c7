use std::fs::File;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::Error;
use crate::quiet_hours::parse_time_of_day;

pub fn load<P>(config_path: P) -> Arc<Config>
where
    P: AsRef<Path>,
{
    let config_path = config_path.as_ref();
    let reader = File::open(config_path).unwrap_or_else(|err| {
        panic!("Failed to open {}: {}", config_path.display(), err);
    });
    let config: Config = serde_yaml::from_reader(reader).unwrap_or_else(|err| {
        panic!("Failed to parse {}: {}", config_path.display(), err);
    });
    config.validate();
    Arc::new(config)
}

/// Re-reads the config file while running.
///
/// Unlike `load()`, a missing, malformed or invalid file is returned as an
/// error so that the caller can keep using the current config.
pub fn reload<P>(config_path: P) -> Result<Arc<Config>, Error>
where
    P: AsRef<Path>,
{
    let reader = File::open(config_path.as_ref())?;
    let config: Config = serde_yaml::from_reader(reader)?;
    // `validate()` reports a violation by panicking.
    std::panic::catch_unwind(AssertUnwindSafe(|| config.validate()))
        .map_err(|_| anyhow::anyhow!("Invalid config: {}", config_path.as_ref().display()))?;
    Ok(Arc::new(config))
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub timers: TimersConfig,
    #[serde(default)]
    pub quiet_hours: QuietHoursConfig,
    // A comma-separated list of channel names.
    #[serde(default)]
    pub priority: String,
    // Channel name -> channel identifier on the video platform.
    #[serde(default)]
    pub channels: IndexMap<String, String>, // keeps the insertion order
    #[serde(default = "Config::default_randomize_streams")]
    pub randomize_streams: bool,
    #[serde(default)]
    pub music_dir: Option<PathBuf>,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub live_status: LiveStatusConfig,
}

impl Config {
    fn default_randomize_streams() -> bool {
        true
    }

    /// Channel names in the order of preference.
    pub fn priority_list(&self) -> Vec<String> {
        parse_priority(&self.priority)
    }

    pub fn validate(&self) {
        self.player.validate();
        self.timers.validate();
        self.quiet_hours.validate();
        self.channels.iter().for_each(|(name, id)| {
            assert!(
                !name.is_empty(),
                "config.channels: channel name must be a non-empty string"
            );
            assert!(
                !id.is_empty(),
                "config.channels.{}: channel id must be a non-empty string",
                name
            );
        });
        // Unknown names are tolerated, they never match.
        for name in self.priority_list() {
            if !self.channels.contains_key(&name) {
                tracing::warn!(channel = name, "config.priority: Unknown channel");
            }
        }
        if let Some(music_dir) = self.music_dir.as_ref() {
            assert!(
                music_dir.is_dir(),
                "config: `music-dir` must be a path to an existing directory"
            );
        }
        self.notification.validate();
        self.live_status.validate();
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            player: Default::default(),
            timers: Default::default(),
            quiet_hours: Default::default(),
            priority: Default::default(),
            channels: Default::default(),
            randomize_streams: Self::default_randomize_streams(),
            music_dir: None,
            notification: Default::default(),
            live_status: Default::default(),
        }
    }
}

pub fn parse_priority(priority: &str) -> Vec<String> {
    priority
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    #[serde(default = "PlayerConfig::default_addr")]
    pub addr: String,
    // Used for launching the player when it's not running.
    #[serde(default = "PlayerConfig::default_command")]
    pub command: String,
    #[serde(default = "PlayerConfig::default_connect_attempts")]
    pub connect_attempts: usize,
    #[serde(default = "PlayerConfig::default_connect_retry_interval")]
    #[serde(with = "humantime_serde")]
    pub connect_retry_interval: Duration,
}

impl PlayerConfig {
    fn default_addr() -> String {
        "localhost:4212".to_string()
    }

    fn default_command() -> String {
        "vlc -I rc --rc-host=localhost:4212 --one-instance --fullscreen".to_string()
    }

    fn default_connect_attempts() -> usize {
        5
    }

    fn default_connect_retry_interval() -> Duration {
        Duration::from_secs(1)
    }

    fn validate(&self) {
        assert!(
            !self.addr.is_empty(),
            "config.player: `addr` must be a non-empty string"
        );
        assert!(
            self.connect_attempts > 0,
            "config.player: `connect-attempts` must be larger than 0"
        );
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            addr: Self::default_addr(),
            command: Self::default_command(),
            connect_attempts: Self::default_connect_attempts(),
            connect_retry_interval: Self::default_connect_retry_interval(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct TimersConfig {
    #[serde(default = "TimersConfig::default_status")]
    #[serde(with = "humantime_serde")]
    pub status: Duration,
    #[serde(default = "TimersConfig::default_live_check")]
    #[serde(with = "humantime_serde")]
    pub live_check: Duration,
    #[serde(default = "TimersConfig::default_quiet_check")]
    #[serde(with = "humantime_serde")]
    pub quiet_check: Duration,
    #[serde(default = "TimersConfig::default_ambience")]
    #[serde(with = "humantime_serde")]
    pub ambience: Duration,
    #[serde(default = "TimersConfig::default_cache_sweep")]
    #[serde(with = "humantime_serde")]
    pub cache_sweep: Duration,
}

impl TimersConfig {
    fn default_status() -> Duration {
        Duration::from_secs(2)
    }

    fn default_live_check() -> Duration {
        Duration::from_secs(60)
    }

    fn default_quiet_check() -> Duration {
        Duration::from_secs(2 * 60)
    }

    fn default_ambience() -> Duration {
        Duration::from_secs(60)
    }

    fn default_cache_sweep() -> Duration {
        Duration::from_secs(12 * 60 * 60)
    }

    fn validate(&self) {
        for (name, value) in [
            ("status", self.status),
            ("live-check", self.live_check),
            ("quiet-check", self.quiet_check),
            ("ambience", self.ambience),
            ("cache-sweep", self.cache_sweep),
        ] {
            assert!(
                !value.is_zero(),
                "config.timers: `{}` must be a non-zero duration",
                name
            );
        }
    }
}

impl Default for TimersConfig {
    fn default() -> Self {
        TimersConfig {
            status: Self::default_status(),
            live_check: Self::default_live_check(),
            quiet_check: Self::default_quiet_check(),
            ambience: Self::default_ambience(),
            cache_sweep: Self::default_cache_sweep(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct QuietHoursConfig {
    #[serde(default = "QuietHoursConfig::default_start")]
    pub start: String,
    #[serde(default = "QuietHoursConfig::default_end")]
    pub end: String,
}

impl QuietHoursConfig {
    fn default_start() -> String {
        "03:00:00".to_string()
    }

    fn default_end() -> String {
        "08:00:00".to_string()
    }

    fn validate(&self) {
        // Malformed values disable quiet hours instead of stopping the process.
        if parse_time_of_day(&self.start).is_none() {
            tracing::warn!(start = self.start, "config.quiet-hours: Malformed `start`");
        }
        if parse_time_of_day(&self.end).is_none() {
            tracing::warn!(end = self.end, "config.quiet-hours: Malformed `end`");
        }
    }
}

impl Default for QuietHoursConfig {
    fn default() -> Self {
        QuietHoursConfig {
            start: Self::default_start(),
            end: Self::default_end(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    #[serde(default)]
    pub disabled: bool,
    // A mustache template.  `title`, `channel`, `icon` and `url` are
    // shell-quoted before rendering, use triple braces for them.
    #[serde(default = "NotificationConfig::default_command")]
    pub command: String,
    #[serde(default = "NotificationConfig::default_thumb_dir")]
    pub thumb_dir: PathBuf,
    // Runs with the shell-quoted `url` when the notification command prints
    // `watch`.  An empty string disables it.
    #[serde(default = "NotificationConfig::default_open_command")]
    pub open_command: String,
    #[serde(default = "NotificationConfig::default_timeout")]
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl NotificationConfig {
    fn default_command() -> String {
        "notify-send --app-name=StreamNotify --icon={{{icon}}} \
         --action=watch=Watch --action=dismiss=Dismiss \
         {{{title}}} {{{url}}}"
            .to_string()
    }

    fn default_thumb_dir() -> PathBuf {
        std::env::temp_dir().join("streamnotify").join("thumb")
    }

    fn default_open_command() -> String {
        "xdg-open {{{url}}}".to_string()
    }

    fn default_timeout() -> Duration {
        Duration::from_secs(30)
    }

    fn validate(&self) {
        if self.disabled {
            return;
        }
        assert!(
            !self.command.is_empty(),
            "config.notification: `command` must be a non-empty string"
        );
        assert!(
            mustache::compile_str(&self.command).is_ok(),
            "config.notification: `command` must be a valid mustache template"
        );
        assert!(
            mustache::compile_str(&self.open_command).is_ok(),
            "config.notification: `open-command` must be a valid mustache template"
        );
        assert!(
            !self.timeout.is_zero(),
            "config.notification: `timeout` must be a non-zero duration"
        );
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            disabled: false,
            command: Self::default_command(),
            thumb_dir: Self::default_thumb_dir(),
            open_command: Self::default_open_command(),
            timeout: Self::default_timeout(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct LiveStatusConfig {
    #[serde(default = "LiveStatusConfig::default_base_url")]
    pub base_url: String,
    // A mustache template rendered with the stream id as `id`.
    #[serde(default = "LiveStatusConfig::default_watch_url")]
    pub watch_url: String,
    #[serde(default = "LiveStatusConfig::default_timeout")]
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl LiveStatusConfig {
    fn default_base_url() -> String {
        "https://www.youtube.com".to_string()
    }

    fn default_watch_url() -> String {
        "https://www.youtube.com/watch?v={{{id}}}".to_string()
    }

    fn default_timeout() -> Duration {
        Duration::from_secs(30)
    }

    pub fn live_url_of(&self, channel_id: &str) -> String {
        format!("{}/{}/live", self.base_url.trim_end_matches('/'), channel_id)
    }

    fn validate(&self) {
        assert!(
            !self.base_url.is_empty(),
            "config.live-status: `base-url` must be a non-empty string"
        );
        assert!(
            !self.watch_url.is_empty(),
            "config.live-status: `watch-url` must be a non-empty string"
        );
        assert!(
            mustache::compile_str(&self.watch_url).is_ok(),
            "config.live-status: `watch-url` must be a valid mustache template"
        );
        assert!(
            !self.timeout.is_zero(),
            "config.live-status: `timeout` must be a non-zero duration"
        );
    }
}

impl Default for LiveStatusConfig {
    fn default() -> Self {
        LiveStatusConfig {
            base_url: Self::default_base_url(),
            watch_url: Self::default_watch_url(),
            timeout: Self::default_timeout(),
        }
    }
}

// </coverage:exclude>
