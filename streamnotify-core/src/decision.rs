use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::time::Interval;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config;
use crate::config::Config;
use crate::error::Error;
use crate::file_util;
use crate::library::pick_random_media;
use crate::live_status::LiveStatusSource;
use crate::live_status::fetch_all;
use crate::models::ChannelStatuses;
use crate::models::PlayerCommand;
use crate::models::PlayerSnapshot;
use crate::models::SnapshotUpdate;
use crate::notifier::NotificationHistory;
use crate::notifier::Notify;
use crate::player::PlayerControl;
use crate::quiet_hours::is_quiet_now;
use crate::quiet_hours::local_time_now;
use crate::selector::is_current_stream;
use crate::selector::select_by_priority;
use crate::selector::select_random_live;

/// What an ambience tick decided to do.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// The user started playback while sleeping.
    ManualResume,
    QuietHours,
    PlayPriority { channel: String, stream_id: String },
    PlayRandom { channel: String, stream_id: String },
    PlayAmbience(PathBuf),
    Keep,
}

#[derive(Clone, Copy, Debug)]
enum Tick {
    Status,
    LiveCheck,
    QuietCheck,
    Ambience,
    CacheSweep,
}

/// Owns the player snapshot and runs every decision sequentially.
pub struct DecisionLoop<P, S, N> {
    config: Arc<Config>,
    // Re-read on every live check when set.
    config_path: Option<PathBuf>,
    priority: Vec<String>,
    player: P,
    live_status: S,
    notifier: N,
    rng: Box<dyn RngCore + Send>,
    snapshot: PlayerSnapshot,
    statuses: ChannelStatuses,
    history: NotificationHistory,
    sleeping: bool,
}

impl<P, S, N> DecisionLoop<P, S, N>
where
    P: PlayerControl,
    S: LiveStatusSource,
    N: Notify,
{
    pub fn new(config: Arc<Config>, player: P, live_status: S, notifier: N) -> Self {
        DecisionLoop {
            priority: config.priority_list(),
            config,
            config_path: None,
            player,
            live_status,
            notifier,
            rng: Box::new(StdRng::from_os_rng()),
            snapshot: Default::default(),
            statuses: Default::default(),
            history: Default::default(),
            sleeping: false,
        }
    }

    pub fn with_rng<R>(mut self, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        self.rng = Box::new(rng);
        self
    }

    pub fn with_config_path<T>(mut self, config_path: T) -> Self
    where
        T: Into<PathBuf>,
    {
        self.config_path = Some(config_path.into());
        self
    }

    pub fn snapshot(&self) -> &PlayerSnapshot {
        &self.snapshot
    }

    pub fn statuses(&self) -> &ChannelStatuses {
        &self.statuses
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Prepares the thumbnail directory, announces live channels and applies
    /// quiet hours once.  An error here must abort the process.
    pub async fn start(&mut self, now: NaiveTime) -> Result<(), Error> {
        let thumb_dir = &self.config.notification.thumb_dir;
        file_util::ensure_dir(thumb_dir)?;
        let nremoved = file_util::remove_contents(thumb_dir)?;
        tracing::debug!(?thumb_dir, nremoved, "Cleared the thumbnail cache");
        self.handle_live_check().await;
        self.handle_quiet_check(now).await?;
        Ok(())
    }

    pub async fn run(
        mut self,
        mut updates: mpsc::UnboundedReceiver<SnapshotUpdate>,
        shutdown: CancellationToken,
    ) -> Result<(), Error> {
        let timers = &self.config.timers;
        let mut status_timer = make_interval(timers.status);
        let mut live_check_timer = make_interval(timers.live_check);
        let mut quiet_check_timer = make_interval(timers.quiet_check);
        let mut ambience_timer = make_interval(timers.ambience);
        let mut cache_sweep_timer = make_interval(timers.cache_sweep);
        let mut receiving = true;

        tracing::info!("Started");
        loop {
            let tick = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                update = updates.recv(), if receiving => {
                    match update {
                        Some(update) => self.apply_update(update),
                        None => {
                            tracing::warn!("No more status updates from the player");
                            receiving = false;
                        }
                    }
                    continue;
                }
                _ = status_timer.tick() => Tick::Status,
                _ = live_check_timer.tick() => Tick::LiveCheck,
                _ = quiet_check_timer.tick() => Tick::QuietCheck,
                _ = ambience_timer.tick() => Tick::Ambience,
                _ = cache_sweep_timer.tick() => Tick::CacheSweep,
            };
            // A handler may wait on the network or the player.
            match shutdown.run_until_cancelled(self.handle_tick(tick)).await {
                Some(result) => result?,
                None => {
                    tracing::info!(?tick, "Shutdown requested while handling a tick");
                    break;
                }
            }
        }
        tracing::info!("Stopped");
        Ok(())
    }

    async fn handle_tick(&mut self, tick: Tick) -> Result<(), Error> {
        tracing::trace!(?tick);
        match tick {
            Tick::Status => self.player.send_command(PlayerCommand::Status).await?,
            Tick::LiveCheck => self.handle_live_check().await,
            Tick::QuietCheck => self.handle_quiet_check(local_time_now()).await?,
            Tick::Ambience => {
                self.handle_ambience(local_time_now()).await?;
            }
            Tick::CacheSweep => self.handle_cache_sweep(),
        }
        Ok(())
    }

    fn apply_update(&mut self, update: SnapshotUpdate) {
        tracing::trace!(?update);
        if let SnapshotUpdate::State(state) = update {
            if state != self.snapshot.state {
                tracing::debug!(%state, "Player state changed");
            }
        }
        self.snapshot.apply(update);
    }

    fn reload_config(&mut self) {
        let Some(config_path) = self.config_path.as_ref() else {
            return;
        };
        match config::reload(config_path) {
            Ok(config) => {
                tracing::debug!(?config_path, "Reloaded the config");
                self.priority = config.priority_list();
                self.config = config;
            }
            Err(err) => {
                tracing::warn!(
                    %err,
                    ?config_path,
                    "Failed to reload the config, keep using the current one"
                );
            }
        }
    }

    async fn handle_live_check(&mut self) {
        self.reload_config();
        self.statuses = fetch_all(&self.live_status, &self.config.channels).await;
        tracing::info!(
            nchannels = self.statuses.len(),
            nlive = self.statuses.values().filter(|status| status.is_live).count(),
            "Updated live statuses"
        );
        for (channel, status) in self.statuses.iter() {
            if !status.is_live {
                continue;
            }
            if self.history.should_notify(&status.stream_id) {
                self.notifier.notify(channel, status).await;
            }
        }
    }

    async fn handle_quiet_check(&mut self, now: NaiveTime) -> Result<(), Error> {
        let quiet_hours = &self.config.quiet_hours;
        if !is_quiet_now(now, &quiet_hours.start, &quiet_hours.end) {
            return Ok(());
        }
        if self.snapshot.state.is_active() {
            tracing::info!(%now, state = %self.snapshot.state, "Quiet hours, stopping playback");
            self.player.stop().await?;
            self.sleeping = true;
        }
        Ok(())
    }

    async fn handle_ambience(&mut self, now: NaiveTime) -> Result<Decision, Error> {
        let decision = self.decide(now).await?;
        tracing::debug!(?decision);
        Ok(decision)
    }

    async fn decide(&mut self, now: NaiveTime) -> Result<Decision, Error> {
        let playing = self.snapshot.state.is_playing();

        if playing && self.sleeping {
            tracing::info!("Playback resumed manually");
            self.sleeping = false;
            return Ok(Decision::ManualResume);
        }

        let quiet_hours = &self.config.quiet_hours;
        if is_quiet_now(now, &quiet_hours.start, &quiet_hours.end) {
            return Ok(Decision::QuietHours);
        }

        if let Some((channel, stream_id)) =
            select_by_priority(&self.priority, &self.statuses, &self.snapshot.stream_id)
        {
            tracing::info!(channel, stream.id = stream_id, "Playing a priority stream");
            self.play_stream(&stream_id).await?;
            return Ok(Decision::PlayPriority { channel, stream_id });
        }

        // A tracked stream which is playing decides whether the player is on.
        let on = self
            .statuses
            .values()
            .find(|status| is_current_stream(&self.snapshot.stream_id, &status.stream_id))
            .map_or(playing, |status| status.is_live);

        if (!on || self.snapshot.is_local_file()) && self.config.randomize_streams {
            let picked = select_random_live(&self.statuses, &self.snapshot.stream_id, &mut self.rng)
                .map(|(channel, status)| (channel.to_string(), status.stream_id.clone()));
            if let Some((channel, stream_id)) = picked {
                tracing::info!(channel, stream.id = stream_id, "Playing a random stream");
                self.play_stream(&stream_id).await?;
                return Ok(Decision::PlayRandom { channel, stream_id });
            }
        }

        if !on {
            if let Some(path) = self.pick_ambience() {
                tracing::info!(?path, "Playing ambience");
                self.player.play(&path.to_string_lossy()).await?;
                return Ok(Decision::PlayAmbience(path));
            }
        }

        Ok(Decision::Keep)
    }

    async fn play_stream(&mut self, stream_id: &str) -> Result<(), Error> {
        let url = self.config.live_status.watch_url_of(stream_id)?;
        self.player.play(&url).await
    }

    fn pick_ambience(&mut self) -> Option<PathBuf> {
        let music_dir = match self.config.music_dir.as_ref() {
            Some(music_dir) => music_dir,
            None => {
                tracing::debug!("No music directory configured");
                return None;
            }
        };
        match pick_random_media(music_dir, &mut self.rng) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(%err, ?music_dir, "No ambience to play");
                None
            }
        }
    }

    fn handle_cache_sweep(&self) {
        let thumb_dir = &self.config.notification.thumb_dir;
        match file_util::remove_contents(thumb_dir) {
            Ok(nremoved) => tracing::info!(?thumb_dir, nremoved, "Swept the thumbnail cache"),
            Err(err) => tracing::error!(%err, ?thumb_dir, "Failed to sweep the thumbnail cache"),
        }
    }
}

// The first tick fires after one period.
fn make_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

// <coverage:exclude>
#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_status::stub::LiveStatusStub;
    use crate::models::ChannelStatus;
    use crate::models::PlayerState;
    use crate::player::stub::PlayerStub;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use indexmap::indexmap;
    use tempfile::TempDir;
    use test_log::test;

    mockall::mock! {
        Notifier {}

        #[async_trait]
        impl Notify for Notifier {
            async fn notify(&self, channel: &str, status: &ChannelStatus);
        }
    }

    macro_rules! t {
        ($h:expr, $m:expr) => {
            NaiveTime::from_hms_opt($h, $m, 0).unwrap()
        };
    }

    const DAYTIME: (u32, u32) = (12, 0);
    const QUIET: (u32, u32) = (4, 0);

    struct Fixture {
        player: PlayerStub,
        live_status: LiveStatusStub,
    }

    fn test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.priority = "a, b".to_string();
        config.channels = indexmap! {
            "a".to_string() => "id-a".to_string(),
            "b".to_string() => "id-b".to_string(),
            "c".to_string() => "id-c".to_string(),
        };
        config.notification.thumb_dir = dir.path().join("thumb");
        config
    }

    fn quiet_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().returning(|_, _| ());
        notifier
    }

    fn make_loop(
        config: Config,
        notifier: MockNotifier,
    ) -> (TestLoop, Fixture) {
        let player = PlayerStub::default();
        let live_status = LiveStatusStub::default();
        let decision_loop = DecisionLoop::new(
            Arc::new(config),
            player.clone(),
            live_status.clone(),
            notifier,
        )
        .with_rng(StdRng::seed_from_u64(0));
        let fixture = Fixture {
            player,
            live_status,
        };
        (decision_loop, fixture)
    }

    type TestLoop = DecisionLoop<PlayerStub, LiveStatusStub, MockNotifier>;

    fn play_state(decision_loop: &mut TestLoop, state: i64) {
        decision_loop.apply_update(SnapshotUpdate::State(PlayerState::from(state)));
    }

    fn play_input(
        decision_loop: &mut TestLoop,
        media_ref: &str,
        stream_id: &str,
    ) {
        decision_loop.apply_update(SnapshotUpdate::Input {
            media_ref: media_ref.to_string(),
            stream_id: stream_id.to_string(),
        });
    }

    fn watch_url(id: &str) -> PlayerCommand {
        PlayerCommand::Add(format!("https://www.youtube.com/watch?v={}", id))
    }

    #[test(tokio::test)]
    async fn test_quiet_check_stops_playback() {
        let dir = TempDir::new().unwrap();
        let (mut decision_loop, fixture) = make_loop(test_config(&dir), quiet_notifier());

        play_state(&mut decision_loop, 3);
        decision_loop.handle_quiet_check(t!(QUIET.0, QUIET.1)).await.unwrap();
        assert!(decision_loop.is_sleeping());
        assert_eq!(fixture.player.commands(), vec![PlayerCommand::Clear]);

        // A play event clears `sleeping` without any command.
        fixture.player.clear_commands();
        play_state(&mut decision_loop, 3);
        let decision = decision_loop.handle_ambience(t!(QUIET.0, QUIET.1)).await.unwrap();
        assert_eq!(decision, Decision::ManualResume);
        assert!(!decision_loop.is_sleeping());
        assert!(fixture.player.commands().is_empty());

        // Once resumed manually, quiet hours keep the player untouched.
        let decision = decision_loop.handle_ambience(t!(QUIET.0, QUIET.1)).await.unwrap();
        assert_eq!(decision, Decision::QuietHours);
        assert!(fixture.player.commands().is_empty());
    }

    #[test(tokio::test)]
    async fn test_quiet_check_outside_quiet_hours() {
        let dir = TempDir::new().unwrap();
        let (mut decision_loop, fixture) = make_loop(test_config(&dir), quiet_notifier());

        play_state(&mut decision_loop, 3);
        decision_loop.handle_quiet_check(t!(DAYTIME.0, DAYTIME.1)).await.unwrap();
        assert!(!decision_loop.is_sleeping());
        assert!(fixture.player.commands().is_empty());
    }

    #[test(tokio::test)]
    async fn test_quiet_check_inactive_player() {
        let dir = TempDir::new().unwrap();
        let (mut decision_loop, fixture) = make_loop(test_config(&dir), quiet_notifier());

        decision_loop.handle_quiet_check(t!(QUIET.0, QUIET.1)).await.unwrap();
        assert!(!decision_loop.is_sleeping());
        assert!(fixture.player.commands().is_empty());
    }

    #[test(tokio::test)]
    async fn test_ambience_plays_priority_stream() {
        let dir = TempDir::new().unwrap();
        let (mut decision_loop, fixture) = make_loop(test_config(&dir), quiet_notifier());
        fixture.live_status.set("id-a", offline!());
        fixture.live_status.set("id-b", live!("X"));
        fixture.live_status.set("id-c", live!("Y"));
        decision_loop.handle_live_check().await;

        let decision = decision_loop.handle_ambience(t!(DAYTIME.0, DAYTIME.1)).await.unwrap();
        assert_eq!(
            decision,
            Decision::PlayPriority {
                channel: "b".to_string(),
                stream_id: "X".to_string(),
            }
        );
        assert_eq!(
            fixture.player.commands(),
            vec![PlayerCommand::Clear, watch_url("X")]
        );

        // Already playing.
        fixture.player.clear_commands();
        play_state(&mut decision_loop, 3);
        play_input(&mut decision_loop, "https://x/id/X/source", "X");
        let decision = decision_loop.handle_ambience(t!(DAYTIME.0, DAYTIME.1)).await.unwrap();
        assert_eq!(decision, Decision::Keep);
        assert!(fixture.player.commands().is_empty());
    }

    #[test(tokio::test)]
    async fn test_ambience_in_quiet_hours() {
        let dir = TempDir::new().unwrap();
        let (mut decision_loop, fixture) = make_loop(test_config(&dir), quiet_notifier());
        fixture.live_status.set("id-a", live!("X"));
        decision_loop.handle_live_check().await;

        let decision = decision_loop.handle_ambience(t!(QUIET.0, QUIET.1)).await.unwrap();
        assert_eq!(decision, Decision::QuietHours);
        assert!(fixture.player.commands().is_empty());
    }

    #[test(tokio::test)]
    async fn test_ambience_plays_random_stream() {
        let dir = TempDir::new().unwrap();
        let (mut decision_loop, fixture) = make_loop(test_config(&dir), quiet_notifier());
        fixture.live_status.set("id-a", offline!());
        fixture.live_status.set("id-b", offline!());
        fixture.live_status.set("id-c", live!("Z"));
        decision_loop.handle_live_check().await;

        let decision = decision_loop.handle_ambience(t!(DAYTIME.0, DAYTIME.1)).await.unwrap();
        assert_eq!(
            decision,
            Decision::PlayRandom {
                channel: "c".to_string(),
                stream_id: "Z".to_string(),
            }
        );
        assert_eq!(
            fixture.player.commands(),
            vec![PlayerCommand::Clear, watch_url("Z")]
        );
    }

    #[test(tokio::test)]
    async fn test_ambience_replaces_local_file_with_live_stream() {
        let dir = TempDir::new().unwrap();
        let (mut decision_loop, fixture) = make_loop(test_config(&dir), quiet_notifier());
        fixture.live_status.set("id-c", live!("Z"));
        decision_loop.handle_live_check().await;

        play_state(&mut decision_loop, 3);
        play_input(&mut decision_loop, "file:///music/rain.mp3", "");
        let decision = decision_loop.handle_ambience(t!(DAYTIME.0, DAYTIME.1)).await.unwrap();
        assert_matches!(decision, Decision::PlayRandom { channel, stream_id } => {
            assert_eq!(channel, "c");
            assert_eq!(stream_id, "Z");
        });
    }

    #[test(tokio::test)]
    async fn test_ambience_keeps_playing_tracked_stream() {
        let dir = TempDir::new().unwrap();
        let (mut decision_loop, fixture) = make_loop(test_config(&dir), quiet_notifier());
        fixture.live_status.set("id-a", offline!());
        fixture.live_status.set("id-c", live!("Z"));
        decision_loop.handle_live_check().await;

        play_state(&mut decision_loop, 3);
        play_input(&mut decision_loop, "https://x/id/Z/source", "Z");
        let decision = decision_loop.handle_ambience(t!(DAYTIME.0, DAYTIME.1)).await.unwrap();
        assert_eq!(decision, Decision::Keep);
        assert!(fixture.player.commands().is_empty());
    }

    #[test(tokio::test)]
    async fn test_ambience_random_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.randomize_streams = false;
        let (mut decision_loop, fixture) = make_loop(config, quiet_notifier());
        fixture.live_status.set("id-c", live!("Z"));
        decision_loop.handle_live_check().await;

        let decision = decision_loop.handle_ambience(t!(DAYTIME.0, DAYTIME.1)).await.unwrap();
        assert_eq!(decision, Decision::Keep);
        assert!(fixture.player.commands().is_empty());
    }

    #[test(tokio::test)]
    async fn test_ambience_plays_local_media() {
        let dir = TempDir::new().unwrap();
        let music_dir = dir.path().join("music");
        std::fs::create_dir(&music_dir).unwrap();
        std::fs::write(music_dir.join("rain.mp3"), "").unwrap();
        let mut config = test_config(&dir);
        config.music_dir = Some(music_dir.clone());
        let (mut decision_loop, fixture) = make_loop(config, quiet_notifier());
        fixture.live_status.set("id-a", offline!());
        decision_loop.handle_live_check().await;

        // The loaded media has ended.
        play_state(&mut decision_loop, 5);
        let decision = decision_loop.handle_ambience(t!(DAYTIME.0, DAYTIME.1)).await.unwrap();
        let path = music_dir.join("rain.mp3");
        assert_eq!(decision, Decision::PlayAmbience(path.clone()));
        assert_eq!(
            fixture.player.commands(),
            vec![
                PlayerCommand::Clear,
                PlayerCommand::Add(path.to_string_lossy().to_string()),
            ]
        );

        // Ambience is playing and nothing is live.
        fixture.player.clear_commands();
        play_state(&mut decision_loop, 3);
        play_input(&mut decision_loop, "file:///music/rain.mp3", "");
        let decision = decision_loop.handle_ambience(t!(DAYTIME.0, DAYTIME.1)).await.unwrap();
        assert_eq!(decision, Decision::Keep);
        assert!(fixture.player.commands().is_empty());
    }

    #[test(tokio::test)]
    async fn test_ambience_empty_media_dir() {
        let dir = TempDir::new().unwrap();
        let music_dir = dir.path().join("music");
        std::fs::create_dir(&music_dir).unwrap();
        let mut config = test_config(&dir);
        config.music_dir = Some(music_dir);
        let (mut decision_loop, fixture) = make_loop(config, quiet_notifier());

        let decision = decision_loop.handle_ambience(t!(DAYTIME.0, DAYTIME.1)).await.unwrap();
        assert_eq!(decision, Decision::Keep);
        assert!(fixture.player.commands().is_empty());
    }

    #[test(tokio::test)]
    async fn test_ambience_send_failure() {
        let dir = TempDir::new().unwrap();
        let config = Arc::new(test_config(&dir));
        let live_status = LiveStatusStub::default();
        live_status.set("id-a", live!("X"));
        let mut decision_loop =
            DecisionLoop::new(config, PlayerStub::broken(), live_status, quiet_notifier());
        decision_loop.handle_live_check().await;

        let result = decision_loop.handle_ambience(t!(DAYTIME.0, DAYTIME.1)).await;
        assert_matches!(result, Err(Error::PlayerCommandFailed(_)));
    }

    #[test(tokio::test)]
    async fn test_ambience_first_tracked_stream_decides() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.priority = "".to_string();
        let (mut decision_loop, fixture) = make_loop(config, quiet_notifier());
        fixture.live_status.set("id-a", live!("X"));
        // A stale entry for the same stream.
        fixture.live_status.set(
            "id-b",
            ChannelStatus {
                is_live: false,
                stream_id: "X".to_string(),
                ..Default::default()
            },
        );
        fixture.live_status.set("id-c", live!("Y"));
        decision_loop.handle_live_check().await;

        play_state(&mut decision_loop, 3);
        play_input(&mut decision_loop, "https://x/id/X/source", "X");
        let decision = decision_loop.handle_ambience(t!(DAYTIME.0, DAYTIME.1)).await.unwrap();
        assert_eq!(decision, Decision::Keep);
        assert!(fixture.player.commands().is_empty());
    }

    #[test(tokio::test)]
    async fn test_live_check_reloads_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yml");
        let thumb_dir = dir.path().join("thumb");
        let write_config = |body: &str| {
            let yaml = format!("{}notification:\n  thumb-dir: {}\n", body, thumb_dir.display());
            std::fs::write(&config_path, yaml).unwrap();
        };
        write_config("priority: a, b\nchannels:\n  a: id-a\n  b: id-b\n  c: id-c\n");

        let player = PlayerStub::default();
        let live_status = LiveStatusStub::default();
        live_status.set("id-a", live!("X"));
        live_status.set("id-b", live!("Y"));
        live_status.set("id-c", live!("Z"));
        let mut decision_loop = DecisionLoop::new(
            config::load(&config_path),
            player,
            live_status,
            quiet_notifier(),
        )
        .with_config_path(config_path.clone());

        decision_loop.handle_live_check().await;
        assert_eq!(decision_loop.statuses().len(), 3);
        assert_eq!(decision_loop.priority, vec!["a", "b"]);

        // Channel `c` removed between two ticks.
        write_config("priority: b\nchannels:\n  a: id-a\n  b: id-b\n");
        decision_loop.handle_live_check().await;
        assert_eq!(
            decision_loop.statuses().keys().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(decision_loop.priority, vec!["b"]);

        // A broken file keeps the current config.
        std::fs::write(&config_path, "channels: [").unwrap();
        decision_loop.handle_live_check().await;
        assert_eq!(decision_loop.statuses().len(), 2);
        assert_eq!(decision_loop.priority, vec!["b"]);
    }

    #[test(tokio::test)]
    async fn test_live_check_notifies_once() {
        let dir = TempDir::new().unwrap();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|channel, status| channel.to_string() == "b" && status.stream_id == "X")
            .times(1)
            .returning(|_, _| ());
        notifier
            .expect_notify()
            .withf(|channel, status| channel.to_string() == "c" && status.stream_id == "Y")
            .times(1)
            .returning(|_, _| ());
        let (mut decision_loop, fixture) = make_loop(test_config(&dir), notifier);

        fixture.live_status.set("id-a", offline!());
        fixture.live_status.set("id-b", live!("X"));
        decision_loop.handle_live_check().await;
        assert_eq!(decision_loop.statuses().len(), 2);

        fixture.live_status.set("id-c", live!("Y"));
        decision_loop.handle_live_check().await;
        decision_loop.handle_live_check().await;
        assert_eq!(decision_loop.statuses().len(), 3);
    }

    #[test(tokio::test)]
    async fn test_start() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let thumb_dir = config.notification.thumb_dir.clone();
        std::fs::create_dir(&thumb_dir).unwrap();
        std::fs::write(thumb_dir.join("old.jpg"), "").unwrap();

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(|_, _| ());
        let (mut decision_loop, fixture) = make_loop(config, notifier);
        fixture.live_status.set("id-a", live!("X"));

        decision_loop.start(t!(QUIET.0, QUIET.1)).await.unwrap();
        assert!(thumb_dir.is_dir());
        assert!(!thumb_dir.join("old.jpg").exists());
        assert_eq!(decision_loop.statuses().len(), 1);
        // Nothing has been reported from the player yet.
        assert!(!decision_loop.is_sleeping());
        assert!(fixture.player.commands().is_empty());
    }

    #[test(tokio::test)]
    async fn test_start_unusable_thumb_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        let file = dir.path().join("file");
        std::fs::write(&file, "").unwrap();
        config.notification.thumb_dir = file.join("thumb");
        let (mut decision_loop, _fixture) = make_loop(config, quiet_notifier());

        let result = decision_loop.start(t!(DAYTIME.0, DAYTIME.1)).await;
        assert_matches!(result, Err(Error::IoError(_)));
    }

    #[test(tokio::test)]
    async fn test_run() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.timers.status = Duration::from_millis(10);
        let (decision_loop, fixture) = make_loop(config, quiet_notifier());

        let (sender, receiver) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(decision_loop.run(receiver, shutdown.clone()));

        sender.send(SnapshotUpdate::State(PlayerState::from(3))).unwrap();
        drop(sender);

        let mut commands = vec![];
        for _ in 0..100 {
            commands = fixture.player.commands();
            if !commands.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(commands.first(), Some(&PlayerCommand::Status));

        shutdown.cancel();
        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    struct PendingLiveStatus;

    #[async_trait]
    impl LiveStatusSource for PendingLiveStatus {
        async fn fetch(&self, _channel_id: &str) -> Result<ChannelStatus, Error> {
            std::future::pending().await
        }
    }

    #[test(tokio::test)]
    async fn test_run_shutdown_during_live_check() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.timers.live_check = Duration::from_millis(10);
        let decision_loop = DecisionLoop::new(
            Arc::new(config),
            PlayerStub::default(),
            PendingLiveStatus,
            quiet_notifier(),
        );

        let (_sender, receiver) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(decision_loop.run(receiver, shutdown.clone()));

        // The live check is stuck in `fetch()` by now.
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert_matches!(result, Ok(Ok(Ok(()))));
    }

    #[test(tokio::test)]
    async fn test_run_send_failure() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.timers.status = Duration::from_millis(10);
        let decision_loop = DecisionLoop::new(
            Arc::new(config),
            PlayerStub::broken(),
            LiveStatusStub::default(),
            quiet_notifier(),
        );

        let (_sender, receiver) = mpsc::unbounded_channel();
        let result = decision_loop.run(receiver, CancellationToken::new()).await;
        assert_matches!(result, Err(Error::PlayerCommandFailed(_)));
    }
}
// </coverage:exclude>
