use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::command_util::run_command;
use crate::command_util::run_command_with_output;
use crate::config::Config;
use crate::error::Error;
use crate::file_util;
use crate::models::ChannelStatus;

// What the notification command prints when the user picks the watch action.
const WATCH_ACTION: &str = "watch";

/// Stream ids which have already been announced.
///
/// Entries are never removed, so a stream is announced at most once per
/// process lifetime.
#[derive(Debug, Default)]
pub struct NotificationHistory {
    notified: HashSet<String>,
}

impl NotificationHistory {
    /// Returns `true` and records `stream_id` if it has not been announced
    /// yet.
    pub fn should_notify(&mut self, stream_id: &str) -> bool {
        if self.notified.contains(stream_id) {
            return false;
        }
        self.notified.insert(stream_id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notified.is_empty()
    }
}

#[async_trait]
pub trait Notify: Send + Sync {
    /// Announces that `channel` went live.  Failures are logged, not returned.
    async fn notify(&self, channel: &str, status: &ChannelStatus);
}

/// Shows a desktop notification by running an external command.
pub struct CommandNotifier {
    config: Arc<Config>,
    client: reqwest::Client,
}

impl CommandNotifier {
    pub fn new(config: Arc<Config>) -> Self {
        CommandNotifier {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn thumbnail_path(&self, stream_id: &str) -> PathBuf {
        self.config
            .notification
            .thumb_dir
            .join(format!("{}.jpg", stream_id))
    }

    async fn cache_thumbnail(&self, status: &ChannelStatus) -> Result<Option<PathBuf>, Error> {
        if status.thumbnail_url.is_empty() {
            return Ok(None);
        }
        let path = self.thumbnail_path(&status.stream_id);
        if path.exists() {
            tracing::debug!(?path, "Thumbnail already cached");
            return Ok(Some(path));
        }
        let data = self
            .client
            .get(&status.thumbnail_url)
            .timeout(self.config.notification.timeout)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        file_util::ensure_dir(&self.config.notification.thumb_dir)?;
        if !file_util::save_data(&data, &path) {
            return Err(anyhow::anyhow!("Failed to save {}", path.display()).into());
        }
        Ok(Some(path))
    }

    fn make_command(&self, channel: &str, status: &ChannelStatus, icon: &str) -> Result<String, Error> {
        let url = self.config.live_status.watch_url_of(&status.stream_id)?;
        let template = mustache::compile_str(&self.config.notification.command)?;
        let data = mustache::MapBuilder::new()
            .insert_str("title", shell_words::quote(&status.title))
            .insert_str("channel", shell_words::quote(channel))
            .insert_str("icon", shell_words::quote(icon))
            .insert_str("url", shell_words::quote(&url))
            .build();
        Ok(template.render_data_to_string(&data)?)
    }

    fn make_open_command(&self, status: &ChannelStatus) -> Result<Option<String>, Error> {
        if self.config.notification.open_command.is_empty() {
            return Ok(None);
        }
        let url = self.config.live_status.watch_url_of(&status.stream_id)?;
        let template = mustache::compile_str(&self.config.notification.open_command)?;
        let data = mustache::MapBuilder::new()
            .insert_str("url", shell_words::quote(&url))
            .build();
        Ok(Some(template.render_data_to_string(&data)?))
    }
}

#[async_trait]
impl Notify for CommandNotifier {
    async fn notify(&self, channel: &str, status: &ChannelStatus) {
        if self.config.notification.disabled {
            tracing::debug!(channel, stream.id = status.stream_id, "Notification disabled");
            return;
        }

        let icon = match self.cache_thumbnail(status).await {
            Ok(Some(path)) => path.display().to_string(),
            Ok(None) => String::new(),
            Err(err) => {
                tracing::warn!(%err, channel, url = status.thumbnail_url, "Failed to cache thumbnail");
                String::new()
            }
        };

        let (command, open_command) = match self
            .make_command(channel, status, &icon)
            .and_then(|command| Ok((command, self.make_open_command(status)?)))
        {
            Ok(commands) => commands,
            Err(err) => {
                tracing::error!(%err, channel, "Failed to make a notification command");
                return;
            }
        };

        tracing::info!(channel, stream.id = status.stream_id, title = status.title, "Notifying");
        // The command may wait for a user action.
        let stream_id = status.stream_id.clone();
        tokio::spawn(async move {
            let action = match run_command_with_output(&command).await {
                Ok(output) => output,
                Err(err) => {
                    tracing::error!(%err, "Notification command failed");
                    return;
                }
            };
            if action.trim() != WATCH_ACTION {
                return;
            }
            let Some(open_command) = open_command else {
                tracing::debug!(stream.id = stream_id, "No open command");
                return;
            };
            tracing::info!(stream.id = stream_id, "Opening the stream");
            if let Err(err) = run_command(&open_command).await {
                tracing::error!(%err, stream.id = stream_id, "Open command failed");
            }
        });
    }
}

// </coverage:exclude>
