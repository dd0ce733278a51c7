use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::config::Config;
use crate::config::LiveStatusConfig;
use crate::error::Error;
use crate::models::ChannelStatus;
use crate::models::ChannelStatuses;

const PREFERRED_THUMBNAIL_WIDTH: u32 = 1920;

// The player response is embedded as a script statement in the live page.
static PLAYER_RESPONSE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)var\s+ytInitialPlayerResponse\s*=\s*(.*?);\s*</script>").expect("valid regex")
});

#[async_trait]
pub trait LiveStatusSource: Send + Sync {
    async fn fetch(&self, channel_id: &str) -> Result<ChannelStatus, Error>;
}

/// Fetches the status of every channel.
///
/// Channels which fail are logged and left out of the result.
pub async fn fetch_all<S>(source: &S, channels: &IndexMap<String, String>) -> ChannelStatuses
where
    S: LiveStatusSource + ?Sized,
{
    let mut statuses = ChannelStatuses::new();
    for (name, channel_id) in channels.iter() {
        match source.fetch(channel_id).await {
            Ok(status) => {
                tracing::debug!(
                    channel = name,
                    channel.id = channel_id,
                    status.is_live,
                    status.stream_id,
                    "Got live status"
                );
                statuses.insert(name.clone(), status);
            }
            Err(err) => {
                tracing::error!(
                    %err,
                    channel = name,
                    channel.id = channel_id,
                    "Failed to get live status"
                );
            }
        }
    }
    statuses
}

/// Scrapes the live page of a channel on the video platform.
pub struct YoutubeLiveStatus {
    config: Arc<Config>,
    client: reqwest::Client,
}

impl YoutubeLiveStatus {
    pub fn new(config: Arc<Config>) -> Self {
        YoutubeLiveStatus {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LiveStatusSource for YoutubeLiveStatus {
    async fn fetch(&self, channel_id: &str) -> Result<ChannelStatus, Error> {
        let url = self.config.live_status.live_url_of(channel_id);
        tracing::trace!(url, "Fetching the live page");
        let html = self
            .client
            .get(&url)
            .timeout(self.config.live_status.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_live_page(&html)
    }
}

pub fn parse_live_page(html: &str) -> Result<ChannelStatus, Error> {
    let caps = PLAYER_RESPONSE_REGEX.captures(html).ok_or_else(|| {
        Error::LiveStatusUnavailable("ytInitialPlayerResponse not found".to_string())
    })?;
    let response: PlayerResponse = serde_json::from_str(&caps[1])?;
    let details = match response.video_details {
        Some(details) => details,
        None => return Ok(Default::default()),
    };
    let thumbnail_url = details.thumbnail_url().unwrap_or_default();
    Ok(ChannelStatus {
        is_live: details.is_live,
        // The page of an offline channel may show an upcoming stream.
        stream_id: if details.is_live {
            details.video_id
        } else {
            String::new()
        },
        title: details.title,
        thumbnail_url,
    })
}

impl LiveStatusConfig {
    pub fn watch_url_of(&self, stream_id: &str) -> Result<String, Error> {
        let template = mustache::compile_str(&self.watch_url)?;
        let data = mustache::MapBuilder::new()
            .insert_str("id", stream_id)
            .build();
        Ok(template.render_data_to_string(&data)?)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    #[serde(default)]
    video_details: Option<VideoDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    #[serde(default)]
    video_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    is_live: bool,
    #[serde(default)]
    thumbnail: Thumbnails,
}

impl VideoDetails {
    fn thumbnail_url(&self) -> Option<String> {
        let thumbnails = &self.thumbnail.thumbnails;
        thumbnails
            .iter()
            .find(|thumbnail| thumbnail.width == PREFERRED_THUMBNAIL_WIDTH)
            .or_else(|| thumbnails.first())
            .map(|thumbnail| thumbnail.url.clone())
    }
}

#[derive(Default, Deserialize)]
struct Thumbnails {
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
    #[serde(default)]
    width: u32,
}


// </coverage:exclude>
