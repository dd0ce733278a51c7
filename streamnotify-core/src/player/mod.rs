mod parser;

#[cfg(test)]
pub(crate) mod stub;

pub use parser::parse_line;

use async_trait::async_trait;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::command_util::spawn_process;
use crate::config::PlayerConfig;
use crate::error::Error;
use crate::models::PlayerCommand;
use crate::models::SnapshotUpdate;

#[async_trait]
pub trait PlayerControl: Send {
    async fn send_command(&mut self, command: PlayerCommand) -> Result<(), Error>;

    /// Replaces the playlist with `target` and starts playing it.
    async fn play(&mut self, target: &str) -> Result<(), Error> {
        self.send_command(PlayerCommand::Clear).await?;
        self.send_command(PlayerCommand::Add(target.to_string()))
            .await
    }

    async fn stop(&mut self) -> Result<(), Error> {
        self.send_command(PlayerCommand::Clear).await
    }
}

/// A client of the line-oriented remote control interface of the player.
///
/// Status lines are read on a separate task and delivered as
/// [`SnapshotUpdate`]s through the receiver returned from [`connect`].
#[derive(Debug)]
pub struct PlayerClient {
    addr: String,
    writer: OwnedWriteHalf,
}

#[async_trait]
impl PlayerControl for PlayerClient {
    async fn send_command(&mut self, command: PlayerCommand) -> Result<(), Error> {
        tracing::debug!(addr = self.addr, %command, "Sending command");
        let line = format!("{}\n", command);
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(Error::PlayerCommandFailed)?;
        Ok(())
    }
}

/// Connects to the player, launching it when nothing listens on the address.
pub async fn connect(
    config: &PlayerConfig,
) -> Result<(PlayerClient, mpsc::UnboundedReceiver<SnapshotUpdate>), Error> {
    let stream = match TcpStream::connect(&config.addr).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(%err, addr = config.addr, "Player not running, launching it");
            launch_and_connect(config).await?
        }
    };
    tracing::info!(addr = config.addr, "Connected to the player");

    let (reader, writer) = stream.into_split();
    let (sender, receiver) = mpsc::unbounded_channel();
    tokio::spawn(
        read_status_lines(reader, sender)
            .instrument(tracing::info_span!("player", addr = config.addr)),
    );

    let client = PlayerClient {
        addr: config.addr.clone(),
        writer,
    };
    Ok((client, receiver))
}

async fn launch_and_connect(config: &PlayerConfig) -> Result<TcpStream, Error> {
    for attempt in 1..=config.connect_attempts {
        match spawn_process(&config.command) {
            Ok(child) => {
                tracing::debug!(attempt, pid = child.id(), "Launched the player");
            }
            Err(err) => {
                tracing::error!(%err, attempt, "Failed to launch the player");
                continue;
            }
        }
        tokio::time::sleep(config.connect_retry_interval).await;
        match TcpStream::connect(&config.addr).await {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                tracing::warn!(%err, attempt, addr = config.addr, "Failed to connect");
            }
        }
    }
    Err(Error::PlayerUnavailable(config.addr.clone()))
}

async fn read_status_lines<R>(reader: R, sender: mpsc::UnboundedSender<SnapshotUpdate>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut data = Vec::with_capacity(256);
    loop {
        data.clear();
        // The player may send non-utf8 sequences.
        match reader.read_until(0x0A, &mut data).await {
            Ok(0) => {
                tracing::warn!("Connection closed by the player");
                break;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&data);
                let line = line.trim_end();
                tracing::trace!(line);
                for update in parse_line(line) {
                    if sender.send(update).is_err() {
                        tracing::debug!("Receiver dropped");
                        return;
                    }
                }
            }
            Err(err) => {
                tracing::error!(%err, "Failed to read a status line");
                break;
            }
        }
    }
}

// </coverage:exclude>
