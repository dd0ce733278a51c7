use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;

use streamnotify_core::error::ExitReason;
use streamnotify_core::quiet_hours::local_time_now;
use streamnotify_core::tracing_ext::init_tracing;
use streamnotify_core::*;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Opt {
    /// Path to a configuration file in a YAML format.
    ///
    /// The STREAMNOTIFY_CONFIG environment variable is used if this option is
    /// not specified.
    #[arg(short, long, env = "STREAMNOTIFY_CONFIG")]
    config: PathBuf,

    /// Logging format.
    #[arg(
        long,
        env = "STREAMNOTIFY_LOG_FORMAT",
        value_parser = ["text", "json"],
        default_value = "text",
    )]
    log_format: String,
}

#[tokio::main]
async fn main() {
    let opt = Opt::parse();

    init_tracing(&opt.log_format);

    let config = config::load(&opt.config);

    let reason = serve(config, opt.config).await;
    tracing::info!(code = reason.code(), ?reason, "Exit");
    std::process::exit(reason.code());
}

async fn serve(config: Arc<config::Config>, config_path: PathBuf) -> ExitReason {
    let shutdown = CancellationToken::new();
    if let Err(err) = watch_signals(shutdown.clone()) {
        tracing::error!(%err, "Failed to install signal handlers");
        return ExitReason::Abort;
    }

    let (player, updates) = match player::connect(&config.player).await {
        Ok(conn) => conn,
        Err(err) => {
            tracing::error!(%err, "Failed to connect to the player");
            return ExitReason::Abort;
        }
    };

    let mut decision_loop = decision::DecisionLoop::new(
        config.clone(),
        player,
        live_status::YoutubeLiveStatus::new(config.clone()),
        notifier::CommandNotifier::new(config.clone()),
    )
    .with_config_path(config_path);

    let token = shutdown.clone();
    let handle = tokio::spawn(async move {
        match token.run_until_cancelled(decision_loop.start(local_time_now())).await {
            Some(Ok(())) => (),
            Some(Err(err)) => {
                tracing::error!(%err, "Failed to start");
                return ExitReason::Abort;
            }
            None => {
                tracing::info!("Shutdown requested while starting");
                return ExitReason::Shutdown;
            }
        }
        match decision_loop.run(updates, token).await {
            Ok(()) => ExitReason::Shutdown,
            Err(err) => {
                tracing::error!(%err, "Decision loop failed");
                ExitReason::from(&err)
            }
        }
    });

    match handle.await {
        Ok(reason) => reason,
        Err(err) if err.is_panic() => {
            let panic = err.into_panic();
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            tracing::error!(panic = msg, "Decision loop panicked, waiting for a signal");
            shutdown.cancelled().await;
            ExitReason::Panic
        }
        Err(err) => {
            tracing::error!(%err, "Decision loop cancelled");
            ExitReason::Abort
        }
    }
}

fn watch_signals(shutdown: CancellationToken) -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("SIGINT received");
            }
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received");
            }
        }
        shutdown.cancel();
    });
    Ok(())
}

// </coverage:exclude>
