use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use log::{info, warn};
use tokio::sync::{mpsc, watch, Notify};

use irccmd::core::{CliArgs, Config};
use irccmd::input;
use irccmd::session::Session;
use irccmd::transport::IrcTransport;
use irccmd::ChannelNames;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let args = CliArgs::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .init();

    let mut config = Config::load(&args)?;

    // Interactive use only makes sense on a real terminal. It forces the
    // channel and nick prefixes on, since several channels share one
    // screen there.
    let interactive =
        config.interactive && config.mode.takes_input() && std::io::stdin().is_terminal();
    if interactive {
        config.show_channel = true;
        config.show_nick = true;
    }
    let config = Arc::new(config);

    info!("starting irccmd {}", env!("CARGO_PKG_VERSION"));

    let channel_names: ChannelNames = Arc::new(RwLock::new(Vec::new()));
    let (prompt_tx, prompt_rx) = watch::channel(String::new());

    let lines = if interactive {
        input::spawn_interactive(prompt_rx, channel_names.clone())
    } else if config.mode.takes_input() {
        input::spawn_piped()
    } else {
        // No input source; the session never polls this side.
        let (_tx, rx) = mpsc::channel(1);
        rx
    };

    let running = Arc::new(AtomicBool::new(true));
    let shutdown = Arc::new(Notify::new());
    spawn_signal_task(running.clone(), shutdown.clone());

    let mut session = Session::new(
        config,
        IrcTransport::new(),
        lines,
        prompt_tx,
        channel_names,
        running,
        shutdown,
    )?;
    session.run().await?;
    Ok(())
}

/// Translate SIGINT/SIGHUP into an orderly session shutdown. The flag is
/// set before the wakeup so the session loop cannot miss it.
fn spawn_signal_task(running: Arc<AtomicBool>, shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        running.store(false, Ordering::SeqCst);
        shutdown.notify_one();
    });
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::hangup()) {
            Ok(mut hangup) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
                    _ = hangup.recv() => info!("hangup received, shutting down"),
                }
                return;
            }
            Err(e) => warn!("cannot install hangup handler: {e}"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot wait for interrupt: {e}");
    } else {
        info!("interrupt received, shutting down");
    }
}
