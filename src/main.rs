use anyhow::Context;
use clap::{Parser, Subcommand};
use lpr_core::config::Config;
use lpr_core::{CorrelationState, EventDeduplicator};
use lpr_feeds::{connection_status, FeedClient, HttpAppointmentResolver, HttpArchiver};
use lpr_monitor::{api, PollLoop};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lpr-monitor", about = "License plate monitor: camera detections matched to service appointments")]
struct Cli {
    /// Configuration file (defaults to ./lpr-monitor.toml when present).
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Write debug logs to /tmp/lpr-monitor-debug.log (tail -f to inspect).
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the camera and serve the read API (default).
    Run,
    /// Fetch the camera feed once and report connectivity.
    Probe,
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    if debug {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/lpr-monitor-debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
        tracing::info!("lpr-monitor debug log started, tail -f /tmp/lpr-monitor-debug.log");
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let cfg = Config::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(cfg).await,
        Command::Probe => probe(cfg).await,
    }
}

async fn run(cfg: Config) -> anyhow::Result<()> {
    let feed = FeedClient::new(&cfg.camera).context("building camera client")?;
    let resolver =
        HttpAppointmentResolver::new(&cfg.appointments).context("building appointment client")?;
    let archiver = HttpArchiver::from_config(&cfg.archive).context("building archive client")?;

    let dedup = match cfg.monitor.dedup_retention() {
        Some(retention) => EventDeduplicator::with_retention(retention),
        None => EventDeduplicator::new(),
    };

    let state = Arc::new(CorrelationState::new());
    let poll = PollLoop::new(feed, resolver, Arc::clone(&state))
        .with_poll_interval(cfg.monitor.poll_interval())
        .with_resolve_timeout(cfg.appointments.timeout())
        .with_dedup(dedup);
    poll.verify_connection().await;

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding read API on {}", cfg.server.bind))?;
    let server = tokio::spawn(api::serve(listener, Arc::clone(&state)));

    let poller = match archiver {
        Some(archiver) => tokio::spawn(poll.with_archiver(archiver).run()),
        None => {
            tracing::info!("archive.url not set; archiving disabled");
            tokio::spawn(poll.run())
        }
    };

    tokio::select! {
        res = server => {
            res.context("read API task failed")?.context("read API stopped")?;
        }
        res = poller => {
            res.context("poll loop task failed")?;
        }
        res = tokio::signal::ctrl_c() => {
            res.context("waiting for ctrl-c")?;
            tracing::info!("shutting down");
        }
    }
    Ok(())
}

async fn probe(cfg: Config) -> anyhow::Result<()> {
    let feed = FeedClient::new(&cfg.camera).context("building camera client")?;
    let fetched = feed.fetch().await;
    let status = connection_status(&fetched);
    let label = if status.connected { "Activo" } else { "Sin conexión" };
    println!("{label}: {}", status.message);

    match fetched {
        Ok(records) => {
            println!("{} evento(s) recientes", status.recent_events);
            for record in records.iter().take(10) {
                println!(
                    "  {}  {}  {}",
                    record.captured_at().format("%Y-%m-%d %H:%M:%S"),
                    record.plate(),
                    record.country().unwrap_or("-")
                );
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
