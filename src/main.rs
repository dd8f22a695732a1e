//! CLI entry point for the mail sink.

use std::net::TcpListener as StdTcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use mailsink::api::{self, AppState};
use mailsink::config::Config;
use mailsink::smtp::SmtpServer;
use mailsink::store::HistoryStore;

#[derive(Parser)]
#[command(name = "mailsink", version, about = "Development SMTP sink with an HTTP query API")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "MAILSINK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Interface both listeners bind to
    #[arg(long, env = "MAILSINK_BIND_HOST")]
    bind_host: Option<String>,

    /// SMTP listener port
    #[arg(long, env = "SMTP_PORT")]
    smtp_port: Option<u16>,

    /// HTTP listener port
    #[arg(long, env = "PORT")]
    http_port: Option<u16>,

    /// Hostname announced in SMTP greetings
    #[arg(long, env = "MAILSINK_HOSTNAME")]
    hostname: Option<String>,

    /// Number of messages kept in memory
    #[arg(long, env = "MAILSINK_CAPACITY")]
    capacity: Option<usize>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.bind_host {
            config.bind_host = host;
        }
        if let Some(port) = self.smtp_port {
            config.smtp_port = port;
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if let Some(hostname) = self.hostname {
            config.hostname = hostname;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        match self.verbose {
            0 => {}
            1 => config.log_level = "debug".to_string(),
            _ => config.log_level = "trace".to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    setup_logging(&config.log_level);

    let store = Arc::new(HistoryStore::new(config.capacity));

    let smtp_addr = config.smtp_addr();
    let smtp_listener = StdTcpListener::bind(&smtp_addr)
        .with_context(|| format!("failed to bind SMTP listener on {smtp_addr}"))?;
    let smtp = SmtpServer::new(&config.hostname, Arc::clone(&store));
    thread::Builder::new()
        .name("smtp-accept".to_string())
        .spawn(move || {
            if let Err(e) = smtp.start_with_listener(smtp_listener) {
                error!(error = %e, "SMTP server stopped");
            }
        })
        .context("failed to spawn SMTP thread")?;

    let http_addr = config.http_addr();
    let http_listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {http_addr}"))?;

    info!(
        service = %config.service_name,
        capacity = store.capacity(),
        "Mail sink started"
    );

    let state = AppState::new(store, &config.service_name);
    api::serve(http_listener, state, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutting down");
    Ok(())
}

fn setup_logging(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
