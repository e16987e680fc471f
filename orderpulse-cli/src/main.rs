use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use orderpulse_core::source;
use orderpulse_core::{DriverReport, PipelineConfig, PipelineError, StreamDriver};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "orderpulse")]
#[command(about = "Windowed KPI aggregation over an order event stream", long_about = None)]
struct Cli {
    /// Config file (TOML, YAML or JSON). Environment variables prefixed
    /// `ORDERPULSE_` override it; flags override both.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_parser = humantime::parse_duration)]
    window_size: Option<Duration>,
    #[arg(long, value_parser = humantime::parse_duration)]
    allowed_lateness: Option<Duration>,
    #[arg(long, value_parser = humantime::parse_duration)]
    flush_interval: Option<Duration>,
    /// `-` for stdin, `tcp://host:port`, `file://path` or a path.
    #[arg(long)]
    source_endpoint: Option<String>,
    #[arg(long)]
    sink_directory: Option<PathBuf>,
    #[arg(long)]
    buffer_capacity: Option<usize>,
    /// Log every accepted order.
    #[arg(long)]
    log_events: bool,
    /// Used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(v) = self.window_size {
            config.window_size = v;
        }
        if let Some(v) = self.allowed_lateness {
            config.allowed_lateness = v;
        }
        if let Some(v) = self.flush_interval {
            config.flush_interval = Some(v);
        }
        if let Some(v) = &self.source_endpoint {
            config.source_endpoint = v.clone();
        }
        if let Some(v) = &self.sink_directory {
            config.sink_directory = v.clone();
        }
        if let Some(v) = self.buffer_capacity {
            config.buffer_capacity = v;
        }
        if self.log_events {
            config.log_events = true;
        }
    }
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}

async fn run(cli: Cli) -> Result<DriverReport, PipelineError> {
    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let endpoint = config.source_endpoint.clone();
    let driver = StreamDriver::with_fs_sink(config)?;
    let source = source::connect(&endpoint)
        .await
        .map_err(|e| PipelineError::SourceConnectionLost {
            endpoint: endpoint.clone(),
            reason: format!("{:#}", e),
        })?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(forward_interrupt(tokio::signal::ctrl_c(), shutdown_tx));

    driver.run(source, shutdown_rx).await
}

/// Turn the first interrupt into a shutdown request. If the handler cannot
/// be installed the sender is kept alive, so the driver runs until end of
/// stream instead of treating the closed channel as a signal.
async fn forward_interrupt(
    interrupt: impl Future<Output = std::io::Result<()>>,
    shutdown: watch::Sender<bool>,
) {
    match interrupt.await {
        Ok(()) => {
            info!("interrupt received, shutting down");
            let _ = shutdown.send(true);
        }
        Err(e) => {
            warn!(error = %e, "cannot listen for interrupts");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs);

    match run(cli).await {
        Ok(report) => {
            info!(
                accepted = report.stats.events_accepted,
                dropped = report.stats.dropped(),
                snapshots = report.stats.snapshots_emitted,
                "orderpulse finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "orderpulse failed");
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "orderpulse",
            "--window-size",
            "5m",
            "--flush-interval",
            "30s",
            "--source-endpoint",
            "tcp://127.0.0.1:9000",
            "--log-events",
        ])
        .unwrap();
        let mut config = PipelineConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.window_size, Duration::from_secs(300));
        assert_eq!(config.flush_interval(), Duration::from_secs(30));
        assert_eq!(config.allowed_lateness, Duration::from_secs(60));
        assert_eq!(config.source_endpoint, "tcp://127.0.0.1:9000");
        assert!(config.log_events);
    }

    #[tokio::test]
    async fn test_interrupt_requests_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        forward_interrupt(async { Ok(()) }, tx).await;
        assert!(*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_failed_interrupt_handler_keeps_driver_running() {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(forward_interrupt(
            async { Err(std::io::Error::other("signals unavailable")) },
            tx,
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!task.is_finished());
        // Sender still alive and no shutdown requested.
        assert!(rx.has_changed().is_ok());
        assert!(!*rx.borrow());
        task.abort();
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        assert!(Cli::try_parse_from(["orderpulse", "--window-size", "soon"]).is_err());
    }
}
