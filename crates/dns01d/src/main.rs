// # dns01d - DNS-01 Solver Daemon
//
// Thin integration layer. All solver and refresh logic lives in dns01-core,
// all wire formats in dns01-provider-nicru.
//
// The dns01d daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Composing the credential store, provider client and solver
// 4. Running the token refresher, or one solver invocation
//
// ## Modes
//
// - `dns01d` / `dns01d serve`: refresh tokens on schedule until SIGTERM/SIGINT
// - `dns01d present <file|->`: publish the challenge described by a JSON
//   ChallengeRequest, then exit
// - `dns01d cleanup <file|->`: remove it again
//
// ## Configuration
//
// - `GROUP_NAME`: API group of the solver (required)
// - `NAMESPACE`: Namespace of the token secret (default: default)
// - `DNS01_SECRET_NAME`: Name of the token secret (default: nicru-tokens)
// - `DNS01_SECRET_PATH`: JSON file holding the token secret (required)
// - `DNS01_API_URL`: API base URL (default: https://api.nic.ru/)
// - `DNS01_HTTP_TIMEOUT_SECS`: Per-request timeout (default: 30)
// - `DNS01_REFRESH_INTERVAL_SECS`: Token refresh period (default: 10800)
// - `DNS01_STARTUP_DELAY_SECS`: Delay before the first refresh (default: 60)
// - `DNS01_OPERATION_TIMEOUT_SECS`: Deadline per present/cleanup (default: 120)
// - `DNS01_CLEANUP_ZONE_POLICY`: tolerant | fail-fast (default: tolerant)
// - `DNS01_LOG_LEVEL`: trace | debug | info | warn | error (default: info)
//
// ## Example
//
// ```bash
// export GROUP_NAME=acme.example.com
// export NAMESPACE=cert-manager
// export DNS01_SECRET_PATH=/var/lib/dns01/nicru-tokens.json
//
// dns01d
// echo '{"resolvedFQDN":"_acme-challenge.example.com.","resolvedZone":"example.com.","key":"abc"}' \
//   | dns01d present -
// ```

mod config;

use anyhow::{Context, Result};
use dns01_core::traits::CredentialStore;
use dns01_core::{
    ChallengeRequest, ChallengeSolver, Error, IntervalTicks, RefreshEvent, Solver, TokenRefresher,
};
use dns01_provider_nicru::NicruClient;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::config::Config;

/// How long the refresher may take to stop after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum Dns01ExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<Dns01ExitCode> for ExitCode {
    fn from(code: Dns01ExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// What this invocation does
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Serve,
    Present(String),
    CleanUp(String),
}

impl Mode {
    fn from_args(args: &[String]) -> Result<Self> {
        match args {
            [] => Ok(Mode::Serve),
            [cmd] if cmd == "serve" => Ok(Mode::Serve),
            [cmd, source] if cmd == "present" => Ok(Mode::Present(source.clone())),
            [cmd, source] if cmd == "cleanup" => Ok(Mode::CleanUp(source.clone())),
            _ => anyhow::bail!(
                "Usage: dns01d [serve | present <file|-> | cleanup <file|->]. Got: {}",
                args.join(" ")
            ),
        }
    }
}

/// Components shared by every mode
struct Components {
    store: Arc<dyn CredentialStore>,
    client: Arc<NicruClient>,
    solver: ChallengeSolver,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match Mode::from_args(&args) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{}", e);
            return Dns01ExitCode::ConfigError.into();
        }
    };

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Dns01ExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return Dns01ExitCode::ConfigError.into();
    }

    // Initialize tracing; stdout stays free for host glue
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return Dns01ExitCode::ConfigError.into();
    }

    info!(group = %config.group_name, mode = ?mode, "Starting dns01d");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return Dns01ExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let components = match build_components(&config).await {
            Ok(components) => components,
            Err(e) => {
                error!("Startup failed: {:#}", e);
                return Dns01ExitCode::ConfigError;
            }
        };

        let outcome = match mode {
            Mode::Serve => run_daemon(&config, components).await,
            Mode::Present(source) => run_once(components, Operation::Present, &source).await,
            Mode::CleanUp(source) => run_once(components, Operation::CleanUp, &source).await,
        };

        match outcome {
            Ok(()) => Dns01ExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                Dns01ExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Build and initialize the components
async fn build_components(config: &Config) -> Result<Components> {
    let core = config.to_core();

    let store = dns01_core::credentials::from_config(&core.credentials)
        .await
        .context("Failed to open the credential store")?;

    let client = Arc::new(
        NicruClient::from_config(&core.provider, store.clone())
            .context("Failed to build the API client")?,
    );

    let solver = ChallengeSolver::new(store.clone(), client.clone(), client.clone(), core.solver)?;
    solver
        .initialize()
        .await
        .context("Solver initialization failed")?;

    Ok(Components {
        store,
        client,
        solver,
    })
}

/// Run the token refresher until a shutdown signal arrives
async fn run_daemon(config: &Config, components: Components) -> Result<()> {
    let core = config.to_core();
    let Components {
        store,
        client,
        solver,
    } = components;

    let (refresher, mut events) = TokenRefresher::new(store, client, &core.refresher)?;
    let schedule = IntervalTicks::from_config(&core.refresher)?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    info!(
        solver = %solver.name(),
        startup_delay_secs = schedule.startup_delay().as_secs(),
        interval_secs = schedule.period().as_secs(),
        "Starting token refresher"
    );

    let refresher_handle =
        tokio::spawn(async move { refresher.run(&schedule, shutdown_rx).await });

    // Ends when the refresher drops its sender
    let events_handle = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                RefreshEvent::Refreshed { tick, at } => {
                    debug!(tick, at = %at, "Refresher event: refreshed")
                }
                RefreshEvent::RefreshFailed { tick, error } => {
                    warn!(tick, error = %error, "Refresher event: refresh failed")
                }
                other => debug!(event = ?other, "Refresher event"),
            }
        }
    });

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);

    // A send error means the refresher already stopped
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, refresher_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => anyhow::bail!("Token refresher task failed: {}", e),
        Err(_) => anyhow::bail!("Token refresher did not stop within {:?}", DRAIN_TIMEOUT),
    }
    if events_handle.await.is_err() {
        warn!("Refresher event logger ended abnormally");
    }

    info!("Shutting down dns01d");
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Present,
    CleanUp,
}

/// Run one solver invocation for the request read from `source`
///
/// SIGINT/SIGTERM abandon the invocation; the error says so.
async fn run_once(components: Components, operation: Operation, source: &str) -> Result<()> {
    let raw = read_source(source).await?;
    let request: ChallengeRequest =
        serde_json::from_str(&raw).context("Failed to decode the challenge request")?;

    let solver = components.solver;
    let invocation = async {
        match operation {
            Operation::Present => solver.present(&request).await,
            Operation::CleanUp => solver.clean_up(&request).await,
        }
    };

    let result = tokio::select! {
        result = invocation => result,
        signal = wait_for_shutdown() => {
            let signal = signal?;
            Err(Error::Cancelled(format!("{:?} interrupted by {}", operation, signal)))
        }
    };

    result?;
    info!(fqdn = %request.resolved_fqdn, operation = ?operation, "Challenge operation completed");
    Ok(())
}

/// Read a file, or stdin for "-"
async fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("Failed to read the challenge request from stdin")?;
        Ok(raw)
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read the challenge request from {}", source))
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(received)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mode_from_args() {
        assert_eq!(Mode::from_args(&args(&[])).unwrap(), Mode::Serve);
        assert_eq!(Mode::from_args(&args(&["serve"])).unwrap(), Mode::Serve);
        assert_eq!(
            Mode::from_args(&args(&["present", "-"])).unwrap(),
            Mode::Present("-".to_string())
        );
        assert_eq!(
            Mode::from_args(&args(&["cleanup", "/tmp/req.json"])).unwrap(),
            Mode::CleanUp("/tmp/req.json".to_string())
        );
    }

    #[test]
    fn test_mode_rejects_unknown_usage() {
        assert!(Mode::from_args(&args(&["present"])).is_err());
        assert!(Mode::from_args(&args(&["restart"])).is_err());
        assert!(Mode::from_args(&args(&["serve", "extra"])).is_err());
    }

    #[tokio::test]
    async fn test_read_source_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(&path, r#"{"resolvedFQDN":"a.","resolvedZone":"b.","key":"k"}"#).unwrap();

        let raw = read_source(path.to_str().unwrap()).await.unwrap();
        let request: ChallengeRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(request.key, "k");
    }

    #[tokio::test]
    async fn test_read_source_missing_file() {
        assert!(read_source("/nonexistent/request.json").await.is_err());
    }
}
