//! Palm flow demo entry point
//!
//! Runs one simulated session end to end: scans, retries failures the user
//! could fix with a refresh, and exits once the session is dismissed.

use anyhow::{anyhow, Context, Result};
use std::{env, path::PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use palm_flow::*;

const MAX_RETRIES: usize = 3;

struct Args {
    mode: ScanMode,
    config_path: Option<PathBuf>,
    seed: Option<u64>,
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = env::args().skip(1);
    let mut mode = ScanMode::Verify;
    let mut config_path = None;
    let mut seed = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("palm-flow {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "--config" | "-c" => {
                let path = args.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                config_path = Some(PathBuf::from(path));
            }
            "--seed" => {
                let value = args.next().ok_or_else(|| anyhow!("--seed needs a value"))?;
                seed = Some(value.parse().context("--seed must be an unsigned integer")?);
            }
            other => mode = other.parse().map_err(|e: String| anyhow!(e))?,
        }
    }

    Ok(Some(Args {
        mode,
        config_path,
        seed,
    }))
}

fn render(state: &ScanState) {
    println!("[{}] {}", state.icon().as_str(), state.title());
    for line in state.subtitle().lines() {
        println!("    {}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config_path {
        Some(path) => PalmConfig::from_file(path)?,
        None => PalmConfig::default(),
    };
    config.validate().map_err(|e| anyhow!(e))?;

    info!("Starting {} session", args.mode.as_str());

    let mut scanner = config.build_scanner(args.mode);
    if let Some(seed) = args.seed {
        scanner = scanner.with_outcomes(RandomOutcomes::seeded(seed));
    }
    let mut controller = ScannerController::new(scanner)
        .with_dismiss_delay(config.dismiss_delay())
        .with_enrollment_code(config.enrollment.code_url.clone());

    let mut events = controller.events();
    println!("{}: {}", args.mode.service_title(), args.mode.instructions());
    render(&controller.state());
    if let Some(code) = controller.enrollment_code() {
        println!("    enrollment code: {}", code);
    }

    controller.start_scanning();
    let mut retries = 0;

    loop {
        match events.recv().await {
            Ok(SessionEvent::Succeeded { state, .. }) => render(&state),
            Ok(SessionEvent::Failed { error, state, .. }) => {
                render(&state);
                if let Some(code) = controller.enrollment_code() {
                    println!("    enrollment code: {}", code);
                }

                if state.shows_retry_action() && retries < MAX_RETRIES {
                    retries += 1;
                    info!("Retrying after {} ({}/{})", error, retries, MAX_RETRIES);
                    controller.refresh();
                } else {
                    warn!("Giving up after {}", error);
                    controller.cancel();
                    break;
                }
            }
            Ok(SessionEvent::Dismissed) => break,
            Ok(event) => info!("Session event: {}", event.as_str()),
            Err(RecvError::Lagged(skipped)) => warn!("Missed {} session events", skipped),
            Err(RecvError::Closed) => break,
        }
    }

    let stats = controller.stats();
    info!(
        "Session finished: {} attempts, {} succeeded, {} failed",
        stats.total_attempts, stats.successful_attempts, stats.failed_attempts
    );
    Ok(())
}
