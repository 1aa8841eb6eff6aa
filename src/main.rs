use clap::Parser;
use oddsarb::adapters::{LogNotifier, Notifier, OddsApiClient, OddsFeed, SnapshotFeed};
use oddsarb::cli::{self, Cli, Commands};
use oddsarb::config::AppConfig;
use oddsarb::coordination::StopFlag;
use oddsarb::error::Result;
use oddsarb::scanner::{PeakSchedule, Runner, ScanEngine, ScanStats};
use std::path::Path;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info};

mod main_runtime;

use main_runtime::{build_notifier, init_logging, init_logging_simple, load_config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Run {
        dry_run: false,
        duration: None,
        sport: None,
    });

    match command {
        Commands::CheckConfig => {
            init_logging_simple();
            run_check_config(&cli.config)?;
        }
        Commands::Scan { snapshot, notify } => {
            let config = load_config(&cli.config)?;
            init_logging(&config.logging);
            run_snapshot_scan(config, &snapshot, notify).await?;
        }
        Commands::Burst { dry_run, sport } => {
            let config = load_config(&cli.config)?;
            init_logging(&config.logging);
            run_burst(config, dry_run, sport.as_deref()).await?;
        }
        Commands::Run {
            dry_run,
            duration,
            sport,
        } => {
            let config = load_config(&cli.config)?;
            init_logging(&config.logging);
            run_scanner(config, dry_run, duration, sport.as_deref()).await?;
        }
    }

    Ok(())
}

fn run_check_config(dir: &Path) -> Result<()> {
    let config = AppConfig::load_from(dir)?;
    match config.validate() {
        Ok(()) => {
            println!("\x1b[32m✓ Configuration valid\x1b[0m\n");
            cli::print_config_summary(&config);
            Ok(())
        }
        Err(errors) => {
            println!("\x1b[31m✗ Configuration invalid:\x1b[0m");
            for e in &errors {
                println!("  - {}", e);
            }
            Err(oddsarb::OddsArbError::Validation(errors.join("; ")))
        }
    }
}

fn build_runner(
    config: &AppConfig,
    notifier: Arc<dyn Notifier>,
    sport: Option<&str>,
    stop: Arc<StopFlag>,
) -> Result<Arc<Runner>> {
    let feed: Arc<dyn OddsFeed> = Arc::new(OddsApiClient::new(config.feed.clone())?);
    let engine = Arc::new(ScanEngine::from_config(config, notifier));
    let sports = cli::resolve_sports(sport, &config.feed.sports);

    Ok(Arc::new(Runner::new(
        engine,
        feed,
        PeakSchedule::from_config(&config.scanner),
        config.scanner.clone(),
        sports,
        stop,
    )))
}

/// Peak-aware polling loop until Ctrl-C or `--duration`
async fn run_scanner(
    config: AppConfig,
    dry_run: bool,
    duration_minutes: Option<u64>,
    sport: Option<&str>,
) -> Result<()> {
    cli::print_banner("Arbitrage Scanner", dry_run);

    let notifier = build_notifier(&config, dry_run);
    let stop = StopFlag::new();
    stop.install_signal_handler();

    let runner = build_runner(&config, notifier, sport, Arc::clone(&stop))?;
    #[cfg(unix)]
    runner.install_burst_trigger();

    if let Some(minutes) = duration_minutes {
        info!("Will stop after {} minutes", minutes);
    }
    info!(
        "Filters: ROI {}% - {}%, stake {} ({:?})",
        config.filters.min_roi_percent,
        config.filters.max_roi_percent,
        config.staking.total_investment,
        config.staking.rounding
    );

    let stats = runner
        .run(duration_minutes.map(|m| Duration::from_secs(m * 60)))
        .await;
    cli::print_scan_stats(&stats);
    Ok(())
}

/// One manual burst in the foreground
async fn run_burst(config: AppConfig, dry_run: bool, sport: Option<&str>) -> Result<()> {
    cli::print_banner("Manual Scan Burst", dry_run);

    let notifier = build_notifier(&config, dry_run);
    let stop = StopFlag::new();
    stop.install_signal_handler();

    let runner = build_runner(&config, notifier, sport, stop)?;
    let sports = runner.sports().to_vec();
    let report = runner.run_burst(&sports).await?;
    cli::print_burst_report(&report);
    Ok(())
}

/// One offline cycle over a saved payload; quote age is ignored
async fn run_snapshot_scan(mut config: AppConfig, snapshot: &Path, notify: bool) -> Result<()> {
    config.feed.max_quote_age_minutes = 0;

    let notifier: Arc<dyn Notifier> = if notify {
        build_notifier(&config, false)
    } else {
        Arc::new(LogNotifier)
    };
    let engine = ScanEngine::from_config(&config, notifier);
    let feed = SnapshotFeed::new(snapshot);

    info!("Scanning snapshot {}", feed.path().display());
    let mut total = ScanStats::default();
    for sport in feed.sports().await? {
        match feed.fetch_events(&sport).await {
            Ok(events) => {
                let stats = engine
                    .process_events(&sport, &events, chrono::Utc::now())
                    .await;
                total.merge(&stats);
            }
            Err(e) => error!("Failed to read {} events: {}", sport, e),
        }
    }

    cli::print_scan_stats(&total);
    Ok(())
}
