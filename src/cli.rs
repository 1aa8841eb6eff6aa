use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::scanner::{BurstReport, PeakSchedule, ScanStats};

#[derive(Parser)]
#[command(name = "oddsarb")]
#[command(version = "0.1.0")]
#[command(about = "Sports bookmaker arbitrage scanner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory (default.toml plus the ODDSARB_ENV overlay)
    #[arg(short, long, default_value = "config", env = "ODDSARB_CONFIG_DIR")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the polling loop (send SIGUSR1 for a manual burst)
    Run {
        /// Log alerts instead of sending them
        #[arg(long)]
        dry_run: bool,
        /// Stop after this many minutes
        #[arg(long)]
        duration: Option<u64>,
        /// nba, tennis, all, or a provider sport key
        #[arg(long)]
        sport: Option<String>,
    },
    /// Run one manual high-frequency burst and exit
    Burst {
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        sport: Option<String>,
    },
    /// Run one offline cycle over a saved odds payload
    Scan {
        /// JSON array in the odds provider's format
        snapshot: PathBuf,
        /// Send alerts through the configured webhook
        #[arg(long)]
        notify: bool,
    },
    /// Validate configuration and print the effective settings
    CheckConfig,
}

/// Map a `--sport` shorthand onto configured sport keys.
///
/// `None` and "all" keep every configured sport; an unknown key falls back
/// to all of them as well.
pub fn resolve_sports(filter: Option<&str>, configured: &[String]) -> Vec<String> {
    let key = match filter {
        None | Some("all") => return configured.to_vec(),
        Some("nba") => "basketball_nba",
        Some("tennis") => "tennis_atp",
        Some(other) => other,
    };

    if configured.iter().any(|s| s == key) {
        vec![key.to_string()]
    } else {
        configured.to_vec()
    }
}

pub fn print_banner(mode: &str, dry_run: bool) {
    println!("\x1b[36m");
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  ODDSARB - {:<50}║", mode);
    if dry_run {
        println!("║  [DRY RUN - alerts are logged, not sent]                     ║");
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!("\x1b[0m");
}

pub fn print_config_summary(config: &AppConfig) {
    println!("\x1b[32mFilters:\x1b[0m");
    println!(
        "  ROI window: {}% - {}% (rule check: {})",
        config.filters.min_roi_percent,
        config.filters.max_roi_percent,
        if config.filters.check_rules { "on" } else { "off" }
    );
    println!(
        "  Stakes: {} total, {:?} rounding",
        config.staking.total_investment, config.staking.rounding
    );

    println!("\x1b[32mBookmakers:\x1b[0m");
    println!("  Sharp: {}", config.bookmakers.sharp.join(", "));
    println!("  Soft:  {}", config.bookmakers.soft.join(", "));
    println!("  High risk: {}", config.rules.high_risk.join(", "));

    println!("\x1b[32mDrift:\x1b[0m");
    if config.drift.enabled {
        println!(
            "  drift {}%, value {}%, sharp drop {}%",
            config.drift.threshold_percent,
            config.drift.value_threshold_percent,
            config.drift.sharp_drop_percent
        );
    } else {
        println!("  disabled");
    }

    println!("\x1b[32mFeed:\x1b[0m");
    println!("  {} [{}]", config.feed.base_url, config.feed.sports.join(", "));
    println!(
        "  API key: {}",
        if config.feed.api_key.is_some() { "set" } else { "\x1b[33mmissing\x1b[0m" }
    );
    println!(
        "  Webhook: {}",
        if config.alerts.webhook_url.is_some() { "set" } else { "none (log only)" }
    );

    println!("\x1b[32mPeak hours:\x1b[0m");
    let schedule = PeakSchedule::from_config(&config.scanner);
    for line in schedule.describe() {
        println!("  {}", line);
    }
    println!();
}

pub fn print_scan_stats(stats: &ScanStats) {
    println!("\x1b[32mScan complete\x1b[0m");
    println!("  Events:        {} ({} skipped)", stats.events, stats.skipped_events);
    println!("  Combinations:  {}", stats.combinations);
    println!("  Arbitrages:    {}", stats.arbitrages);
    println!("  Opportunities: {}", stats.opportunities);
    for (kind, count) in &stats.rejections {
        println!("  Rejected {:<14} {}", kind, count);
    }
    println!("  Drift signals: {}", stats.drift_signals);
    println!("  Value bets:    {}", stats.value_bets);
    println!();
}

pub fn print_burst_report(report: &BurstReport) {
    println!("\x1b[32mManual scan {} complete\x1b[0m", report.burst_id);
    println!("  Duration:      {:.1}s", report.elapsed.as_secs_f64());
    println!("  Scans:         {}", report.scans);
    println!("  Opportunities: {}", report.stats.opportunities);
    println!("  API credits:   {}", report.credits_used);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Vec<String> {
        vec!["basketball_nba".to_string(), "tennis_atp".to_string()]
    }

    #[test]
    fn test_sport_shorthands() {
        assert_eq!(resolve_sports(Some("nba"), &configured()), vec!["basketball_nba"]);
        assert_eq!(resolve_sports(Some("tennis"), &configured()), vec!["tennis_atp"]);
        assert_eq!(resolve_sports(Some("all"), &configured()), configured());
        assert_eq!(resolve_sports(None, &configured()), configured());
    }

    #[test]
    fn test_unknown_sport_keeps_all() {
        assert_eq!(resolve_sports(Some("curling"), &configured()), configured());
        assert_eq!(
            resolve_sports(Some("tennis_atp"), &configured()),
            vec!["tennis_atp"]
        );
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "oddsarb", "run", "--dry-run", "--duration", "30", "--sport", "nba",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run {
                dry_run,
                duration,
                sport,
            }) => {
                assert!(dry_run);
                assert_eq!(duration, Some(30));
                assert_eq!(sport.as_deref(), Some("nba"));
            }
            _ => panic!("expected run"),
        }
    }
}
