use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::bookmakers::{MatchMode, SettlementRule};
use crate::strategy::RoundingMode;

/// Upper bound for minute-based windows (quote age, alert cooldown): one week
pub const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub filters: FilterConfig,
    pub staking: StakingConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    pub drift: DriftConfig,
    pub bookmakers: BookmakerConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    pub alerts: AlertConfig,
    pub feed: FeedConfig,
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// ROI above this is treated as a palpable pricing error (percent, e.g. 15.0)
    pub max_roi_percent: Decimal,
    /// ROI below this does not cover transfer costs (percent, e.g. 1.5)
    pub min_roi_percent: Decimal,
    /// Run the settlement-rule mismatch filter
    #[serde(default = "default_true")]
    pub check_rules: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StakingConfig {
    /// Total capital spread across the legs of one opportunity
    pub total_investment: Decimal,
    /// Stake rounding policy
    #[serde(default)]
    pub rounding: RoundingMode,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectorConfig {
    /// Require three distinct bookmakers for three-way combinations
    #[serde(default)]
    pub require_distinct_bookmakers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriftConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cycle-to-cycle move that counts as drift (percent)
    pub threshold_percent: Decimal,
    /// Soft-over-sharp gap that counts as a value bet (percent)
    pub value_threshold_percent: Decimal,
    /// Sharp price drop required to move the consensus (percent)
    #[serde(default = "default_sharp_drop_percent")]
    pub sharp_drop_percent: Decimal,
}

fn default_sharp_drop_percent() -> Decimal {
    Decimal::from(3)
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookmakerConfig {
    /// Market-leading bookmakers treated as the source of truth
    pub sharp: Vec<String>,
    /// Slow-moving bookmakers, the usual arbitrage targets
    pub soft: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Basketball moneyline settlement per bookmaker
    #[serde(default)]
    pub basketball: HashMap<String, SettlementRule>,
    /// Soccer 1X2 settlement per bookmaker
    #[serde(default)]
    pub soccer: HashMap<String, SettlementRule>,
    /// Canonical name -> provider spellings
    #[serde(default)]
    pub aliases: HashMap<String, Vec<String>>,
    /// Bookmakers with non-standard rules (always flagged)
    #[serde(default)]
    pub high_risk: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        use SettlementRule::{IncludesOvertime, RegulationOnly};

        let basketball = [
            ("PointsBet", IncludesOvertime),
            ("DraftKings", IncludesOvertime),
            ("FanDuel", IncludesOvertime),
            ("BetMGM", IncludesOvertime),
            ("Caesars", IncludesOvertime),
            ("Unibet", IncludesOvertime),
            ("William Hill", IncludesOvertime),
            ("1xBet", IncludesOvertime),
            ("Pinnacle", IncludesOvertime),
            ("Kwiff", RegulationOnly),
        ];
        let soccer = [
            ("Betfair", RegulationOnly),
            ("Bet365", RegulationOnly),
            ("Ladbrokes", RegulationOnly),
            ("William Hill", RegulationOnly),
            ("Unibet", RegulationOnly),
            ("1xBet", RegulationOnly),
            ("Pinnacle", RegulationOnly),
        ];
        let aliases = [
            ("williamhill", vec!["williamhill_us", "william_hill"]),
            ("betfair", vec!["betfair_ex_eu", "betfair_ex_uk", "betfair_sb_uk"]),
            ("betmgm", vec!["bet_mgm"]),
            ("caesars", vec!["williamhill_us_caesars"]),
        ];

        Self {
            match_mode: MatchMode::default(),
            basketball: basketball
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            soccer: soccer.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            aliases: aliases
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
                .collect(),
            high_risk: vec!["Kwiff".to_string(), "InternationalBookieX".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Minimum minutes between two alerts for the same event
    pub cooldown_minutes: i64,
    /// Size the cooldown cache is pruned back to
    #[serde(default = "default_max_alert_entries")]
    pub max_entries: usize,
    /// Chat webhook receiving alerts (disabled when unset)
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_max_alert_entries() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Odds provider REST endpoint
    pub base_url: String,
    /// Provider API key (usually set through ODDSARB_FEED__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,
    pub regions: Vec<String>,
    pub sports: Vec<String>,
    #[serde(default = "default_markets")]
    pub markets: Vec<String>,
    /// Quotes older than this are dropped before detection; 0 disables the check
    #[serde(default = "default_max_quote_age")]
    pub max_quote_age_minutes: i64,
    /// Request budget for the provider's billing period
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Attempts per fetch before giving up on a sport for this cycle
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_markets() -> Vec<String> {
    vec!["h2h".to_string()]
}

fn default_max_quote_age() -> i64 {
    5
}

fn default_max_requests() -> u32 {
    500
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Poll interval inside a peak window
    pub poll_interval_secs: u64,
    /// Poll interval outside every peak window
    pub off_peak_interval_secs: u64,
    /// Wait after a failed fetch
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    /// Manual burst length
    #[serde(default = "default_burst_duration")]
    pub burst_duration_secs: u64,
    /// Poll interval during a manual burst
    #[serde(default = "default_burst_interval")]
    pub burst_interval_secs: u64,
    /// Sport key -> peak windows; sports without an entry are always peak
    #[serde(default)]
    pub peak_hours: HashMap<String, Vec<PeakWindowConfig>>,
}

fn default_retry_delay() -> u64 {
    300
}

fn default_burst_duration() -> u64 {
    300
}

fn default_burst_interval() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeakWindowConfig {
    /// Weekdays, 0 = Monday
    pub days: Vec<u32>,
    pub start_hour: u32,
    pub end_hour: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("filters.max_roi_percent", "15.0")?
            .set_default("filters.min_roi_percent", "1.5")?
            .set_default("staking.total_investment", "1000")?
            .set_default("drift.threshold_percent", "5.0")?
            .set_default("drift.value_threshold_percent", "5.0")?
            .set_default("alerts.cooldown_minutes", 10)?
            .set_default("feed.base_url", "https://api.the-odds-api.com/v4")?
            .set_default("feed.regions", vec!["eu", "us"])?
            .set_default("feed.sports", vec!["basketball_nba", "tennis_atp"])?
            .set_default("scanner.poll_interval_secs", 60)?
            .set_default("scanner.off_peak_interval_secs", 1800)?
            .set_default("bookmakers.sharp", vec!["pinnacle", "betfair", "bet365"])?
            .set_default(
                "bookmakers.soft",
                vec!["1xbet", "unibet", "williamhill", "marathonbet"],
            )?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("ODDSARB_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (ODDSARB_FEED__API_KEY, etc.)
            .add_source(
                Environment::with_prefix("ODDSARB")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration matching the scanner's stock settings
    pub fn default_config(dry_run: bool) -> Self {
        use rust_decimal_macros::dec;

        let peak_hours = HashMap::from([
            (
                "basketball_nba".to_string(),
                vec![PeakWindowConfig {
                    days: (0..7).collect(),
                    start_hour: 18,
                    end_hour: 23,
                }],
            ),
            (
                "tennis_atp".to_string(),
                vec![PeakWindowConfig {
                    days: (0..7).collect(),
                    start_hour: 9,
                    end_hour: 20,
                }],
            ),
        ]);

        Self {
            filters: FilterConfig {
                max_roi_percent: dec!(15.0),
                min_roi_percent: dec!(1.5),
                check_rules: true,
            },
            staking: StakingConfig {
                total_investment: dec!(1000),
                rounding: RoundingMode::Smart,
            },
            detector: DetectorConfig::default(),
            drift: DriftConfig {
                enabled: true,
                threshold_percent: dec!(5.0),
                value_threshold_percent: dec!(5.0),
                sharp_drop_percent: dec!(3.0),
            },
            bookmakers: BookmakerConfig {
                sharp: vec!["pinnacle".into(), "betfair".into(), "bet365".into()],
                soft: vec![
                    "1xbet".into(),
                    "unibet".into(),
                    "williamhill".into(),
                    "marathonbet".into(),
                ],
            },
            rules: RulesConfig::default(),
            alerts: AlertConfig {
                cooldown_minutes: 10,
                max_entries: 100,
                // Dry runs only log
                webhook_url: if dry_run {
                    None
                } else {
                    std::env::var("ODDSARB_WEBHOOK_URL").ok()
                },
            },
            feed: FeedConfig {
                base_url: "https://api.the-odds-api.com/v4".to_string(),
                api_key: std::env::var("ODDS_API_KEY").ok(),
                regions: vec!["eu".into(), "us".into()],
                sports: vec!["basketball_nba".into(), "tennis_atp".into()],
                markets: default_markets(),
                max_quote_age_minutes: 5,
                max_requests: default_max_requests(),
                max_retries: default_max_retries(),
                timeout_secs: default_request_timeout(),
            },
            scanner: ScannerConfig {
                poll_interval_secs: 60,
                off_peak_interval_secs: 1800,
                retry_delay_secs: 300,
                burst_duration_secs: 300,
                burst_interval_secs: 10,
                peak_hours,
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Filter thresholds
        if self.filters.min_roi_percent < Decimal::ZERO {
            errors.push("min_roi_percent must not be negative".to_string());
        }
        if self.filters.max_roi_percent <= self.filters.min_roi_percent {
            errors.push(format!(
                "max_roi_percent ({}) must be greater than min_roi_percent ({})",
                self.filters.max_roi_percent, self.filters.min_roi_percent
            ));
        }

        if self.staking.total_investment <= Decimal::ZERO {
            errors.push("total_investment must be positive".to_string());
        }

        if self.drift.threshold_percent <= Decimal::ZERO
            || self.drift.value_threshold_percent <= Decimal::ZERO
            || self.drift.sharp_drop_percent <= Decimal::ZERO
        {
            errors.push("drift thresholds must be positive".to_string());
        }

        // Tiers must not overlap
        for sharp in &self.bookmakers.sharp {
            if self
                .bookmakers
                .soft
                .iter()
                .any(|soft| soft.eq_ignore_ascii_case(sharp))
            {
                errors.push(format!("bookmaker '{sharp}' is listed as both sharp and soft"));
            }
        }

        if self.alerts.cooldown_minutes < 0 {
            errors.push("cooldown_minutes must not be negative".to_string());
        }
        if self.alerts.cooldown_minutes > MAX_WINDOW_MINUTES {
            errors.push(format!(
                "cooldown_minutes must not exceed {MAX_WINDOW_MINUTES} (one week)"
            ));
        }
        if self.alerts.max_entries == 0 {
            errors.push("alerts.max_entries must be at least 1".to_string());
        }

        if self.feed.sports.is_empty() {
            errors.push("feed.sports must list at least one sport".to_string());
        }
        if self.feed.max_quote_age_minutes < 0 {
            errors.push("feed.max_quote_age_minutes must not be negative".to_string());
        }
        if self.feed.max_quote_age_minutes > MAX_WINDOW_MINUTES {
            errors.push(format!(
                "feed.max_quote_age_minutes must not exceed {MAX_WINDOW_MINUTES} (one week)"
            ));
        }
        if self.feed.max_retries == 0 {
            errors.push("feed.max_retries must be at least 1".to_string());
        }

        if self.scanner.poll_interval_secs == 0 || self.scanner.burst_interval_secs == 0 {
            errors.push("scanner intervals must be positive".to_string());
        }
        for (sport, windows) in &self.scanner.peak_hours {
            for window in windows {
                if window.start_hour >= window.end_hour || window.end_hour > 24 {
                    errors.push(format!(
                        "invalid peak window for {sport}: {}..{}",
                        window.start_hour, window.end_hour
                    ));
                }
                if window.days.iter().any(|d| *d > 6) {
                    errors.push(format!("invalid weekday in peak window for {sport}"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default_config(true);
        assert!(config.validate().is_ok());
        assert!(config.alerts.webhook_url.is_none());
        assert_eq!(config.staking.rounding, RoundingMode::Smart);
    }

    #[test]
    fn test_inverted_roi_thresholds_rejected() {
        let mut config = AppConfig::default_config(true);
        config.filters.max_roi_percent = dec!(1.0);
        config.filters.min_roi_percent = dec!(2.0);

        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("max_roi_percent")));
    }

    #[test]
    fn test_overlapping_tiers_rejected() {
        let mut config = AppConfig::default_config(true);
        config.bookmakers.soft.push("Pinnacle".to_string());

        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("both sharp and soft")));
    }

    #[test]
    fn test_bad_peak_window_rejected() {
        let mut config = AppConfig::default_config(true);
        config.scanner.peak_hours.insert(
            "soccer_epl".to_string(),
            vec![PeakWindowConfig {
                days: vec![7],
                start_hour: 20,
                end_hour: 18,
            }],
        );

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_minute_windows_bounded() {
        let mut config = AppConfig::default_config(true);
        config.feed.max_quote_age_minutes = MAX_WINDOW_MINUTES;
        config.alerts.cooldown_minutes = MAX_WINDOW_MINUTES;
        assert!(config.validate().is_ok());

        config.feed.max_quote_age_minutes = i64::MAX;
        config.alerts.cooldown_minutes = MAX_WINDOW_MINUTES + 1;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("max_quote_age_minutes")));
    }

    #[test]
    fn test_default_rule_tables() {
        let rules = RulesConfig::default();
        assert_eq!(
            rules.basketball.get("Kwiff"),
            Some(&SettlementRule::RegulationOnly)
        );
        assert_eq!(
            rules.soccer.get("Unibet"),
            Some(&SettlementRule::RegulationOnly)
        );
        assert_eq!(
            rules.basketball.get("Unibet"),
            Some(&SettlementRule::IncludesOvertime)
        );
    }
}
