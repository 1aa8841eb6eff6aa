use chrono::Utc;
use oddsarb::adapters::{LogNotifier, OddsFeed, SnapshotFeed};
use oddsarb::config::{AppConfig, PeakWindowConfig};
use oddsarb::scanner::ScanEngine;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Stock settings must pass validation untouched.
#[test]
fn default_config_is_valid() {
    let config = AppConfig::default_config(true);
    assert!(config.validate().is_ok());
    assert!(config.alerts.webhook_url.is_none());
}

/// Every broken value is reported, not just the first.
#[test]
fn validation_collects_every_problem() {
    let mut config = AppConfig::default_config(true);
    config.filters.max_roi_percent = dec!(1.0);
    config.staking.total_investment = dec!(0);
    config.bookmakers.soft.push("Pinnacle".to_string());
    config.scanner.peak_hours.insert(
        "soccer_epl".to_string(),
        vec![PeakWindowConfig {
            days: vec![7],
            start_hour: 20,
            end_hour: 18,
        }],
    );

    let errors = config.validate().unwrap_err();
    assert!(errors.len() >= 5, "got: {errors:?}");
    assert!(errors.iter().any(|e| e.contains("max_roi_percent")));
    assert!(errors.iter().any(|e| e.contains("both sharp and soft")));
    assert!(errors.iter().any(|e| e.contains("invalid weekday")));
}

const SNAPSHOT: &str = r#"[
  {
    "id": "a1",
    "sport_key": "tennis_atp",
    "sport_title": "ATP",
    "commence_time": "2099-06-01T12:00:00Z",
    "home_team": "Sinner",
    "away_team": "Alcaraz",
    "bookmakers": [
      {
        "key": "marathonbet",
        "title": "Marathon Bet",
        "last_update": "2024-01-01T00:00:00Z",
        "markets": [
          {"key": "h2h", "outcomes": [{"name": "Sinner", "price": 2.10}, {"name": "Alcaraz", "price": 1.70}]},
          {"key": "spreads", "outcomes": [{"name": "Sinner", "price": 9.0}]}
        ]
      },
      {
        "key": "1xbet",
        "title": "1xBet",
        "last_update": "2024-01-01T00:00:00Z",
        "markets": [
          {"key": "h2h", "outcomes": [{"name": "Sinner", "price": 1.75}, {"name": "Alcaraz", "price": 2.05}]}
        ]
      }
    ]
  },
  {"id": "broken", "sport_key": "tennis_atp"},
  {
    "id": "b2",
    "sport_key": "basketball_nba",
    "commence_time": "2099-06-01T23:00:00Z",
    "home_team": "Lakers",
    "away_team": "Celtics",
    "bookmakers": []
  }
]"#;

fn write_snapshot() -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("oddsarb-it-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, SNAPSHOT).unwrap();
    path
}

/// Offline scan over a saved payload: malformed records and non-moneyline
/// markets are dropped, old timestamps are fine with the staleness check off.
#[tokio::test]
async fn snapshot_scan_finds_the_arbitrage() {
    let path = write_snapshot();
    let feed = SnapshotFeed::new(&path);

    let sports = feed.sports().await.unwrap();
    assert_eq!(sports, vec!["tennis_atp", "basketball_nba"]);

    let tennis = feed.fetch_events("tennis_atp").await.unwrap();
    assert_eq!(tennis.len(), 1);
    assert_eq!(tennis[0].quotes.len(), 4);

    let mut config = AppConfig::default_config(true);
    config.feed.max_quote_age_minutes = 0;
    let engine = ScanEngine::from_config(&config, Arc::new(LogNotifier));

    let stats = engine.process_events("tennis_atp", &tennis, Utc::now()).await;
    assert_eq!(stats.skipped_events, 0);
    assert_eq!(stats.opportunities, 1);

    let nba = feed.fetch_events("basketball_nba").await.unwrap();
    let stats = engine.process_events("basketball_nba", &nba, Utc::now()).await;
    assert_eq!(stats.skipped_events, 1);

    let _ = std::fs::remove_file(path);
}

/// With the stock five-minute limit the same payload is all stale.
#[tokio::test]
async fn stale_snapshot_is_skipped_with_age_check_on() {
    let path = write_snapshot();
    let feed = SnapshotFeed::new(&path);
    let tennis = feed.fetch_events("tennis_atp").await.unwrap();

    let engine = ScanEngine::from_config(&AppConfig::default_config(true), Arc::new(LogNotifier));
    let stats = engine.process_events("tennis_atp", &tennis, Utc::now()).await;
    assert_eq!(stats.skipped_events, 1);
    assert_eq!(stats.opportunities, 0);

    let _ = std::fs::remove_file(path);
}
