pub mod adapters;
pub mod bookmakers;
pub mod cli;
pub mod config;
pub mod coordination;
pub mod domain;
pub mod error;
pub mod scanner;
pub mod strategy;
pub mod supervisor;

pub use adapters::{LogNotifier, Notifier, OddsApiClient, OddsFeed, SnapshotFeed, WebhookNotifier};
pub use bookmakers::{BookmakerClassifier, BookmakerTier, RiskLevel, RuleDatabase, SettlementRule};
pub use config::AppConfig;
pub use coordination::{StopFlag, StopReason};
pub use domain::{Bet, DriftSignal, Event, MarketSignal, Opportunity, Quote, ValueBetSignal};
pub use error::{OddsArbError, Result};
pub use scanner::{BurstReport, PeakSchedule, Runner, ScanEngine, ScanStats};
pub use strategy::{ArbitrageDetector, DriftTracker, SafetyFilterChain};
pub use supervisor::AlertManager;
