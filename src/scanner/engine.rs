//! Per-cycle scan engine
//!
//! Owns the detector, drift tracker and alert manager, all constructed
//! explicitly from `AppConfig`. One engine is shared through `Arc` by the
//! polling loop and any manual burst.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::adapters::Notifier;
use crate::bookmakers::{BookmakerClassifier, RuleDatabase};
use crate::config::{AppConfig, MAX_WINDOW_MINUTES};
use crate::domain::{Event, MarketSignal};
use crate::strategy::{ArbitrageDetector, DriftTracker, SafetyFilterChain, ScanOutcome};
use crate::supervisor::AlertManager;

/// What one event produced in one cycle
#[derive(Debug, Default)]
pub struct EventScan {
    pub outcome: ScanOutcome,
    pub signals: Vec<MarketSignal>,
    /// Dropped before detection (stale or too few quotes)
    pub skipped: bool,
}

/// Counters for one cycle (or a whole burst once merged)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub events: usize,
    pub skipped_events: usize,
    pub combinations: usize,
    pub invalid_combinations: usize,
    pub arbitrages: usize,
    pub opportunities: usize,
    /// Rejection kind -> count
    pub rejections: BTreeMap<&'static str, usize>,
    pub drift_signals: usize,
    pub value_bets: usize,
    pub alerts_sent: usize,
    pub alerts_suppressed: usize,
    pub alerts_failed: usize,
    pub fetch_failures: usize,
}

impl ScanStats {
    pub fn merge(&mut self, other: &ScanStats) {
        self.events += other.events;
        self.skipped_events += other.skipped_events;
        self.combinations += other.combinations;
        self.invalid_combinations += other.invalid_combinations;
        self.arbitrages += other.arbitrages;
        self.opportunities += other.opportunities;
        for (kind, count) in &other.rejections {
            *self.rejections.entry(*kind).or_default() += *count;
        }
        self.drift_signals += other.drift_signals;
        self.value_bets += other.value_bets;
        self.alerts_sent += other.alerts_sent;
        self.alerts_suppressed += other.alerts_suppressed;
        self.alerts_failed += other.alerts_failed;
        self.fetch_failures += other.fetch_failures;
    }

    pub fn rejected(&self) -> usize {
        self.rejections.values().sum()
    }

    pub fn summary(&self) -> String {
        let rejections: Vec<String> = self
            .rejections
            .iter()
            .map(|(kind, count)| format!("{}={}", kind, count))
            .collect();
        format!(
            "{} events ({} skipped), {} combinations, {} arbs, {} opportunities, {} rejected [{}], {} drift, {} value bets, {} alerts sent",
            self.events,
            self.skipped_events,
            self.combinations,
            self.arbitrages,
            self.opportunities,
            self.rejected(),
            rejections.join(" "),
            self.drift_signals,
            self.value_bets,
            self.alerts_sent
        )
    }
}

pub struct ScanEngine {
    detector: ArbitrageDetector,
    tracker: DriftTracker,
    alerts: AlertManager,
    /// `None` disables the staleness check
    max_quote_age: Option<Duration>,
}

impl ScanEngine {
    pub fn new(
        detector: ArbitrageDetector,
        tracker: DriftTracker,
        alerts: AlertManager,
        max_quote_age: Option<Duration>,
    ) -> Self {
        Self {
            detector,
            tracker,
            alerts,
            max_quote_age,
        }
    }

    /// Wire every component from configuration
    pub fn from_config(config: &AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        let rules = Arc::new(RuleDatabase::new(&config.rules));
        let classifier = Arc::new(BookmakerClassifier::from_config(&config.bookmakers));

        let filters = SafetyFilterChain::from_config(&config.filters, Arc::clone(&rules));
        let detector =
            ArbitrageDetector::new(filters, config.staking.clone(), &config.detector);
        let tracker = DriftTracker::new(config.drift.clone(), Arc::clone(&classifier));
        let alerts = AlertManager::new(config.alerts.clone(), notifier, classifier, rules);

        let age = config.feed.max_quote_age_minutes.min(MAX_WINDOW_MINUTES);
        let max_quote_age = (age > 0).then(|| Duration::minutes(age));

        Self::new(detector, tracker, alerts, max_quote_age)
    }

    pub fn tracker(&self) -> &DriftTracker {
        &self.tracker
    }

    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }

    /// Detection and signal tracking for one event; no delivery
    pub fn scan_event(&self, event: &Event, now: DateTime<Utc>) -> EventScan {
        let fresh = match self.max_quote_age {
            Some(max_age) => event.without_stale_quotes(now, max_age),
            None => event.clone(),
        };

        if fresh.quotes.len() < 2 {
            debug!(
                "Skipping {}: {} usable quotes ({} stale)",
                event.id,
                fresh.quotes.len(),
                event.quotes.len() - fresh.quotes.len()
            );
            return EventScan {
                skipped: true,
                ..Default::default()
            };
        }

        let outcome = self.detector.find_opportunities(&fresh);

        let mut signals = Vec::new();
        if self.tracker.is_enabled() {
            signals.extend(
                self.tracker
                    .track_value(&fresh, now)
                    .into_iter()
                    .map(MarketSignal::ValueBet),
            );
            signals.extend(
                self.tracker
                    .track_drift(&fresh, now)
                    .into_iter()
                    .map(MarketSignal::Drift),
            );
        }

        EventScan {
            outcome,
            signals,
            skipped: false,
        }
    }

    /// Scan a batch and deliver alerts. Delivery failures are counted, never
    /// propagated.
    pub async fn process_events(&self, sport: &str, events: &[Event], now: DateTime<Utc>) -> ScanStats {
        let mut stats = ScanStats::default();
        info!("Scanning {} {} events", events.len(), sport);

        for event in events {
            stats.events += 1;
            let scan = self.scan_event(event, now);
            if scan.skipped {
                stats.skipped_events += 1;
                continue;
            }

            stats.combinations += scan.outcome.combinations;
            stats.invalid_combinations += scan.outcome.invalid;
            stats.arbitrages += scan.outcome.arbitrages_found();
            for rejection in &scan.outcome.rejections {
                *stats.rejections.entry(rejection.kind()).or_default() += 1;
            }

            for opp in &scan.outcome.opportunities {
                stats.opportunities += 1;
                info!(
                    "ARB DETECTED: {} | ROI: {:.2}% | Bookmakers: {}",
                    opp.event_name,
                    opp.roi.round_dp(2),
                    opp.bookmakers().join(" vs ")
                );
                match self.alerts.notify_opportunity(opp, now).await {
                    Ok(true) => stats.alerts_sent += 1,
                    Ok(false) => stats.alerts_suppressed += 1,
                    Err(e) => {
                        error!("Failed to deliver alert for {}: {}", opp.event_name, e);
                        stats.alerts_failed += 1;
                    }
                }
            }

            for signal in &scan.signals {
                match signal {
                    MarketSignal::Drift(_) => stats.drift_signals += 1,
                    MarketSignal::ValueBet(_) => stats.value_bets += 1,
                }
                match self.alerts.notify_signal(signal).await {
                    Ok(()) => stats.alerts_sent += 1,
                    Err(e) => {
                        error!("Failed to deliver {} alert: {}", signal.kind(), e);
                        stats.alerts_failed += 1;
                    }
                }
            }
        }

        stats
    }

    /// Evict tracker and cooldown state for events that have started
    pub async fn evict_started(&self, now: DateTime<Utc>) {
        let tracked = self.tracker.evict_started(now);
        let cooled = self.alerts.evict_started(now).await;
        if tracked + cooled > 0 {
            debug!(
                "Evicted {} tracked events and {} cooldown entries",
                tracked, cooled
            );
        }
    }
}
