//! Odds drift and value-bet tracking
//!
//! Two independent signals are derived from cycle-to-cycle prices:
//! - plain drift: one bookmaker's price for an outcome moved more than the
//!   threshold since that bookmaker's previous quote
//! - value bet: a soft bookmaker still quotes above the last sharp consensus
//!   by more than the value threshold
//!
//! State is keyed by event and evicted once the event has started.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bookmakers::{display_name, BookmakerClassifier, BookmakerTier};
use crate::config::DriftConfig;
use crate::domain::{DriftSignal, Event, ValueBetSignal};

/// Last accepted sharp price for one outcome
#[derive(Debug, Clone, PartialEq)]
pub struct SharpSnapshot {
    pub bookmaker: String,
    pub price: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Absolute move from `previous` to `current`, percent of `previous`
fn change_percent(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if previous <= Decimal::ZERO {
        return None;
    }
    Some(((current - previous) / previous * Decimal::ONE_HUNDRED).abs())
}

/// Per-event price history shared between the polling loop and a manual burst
pub struct DriftTracker {
    config: DriftConfig,
    classifier: Arc<BookmakerClassifier>,
    /// event_id -> (outcome, bookmaker) -> price last cycle
    previous: DashMap<String, HashMap<(String, String), Decimal>>,
    /// (event_id, outcome) -> sharp consensus
    sharp: DashMap<(String, String), SharpSnapshot>,
    /// event_id -> start time
    starts: DashMap<String, DateTime<Utc>>,
}

impl DriftTracker {
    pub fn new(config: DriftConfig, classifier: Arc<BookmakerClassifier>) -> Self {
        Self {
            config,
            classifier,
            previous: DashMap::new(),
            sharp: DashMap::new(),
            starts: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Compare each bookmaker's prices against its own quotes last cycle.
    ///
    /// The stored map is replaced on every call, so a move is reported once.
    pub fn track_drift(&self, event: &Event, now: DateTime<Utc>) -> Vec<DriftSignal> {
        self.starts.insert(event.id.clone(), event.start_time);

        let current = event.prices_by_bookmaker();
        let Some(previous) = self.previous.insert(event.id.clone(), current.clone()) else {
            debug!("{}: first drift snapshot ({} prices)", event.id, current.len());
            return Vec::new();
        };

        let mut signals = Vec::new();
        for quote in &event.quotes {
            let key = (quote.outcome.clone(), quote.bookmaker.clone());
            let (Some(&prev), Some(&cur)) = (previous.get(&key), current.get(&key)) else {
                continue;
            };
            if signals
                .iter()
                .any(|s: &DriftSignal| s.outcome == key.0 && s.bookmaker == key.1)
            {
                continue;
            }
            let Some(change) = change_percent(prev, cur) else {
                continue;
            };

            if change > self.config.threshold_percent {
                info!(
                    "Drift on {} {} at {}: {} -> {} ({:.1}%)",
                    event.id,
                    quote.outcome,
                    quote.bookmaker,
                    prev,
                    cur,
                    change.round_dp(1)
                );
                signals.push(DriftSignal {
                    event_id: event.id.clone(),
                    outcome: key.0,
                    bookmaker: key.1,
                    previous_price: prev,
                    current_price: cur,
                    change_percent: change,
                    detected_at: now,
                });
            }
        }
        signals
    }

    /// Update sharp consensus from this cycle's sharp quotes, then compare
    /// every soft quote against it.
    pub fn track_value(&self, event: &Event, now: DateTime<Utc>) -> Vec<ValueBetSignal> {
        self.starts.insert(event.id.clone(), event.start_time);

        for quote in &event.quotes {
            if self.classifier.classify(&quote.bookmaker) == BookmakerTier::Sharp {
                self.record_sharp(&event.id, &quote.outcome, &quote.bookmaker, quote.price, now);
            }
        }

        event
            .quotes
            .iter()
            .filter(|q| self.classifier.classify(&q.bookmaker) == BookmakerTier::Soft)
            .filter_map(|q| self.check_soft(&event.id, &q.outcome, &q.bookmaker, q.price, now))
            .collect()
    }

    /// Store the first sharp sighting; afterwards only a drop beyond
    /// `sharp_drop_percent` moves the consensus.
    pub fn record_sharp(
        &self,
        event_id: &str,
        outcome: &str,
        bookmaker: &str,
        price: Decimal,
        now: DateTime<Utc>,
    ) {
        let snapshot = || SharpSnapshot {
            bookmaker: bookmaker.to_string(),
            price,
            recorded_at: now,
        };

        self.sharp
            .entry((event_id.to_string(), outcome.to_string()))
            .and_modify(|existing| {
                if price >= existing.price || existing.price <= Decimal::ZERO {
                    return;
                }
                let drop = (existing.price - price) / existing.price * Decimal::ONE_HUNDRED;
                if drop > self.config.sharp_drop_percent {
                    warn!(
                        "Sharp drop: {} {} {} -> {} (-{:.1}%)",
                        bookmaker,
                        outcome,
                        existing.price,
                        price,
                        drop.round_dp(1)
                    );
                    *existing = snapshot();
                }
            })
            .or_insert_with(snapshot);
    }

    /// Value-bet signal when a soft price beats the sharp consensus
    pub fn check_soft(
        &self,
        event_id: &str,
        outcome: &str,
        bookmaker: &str,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Option<ValueBetSignal> {
        let consensus = self
            .sharp
            .get(&(event_id.to_string(), outcome.to_string()))?
            .clone();
        if consensus.price <= Decimal::ZERO {
            return None;
        }

        let gap = (price - consensus.price) / consensus.price * Decimal::ONE_HUNDRED;
        if gap <= self.config.value_threshold_percent {
            return None;
        }

        warn!(
            "Value bet: {} @ {} vs {} @ {} (+{:.1}% value)",
            bookmaker,
            price,
            consensus.bookmaker,
            consensus.price,
            gap.round_dp(1)
        );

        Some(ValueBetSignal {
            event_id: event_id.to_string(),
            outcome: outcome.to_string(),
            soft_bookmaker: bookmaker.to_string(),
            soft_price: price,
            sharp_bookmaker: consensus.bookmaker.clone(),
            sharp_price: consensus.price,
            value_gap_percent: gap,
            recommendation: format!(
                "Bet {} @ {:.2} on {}. Sharp consensus is {:.2}, giving you {:.1}% value edge.",
                outcome,
                price.round_dp(2),
                display_name(bookmaker),
                consensus.price.round_dp(2),
                gap.round_dp(1)
            ),
            detected_at: now,
        })
    }

    pub fn sharp_consensus(&self, event_id: &str, outcome: &str) -> Option<SharpSnapshot> {
        self.sharp
            .get(&(event_id.to_string(), outcome.to_string()))
            .map(|s| s.clone())
    }

    /// Drop every entry for events that have started. Returns how many events
    /// were evicted.
    pub fn evict_started(&self, now: DateTime<Utc>) -> usize {
        let started: Vec<String> = self
            .starts
            .iter()
            .filter(|entry| *entry.value() <= now)
            .map(|entry| entry.key().clone())
            .collect();

        for event_id in &started {
            self.starts.remove(event_id);
            self.previous.remove(event_id);
        }
        if !started.is_empty() {
            self.sharp.retain(|(event_id, _), _| !started.contains(event_id));
            debug!("Evicted drift state for {} started events", started.len());
        }
        started.len()
    }

    /// Events currently tracked
    pub fn tracked_events(&self) -> usize {
        self.starts.len()
    }
}
