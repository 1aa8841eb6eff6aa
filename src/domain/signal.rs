use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rapid cycle-to-cycle price movement on one outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSignal {
    pub event_id: String,
    pub outcome: String,
    pub bookmaker: String,
    pub previous_price: Decimal,
    pub current_price: Decimal,
    /// Absolute move, percent of the previous price
    pub change_percent: Decimal,
    pub detected_at: DateTime<Utc>,
}

/// A soft bookmaker still quoting above the sharp consensus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueBetSignal {
    pub event_id: String,
    pub outcome: String,
    pub soft_bookmaker: String,
    pub soft_price: Decimal,
    pub sharp_bookmaker: String,
    pub sharp_price: Decimal,
    /// (soft - sharp) / sharp, percent
    pub value_gap_percent: Decimal,
    pub recommendation: String,
    pub detected_at: DateTime<Utc>,
}

/// Non-arbitrage market signal handed to the notifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketSignal {
    Drift(DriftSignal),
    ValueBet(ValueBetSignal),
}

impl MarketSignal {
    pub fn event_id(&self) -> &str {
        match self {
            MarketSignal::Drift(s) => &s.event_id,
            MarketSignal::ValueBet(s) => &s.event_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MarketSignal::Drift(_) => "drift",
            MarketSignal::ValueBet(_) => "value_bet",
        }
    }
}
