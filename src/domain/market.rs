use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One bookmaker's decimal price for one outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bookmaker: String,
    pub outcome: String,
    /// Decimal odds (e.g. 2.10)
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(bookmaker: &str, outcome: &str, price: Decimal, observed_at: DateTime<Utc>) -> Self {
        Self {
            bookmaker: bookmaker.to_string(),
            outcome: outcome.to_string(),
            price,
            observed_at,
        }
    }

    /// Check if the quote is older than `max_age` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.observed_at > max_age
    }
}

/// A sporting event with every quote collected for it in one polling cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    /// Provider sport key (e.g. "basketball_nba")
    pub sport: String,
    /// Display title (e.g. "NBA")
    #[serde(default)]
    pub sport_title: Option<String>,
    /// (home, away)
    pub participants: (String, String),
    pub start_time: DateTime<Utc>,
    pub quotes: Vec<Quote>,
}

impl Event {
    /// "Home vs Away"
    pub fn name(&self) -> String {
        format!("{} vs {}", self.participants.0, self.participants.1)
    }

    /// Title when the provider sent one, otherwise the sport key
    pub fn display_sport(&self) -> &str {
        self.sport_title.as_deref().unwrap_or(&self.sport)
    }

    pub fn family(&self) -> SportFamily {
        SportFamily::from_sport_key(&self.sport)
    }

    /// Distinct bookmakers quoting this event
    pub fn bookmaker_count(&self) -> usize {
        let mut seen: Vec<&str> = Vec::new();
        for quote in &self.quotes {
            if !seen.contains(&quote.bookmaker.as_str()) {
                seen.push(&quote.bookmaker);
            }
        }
        seen.len()
    }

    /// Group quotes by outcome name, keeping first-seen outcome order
    pub fn quotes_by_outcome(&self) -> Vec<(&str, Vec<&Quote>)> {
        let mut groups: Vec<(&str, Vec<&Quote>)> = Vec::new();
        for quote in &self.quotes {
            match groups.iter_mut().find(|(name, _)| *name == quote.outcome) {
                Some((_, group)) => group.push(quote),
                None => groups.push((&quote.outcome, vec![quote])),
            }
        }
        groups
    }

    /// Market shape derived from the number of distinct outcomes
    pub fn shape(&self) -> MarketShape {
        MarketShape::from_outcome_count(self.quotes_by_outcome().len())
    }

    /// Price per `(outcome, bookmaker)`; a later duplicate quote wins
    pub fn prices_by_bookmaker(&self) -> HashMap<(String, String), Decimal> {
        self.quotes
            .iter()
            .map(|q| ((q.outcome.clone(), q.bookmaker.clone()), q.price))
            .collect()
    }

    /// Copy of the event without quotes older than `max_age`
    pub fn without_stale_quotes(&self, now: DateTime<Utc>, max_age: Duration) -> Self {
        Self {
            quotes: self
                .quotes
                .iter()
                .filter(|q| !q.is_stale(now, max_age))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

/// Market structure inferred from an event's quotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketShape {
    /// Moneyline without a draw
    TwoWay,
    /// 1X2 with a draw
    ThreeWay,
    /// Anything else; never produces opportunities
    Unsupported(usize),
}

impl MarketShape {
    pub fn from_outcome_count(count: usize) -> Self {
        match count {
            2 => MarketShape::TwoWay,
            3 => MarketShape::ThreeWay,
            n => MarketShape::Unsupported(n),
        }
    }
}

/// Sport grouping used for settlement-rule checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SportFamily {
    Basketball,
    /// Soccer and anything keyed as football
    Soccer,
    Other,
}

impl SportFamily {
    pub fn from_sport_key(sport: &str) -> Self {
        let sport = sport.to_lowercase();
        if sport.contains("basketball") {
            SportFamily::Basketball
        } else if sport.contains("soccer") || sport.contains("football") {
            SportFamily::Soccer
        } else {
            SportFamily::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SportFamily::Basketball => "basketball",
            SportFamily::Soccer => "soccer",
            SportFamily::Other => "other",
        }
    }
}

impl std::fmt::Display for SportFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
