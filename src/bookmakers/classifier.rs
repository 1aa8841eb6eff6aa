use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{canonical_key, display_name};
use crate::config::BookmakerConfig;

/// Market role of a bookmaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmakerTier {
    /// Price-setting, low margin; treated as ground truth
    Sharp,
    /// Slow to move; the usual target
    Soft,
    Unknown,
}

impl BookmakerTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookmakerTier::Sharp => "sharp",
            BookmakerTier::Soft => "soft",
            BookmakerTier::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for BookmakerTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert priority derived from the tiers of a bookmaker pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityTag {
    /// Sharp against soft
    HighConfidence,
    /// Soft against soft
    FastMove,
    /// Sharp against sharp
    SharpArb,
    Standard,
}

impl PriorityTag {
    pub fn icon(&self) -> &'static str {
        match self {
            PriorityTag::HighConfidence => "\u{2b50}",  // star
            PriorityTag::FastMove => "\u{26a1}",        // lightning
            PriorityTag::SharpArb => "\u{1f539}",       // blue diamond
            PriorityTag::Standard => "\u{1f4ca}",       // bar chart
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriorityTag::HighConfidence => "HIGH CONFIDENCE",
            PriorityTag::FastMove => "FAST MOVE",
            PriorityTag::SharpArb => "SHARP ARB",
            PriorityTag::Standard => "STANDARD",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTag::HighConfidence => "HIGH_CONFIDENCE",
            PriorityTag::FastMove => "FAST_MOVE",
            PriorityTag::SharpArb => "SHARP_ARB",
            PriorityTag::Standard => "STANDARD",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            PriorityTag::HighConfidence => {
                "Sharp bookmaker vs Soft bookmaker - High probability profit"
            }
            PriorityTag::FastMove => "Both bookmakers are slow movers - Temporary pricing lag",
            PriorityTag::SharpArb => "Rare arbitrage between market leaders - Act quickly",
            PriorityTag::Standard => "Standard arbitrage opportunity",
        }
    }
}

impl std::fmt::Display for PriorityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.icon(), self.label())
    }
}

/// Sharp/soft partition of bookmaker identifiers.
///
/// Membership is exact after the regional suffix is stripped, so
/// "unibet_us" is soft when "unibet" is listed.
#[derive(Debug, Clone)]
pub struct BookmakerClassifier {
    sharp: HashSet<String>,
    soft: HashSet<String>,
}

impl BookmakerClassifier {
    pub fn new<S: AsRef<str>>(sharp: &[S], soft: &[S]) -> Self {
        let keys = |names: &[S]| names.iter().map(|n| canonical_key(n.as_ref())).collect();
        Self {
            sharp: keys(sharp),
            soft: keys(soft),
        }
    }

    pub fn from_config(config: &BookmakerConfig) -> Self {
        Self::new(&config.sharp, &config.soft)
    }

    pub fn classify(&self, bookmaker: &str) -> BookmakerTier {
        let key = canonical_key(bookmaker);
        if self.sharp.contains(&key) {
            BookmakerTier::Sharp
        } else if self.soft.contains(&key) {
            BookmakerTier::Soft
        } else {
            BookmakerTier::Unknown
        }
    }

    pub fn is_sharp(&self, bookmaker: &str) -> bool {
        self.classify(bookmaker) == BookmakerTier::Sharp
    }

    pub fn is_soft(&self, bookmaker: &str) -> bool {
        self.classify(bookmaker) == BookmakerTier::Soft
    }

    pub fn priority_tag(&self, bookie_a: &str, bookie_b: &str) -> PriorityTag {
        use BookmakerTier::{Sharp, Soft};

        match (self.classify(bookie_a), self.classify(bookie_b)) {
            (Sharp, Soft) | (Soft, Sharp) => PriorityTag::HighConfidence,
            (Soft, Soft) => PriorityTag::FastMove,
            (Sharp, Sharp) => PriorityTag::SharpArb,
            _ => PriorityTag::Standard,
        }
    }

    /// The sharp side of a pair, only when exactly one side is sharp
    pub fn identify_sharp<'a>(&self, bookie_a: &'a str, bookie_b: &'a str) -> Option<&'a str> {
        match (self.is_sharp(bookie_a), self.is_sharp(bookie_b)) {
            (true, false) => Some(bookie_a),
            (false, true) => Some(bookie_b),
            _ => None,
        }
    }

    /// Betting hint for an alert
    pub fn recommendation(&self, bookie_a: &str, bookie_b: &str) -> Option<String> {
        if let Some(sharp) = self.identify_sharp(bookie_a, bookie_b) {
            return Some(format!(
                "\u{1f4a1} Pro Tip: {} is a Sharp bookmaker. Their price is the market consensus. Bet the opposite side.",
                display_name(sharp)
            ));
        }

        if self.is_soft(bookie_a) && self.is_soft(bookie_b) {
            return Some(
                "\u{23f1}\u{fe0f} Time Sensitive: Both bookmakers are slow movers. This gap may close within 2-3 minutes."
                    .to_string(),
            );
        }

        None
    }
}
