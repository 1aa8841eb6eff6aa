//! Bookmaker identity, settlement rules and sharp/soft classification
//!
//! Provider keys arrive in many spellings ("williamhill_us", "William Hill",
//! "betfair_ex_eu"). Everything in this module funnels them through the same
//! normalisation before any lookup:
//! - `strip_region` drops an underscore-separated regional suffix
//! - `canonical_key` lowercases and keeps only ASCII alphanumerics

pub mod classifier;
pub mod rules;

pub use classifier::{BookmakerClassifier, BookmakerTier, PriorityTag};
pub use rules::{
    MatchMode, PairValidation, RiskLevel, RiskStatus, RuleDatabase, SettlementRule,
};

/// Drop the regional suffix ("unibet_us" -> "unibet")
pub fn strip_region(bookmaker: &str) -> &str {
    bookmaker.split('_').next().unwrap_or(bookmaker)
}

/// Lowercase ASCII alphanumerics only, suffix kept
pub fn alias_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Normalised lookup key ("William Hill" and "williamhill_us" -> "williamhill")
pub fn canonical_key(bookmaker: &str) -> String {
    alias_key(strip_region(bookmaker))
}

/// Human-readable bookmaker name for alerts
pub fn display_name(bookmaker: &str) -> String {
    let key = canonical_key(bookmaker);
    let known = match key.as_str() {
        "williamhill" => Some("William Hill"),
        "draftkings" => Some("DraftKings"),
        "fanduel" => Some("FanDuel"),
        "betmgm" => Some("BetMGM"),
        "pointsbet" => Some("PointsBet"),
        "unibet" => Some("Unibet"),
        "betfair" => Some("Betfair"),
        "pinnacle" => Some("Pinnacle"),
        "1xbet" => Some("1xBet"),
        "bet365" => Some("Bet365"),
        "marathonbet" => Some("Marathonbet"),
        _ => None,
    };

    match known {
        Some(name) => name.to_string(),
        None => {
            let mut chars = bookmaker.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}
