use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the arbitrage scanner
#[derive(Error, Debug)]
pub enum OddsArbError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Collaborator errors
    #[error("Odds feed error: {0}")]
    Feed(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    // Odds arithmetic errors
    #[error(transparent)]
    Odds(#[from] OddsError),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("A manual scan is already in progress")]
    BurstInProgress,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for OddsArbError
pub type Result<T> = std::result::Result<T, OddsArbError>;

/// Errors raised by the implied-probability arithmetic.
///
/// These are local to a single price combination: the detector logs them and
/// moves on to the next combination.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OddsError {
    #[error("Invalid odds: {prices:?} (every price must be > 0)")]
    InvalidOdds { prices: Vec<Decimal> },

    #[error("Degenerate implied total for odds {prices:?}")]
    DegenerateImpliedTotal { prices: Vec<Decimal> },
}

/// Why a safety filter turned a candidate down.
///
/// Rejections are expected steady-state outcomes, not faults.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("PALPABLE_ERROR (ROI {roi:.1}% > {threshold}% threshold - likely void)")]
    PalpableError { roi: Decimal, threshold: Decimal },

    #[error("LOW_PROFIT (ROI {roi:.2}% < {threshold}% minimum)")]
    LowProfit { roi: Decimal, threshold: Decimal },

    #[error("RULE_MISMATCH ({bookmaker_a}:{rule_a} vs {bookmaker_b}:{rule_b})")]
    RuleMismatch {
        bookmaker_a: String,
        rule_a: String,
        bookmaker_b: String,
        rule_b: String,
    },
}

impl Rejection {
    /// Short machine-friendly label used for stats and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::PalpableError { .. } => "palpable_error",
            Rejection::LowProfit { .. } => "low_profit",
            Rejection::RuleMismatch { .. } => "rule_mismatch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rejection_messages() {
        let palpable = Rejection::PalpableError {
            roi: dec!(20.04),
            threshold: dec!(15),
        };
        assert_eq!(
            palpable.to_string(),
            "PALPABLE_ERROR (ROI 20.0% > 15% threshold - likely void)"
        );
        assert_eq!(palpable.kind(), "palpable_error");

        let low = Rejection::LowProfit {
            roi: dec!(0.754),
            threshold: dec!(1.5),
        };
        assert_eq!(low.to_string(), "LOW_PROFIT (ROI 0.75% < 1.5% minimum)");
    }

    #[test]
    fn test_odds_error_converts() {
        let err: OddsArbError = OddsError::InvalidOdds {
            prices: vec![dec!(0), dec!(2.0)],
        }
        .into();
        assert!(err.to_string().contains("Invalid odds"));
    }
}
