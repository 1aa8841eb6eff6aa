//! Detection strategy
//!
//! - `arbitrage` - implied-probability tests and combination enumeration
//! - `stakes` - proportional stake allocation and rounding tiers
//! - `filters` - ordered safety filters applied to each candidate
//! - `drift` - cycle-to-cycle drift and sharp/soft value-bet tracking

pub mod arbitrage;
pub mod drift;
pub mod filters;
pub mod stakes;

pub use arbitrage::{
    detect_arbitrage, detect_three_way, detect_two_way, implied_probability,
    implied_probability_percent, ArbitrageDetector, ScanOutcome,
};
pub use drift::{DriftTracker, SharpSnapshot};
pub use filters::{
    Candidate, ProfitCeiling, ProfitFloor, RuleMismatchFilter, SafetyFilter, SafetyFilterChain,
};
pub use stakes::{allocate_stakes, round_stake, RoundingMode, StakeSplit};
