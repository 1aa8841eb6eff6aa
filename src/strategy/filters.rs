//! Safety filters applied to every arbitrage candidate
//!
//! Filters run strictly in order and the first rejection wins:
//! - `ProfitCeiling`: ROI too good to be true, probably a palpable error
//! - `ProfitFloor`: ROI too thin to cover transfer costs
//! - `RuleMismatchFilter`: legs settle under different overtime conventions

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::bookmakers::{RuleDatabase, SettlementRule};
use crate::config::FilterConfig;
use crate::domain::SportFamily;
use crate::error::Rejection;

/// What the filters get to see of a candidate
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub event_name: &'a str,
    /// Provider sport key
    pub sport: &'a str,
    /// Percent
    pub roi: Decimal,
    /// Bookmaker per leg, in outcome order
    pub bookmakers: Vec<&'a str>,
}

impl Candidate<'_> {
    /// Every unordered pair of distinct bookmakers among the legs
    pub fn bookmaker_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        for (i, a) in self.bookmakers.iter().enumerate() {
            for b in &self.bookmakers[i + 1..] {
                if a != b && !pairs.contains(&(*a, *b)) && !pairs.contains(&(*b, *a)) {
                    pairs.push((*a, *b));
                }
            }
        }
        pairs
    }
}

/// One accept/reject rule
pub trait SafetyFilter: Send + Sync {
    /// Name of this filter
    fn name(&self) -> &str;

    /// Accept the candidate or say why not
    fn check(&self, candidate: &Candidate<'_>) -> Result<(), Rejection>;
}

/// Rejects ROI above the palpable-error threshold
pub struct ProfitCeiling {
    pub max_roi: Decimal,
}

impl SafetyFilter for ProfitCeiling {
    fn name(&self) -> &str {
        "ProfitCeiling"
    }

    fn check(&self, candidate: &Candidate<'_>) -> Result<(), Rejection> {
        if candidate.roi > self.max_roi {
            return Err(Rejection::PalpableError {
                roi: candidate.roi,
                threshold: self.max_roi,
            });
        }
        Ok(())
    }
}

/// Rejects ROI below the minimum worth acting on
pub struct ProfitFloor {
    pub min_roi: Decimal,
}

impl SafetyFilter for ProfitFloor {
    fn name(&self) -> &str {
        "ProfitFloor"
    }

    fn check(&self, candidate: &Candidate<'_>) -> Result<(), Rejection> {
        if candidate.roi < self.min_roi {
            return Err(Rejection::LowProfit {
                roi: candidate.roi,
                threshold: self.min_roi,
            });
        }
        Ok(())
    }
}

/// Rejects basketball legs whose bookmakers disagree on overtime.
///
/// Unknown rules and every soccer discrepancy only produce warnings.
pub struct RuleMismatchFilter {
    rules: Arc<RuleDatabase>,
}

impl RuleMismatchFilter {
    pub fn new(rules: Arc<RuleDatabase>) -> Self {
        Self { rules }
    }
}

impl SafetyFilter for RuleMismatchFilter {
    fn name(&self) -> &str {
        "RuleMismatch"
    }

    fn check(&self, candidate: &Candidate<'_>) -> Result<(), Rejection> {
        for bookmaker in &candidate.bookmakers {
            if self.rules.is_high_risk(bookmaker) {
                warn!(
                    "{}: {} is a high-risk bookmaker, verify its rules manually",
                    candidate.event_name, bookmaker
                );
            }
        }

        let family = SportFamily::from_sport_key(candidate.sport);
        if family == SportFamily::Other {
            return Ok(());
        }

        for (a, b) in candidate.bookmaker_pairs() {
            let rule_a = self.rules.rule_for(a, family);
            let rule_b = self.rules.rule_for(b, family);

            match family {
                SportFamily::Basketball => {
                    if rule_a == SettlementRule::Unknown || rule_b == SettlementRule::Unknown {
                        warn!(
                            "{}: unknown overtime rules for {} ({}) or {} ({}), check both sites",
                            candidate.event_name, a, rule_a, b, rule_b
                        );
                    } else if rule_a != rule_b {
                        return Err(Rejection::RuleMismatch {
                            bookmaker_a: a.to_string(),
                            rule_a: rule_a.to_string(),
                            bookmaker_b: b.to_string(),
                            rule_b: rule_b.to_string(),
                        });
                    }
                }
                _ => {
                    if rule_a != rule_b || !rule_a.is_known() {
                        info!(
                            "{}: settlement differs or is unknown for {} ({}) / {} ({}), confirm 90 min settlement",
                            candidate.event_name, a, rule_a, b, rule_b
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

/// Ordered filter pipeline
pub struct SafetyFilterChain {
    filters: Vec<Box<dyn SafetyFilter>>,
}

impl SafetyFilterChain {
    pub fn new(filters: Vec<Box<dyn SafetyFilter>>) -> Self {
        Self { filters }
    }

    /// Ceiling, floor, then rules (when enabled)
    pub fn from_config(config: &FilterConfig, rules: Arc<RuleDatabase>) -> Self {
        let mut filters: Vec<Box<dyn SafetyFilter>> = vec![
            Box::new(ProfitCeiling {
                max_roi: config.max_roi_percent,
            }),
            Box::new(ProfitFloor {
                min_roi: config.min_roi_percent,
            }),
        ];
        if config.check_rules {
            filters.push(Box::new(RuleMismatchFilter::new(rules)));
        }
        Self::new(filters)
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run every filter in order, stopping at the first rejection
    pub fn evaluate(&self, candidate: &Candidate<'_>) -> Result<(), Rejection> {
        for filter in &self.filters {
            filter.check(candidate)?;
        }
        Ok(())
    }
}
