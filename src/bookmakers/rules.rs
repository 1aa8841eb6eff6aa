//! Settlement-rule database and human-facing risk reporting
//!
//! Basketball moneylines differ on whether overtime counts; two legs settled
//! under different conventions are not a hedge. Soccer 1X2 markets settle on
//! 90 minutes plus injury time almost everywhere, so soccer mismatches are only
//! ever reported, never enforced.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::{alias_key, canonical_key, strip_region};
use crate::config::RulesConfig;
use crate::domain::SportFamily;

/// How a bookmaker settles a moneyline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementRule {
    IncludesOvertime,
    RegulationOnly,
    Unknown,
}

impl SettlementRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementRule::IncludesOvertime => "includes_overtime",
            SettlementRule::RegulationOnly => "regulation_only",
            SettlementRule::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, SettlementRule::Unknown)
    }
}

impl std::fmt::Display for SettlementRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name matching strategy for rule and high-risk lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Normalise, resolve aliases, then match exactly
    #[default]
    Alias,
    /// Case-insensitive substring match in either direction.
    /// Short names can match inside unrelated longer ones.
    Substring,
}

/// Severity of a risk annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Ok,
    Warning,
    Critical,
}

impl RiskLevel {
    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Ok => "\u{2705}",            // check mark
            RiskLevel::Warning => "\u{26a0}\u{fe0f}", // warning sign
            RiskLevel::Critical => "\u{1f534}",     // red circle
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Ok => "ok",
            RiskLevel::Warning => "warning",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of `RuleDatabase::risk_check`; annotation only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskStatus {
    pub level: RiskLevel,
    pub message: String,
}

impl RiskStatus {
    fn new(level: RiskLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.level.emoji(), self.message)
    }
}

/// Settlement compatibility of two bookmakers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairValidation {
    pub compatible: bool,
    pub warning: Option<String>,
    pub recommendation: String,
}

/// Bookmaker settlement conventions per sport family
#[derive(Debug, Clone)]
pub struct RuleDatabase {
    mode: MatchMode,
    basketball: BTreeMap<String, SettlementRule>,
    soccer: BTreeMap<String, SettlementRule>,
    /// alias_key(spelling) -> canonical key
    aliases: HashMap<String, String>,
    high_risk: Vec<String>,
}

impl RuleDatabase {
    pub fn new(config: &RulesConfig) -> Self {
        let normalise = |table: &HashMap<String, SettlementRule>| {
            table
                .iter()
                .map(|(name, rule)| (canonical_key(name), *rule))
                .collect::<BTreeMap<_, _>>()
        };

        let mut aliases = HashMap::new();
        for (canonical, spellings) in &config.aliases {
            let canonical = canonical_key(canonical);
            for spelling in spellings {
                aliases.insert(alias_key(spelling), canonical.clone());
            }
        }

        Self {
            mode: config.match_mode,
            basketball: normalise(&config.basketball),
            soccer: normalise(&config.soccer),
            aliases,
            high_risk: config.high_risk.clone(),
        }
    }

    /// Canonical key for a provider spelling, aliases applied
    pub fn resolve(&self, bookmaker: &str) -> String {
        if let Some(canonical) = self.aliases.get(&alias_key(bookmaker)) {
            return canonical.clone();
        }
        let key = canonical_key(bookmaker);
        self.aliases.get(&key).cloned().unwrap_or(key)
    }

    fn table(&self, family: SportFamily) -> Option<&BTreeMap<String, SettlementRule>> {
        match family {
            SportFamily::Basketball => Some(&self.basketball),
            SportFamily::Soccer => Some(&self.soccer),
            SportFamily::Other => None,
        }
    }

    /// Does the configured `key` refer to `bookmaker` under the active mode
    fn matches(&self, bookmaker: &str, key: &str) -> bool {
        match self.mode {
            MatchMode::Alias => self.resolve(bookmaker) == canonical_key(key),
            MatchMode::Substring => {
                let cleaned = alias_key(strip_region(bookmaker));
                let key = alias_key(key);
                !cleaned.is_empty()
                    && !key.is_empty()
                    && (cleaned.contains(&key) || key.contains(&cleaned))
            }
        }
    }

    /// Settlement rule for a bookmaker in a sport family
    pub fn rule_for(&self, bookmaker: &str, family: SportFamily) -> SettlementRule {
        let Some(table) = self.table(family) else {
            return SettlementRule::Unknown;
        };

        let rule = match self.mode {
            MatchMode::Alias => table.get(&self.resolve(bookmaker)).copied(),
            MatchMode::Substring => table
                .iter()
                .find(|(key, _)| self.matches(bookmaker, key))
                .map(|(_, rule)| *rule),
        };

        let rule = rule.unwrap_or(SettlementRule::Unknown);
        debug!("Settlement rule for {} ({}): {}", bookmaker, family, rule);
        rule
    }

    /// The configured high-risk entry this bookmaker matches, if any
    pub fn high_risk_match(&self, bookmaker: &str) -> Option<&str> {
        self.high_risk
            .iter()
            .find(|risky| self.matches(bookmaker, risky))
            .map(String::as_str)
    }

    pub fn is_high_risk(&self, bookmaker: &str) -> bool {
        self.high_risk_match(bookmaker).is_some()
    }

    /// Tiered risk annotation for a bookmaker pair.
    ///
    /// `market_type` is a free-form key such as "basketball_moneyline"; its sport
    /// family decides which checks apply. This never affects accept/reject.
    pub fn risk_check(&self, market_type: &str, bookie_a: &str, bookie_b: &str) -> RiskStatus {
        for bookie in [bookie_a, bookie_b] {
            if let Some(risky) = self.high_risk_match(bookie) {
                return RiskStatus::new(
                    RiskLevel::Critical,
                    format!(
                        "HIGH RISK: {} has non-standard {} rules - VERIFY MANUALLY",
                        risky, market_type
                    ),
                );
            }
        }

        match SportFamily::from_sport_key(market_type) {
            SportFamily::Basketball => {
                let rule_a = self.rule_for(bookie_a, SportFamily::Basketball);
                let rule_b = self.rule_for(bookie_b, SportFamily::Basketball);

                if !rule_a.is_known() || !rule_b.is_known() {
                    RiskStatus::new(
                        RiskLevel::Warning,
                        "WARNING: Unknown overtime rules - CHECK BOTH SITES",
                    )
                } else if rule_a != rule_b {
                    RiskStatus::new(
                        RiskLevel::Critical,
                        format!(
                            "RULE MISMATCH: {} ({}) vs {} ({}) - REJECT ARB",
                            bookie_a, rule_a, bookie_b, rule_b
                        ),
                    )
                } else {
                    RiskStatus::new(RiskLevel::Ok, format!("Rules match: both {}", rule_a))
                }
            }
            SportFamily::Soccer => RiskStatus::new(
                RiskLevel::Ok,
                "Check: ensure both settle at 90 mins + injury time (NOT 'to advance')",
            ),
            SportFamily::Other => RiskStatus::new(RiskLevel::Ok, "Rules match"),
        }
    }

    /// Whether two bookmakers settle the same way for a sport
    pub fn validate_pair(&self, bookie_a: &str, bookie_b: &str, sport: &str) -> PairValidation {
        let family = SportFamily::from_sport_key(sport);
        let rule_a = self.rule_for(bookie_a, family);
        let rule_b = self.rule_for(bookie_b, family);

        if !rule_a.is_known() || !rule_b.is_known() {
            return PairValidation {
                compatible: false,
                warning: Some(format!(
                    "Unknown settlement rules for {} or {}",
                    bookie_a, bookie_b
                )),
                recommendation: "MANUALLY VERIFY terms on both sites before betting".to_string(),
            };
        }

        if rule_a != rule_b {
            return PairValidation {
                compatible: false,
                warning: Some(format!(
                    "RULE MISMATCH: {} uses {}, {} uses {}",
                    bookie_a, rule_a, bookie_b, rule_b
                )),
                recommendation: "REJECT THIS ARB - High void risk".to_string(),
            };
        }

        PairValidation {
            compatible: true,
            warning: None,
            recommendation: format!("Safe: both settle on {}", rule_a),
        }
    }

    /// Ordered manual checks to run before placing the legs
    pub fn checklist(&self, bookie_a: &str, bookie_b: &str, sport: &str) -> Vec<String> {
        let mut checklist = vec![
            format!("Check {} terms: does the bet include overtime/extra time?", bookie_a),
            format!("Check {} terms: does the bet include overtime/extra time?", bookie_b),
            "Verify both have the SAME payout conditions".to_string(),
        ];

        match SportFamily::from_sport_key(sport) {
            SportFamily::Basketball => checklist.extend([
                "Confirm overtime is included on BOTH sites".to_string(),
                "Check void conditions (player injury/scratch rules)".to_string(),
            ]),
            SportFamily::Soccer => checklist.extend([
                "Confirm bet settles at 90 min + injury time (NOT penalties/extra time)"
                    .to_string(),
                "Check if postponement voids the bet".to_string(),
            ]),
            SportFamily::Other => {}
        }

        checklist.push("Paper trade first: open both apps, verify odds match the alert".to_string());
        checklist
    }
}
