//! Cross-bookmaker arbitrage detection
//!
//! An event's quotes are grouped by outcome. Every combination taking one
//! quote per outcome is tested on its own: when the implied probabilities sum
//! below 1 the combination is an arbitrage, gets staked, and then has to pass
//! the safety filter chain before it becomes an `Opportunity`.

use rust_decimal::Decimal;
use tracing::{debug, info};

use super::filters::{Candidate, SafetyFilterChain};
use super::stakes::allocate_stakes;
use crate::config::{DetectorConfig, StakingConfig};
use crate::domain::{Bet, Event, MarketShape, Opportunity, Quote};
use crate::error::{OddsError, Rejection};

/// Implied probability of decimal odds, as a fraction
pub fn implied_probability(price: Decimal) -> Result<Decimal, OddsError> {
    if price <= Decimal::ZERO {
        return Err(OddsError::InvalidOdds {
            prices: vec![price],
        });
    }
    Ok(Decimal::ONE / price)
}

/// Implied probability of decimal odds, as a percentage
pub fn implied_probability_percent(price: Decimal) -> Result<Decimal, OddsError> {
    Ok(implied_probability(price)? * Decimal::ONE_HUNDRED)
}

/// ROI (percent) when `prices` form an arbitrage, `None` when they don't
pub fn detect_arbitrage(prices: &[Decimal]) -> Result<Option<Decimal>, OddsError> {
    if prices.is_empty() || prices.iter().any(|p| *p <= Decimal::ZERO) {
        return Err(OddsError::InvalidOdds {
            prices: prices.to_vec(),
        });
    }

    let implied_total: Decimal = prices.iter().map(|p| Decimal::ONE / p).sum();
    if implied_total.is_zero() {
        return Err(OddsError::DegenerateImpliedTotal {
            prices: prices.to_vec(),
        });
    }

    if implied_total < Decimal::ONE {
        let roi = (Decimal::ONE / implied_total - Decimal::ONE) * Decimal::ONE_HUNDRED;
        Ok(Some(roi))
    } else {
        Ok(None)
    }
}

/// Moneyline without a draw
pub fn detect_two_way(price_a: Decimal, price_b: Decimal) -> Result<Option<Decimal>, OddsError> {
    detect_arbitrage(&[price_a, price_b])
}

/// 1X2 market
pub fn detect_three_way(
    home: Decimal,
    draw: Decimal,
    away: Decimal,
) -> Result<Option<Decimal>, OddsError> {
    detect_arbitrage(&[home, draw, away])
}

/// Everything one detector pass over an event produced
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub opportunities: Vec<Opportunity>,
    pub rejections: Vec<Rejection>,
    /// Combinations tested
    pub combinations: usize,
    /// Combinations skipped on invalid odds
    pub invalid: usize,
}

impl ScanOutcome {
    pub fn arbitrages_found(&self) -> usize {
        self.opportunities.len() + self.rejections.len()
    }
}

fn distinct_bookmakers(legs: &[&Quote]) -> usize {
    let mut seen: Vec<&str> = Vec::with_capacity(legs.len());
    for leg in legs {
        if !seen.contains(&leg.bookmaker.as_str()) {
            seen.push(&leg.bookmaker);
        }
    }
    seen.len()
}

/// One quote per group, every way
fn cartesian<'a>(groups: &[Vec<&'a Quote>]) -> Vec<Vec<&'a Quote>> {
    let mut combos: Vec<Vec<&'a Quote>> = vec![Vec::new()];
    for group in groups {
        let mut next = Vec::with_capacity(combos.len() * group.len());
        for combo in &combos {
            for quote in group {
                let mut extended = combo.clone();
                extended.push(*quote);
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

/// Tests every cross-bookmaker combination of an event's quotes
pub struct ArbitrageDetector {
    filters: SafetyFilterChain,
    staking: StakingConfig,
    require_distinct_bookmakers: bool,
}

impl ArbitrageDetector {
    pub fn new(filters: SafetyFilterChain, staking: StakingConfig, detector: &DetectorConfig) -> Self {
        Self {
            filters,
            staking,
            require_distinct_bookmakers: detector.require_distinct_bookmakers,
        }
    }

    /// Whether a combination may be tested at all
    fn eligible(&self, legs: &[&Quote]) -> bool {
        let distinct = distinct_bookmakers(legs);
        match legs.len() {
            2 => distinct == 2,
            3 if self.require_distinct_bookmakers => distinct == 3,
            3 => distinct >= 2,
            _ => false,
        }
    }

    /// Every surviving opportunity for one event, plus what got rejected
    pub fn find_opportunities(&self, event: &Event) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        let groups = event.quotes_by_outcome();
        match MarketShape::from_outcome_count(groups.len()) {
            MarketShape::TwoWay | MarketShape::ThreeWay => {}
            MarketShape::Unsupported(n) => {
                debug!("{}: {} outcomes, skipping", event.id, n);
                return outcome;
            }
        }

        let groups: Vec<Vec<&Quote>> = groups.into_iter().map(|(_, quotes)| quotes).collect();
        for legs in cartesian(&groups) {
            if !self.eligible(&legs) {
                continue;
            }
            outcome.combinations += 1;

            let prices: Vec<Decimal> = legs.iter().map(|q| q.price).collect();
            let roi = match detect_arbitrage(&prices) {
                Ok(Some(roi)) => roi,
                Ok(None) => continue,
                Err(e) => {
                    debug!("{}: skipping combination: {}", event.id, e);
                    outcome.invalid += 1;
                    continue;
                }
            };

            let event_name = event.name();
            let candidate = Candidate {
                event_name: &event_name,
                sport: &event.sport,
                roi,
                bookmakers: legs.iter().map(|q| q.bookmaker.as_str()).collect(),
            };

            if let Err(rejection) = self.filters.evaluate(&candidate) {
                info!(
                    "Rejected {} [{}]: {}",
                    event_name,
                    candidate.bookmakers.join(" / "),
                    rejection
                );
                outcome.rejections.push(rejection);
                continue;
            }

            let stakes = match allocate_stakes(
                self.staking.total_investment,
                &prices,
                self.staking.rounding,
            ) {
                Ok(stakes) => stakes,
                Err(e) => {
                    debug!("{}: cannot stake combination: {}", event.id, e);
                    outcome.invalid += 1;
                    continue;
                }
            };

            let bets = legs
                .iter()
                .zip(stakes)
                .map(|(quote, stake)| Bet {
                    outcome: quote.outcome.clone(),
                    price: quote.price,
                    bookmaker: quote.bookmaker.clone(),
                    stake: stake.rounded,
                    raw_stake: stake.raw,
                })
                .collect();

            info!(
                "Arbitrage on {}: ROI {:.2}% [{}]",
                event_name,
                roi,
                candidate.bookmakers.join(" / ")
            );

            outcome.opportunities.push(Opportunity {
                event_id: event.id.clone(),
                sport: event.display_sport().to_string(),
                sport_key: event.sport.clone(),
                event_name: event_name.clone(),
                commence_time: event.start_time,
                roi,
                bets,
            });
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmakers::RuleDatabase;
    use crate::config::{FilterConfig, RulesConfig};
    use crate::strategy::RoundingMode;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn detector(require_distinct: bool) -> ArbitrageDetector {
        let filters = SafetyFilterChain::from_config(
            &FilterConfig {
                max_roi_percent: dec!(15),
                min_roi_percent: dec!(1.5),
                check_rules: true,
            },
            Arc::new(RuleDatabase::new(&RulesConfig::default())),
        );
        ArbitrageDetector::new(
            filters,
            StakingConfig {
                total_investment: dec!(1000),
                rounding: RoundingMode::Smart,
            },
            &DetectorConfig {
                require_distinct_bookmakers: require_distinct,
            },
        )
    }

    fn event(sport: &str, quotes: &[(&str, &str, Decimal)]) -> Event {
        let now = Utc::now();
        Event {
            id: "evt-1".to_string(),
            sport: sport.to_string(),
            sport_title: None,
            participants: ("Home".to_string(), "Away".to_string()),
            start_time: now + Duration::hours(3),
            quotes: quotes
                .iter()
                .map(|(b, o, p)| Quote::new(b, o, *p, now))
                .collect(),
        }
    }

    #[test]
    fn test_two_way_detection() {
        let roi = detect_two_way(dec!(2.10), dec!(2.05)).unwrap().unwrap();
        let expected = (Decimal::ONE / (Decimal::ONE / dec!(2.10) + Decimal::ONE / dec!(2.05))
            - Decimal::ONE)
            * Decimal::ONE_HUNDRED;
        assert_eq!(roi, expected);
        assert_eq!(roi.round_dp(2), dec!(3.73));

        assert_eq!(detect_two_way(dec!(1.90), dec!(1.90)).unwrap(), None);
        assert_eq!(detect_two_way(dec!(2.0), dec!(2.0)).unwrap(), None);
    }

    #[test]
    fn test_two_way_price_grid() {
        let prices: Vec<Decimal> = (101..=500).map(|cents| Decimal::new(cents, 2)).collect();
        let mut arbs = 0;

        for &a in &prices {
            for &b in &prices {
                let implied = Decimal::ONE / a + Decimal::ONE / b;
                match detect_two_way(a, b).unwrap() {
                    Some(roi) => {
                        assert!(implied < Decimal::ONE, "{a} / {b} flagged");
                        let expected =
                            (Decimal::ONE / implied - Decimal::ONE) * Decimal::ONE_HUNDRED;
                        assert_eq!(roi, expected, "{a} / {b}");
                        assert!(roi > Decimal::ZERO);
                        arbs += 1;
                    }
                    None => assert!(implied >= Decimal::ONE, "{a} / {b} missed"),
                }
            }
        }
        assert!(arbs > 0);
    }

    #[test]
    fn test_non_positive_prices_rejected() {
        for (a, b) in [
            (dec!(0), dec!(0)),
            (dec!(0), dec!(2.5)),
            (dec!(2.5), dec!(0)),
            (dec!(-0.01), dec!(3.0)),
            (dec!(3.0), dec!(-3.0)),
        ] {
            assert!(
                matches!(detect_two_way(a, b), Err(OddsError::InvalidOdds { .. })),
                "{a} / {b}"
            );
        }
    }

    #[test]
    fn test_invalid_odds() {
        assert!(matches!(
            detect_two_way(dec!(0), dec!(2.0)),
            Err(OddsError::InvalidOdds { .. })
        ));
        assert!(detect_two_way(dec!(-1.5), dec!(-2.0)).is_err());
        assert!(implied_probability(dec!(0)).is_err());
        assert_eq!(implied_probability_percent(dec!(2)).unwrap(), dec!(50));
    }

    #[test]
    fn test_three_way_detection() {
        // 1/3.2 + 1/3.6 + 1/3.9 < 1
        let roi = detect_three_way(dec!(3.2), dec!(3.6), dec!(3.9)).unwrap();
        assert!(roi.unwrap() > Decimal::ZERO);
        assert_eq!(detect_three_way(dec!(2.5), dec!(3.2), dec!(2.9)).unwrap(), None);
    }

    #[test]
    fn test_end_to_end_two_way() {
        let evt = event(
            "tennis_atp",
            &[
                ("x", "A", dec!(2.10)),
                ("x", "B", dec!(1.70)),
                ("y", "A", dec!(1.75)),
                ("y", "B", dec!(2.05)),
            ],
        );

        let outcome = detector(false).find_opportunities(&evt);
        assert_eq!(outcome.opportunities.len(), 1);

        let opp = &outcome.opportunities[0];
        assert_eq!(opp.roi.round_dp(2), dec!(3.73));
        assert_eq!(opp.bets.len(), 2);
        assert_eq!(opp.bets[0].bookmaker, "x");
        assert_eq!(opp.bets[0].price, dec!(2.10));
        assert_eq!(opp.bets[1].bookmaker, "y");
        assert_eq!(opp.bets[0].raw_stake + opp.bets[1].raw_stake, dec!(1000));
        assert!(opp.bets[0].raw_stake < opp.bets[1].raw_stake);
        assert_eq!(opp.total_stake(), dec!(1000));
    }

    #[test]
    fn test_same_bookmaker_pair_skipped() {
        let evt = event("tennis_atp", &[("x", "A", dec!(2.2)), ("x", "B", dec!(2.2))]);
        let outcome = detector(false).find_opportunities(&evt);
        assert_eq!(outcome.combinations, 0);
        assert!(outcome.opportunities.is_empty());
    }

    #[test]
    fn test_palpable_error_rejected() {
        let evt = event("tennis_atp", &[("x", "A", dec!(3.0)), ("y", "B", dec!(2.0))]);
        let outcome = detector(false).find_opportunities(&evt);
        assert!(outcome.opportunities.is_empty());
        assert!(matches!(
            outcome.rejections[0],
            Rejection::PalpableError { .. }
        ));
    }

    #[test]
    fn test_three_way_two_of_three_same_bookmaker() {
        let quotes = [
            ("x", "Home", dec!(2.9)),
            ("x", "Draw", dec!(3.6)),
            ("y", "Away", dec!(3.1)),
        ];

        let loose = detector(false).find_opportunities(&event("soccer_epl", &quotes));
        assert_eq!(loose.combinations, 1);
        assert_eq!(loose.opportunities.len(), 1);
        assert_eq!(loose.opportunities[0].bets.len(), 3);

        let strict = detector(true).find_opportunities(&event("soccer_epl", &quotes));
        assert_eq!(strict.combinations, 0);
    }

    #[test]
    fn test_single_bookmaker_three_way_excluded() {
        let quotes = [
            ("x", "Home", dec!(3.2)),
            ("x", "Draw", dec!(3.6)),
            ("x", "Away", dec!(3.9)),
        ];
        let outcome = detector(false).find_opportunities(&event("soccer_epl", &quotes));
        assert_eq!(outcome.combinations, 0);
    }

    #[test]
    fn test_unsupported_shape_yields_nothing() {
        let evt = event("tennis_atp", &[("x", "A", dec!(5.0))]);
        let outcome = detector(false).find_opportunities(&evt);
        assert_eq!(outcome.combinations, 0);
        assert!(outcome.opportunities.is_empty());
    }

    #[test]
    fn test_invalid_price_counted_not_fatal() {
        let evt = event(
            "tennis_atp",
            &[
                ("x", "A", dec!(0)),
                ("z", "A", dec!(2.10)),
                ("y", "B", dec!(2.05)),
            ],
        );
        let outcome = detector(false).find_opportunities(&evt);
        assert_eq!(outcome.invalid, 1);
        assert_eq!(outcome.opportunities.len(), 1);
    }
}
