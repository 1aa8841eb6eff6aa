use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One leg of an arbitrage opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub outcome: String,
    pub price: Decimal,
    pub bookmaker: String,
    /// Stake after rounding; what gets shown to the bettor
    pub stake: Decimal,
    /// Exact proportional stake before rounding
    pub raw_stake: Decimal,
}

impl Bet {
    /// Return if this leg wins, using the rounded stake
    pub fn payout(&self) -> Decimal {
        self.stake * self.price
    }
}

/// A filtered, staked arbitrage across two or three bookmakers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub event_id: String,
    /// Display sport
    pub sport: String,
    /// Provider sport key
    pub sport_key: String,
    pub event_name: String,
    pub commence_time: DateTime<Utc>,
    /// Return on total stake, percent
    pub roi: Decimal,
    pub bets: Vec<Bet>,
}

impl Opportunity {
    /// Sum of rounded stakes
    pub fn total_stake(&self) -> Decimal {
        self.bets.iter().map(|b| b.stake).sum()
    }

    /// Smallest payout across legs (rounded stakes)
    pub fn guaranteed_payout(&self) -> Decimal {
        self.bets
            .iter()
            .map(Bet::payout)
            .min()
            .unwrap_or(Decimal::ZERO)
    }

    /// Worst-case profit with the rounded stakes
    pub fn guaranteed_profit(&self) -> Decimal {
        self.guaranteed_payout() - self.total_stake()
    }

    pub fn bookmakers(&self) -> Vec<&str> {
        self.bets.iter().map(|b| b.bookmaker.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_guaranteed_profit_uses_worst_leg() {
        let opp = Opportunity {
            event_id: "e".to_string(),
            sport: "NBA".to_string(),
            sport_key: "basketball_nba".to_string(),
            event_name: "A vs B".to_string(),
            commence_time: Utc::now(),
            roi: dec!(3.73),
            bets: vec![
                Bet {
                    outcome: "A".to_string(),
                    price: dec!(2.10),
                    bookmaker: "x".to_string(),
                    stake: dec!(500),
                    raw_stake: dec!(493.98),
                },
                Bet {
                    outcome: "B".to_string(),
                    price: dec!(2.05),
                    bookmaker: "y".to_string(),
                    stake: dec!(500),
                    raw_stake: dec!(506.02),
                },
            ],
        };

        assert_eq!(opp.total_stake(), dec!(1000));
        // min(1050, 1025) - 1000
        assert_eq!(opp.guaranteed_profit(), dec!(25.00));
        assert_eq!(opp.bookmakers(), vec!["x", "y"]);
    }
}
