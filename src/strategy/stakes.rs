//! Stake allocation across the legs of an arbitrage

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::OddsError;

/// How proportional stakes are rounded before they are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMode {
    /// Tiered: nearest 100 above 1000, nearest 50 above 100, else nearest 5
    #[default]
    Smart,
    /// Nearest 5 regardless of size
    Flat,
}

/// Stake for one leg, before and after rounding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeSplit {
    pub raw: Decimal,
    pub rounded: Decimal,
}

/// Round `amount` to the nearest multiple of `step`, ties to even
fn round_to(amount: Decimal, step: Decimal) -> Decimal {
    (amount / step).round() * step
}

/// Round a stake so it looks like a human bet
pub fn round_stake(amount: Decimal, mode: RoundingMode) -> Decimal {
    let step = match mode {
        RoundingMode::Flat => Decimal::from(5),
        RoundingMode::Smart if amount > Decimal::from(1000) => Decimal::from(100),
        RoundingMode::Smart if amount > Decimal::from(100) => Decimal::from(50),
        RoundingMode::Smart => Decimal::from(5),
    };
    round_to(amount, step)
}

/// Split `total` across `prices` so every leg pays the same.
///
/// `stake_i = total * (1/price_i) / sum(1/price_j)`. The last leg takes whatever
/// the others leave, so the raw stakes sum to `total` exactly. Rounding is then
/// applied per leg and does not preserve the equal payout.
pub fn allocate_stakes(
    total: Decimal,
    prices: &[Decimal],
    mode: RoundingMode,
) -> Result<Vec<StakeSplit>, OddsError> {
    if prices.is_empty() || prices.iter().any(|p| *p <= Decimal::ZERO) {
        return Err(OddsError::InvalidOdds {
            prices: prices.to_vec(),
        });
    }

    let weights: Vec<Decimal> = prices.iter().map(|p| Decimal::ONE / p).collect();
    let weight_sum: Decimal = weights.iter().sum();
    if weight_sum.is_zero() {
        return Err(OddsError::DegenerateImpliedTotal {
            prices: prices.to_vec(),
        });
    }

    let mut raw: Vec<Decimal> = weights[..weights.len() - 1]
        .iter()
        .map(|w| total * w / weight_sum)
        .collect();
    let allocated: Decimal = raw.iter().sum();
    raw.push(total - allocated);

    Ok(raw
        .into_iter()
        .map(|raw| StakeSplit {
            raw,
            rounded: round_stake(raw, mode),
        })
        .collect())
}
