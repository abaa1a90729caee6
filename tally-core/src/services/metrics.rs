//! Derived sale metrics

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::result::{Error, Result};
use crate::domain::{DerivedMetrics, ParsedSale, PriceBand};

/// Decimal places kept on the margin ratio
const MARGIN_SCALE: u32 = 6;

/// Unit price thresholds for the price band classification.
/// Each lower bound is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBands {
    medium_from: Decimal,
    high_from: Decimal,
}

impl PriceBands {
    pub fn new(medium_from: Decimal, high_from: Decimal) -> Result<Self> {
        if medium_from < Decimal::ZERO || high_from < Decimal::ZERO {
            return Err(Error::config(format!(
                "price band thresholds must not be negative (got {} and {})",
                medium_from, high_from
            )));
        }
        if medium_from > high_from {
            return Err(Error::config(format!(
                "medium price band starts at {} but high starts at {}",
                medium_from, high_from
            )));
        }
        Ok(Self {
            medium_from,
            high_from,
        })
    }

    pub fn medium_from(&self) -> Decimal {
        self.medium_from
    }

    pub fn high_from(&self) -> Decimal {
        self.high_from
    }

    pub fn classify(&self, unit_price: Decimal) -> PriceBand {
        if unit_price >= self.high_from {
            PriceBand::High
        } else if unit_price >= self.medium_from {
            PriceBand::Medium
        } else {
            PriceBand::Low
        }
    }
}

impl Default for PriceBands {
    fn default() -> Self {
        Self {
            medium_from: Decimal::new(5000, 2),
            high_from: Decimal::new(20000, 2),
        }
    }
}

/// Compute margin, profit and price band for a parsed sale
pub fn compute_metrics(sale: &ParsedSale, bands: &PriceBands) -> DerivedMetrics {
    let unit_profit = sale.unit_price - sale.unit_cost;

    let margin = if sale.unit_price > Decimal::ZERO {
        unit_profit
            .checked_div(sale.unit_price)
            .map(|m| m.round_dp_with_strategy(MARGIN_SCALE, RoundingStrategy::MidpointAwayFromZero))
            .map(|m| m.normalize())
    } else {
        None
    };

    DerivedMetrics {
        margin,
        profit: unit_profit * Decimal::from(sale.quantity),
        price_band: bands.classify(sale.unit_price),
    }
}
