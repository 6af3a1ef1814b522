//! Order money rules: totals, IVA and delivery fees.
//!
//! All amounts are exact decimals. Rounding follows the storefront's
//! half-up convention (`floor(x + 0.5)`) to whole pesos.

use bigdecimal::{BigDecimal, ToPrimitive};
use rand::Rng;
use std::fmt;
use std::str::FromStr;

pub const MIN_DELIVERY_FEE: i64 = 1;
pub const MAX_DELIVERY_FEE: i64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTaxRate(pub String);

impl fmt::Display for InvalidTaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tax rate must be a decimal between 0 and 1, got {}", self.0)
    }
}

impl std::error::Error for InvalidTaxRate {}

/// Value-added tax rate (IVA) as a fraction, e.g. `0.19`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxRate(BigDecimal);

impl TaxRate {
    pub fn new(rate: BigDecimal) -> Result<Self, InvalidTaxRate> {
        if rate < BigDecimal::from(0) || rate > BigDecimal::from(1) {
            return Err(InvalidTaxRate(rate.to_string()));
        }
        Ok(Self(rate))
    }

    pub fn value(&self) -> &BigDecimal {
        &self.0
    }
}

impl Default for TaxRate {
    /// Colombian IVA, 19%.
    fn default() -> Self {
        TaxRate(BigDecimal::new(19.into(), 2))
    }
}

impl FromStr for TaxRate {
    type Err = InvalidTaxRate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rate = BigDecimal::from_str(s.trim()).map_err(|_| InvalidTaxRate(s.to_string()))?;
        TaxRate::new(rate)
    }
}

/// Largest whole number not greater than `value`.
fn floor(value: &BigDecimal) -> BigDecimal {
    // with_scale truncates toward zero
    let truncated = value.with_scale(0);
    if truncated > *value {
        truncated - BigDecimal::from(1)
    } else {
        truncated
    }
}

/// Rounds half toward positive infinity.
pub fn round_half_up(value: &BigDecimal) -> BigDecimal {
    let half = BigDecimal::from(1) / BigDecimal::from(2);
    floor(&(value + half))
}

#[derive(Debug, Clone, Default)]
pub struct PriceCalculator {
    tax_rate: TaxRate,
}

impl PriceCalculator {
    pub fn new(tax_rate: TaxRate) -> Self {
        Self { tax_rate }
    }

    pub fn tax_rate(&self) -> &TaxRate {
        &self.tax_rate
    }

    /// `unit_price * quantity + fee`, before tax.
    pub fn compute_total(&self, unit_price: &BigDecimal, quantity: i32, fee: &BigDecimal) -> BigDecimal {
        unit_price * BigDecimal::from(quantity) + fee
    }

    pub fn compute_tax_amount(&self, base: &BigDecimal) -> BigDecimal {
        round_half_up(&(base * self.tax_rate.value()))
    }

    /// `round(base * IVA + base)`, a single rounding over the tax-inclusive amount.
    pub fn compute_total_with_tax(&self, base: &BigDecimal) -> BigDecimal {
        round_half_up(&(base * self.tax_rate.value() + base))
    }

    /// Recovers the pre-tax base of a tax-inclusive total: `round(total / (1 + IVA))`.
    /// Re-applying tax to the result is not guaranteed to reproduce `total`.
    pub fn remove_tax(&self, total_with_tax: &BigDecimal) -> BigDecimal {
        let divisor = BigDecimal::from(1) + self.tax_rate.value();
        round_half_up(&(total_with_tax / divisor))
    }

    /// `floor(total * 100)`, the integer amount the gateway charges.
    pub fn amount_in_cents(&self, total: &BigDecimal) -> Option<i64> {
        floor(&(total * BigDecimal::from(100))).to_i64()
    }
}

/// Strategy for pricing delivery of an order.
pub trait DeliveryFeePolicy: Send + Sync {
    fn delivery_fee(&self) -> BigDecimal;
}

/// Placeholder pricing: a uniformly random whole fee in `[1, 10000]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDeliveryFee;

impl DeliveryFeePolicy for RandomDeliveryFee {
    fn delivery_fee(&self) -> BigDecimal {
        let fee = rand::thread_rng().gen_range(MIN_DELIVERY_FEE..=MAX_DELIVERY_FEE);
        BigDecimal::from(fee)
    }
}

#[derive(Debug, Clone)]
pub struct FixedDeliveryFee(pub BigDecimal);

impl DeliveryFeePolicy for FixedDeliveryFee {
    fn delivery_fee(&self) -> BigDecimal {
        self.0.clone()
    }
}
