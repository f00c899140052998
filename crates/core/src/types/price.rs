//! Type-safe price representation using decimal arithmetic.
//!
//! The backend stores prices as `numeric` in the shop's currency (USD). Cart
//! totals, order revenue, and dashboard spend are all computed here so that
//! rounding never goes through floating point.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A price in the default currency.
    #[must_use]
    pub fn usd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::USD)
    }

    /// Zero in the default currency.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(Decimal::ZERO, CurrencyCode::USD)
    }

    /// Unit price multiplied by a line quantity.
    ///
    /// Negative quantities are treated as zero.
    #[must_use]
    pub fn times(self, quantity: i32) -> Self {
        let quantity = Decimal::from(quantity.max(0));
        Self::new(self.amount * quantity, self.currency_code)
    }

    /// Sum of `unit × quantity` over a set of lines.
    #[must_use]
    pub fn total(lines: impl IntoIterator<Item = (Self, i32)>) -> Self {
        lines
            .into_iter()
            .map(|(unit, quantity)| unit.times(quantity))
            .sum()
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{}{rounded:.2}", self.currency_code.symbol())
    }

    /// True when the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl Mul<i32> for Price {
    type Output = Self;

    fn mul(self, quantity: i32) -> Self {
        self.times(quantity)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_two_decimals() {
        assert_eq!(Price::usd(Decimal::new(30, 0)).display(), "$30.00");
        assert_eq!(Price::usd(Decimal::new(1999, 2)).display(), "$19.99");
        assert_eq!(Price::usd(Decimal::new(12345, 3)).display(), "$12.35");
    }

    #[test]
    fn test_times_multiplies_quantity() {
        let ten = Price::usd(Decimal::new(10, 0));
        assert_eq!(ten.times(3), Price::usd(Decimal::new(30, 0)));
        assert_eq!(ten * 0, Price::zero());
        assert_eq!(ten.times(-2), Price::zero());
    }

    #[test]
    fn test_sum_of_lines() {
        let lines = [
            Price::usd(Decimal::new(1050, 2)).times(2),
            Price::usd(Decimal::new(499, 2)).times(1),
        ];
        let total: Price = lines.into_iter().sum();
        assert_eq!(total.display(), "$25.99");
    }

    #[test]
    fn test_total_of_unit_quantity_pairs() {
        let ten = Price::usd(Decimal::new(10, 0));
        assert_eq!(Price::total([(ten, 3)]).display(), "$30.00");
        assert!(Price::total(Vec::new()).is_zero());
    }

    #[test]
    fn test_empty_sum_is_zero() {
        let total: Price = core::iter::empty::<Price>().sum();
        assert!(total.is_zero());
    }
}
