//! Type-safe price representation.
//!
//! Catalog prices are stored as integer cents (`price_in_cents`). Arithmetic
//! stays in cents; [`Price::amount`] exposes a [`Decimal`] for callers that
//! need the unit value.

use core::fmt;
use core::iter::Sum;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Quantity;

/// A price in Brazilian reais, held as cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price {
    cents: i64,
}

impl Price {
    /// Zero reais.
    pub const ZERO: Self = Self { cents: 0 };

    /// Create a price from an amount in cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Amount in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.cents
    }

    /// Amount in reais with two decimal places.
    #[must_use]
    pub fn amount(self) -> Decimal {
        Decimal::new(self.cents, 2)
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self {
            cents: self.cents.saturating_mul(i64::from(quantity.get())),
        }
    }

    /// Format for display in pt-BR, e.g. `R$ 1.234,56`.
    #[must_use]
    pub fn to_brl(self) -> String {
        let negative = self.cents < 0;
        let abs = self.cents.unsigned_abs();
        let reais = (abs / 100).to_string();
        let centavos = abs % 100;

        let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
        for (i, ch) in reais.chars().enumerate() {
            if i > 0 && (reais.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        let sign = if negative { "-" } else { "" };
        format!("{sign}R$ {grouped},{centavos:02}")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_brl())
    }
}

impl core::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, p| acc + p)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_brl() {
        assert_eq!(Price::from_cents(0).to_brl(), "R$ 0,00");
        assert_eq!(Price::from_cents(5).to_brl(), "R$ 0,05");
        assert_eq!(Price::from_cents(7990).to_brl(), "R$ 79,90");
        assert_eq!(Price::from_cents(123_456).to_brl(), "R$ 1.234,56");
        assert_eq!(Price::from_cents(100_000_000).to_brl(), "R$ 1.000.000,00");
        assert_eq!(Price::from_cents(-1050).to_brl(), "-R$ 10,50");
    }

    #[test]
    fn test_amount() {
        assert_eq!(Price::from_cents(7990).amount().to_string(), "79.90");
    }

    #[test]
    fn test_times_and_sum() {
        let unit = Price::from_cents(2500);
        let line = unit.times(Quantity::new(3).unwrap());
        assert_eq!(line.cents(), 7500);

        let total: Price = [line, Price::from_cents(1000)].into_iter().sum();
        assert_eq!(total.cents(), 8500);
    }
}
