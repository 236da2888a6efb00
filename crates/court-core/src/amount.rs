//! # Token Amounts
//!
//! Stake and fee quantities are unsigned integers in the token's smallest
//! unit. All arithmetic is checked; pro-rata shares truncate toward zero.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Denominator for permyriad percentages (`10_000` = 100%).
pub const PCT_BASE: u128 = 10_000;

/// A token quantity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw quantity.
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Access the raw quantity.
    pub const fn raw(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Result<Self, CoreError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(CoreError::AmountOverflow { operation: "add" })
    }

    /// Subtraction that yields `None` when `other` exceeds `self`.
    pub fn checked_sub(self, other: Amount) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Amount) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiply by an integer count (slots, jurors).
    pub fn checked_mul(self, count: u64) -> Result<Self, CoreError> {
        self.0
            .checked_mul(u128::from(count))
            .map(Self)
            .ok_or(CoreError::AmountOverflow { operation: "mul" })
    }

    /// `self × numerator / denominator`, truncating.
    pub fn mul_div(self, numerator: u128, denominator: u128) -> Result<Self, CoreError> {
        if denominator == 0 {
            return Err(CoreError::DivisionByZero {
                operation: "mul_div",
            });
        }
        self.0
            .checked_mul(numerator)
            .map(|product| Self(product / denominator))
            .ok_or(CoreError::AmountOverflow {
                operation: "mul_div",
            })
    }

    /// Apply a permyriad percentage (`pct / 10_000`).
    pub fn pct(self, pct: u16) -> Result<Self, CoreError> {
        self.mul_div(u128::from(pct), PCT_BASE)
    }

    /// Sum an iterator of amounts, failing on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(items: I) -> Result<Self, CoreError> {
        items
            .into_iter()
            .try_fold(Self::ZERO, |acc, item| acc.checked_add(item))
    }
}

impl From<u64> for Amount {
    fn from(raw: u64) -> Self {
        Self(u128::from(raw))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn checked_add_overflows() {
        let max = Amount::new(u128::MAX);
        assert!(matches!(
            max.checked_add(Amount::new(1)),
            Err(CoreError::AmountOverflow { operation: "add" })
        ));
    }

    #[test]
    fn checked_sub_underflow_is_none() {
        assert_eq!(Amount::new(3).checked_sub(Amount::new(5)), None);
        assert_eq!(
            Amount::new(5).checked_sub(Amount::new(3)),
            Some(Amount::new(2))
        );
    }

    #[test]
    fn pct_truncates() {
        // 10% of 105 is 10.5; truncation keeps 10.
        assert_eq!(Amount::new(105).pct(1_000).unwrap(), Amount::new(10));
        assert_eq!(Amount::new(100).pct(10_000).unwrap(), Amount::new(100));
    }

    #[test]
    fn mul_div_rejects_zero_denominator() {
        assert!(matches!(
            Amount::new(1).mul_div(1, 0),
            Err(CoreError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn checked_sum_adds_all() {
        let total = Amount::checked_sum([1u64, 2, 3].map(Amount::from)).unwrap();
        assert_eq!(total, Amount::new(6));
    }

    proptest! {
        #[test]
        fn pro_rata_shares_never_exceed_pool(
            pool in 0u64..1_000_000_000,
            weights in proptest::collection::vec(1u64..1_000, 1..20),
        ) {
            let total: u64 = weights.iter().sum();
            let pool = Amount::from(pool);
            let mut paid = Amount::ZERO;
            for weight in &weights {
                let share = pool.mul_div(u128::from(*weight), u128::from(total)).unwrap();
                paid = paid.checked_add(share).unwrap();
            }
            prop_assert!(paid <= pool);
            // Truncation loses less than one unit per recipient.
            prop_assert!(pool.raw() - paid.raw() < weights.len() as u128);
        }
    }
}
