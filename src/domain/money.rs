use crate::error::PosError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

/// A non-negative monetary value in Rupiah.
///
/// Wraps `rust_decimal::Decimal` so prices, totals and payment amounts never
/// pass through binary floating point inside the domain. Serialized as a JSON
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, PosError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PosError::validation("Amount must not be negative"))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Rounds to whole Rupiah, midpoint away from zero.
    pub fn round_to_integer(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Integer amount as sent to the payment gateway.
    pub fn to_gross_amount(&self) -> i64 {
        use rust_decimal::prelude::ToPrimitive;
        self.round_to_integer().0.to_i64().unwrap_or(i64::MAX)
    }

    /// `|actual - self| <= self * ratio`. False when either side overflows.
    pub fn within_tolerance(&self, actual: Decimal, ratio: Decimal) -> bool {
        match (actual.checked_sub(self.0), self.0.checked_mul(ratio)) {
            (Some(diff), Some(allowed)) => diff.abs() <= allowed,
            _ => false,
        }
    }

    /// Average over `count`, rounded to whole Rupiah. Zero when `count` is zero.
    pub fn average_over(&self, count: u64) -> Self {
        if count == 0 {
            return Self::ZERO;
        }
        Self(self.0 / Decimal::from(count)).round_to_integer()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = PosError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

// Saturates at zero; a money value is never negative.
impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self((self.0 - rhs.0).max(Decimal::ZERO))
    }
}

impl Mul<u32> for Money {
    type Output = Self;
    fn mul(self, rhs: u32) -> Self::Output {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
