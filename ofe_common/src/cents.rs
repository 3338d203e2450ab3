use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Cents         ---------------------------------------------------------
/// An amount of money in integer minor-currency units (e.g. Rappen or cents). There is deliberately no conversion from
/// floating point values.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);

impl Mul<i64> for Cents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(Self).map_err(|_| CentsConversionError(format!("{value} is too large")))
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    pub fn checked_mul(&self, quantity: i64) -> Option<Self> {
        self.0.checked_mul(quantity).map(Self)
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Cents::from(1500);
        let b = Cents::from(1000);
        assert_eq!(a - b, Cents::from(500));
        assert_eq!(a + b, Cents::from(2500));
        assert_eq!(-b, Cents::from(-1000));
        assert_eq!(b * 3, Cents::from(3000));
        let mut c = a;
        c -= b;
        c += Cents::from(1);
        assert_eq!(c.value(), 501);
        let total: Cents = [a, b, c].into_iter().sum();
        assert_eq!(total, Cents::from(3001));
    }

    #[test]
    fn checked_ops() {
        assert_eq!(Cents::from(250).checked_mul(4), Some(Cents::from(1000)));
        assert!(Cents::from(i64::MAX).checked_mul(2).is_none());
        assert!(Cents::from(i64::MAX).checked_add(Cents::from(1)).is_none());
        assert!(Cents::try_from(u64::MAX).is_err());
        assert_eq!(Cents::try_from(42u64).unwrap(), Cents::from(42));
    }

    #[test]
    fn display() {
        assert_eq!(Cents::from(0).to_string(), "0.00");
        assert_eq!(Cents::from(5).to_string(), "0.05");
        assert_eq!(Cents::from(123_456).to_string(), "1234.56");
        assert_eq!(Cents::from(-250).to_string(), "-2.50");
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&Cents::from(1250)).unwrap();
        assert_eq!(json, "1250");
        let back: Cents = serde_json::from_str("99").unwrap();
        assert_eq!(back, Cents::from(99));
    }
}
