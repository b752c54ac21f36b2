use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------      Money       ------------------------------------------------------------
/// A loyalty-point amount, stored as an integer number of hundredths of a point.
///
/// The wire format (both the user-facing API and the accrual authority) expresses amounts as JSON floats with two
/// meaningful decimals, e.g. `500.0` or `729.98`. Internally all arithmetic is integer arithmetic; floats only exist
/// at the serialization boundary.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a point amount: {0}")]
pub struct MoneyConversionError(String);

impl Money {
    pub const ZERO: Money = Money(0);

    /// An amount of whole points.
    pub fn from_points(points: i64) -> Self {
        Self(points * 100)
    }

    /// An amount of hundredths of a point.
    pub fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// The amount in hundredths of a point.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl From<i64> for Money {
    fn from(hundredths: i64) -> Self {
        Self(hundredths)
    }
}

impl TryFrom<f64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(MoneyConversionError(format!("{value} is not a finite number")));
        }
        let hundredths = (value * 100.0).round();
        if hundredths.abs() >= i64::MAX as f64 {
            return Err(MoneyConversionError(format!("{value} is too large")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(hundredths as i64))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Money::try_from(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::Money;

    #[test]
    fn display_renders_two_decimals() {
        assert_eq!(Money::from_points(500).to_string(), "500.00");
        assert_eq!(Money::from_hundredths(72998).to_string(), "729.98");
        assert_eq!(Money::from_hundredths(-105).to_string(), "-1.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn float_conversion_rounds_to_hundredths() {
        assert_eq!(Money::try_from(500.0).unwrap(), Money::from_points(500));
        assert_eq!(Money::try_from(729.98).unwrap(), Money::from_hundredths(72998));
        assert_eq!(Money::try_from(0.005).unwrap(), Money::from_hundredths(1));
        assert!(Money::try_from(f64::NAN).is_err());
        assert!(Money::try_from(f64::INFINITY).is_err());
    }

    #[test]
    fn serde_uses_json_floats() {
        let m: Money = serde_json::from_str("500").unwrap();
        assert_eq!(m, Money::from_points(500));
        let m: Money = serde_json::from_str("729.98").unwrap();
        assert_eq!(m, Money::from_hundredths(72998));
        assert_eq!(serde_json::to_string(&Money::from_points(500)).unwrap(), "500.0");
    }

    #[test]
    fn arithmetic_is_integer_arithmetic() {
        let a = Money::from_hundredths(10);
        let b = Money::from_hundredths(20);
        assert_eq!(a + b, Money::from_hundredths(30));
        assert_eq!(a - b, Money::from_hundredths(-10));
        assert_eq!(-a, Money::from_hundredths(-10));
        let total: Money = vec![a, b, a].into_iter().sum();
        assert_eq!(total, Money::from_hundredths(40));
    }
}
