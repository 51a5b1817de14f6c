use std::{
    fmt::Display,
    iter::Sum,
    ops::Add,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Number of stored units per whole loyalty point. Balances are kept to two decimal places.
pub const POINTS_SCALE: i64 = 100;

//--------------------------------------       Points         ---------------------------------------------------------
/// A fixed-point quantity of loyalty points, stored as an integer number of hundredths of a point.
///
/// The accrual service and the public API both speak in fractional JSON numbers (e.g. `729.98`). Those are converted
/// at the boundary with [`Points::try_from_f64`] so that arithmetic on balances is always exact.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Points(i64);

op!(binary Points, Add, add);
op!(binary Points, Sub, sub);
op!(inplace Points, AddAssign, add_assign);
op!(inplace Points, SubAssign, sub_assign);
op!(unary Points, Neg, neg);

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in points: {0}")]
pub struct PointsConversionError(String);

impl From<i64> for Points {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Points {
    type Error = PointsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(PointsConversionError(format!("Value {value} is too large to convert to Points")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = POINTS_SCALE.unsigned_abs();
        write!(f, "{sign}{}.{:02}pts", abs / scale, abs % scale)
    }
}

impl Points {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_points(points: i64) -> Self {
        Self(points * POINTS_SCALE)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Converts a (possibly fractional) JSON number of points, rounding to the nearest hundredth.
    ///
    /// Negative, NaN and infinite values are rejected; accruals and withdrawals are never negative.
    pub fn try_from_f64(value: f64) -> Result<Self, PointsConversionError> {
        if !value.is_finite() {
            return Err(PointsConversionError(format!("{value} is not a finite number")));
        }
        if value < 0.0 {
            return Err(PointsConversionError(format!("{value} is negative")));
        }
        let scaled = (value * POINTS_SCALE as f64).round();
        if scaled >= i64::MAX as f64 {
            return Err(PointsConversionError(format!("{value} is too large")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(scaled as i64))
    }

    /// `None` if the sum does not fit.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / POINTS_SCALE as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let mut a = Points::from_points(5);
        let b = Points::from(250);
        assert_eq!(a + b, Points::from(750));
        assert_eq!(a - b, Points::from(250));
        a += b;
        assert_eq!(a, Points::from(750));
        a -= Points::from(50);
        assert_eq!(a.value(), 700);
        assert_eq!(-a, Points::from(-700));
        assert_eq!(b.checked_mul(3), Some(Points::from(750)));
        let total: Points = [Points::from(1), Points::from(2), Points::from(3)].into_iter().sum();
        assert_eq!(total, Points::from(6));
    }

    #[test]
    fn checked_arithmetic_catches_overflow() {
        let big = Points::from(i64::MAX - 10);
        assert_eq!(big.checked_add(Points::from(10)), Some(Points::from(i64::MAX)));
        assert_eq!(big.checked_add(Points::from(11)), None);
        assert_eq!(big.checked_mul(2), None);
        assert!(Points::try_from_f64(9.3e16).is_err());
        assert!(Points::try_from_f64(9.0e16).is_ok());
    }

    #[test]
    fn from_json_numbers() {
        assert_eq!(Points::try_from_f64(500.0).unwrap(), Points::from_points(500));
        assert_eq!(Points::try_from_f64(729.98).unwrap(), Points::from(72_998));
        assert_eq!(Points::try_from_f64(0.005).unwrap(), Points::from(1));
        assert!(Points::try_from_f64(-1.0).is_err());
        assert!(Points::try_from_f64(f64::NAN).is_err());
        assert!(Points::try_from_f64(f64::INFINITY).is_err());
        assert!((Points::from(72_998).as_f64() - 729.98).abs() < 1e-9);
    }

    #[test]
    fn display() {
        assert_eq!(Points::from(72_998).to_string(), "729.98pts");
        assert_eq!(Points::from(5).to_string(), "0.05pts");
        assert_eq!(Points::from(-150).to_string(), "-1.50pts");
        assert_eq!(Points::default().to_string(), "0.00pts");
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&Points::from(1234)).unwrap();
        assert_eq!(json, "1234");
        let p: Points = serde_json::from_str("42").unwrap();
        assert_eq!(p, Points::from(42));
    }
}
