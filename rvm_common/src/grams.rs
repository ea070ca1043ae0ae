use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::op;

//--------------------------------------      Grams       ------------------------------------------------------------
/// A weight in integer grams, i.e. kilograms at three decimal places.
///
/// The same fixed-point discipline as [`crate::Money`]: conversion from floating-point kilograms rounds at
/// construction so that weight totals accumulated over thousands of events stay exact.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Grams(i64);

op!(binary Grams, Add, add);
op!(binary Grams, Sub, sub);
op!(inplace Grams, SubAssign, sub_assign);
op!(unary Grams, Neg, neg);

impl Sum for Grams {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for Grams {
    fn from(grams: i64) -> Self {
        Self(grams)
    }
}

impl Display for Grams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / 1000;
        let frac = (self.0 % 1000).abs();
        if self.0 < 0 && whole == 0 {
            write!(f, "-0.{frac:03}kg")
        } else {
            write!(f, "{whole}.{frac:03}kg")
        }
    }
}

impl Grams {
    /// Rounds the given kilogram value to the nearest gram. Non-finite input becomes zero.
    pub fn from_kg(kg: f64) -> Self {
        if !kg.is_finite() {
            return Self(0);
        }
        #[allow(clippy::cast_possible_truncation)]
        Self((kg * 1000.0).round() as i64)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn as_kg(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conversion_rounds_to_grams() {
        assert_eq!(Grams::from_kg(2.5), Grams::from(2500));
        assert_eq!(Grams::from_kg(0.0004), Grams::from(0));
        assert_eq!(Grams::from_kg(0.0005), Grams::from(1));
    }

    #[test]
    fn display() {
        assert_eq!(Grams::from(2500).to_string(), "2.500kg");
        assert_eq!(Grams::from(-300).to_string(), "-0.300kg");
    }
}
