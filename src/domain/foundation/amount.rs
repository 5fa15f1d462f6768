//! Monetary amount value object.
//!
//! The engine tracks amounts only to maintain running totals on the read
//! model; settlement correctness lives in the transaction subsystem.
//! Historical payloads carry amounts as either integer or decimal JSON
//! numbers, so both must normalize to the same in-memory value.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use super::ValidationError;

/// Non-negative monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Amount(f64);

impl Amount {
    /// Zero amount.
    pub const ZERO: Amount = Amount(0.0);

    /// Creates an amount.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the value is negative or not finite.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::invalid_value("amount", "must be finite"));
        }
        if value < 0.0 {
            return Err(ValidationError::not_positive("amount", 0.0, value));
        }
        Ok(Self(value))
    }

    /// Returns the inner value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether this amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    /// Subtraction clamped at zero. The read model never goes negative;
    /// a shortfall is the transaction subsystem's problem to reconcile.
    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount((self.0 - other.0).max(0.0))
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, other: Amount) -> Amount {
        self.saturating_sub(other)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Amount::new(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(Amount::new(-0.01).is_err());
        assert!(Amount::new(f64::NAN).is_err());
        assert!(Amount::new(f64::INFINITY).is_err());
        assert!(Amount::new(0.0).is_ok());
    }

    #[test]
    fn integer_and_decimal_json_normalize_identically() {
        let from_int: Amount = serde_json::from_str("100").unwrap();
        let from_dec: Amount = serde_json::from_str("100.0").unwrap();
        assert_eq!(from_int, from_dec);
        assert_eq!(from_int.value(), 100.0);
    }

    #[test]
    fn deserialization_rejects_negative() {
        let result: Result<Amount, _> = serde_json::from_str("-5.0");
        assert!(result.is_err());
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        let a = Amount::new(50.0).unwrap();
        let b = Amount::new(80.0).unwrap();
        assert_eq!(a.saturating_sub(b), Amount::ZERO);
        assert_eq!(b.saturating_sub(a).value(), 30.0);
    }
}
