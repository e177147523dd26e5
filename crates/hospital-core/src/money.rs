//! Fixed-point currency amounts
//!
//! Amounts are held as integer cents so sums compare exactly. The stored
//! range mirrors a `max_digits = 10, decimal_places = 2` decimal column.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validation::{ValidationErrorCode, ValidationResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyParseError {
    #[error("amount is empty")]
    Empty,
    #[error("'{0}' is not a decimal amount")]
    Malformed(String),
    #[error("'{0}' has more than 2 decimal places")]
    TooPrecise(String),
    #[error("'{0}' is too large")]
    Overflow(String),
}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Cents per whole unit.
    pub const SCALE: i64 = 100;

    /// Largest amount a 10-digit, 2-decimal column can hold (99,999,999.99).
    pub const MAX: Money = Money(9_999_999_999);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn from_units(units: i64) -> Self {
        Money(units * Self::SCALE)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Whole units, truncated toward zero (`100.75` -> `100`, `-1.50` -> `-1`).
    pub const fn truncated_units(self) -> i64 {
        self.0 / Self::SCALE
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Check the amount is non-negative and fits the stored column.
    pub fn validate(self, field: &str) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.is_negative() {
            result.add_error(field, "Amount cannot be negative", ValidationErrorCode::OutOfRange);
        } else if self > Self::MAX {
            result.add_error(
                field,
                &format!("Amount cannot exceed {}", Self::MAX),
                ValidationErrorCode::OutOfRange,
            );
        }

        result
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = Self::SCALE as u64;
        write!(f, "{}{}.{:02}", sign, abs / scale, abs % scale)
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(frac) {
            return Err(MoneyParseError::Malformed(s.to_string()));
        }
        if frac.len() > 2 {
            return Err(MoneyParseError::TooPrecise(s.to_string()));
        }

        let overflow = || MoneyParseError::Overflow(s.to_string());
        let whole: i64 = whole.parse().map_err(|_| overflow())?;
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| overflow())? * 10,
            _ => frac.parse().map_err(|_| overflow())?,
        };

        let cents = whole
            .checked_mul(Self::SCALE)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}
