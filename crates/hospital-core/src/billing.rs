//! Discharge billing total verification
//!
//! Read-only diagnostic: compares a discharge's stated total with the sum of
//! its charge components. The stored total is never corrected.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::model::Charges;
use crate::money::Money;

/// Outcome of checking a discharge bill
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TotalVerification {
    /// The record has not been persisted yet
    Pending,
    /// Stated total equals the sum of the components
    Correct { total: Money },
    /// Stated total differs from the sum of the components
    Mismatch { stated: Money, expected: Money },
}

impl TotalVerification {
    /// Check `charges`. Unsaved records are not evaluated.
    pub fn evaluate(persisted: bool, charges: &Charges) -> Self {
        if !persisted {
            return TotalVerification::Pending;
        }

        let verification = match charges.expected_total() {
            Some(expected) if expected == charges.total => {
                TotalVerification::Correct { total: expected }
            }
            Some(expected) => TotalVerification::Mismatch {
                stated: charges.total,
                expected,
            },
            // No stored total can equal a sum past i64::MAX cents
            None => {
                warn!(stated = %charges.total, "discharge charges overflow the cent range");
                TotalVerification::Mismatch {
                    stated: charges.total,
                    expected: charges.saturated_total(),
                }
            }
        };

        debug!(?verification, "verified discharge total");
        verification
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, TotalVerification::Mismatch { .. })
    }

    /// Render for the billing review column with the given currency symbol.
    pub fn render(&self, currency_symbol: &str) -> String {
        match self {
            TotalVerification::Pending => "-".to_string(),
            TotalVerification::Correct { total } => {
                format!("✓ Correct: {}{}", currency_symbol, total)
            }
            TotalVerification::Mismatch { stated, expected } => {
                format!("⚠ Mismatch: {}{} (should be {})", currency_symbol, stated, expected)
            }
        }
    }
}

impl fmt::Display for TotalVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render("$"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charges(total: &str) -> Charges {
        Charges {
            room_charge: "100.00".parse().unwrap(),
            medicine_cost: "50.00".parse().unwrap(),
            doctor_fee: "200.00".parse().unwrap(),
            other_charge: "10.00".parse().unwrap(),
            total: total.parse().unwrap(),
        }
    }

    #[test]
    fn test_matching_total() {
        let verification = TotalVerification::evaluate(true, &charges("360.00"));
        assert_eq!(verification, TotalVerification::Correct { total: Money::from_units(360) });
        assert_eq!(verification.to_string(), "✓ Correct: $360.00");
    }

    #[test]
    fn test_mismatched_total() {
        let verification = TotalVerification::evaluate(true, &charges("350.00"));
        assert_eq!(
            verification,
            TotalVerification::Mismatch {
                stated: Money::from_units(350),
                expected: Money::from_units(360),
            }
        );
        assert!(verification.is_mismatch());
        assert_eq!(verification.to_string(), "⚠ Mismatch: $350.00 (should be 360.00)");
    }

    #[test]
    fn test_unsaved_record_is_pending() {
        let verification = TotalVerification::evaluate(false, &charges("1.00"));
        assert_eq!(verification, TotalVerification::Pending);
        assert_eq!(verification.to_string(), "-");
    }

    #[test]
    fn test_no_float_drift() {
        // 0.10 + 0.20 + 0.30 + 0.40 == 1.00 exactly
        let charges = Charges {
            room_charge: "0.10".parse().unwrap(),
            medicine_cost: "0.20".parse().unwrap(),
            doctor_fee: "0.30".parse().unwrap(),
            other_charge: "0.40".parse().unwrap(),
            total: "1.00".parse().unwrap(),
        };
        assert!(!TotalVerification::evaluate(true, &charges).is_mismatch());
    }

    #[test]
    fn test_overflowing_components_are_a_mismatch() {
        let charges: Charges = serde_json::from_value(serde_json::json!({
            "room_charge": i64::MAX,
            "medicine_cost": 1,
            "doctor_fee": 0,
            "other_charge": 0,
            "total": i64::MAX,
        }))
        .unwrap();

        assert_eq!(
            TotalVerification::evaluate(true, &charges),
            TotalVerification::Mismatch {
                stated: Money::from_cents(i64::MAX),
                expected: Money::from_cents(i64::MAX),
            }
        );
    }

    #[test]
    fn test_render_with_configured_symbol() {
        let verification = TotalVerification::evaluate(true, &charges("360.00"));
        assert_eq!(verification.render("€"), "✓ Correct: €360.00");
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A total equal to the component sum always matches; any other total never does
        #[test]
        fn match_iff_exact_sum(
            parts in proptest::collection::vec(0i64..10_000_000, 4),
            delta in -1_000i64..1_000,
        ) {
            let mut charges = Charges {
                room_charge: Money::from_cents(parts[0]),
                medicine_cost: Money::from_cents(parts[1]),
                doctor_fee: Money::from_cents(parts[2]),
                other_charge: Money::from_cents(parts[3]),
                total: Money::ZERO,
            };
            let sum: i64 = parts.iter().sum();
            charges.total = Money::from_cents(sum + delta);

            let verification = TotalVerification::evaluate(true, &charges);
            prop_assert_eq!(verification.is_mismatch(), delta != 0);
        }
    }
}
