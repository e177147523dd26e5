//! Hospital Core - Hospital Records Domain Library
//!
//! Doctors, patients, appointments and discharge records, with the
//! denormalized legacy fields older consumers read and a billing check for
//! discharge totals.
//!
//! # Features
//!
//! - Field-level validation of every record before it is stored
//! - Legacy mirror fields recomputed inside the same write as the record
//! - Exact integer money and discharge total verification
//! - Declared deletion policy (cascade or set-null per reference)
//! - In-memory [`HospitalStore`] over any [`IdentityProvider`]
//!
//! # Example
//!
//! ```rust
//! use hospital_core::{
//!     Charges, FixedClock, HospitalConfig, HospitalStore, IdentityDirectory, NewDischarge,
//!     StayDetails, TotalVerification, UserIdentity,
//! };
//! use chrono::{NaiveDate, TimeZone, Utc};
//!
//! let mut identities = IdentityDirectory::new();
//! identities.register(UserIdentity::new(9, "testpat", "Pat", "Smith")).unwrap();
//! let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
//! let mut store = HospitalStore::new(identities, clock, HospitalConfig::default()).unwrap();
//!
//! let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let discharge = store
//!     .create_discharge(NewDischarge {
//!         patient: None,
//!         assigned_doctor: None,
//!         stay: StayDetails { admit_date: day, release_date: day, day_spent: 1 },
//!         charges: Charges {
//!             room_charge: "100.00".parse().unwrap(),
//!             medicine_cost: "50.00".parse().unwrap(),
//!             doctor_fee: "200.00".parse().unwrap(),
//!             other_charge: "10.00".parse().unwrap(),
//!             total: "350.00".parse().unwrap(),
//!         },
//!     })
//!     .unwrap();
//!
//! let verification = store.verify_total(discharge.id).unwrap();
//! assert!(matches!(verification, TotalVerification::Mismatch { .. }));
//! assert_eq!(verification.to_string(), "⚠ Mismatch: $350.00 (should be 360.00)");
//! ```

pub mod billing;
pub mod clock;
pub mod config;
pub mod deletion;
pub mod display;
pub mod identity;
pub mod legacy;
pub mod model;
pub mod money;
pub mod records;
pub mod store;
pub mod validation;

// Re-export commonly used types for convenience
pub use billing::TotalVerification;
#[cfg(feature = "clock")]
pub use clock::SystemClock;
pub use clock::{Clock, FixedClock};
pub use config::{ClearedReferencePolicy, ConfigError, HospitalConfig};
pub use deletion::{DeletionReport, OnDelete, ReferenceField, ReferenceRule, POLICY};
pub use identity::{IdentityDirectory, IdentityProvider, UserId, UserIdentity};
pub use legacy::{
    AppointmentLegacy, DischargeLegacy, LegacySync, PatientLegacy, PatientSnapshot,
};
pub use model::{
    AppointmentDetails, BloodGroup, Charges, Department, DoctorProfile, InvalidChoice,
    PatientProfile, StayDetails,
};
pub use money::{Money, MoneyParseError};
pub use records::{
    Appointment, AuditStamps, DischargeDetails, Doctor, EntityKind, NewAppointment,
    NewDischarge, NewDoctor, NewPatient, Patient, RecordId,
};
pub use store::{HospitalStore, StoreError, StoreResult};
pub use validation::{
    ValidationError, ValidationErrorCode, ValidationErrors, ValidationResult,
};
