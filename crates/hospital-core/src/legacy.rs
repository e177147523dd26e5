//! Legacy mirror fields and their synchronizer
//!
//! Older consumers read flat, denormalized copies of reference data (ids,
//! display names, contact details, integer charges). [`LegacySync`] derives
//! those copies from the canonical fields. Callers run it inside the same
//! write that persists the record, so the mirrors are a snapshot of the
//! referenced records as of that save.
//!
//! Mirrors serialize under their historical camelCase column names.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClearedReferencePolicy;
use crate::identity::{UserId, UserIdentity};
use crate::model::{AppointmentDetails, Charges, PatientProfile, StayDetails};
use crate::money::Money;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientLegacy {
    pub assigned_doctor_id: Option<UserId>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentLegacy {
    pub patient_id: Option<UserId>,
    pub doctor_id: Option<UserId>,
    pub patient_name: String,
    pub doctor_name: String,
    pub appointment_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DischargeLegacy {
    pub patient_id: Option<UserId>,
    pub patient_name: String,
    pub assigned_doctor_name: String,
    pub address: String,
    pub mobile: String,
    pub symptoms: String,
    pub admit_date: Option<NaiveDate>,
    pub release_date: Option<NaiveDate>,
    pub day_spent: Option<u32>,
    pub room_charge: Option<u32>,
    pub medicine_cost: Option<u32>,
    pub doctor_fee: Option<u32>,
    #[serde(rename = "OtherCharge")]
    pub other_charge: Option<u32>,
}

/// The parts of a patient record a discharge mirrors.
#[derive(Clone, Copy, Debug)]
pub struct PatientSnapshot<'a> {
    pub identity: &'a UserIdentity,
    pub profile: &'a PatientProfile,
}

/// Integer legacy copy of a charge: whole units, truncated toward zero.
pub fn legacy_charge(amount: Money) -> Option<u32> {
    u32::try_from(amount.truncated_units()).ok()
}

/// Derives legacy mirrors from canonical fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LegacySync {
    policy: ClearedReferencePolicy,
}

impl LegacySync {
    pub fn new(policy: ClearedReferencePolicy) -> Self {
        Self { policy }
    }

    fn clears(&self) -> bool {
        self.policy == ClearedReferencePolicy::Clear
    }

    pub fn sync_patient(&self, legacy: &mut PatientLegacy, doctor: Option<&UserIdentity>) {
        match doctor {
            Some(doctor) => legacy.assigned_doctor_id = Some(doctor.id),
            None if self.clears() => legacy.assigned_doctor_id = None,
            None => {}
        }

        debug!(assigned_doctor_id = ?legacy.assigned_doctor_id, "synced patient legacy fields");
    }

    pub fn sync_appointment(
        &self,
        legacy: &mut AppointmentLegacy,
        patient: Option<&UserIdentity>,
        doctor: Option<&UserIdentity>,
        details: &AppointmentDetails,
    ) {
        match patient {
            Some(patient) => {
                legacy.patient_id = Some(patient.id);
                legacy.patient_name = patient.display_name();
            }
            None if self.clears() => {
                legacy.patient_id = None;
                legacy.patient_name.clear();
            }
            None => {}
        }

        match doctor {
            Some(doctor) => {
                legacy.doctor_id = Some(doctor.id);
                legacy.doctor_name = doctor.display_name();
            }
            None if self.clears() => {
                legacy.doctor_id = None;
                legacy.doctor_name.clear();
            }
            None => {}
        }

        legacy.appointment_date = Some(details.appointment_date.date_naive());

        debug!(
            patient_id = ?legacy.patient_id,
            doctor_id = ?legacy.doctor_id,
            appointment_date = ?legacy.appointment_date,
            "synced appointment legacy fields"
        );
    }

    pub fn sync_discharge(
        &self,
        legacy: &mut DischargeLegacy,
        patient: Option<PatientSnapshot<'_>>,
        doctor: Option<&UserIdentity>,
        stay: &StayDetails,
        charges: &Charges,
    ) {
        match patient {
            Some(patient) => {
                legacy.patient_id = Some(patient.identity.id);
                legacy.patient_name = patient.identity.display_name();
                legacy.address = patient.profile.address.clone();
                legacy.mobile = patient.profile.mobile.clone();
                legacy.symptoms = patient.profile.symptoms.clone();
            }
            None if self.clears() => {
                legacy.patient_id = None;
                legacy.patient_name.clear();
                legacy.address.clear();
                legacy.mobile.clear();
                legacy.symptoms.clear();
            }
            None => {}
        }

        match doctor {
            Some(doctor) => legacy.assigned_doctor_name = doctor.display_name(),
            None if self.clears() => legacy.assigned_doctor_name.clear(),
            None => {}
        }

        legacy.admit_date = Some(stay.admit_date);
        legacy.release_date = Some(stay.release_date);
        legacy.day_spent = Some(stay.day_spent);
        legacy.room_charge = legacy_charge(charges.room_charge);
        legacy.medicine_cost = legacy_charge(charges.medicine_cost);
        legacy.doctor_fee = legacy_charge(charges.doctor_fee);
        legacy.other_charge = legacy_charge(charges.other_charge);

        debug!(
            patient_id = ?legacy.patient_id,
            assigned_doctor_name = %legacy.assigned_doctor_name,
            "synced discharge legacy fields"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn doctor() -> UserIdentity {
        UserIdentity::new(7, "ab", "A", "B")
    }

    fn patient() -> UserIdentity {
        UserIdentity::new(9, "testpat", "Pat", "Smith")
    }

    fn stay() -> StayDetails {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        StayDetails { admit_date: day, release_date: day, day_spent: 1 }
    }

    fn charges() -> Charges {
        Charges {
            room_charge: "100.75".parse().unwrap(),
            medicine_cost: "50.99".parse().unwrap(),
            doctor_fee: "200.00".parse().unwrap(),
            other_charge: "0.50".parse().unwrap(),
            total: "352.24".parse().unwrap(),
        }
    }

    #[test]
    fn test_patient_mirror_follows_doctor() {
        let sync = LegacySync::default();
        let mut legacy = PatientLegacy::default();

        sync.sync_patient(&mut legacy, Some(&doctor()));
        assert_eq!(legacy.assigned_doctor_id, Some(7));
    }

    #[test]
    fn test_cleared_reference_policies() {
        let mut cleared = PatientLegacy { assigned_doctor_id: Some(7) };
        LegacySync::new(ClearedReferencePolicy::Clear).sync_patient(&mut cleared, None);
        assert_eq!(cleared.assigned_doctor_id, None);

        let mut retained = PatientLegacy { assigned_doctor_id: Some(7) };
        LegacySync::new(ClearedReferencePolicy::Retain).sync_patient(&mut retained, None);
        assert_eq!(retained.assigned_doctor_id, Some(7));
    }

    #[test]
    fn test_appointment_mirrors() {
        let at: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        let details = AppointmentDetails::new(at, "Checkup");
        let mut legacy = AppointmentLegacy::default();

        LegacySync::default().sync_appointment(&mut legacy, Some(&patient()), Some(&doctor()), &details);

        assert_eq!(legacy.patient_id, Some(9));
        assert_eq!(legacy.patient_name, "Pat Smith");
        assert_eq!(legacy.doctor_id, Some(7));
        assert_eq!(legacy.doctor_name, "A B");
        assert_eq!(legacy.appointment_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_appointment_date_synced_without_references() {
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
        let mut legacy = AppointmentLegacy {
            doctor_name: "Old Name".to_string(),
            doctor_id: Some(3),
            ..Default::default()
        };

        LegacySync::new(ClearedReferencePolicy::Retain).sync_appointment(
            &mut legacy,
            None,
            None,
            &AppointmentDetails::new(at, "Follow-up"),
        );

        assert_eq!(legacy.appointment_date, NaiveDate::from_ymd_opt(2024, 5, 2));
        assert_eq!(legacy.doctor_name, "Old Name");
        assert_eq!(legacy.doctor_id, Some(3));
    }

    #[test]
    fn test_discharge_mirrors_truncate_charges() {
        let profile = PatientProfile::new("456 Pat St", "0987654321", "Fever");
        let identity = patient();
        let snapshot = PatientSnapshot { identity: &identity, profile: &profile };
        let mut legacy = DischargeLegacy::default();

        LegacySync::default().sync_discharge(&mut legacy, Some(snapshot), Some(&doctor()), &stay(), &charges());

        assert_eq!(legacy.patient_id, Some(9));
        assert_eq!(legacy.patient_name, "Pat Smith");
        assert_eq!(legacy.assigned_doctor_name, "A B");
        assert_eq!(legacy.address, "456 Pat St");
        assert_eq!(legacy.mobile, "0987654321");
        assert_eq!(legacy.symptoms, "Fever");
        assert_eq!(legacy.room_charge, Some(100));
        assert_eq!(legacy.medicine_cost, Some(50));
        assert_eq!(legacy.doctor_fee, Some(200));
        assert_eq!(legacy.other_charge, Some(0));
        assert_eq!(legacy.day_spent, Some(1));
        assert_eq!(legacy.admit_date, Some(stay().admit_date));
        assert_eq!(legacy.release_date, Some(stay().release_date));
    }

    #[test]
    fn test_discharge_clear_policy_empties_patient_mirrors() {
        let mut legacy = DischargeLegacy {
            patient_id: Some(9),
            patient_name: "Pat Smith".to_string(),
            address: "456 Pat St".to_string(),
            ..Default::default()
        };

        LegacySync::default().sync_discharge(&mut legacy, None, None, &stay(), &charges());

        assert_eq!(legacy.patient_id, None);
        assert!(legacy.patient_name.is_empty());
        assert!(legacy.address.is_empty());
        assert_eq!(legacy.room_charge, Some(100));
    }

    #[test]
    fn test_legacy_column_names() {
        let json = serde_json::to_value(DischargeLegacy::default()).unwrap();
        for key in ["patientId", "assignedDoctorName", "daySpent", "roomCharge", "OtherCharge"] {
            assert!(json.get(key).is_some(), "missing legacy column {}", key);
        }
        let json = serde_json::to_value(PatientLegacy::default()).unwrap();
        assert!(json.get("assignedDoctorId").is_some());
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Integer mirrors truncate, never round
        #[test]
        fn legacy_charge_truncates(cents in 0i64..=Money::MAX.cents()) {
            let legacy = legacy_charge(Money::from_cents(cents)).unwrap();
            prop_assert_eq!(legacy as i64, cents / 100);
            prop_assert!((legacy as i64) * 100 <= cents);
        }

        /// Syncing twice gives the same mirrors as syncing once
        #[test]
        fn discharge_sync_is_idempotent(
            room in 0i64..1_000_000,
            medicine in 0i64..1_000_000,
            fee in 0i64..1_000_000,
            other in 0i64..1_000_000,
            days in 0u32..365,
        ) {
            let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let stay = StayDetails { admit_date: day, release_date: day, day_spent: days };
            let charges = Charges {
                room_charge: Money::from_cents(room),
                medicine_cost: Money::from_cents(medicine),
                doctor_fee: Money::from_cents(fee),
                other_charge: Money::from_cents(other),
                total: Money::ZERO,
            };
            let identity = UserIdentity::new(4, "p", "Pa", "Ti");
            let profile = PatientProfile::new("addr", "1234567890", "cough");
            let doctor = UserIdentity::new(5, "d", "Do", "C");
            let sync = LegacySync::default();

            let mut once = DischargeLegacy::default();
            sync.sync_discharge(&mut once, Some(PatientSnapshot { identity: &identity, profile: &profile }), Some(&doctor), &stay, &charges);
            let mut twice = once.clone();
            sync.sync_discharge(&mut twice, Some(PatientSnapshot { identity: &identity, profile: &profile }), Some(&doctor), &stay, &charges);

            prop_assert_eq!(once, twice);
        }
    }
}
