//! Canonical record content
//!
//! These structs hold the authoritative, validated fields of each record.
//! References between records are kept outside them so the same content can
//! be stored by the in-process [`crate::store::HospitalStore`] (numeric keys)
//! and by the hospital zomes (action hashes).

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::money::Money;
use crate::validation::{
    validate_optional_phone, validate_phone, validate_required_text, ValidationErrorCode,
    ValidationResult,
};

/// Error for a label that is not one of an enum's choices.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct InvalidChoice {
    pub kind: &'static str,
    pub value: String,
}

impl InvalidChoice {
    /// Field-level form of the error.
    pub fn into_validation(self, field: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.add_error(field, &self.to_string(), ValidationErrorCode::InvalidChoice);
        result
    }
}

/// Medical specialization of a doctor
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Department {
    #[default]
    #[serde(rename = "Cardiologist")]
    Cardiologist,
    #[serde(rename = "Dermatologists")]
    Dermatologists,
    #[serde(rename = "Emergency Medicine Specialists")]
    EmergencyMedicineSpecialists,
    #[serde(rename = "Allergists/Immunologists")]
    AllergistsImmunologists,
    #[serde(rename = "Anesthesiologists")]
    Anesthesiologists,
    #[serde(rename = "Colon and Rectal Surgeons")]
    ColonAndRectalSurgeons,
    #[serde(rename = "Endocrinologists")]
    Endocrinologists,
    #[serde(rename = "Gastroenterologists")]
    Gastroenterologists,
    #[serde(rename = "Neurologists")]
    Neurologists,
    #[serde(rename = "Oncologists")]
    Oncologists,
    #[serde(rename = "Ophthalmologists")]
    Ophthalmologists,
    #[serde(rename = "Orthopedic Surgeons")]
    OrthopedicSurgeons,
    #[serde(rename = "Pediatricians")]
    Pediatricians,
    #[serde(rename = "Psychiatrists")]
    Psychiatrists,
    #[serde(rename = "Radiologists")]
    Radiologists,
    #[serde(rename = "Urologists")]
    Urologists,
}

impl Department {
    pub const ALL: [Department; 16] = [
        Department::Cardiologist,
        Department::Dermatologists,
        Department::EmergencyMedicineSpecialists,
        Department::AllergistsImmunologists,
        Department::Anesthesiologists,
        Department::ColonAndRectalSurgeons,
        Department::Endocrinologists,
        Department::Gastroenterologists,
        Department::Neurologists,
        Department::Oncologists,
        Department::Ophthalmologists,
        Department::OrthopedicSurgeons,
        Department::Pediatricians,
        Department::Psychiatrists,
        Department::Radiologists,
        Department::Urologists,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Department::Cardiologist => "Cardiologist",
            Department::Dermatologists => "Dermatologists",
            Department::EmergencyMedicineSpecialists => "Emergency Medicine Specialists",
            Department::AllergistsImmunologists => "Allergists/Immunologists",
            Department::Anesthesiologists => "Anesthesiologists",
            Department::ColonAndRectalSurgeons => "Colon and Rectal Surgeons",
            Department::Endocrinologists => "Endocrinologists",
            Department::Gastroenterologists => "Gastroenterologists",
            Department::Neurologists => "Neurologists",
            Department::Oncologists => "Oncologists",
            Department::Ophthalmologists => "Ophthalmologists",
            Department::OrthopedicSurgeons => "Orthopedic Surgeons",
            Department::Pediatricians => "Pediatricians",
            Department::Psychiatrists => "Psychiatrists",
            Department::Radiologists => "Radiologists",
            Department::Urologists => "Urologists",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Department {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Department::ALL
            .into_iter()
            .find(|d| d.label() == s)
            .ok_or_else(|| InvalidChoice {
                kind: "department",
                value: s.to_string(),
            })
    }
}

/// ABO/Rh blood group
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    ABPositive,
    #[serde(rename = "AB-")]
    ABNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::ABPositive,
        BloodGroup::ABNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::ABPositive => "AB+",
            BloodGroup::ABNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BloodGroup {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BloodGroup::ALL
            .into_iter()
            .find(|g| g.label() == s)
            .ok_or_else(|| InvalidChoice {
                kind: "blood group",
                value: s.to_string(),
            })
    }
}

/// Doctor profile fields
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoctorProfile {
    /// Full address
    pub address: String,
    /// Contact number
    pub mobile: String,
    /// Medical specialization
    pub department: Department,
    /// Approved status
    pub status: bool,
    /// Educational qualifications and certifications
    pub qualifications: Option<String>,
    /// Years of medical practice
    pub experience_years: u32,
    pub consultation_fee: Money,
}

impl DoctorProfile {
    /// Profile with the column defaults: Cardiologist, unapproved, no fee.
    pub fn new(address: impl Into<String>, mobile: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            mobile: mobile.into(),
            department: Department::default(),
            status: false,
            qualifications: None,
            experience_years: 0,
            consultation_fee: Money::ZERO,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.merge(validate_required_text(&self.address, "address", 200));
        result.merge(validate_phone(&self.mobile, "mobile"));
        result.merge(self.consultation_fee.validate("consultation_fee"));
        result
    }
}

/// Patient profile fields
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientProfile {
    pub address: String,
    pub mobile: String,
    /// Free-text description of symptoms
    pub symptoms: String,
    /// Approved/admitted status
    pub status: bool,
    pub blood_group: Option<BloodGroup>,
    pub date_of_birth: Option<NaiveDate>,
    pub emergency_contact: Option<String>,
}

impl PatientProfile {
    pub fn new(
        address: impl Into<String>,
        mobile: impl Into<String>,
        symptoms: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            mobile: mobile.into(),
            symptoms: symptoms.into(),
            status: false,
            blood_group: None,
            date_of_birth: None,
            emergency_contact: None,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.merge(validate_required_text(&self.address, "address", 200));
        result.merge(validate_phone(&self.mobile, "mobile"));
        if self.symptoms.trim().is_empty() {
            result.add_error("symptoms", "Symptoms are required", ValidationErrorCode::Required);
        }
        result.merge(validate_optional_phone(
            self.emergency_contact.as_deref(),
            "emergency_contact",
        ));
        result
    }

    /// Age in whole years on `today`, or `None` without a date of birth.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let dob = self.date_of_birth?;
        let mut years = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}

/// Appointment fields other than its references
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentDetails {
    /// Date and time of the appointment
    pub appointment_date: DateTime<Utc>,
    /// Reason for appointment
    pub description: String,
    /// Approval status
    pub status: bool,
}

impl AppointmentDetails {
    pub fn new(appointment_date: DateTime<Utc>, description: impl Into<String>) -> Self {
        Self {
            appointment_date,
            description: description.into(),
            status: false,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        validate_required_text(&self.description, "description", 1000)
    }
}

/// Hospital stay covered by a discharge
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StayDetails {
    pub admit_date: NaiveDate,
    pub release_date: NaiveDate,
    /// Number of days in hospital
    pub day_spent: u32,
}

impl StayDetails {
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if self.release_date < self.admit_date {
            result.add_error(
                "release_date",
                "Release date cannot be before the admission date",
                ValidationErrorCode::OutOfRange,
            );
        }
        result
    }
}

/// Discharge bill components and the stated total
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Charges {
    pub room_charge: Money,
    pub medicine_cost: Money,
    pub doctor_fee: Money,
    pub other_charge: Money,
    /// Total as entered; never recomputed
    pub total: Money,
}

impl Charges {
    fn components(&self) -> [Money; 4] {
        [self.room_charge, self.medicine_cost, self.doctor_fee, self.other_charge]
    }

    /// Sum of the four components, `None` if it leaves the `i64` cent range.
    pub fn expected_total(&self) -> Option<Money> {
        self.components()
            .into_iter()
            .try_fold(Money::ZERO, Money::checked_add)
    }

    /// Sum of the four components, clamped to the `i64` cent range.
    pub fn saturated_total(&self) -> Money {
        self.components()
            .into_iter()
            .fold(Money::ZERO, Money::saturating_add)
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.merge(self.room_charge.validate("room_charge"));
        result.merge(self.medicine_cost.validate("medicine_cost"));
        result.merge(self.doctor_fee.validate("doctor_fee"));
        result.merge(self.other_charge.validate("other_charge"));
        result.merge(self.total.validate("total"));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_labels_round_trip() {
        assert_eq!(Department::ALL.len(), 16);
        for department in Department::ALL {
            assert_eq!(department.label().parse::<Department>().unwrap(), department);
        }
        assert_eq!(Department::default(), Department::Cardiologist);
    }

    #[test]
    fn test_department_rejects_unknown_label() {
        let err = "Astrologist".parse::<Department>().unwrap_err();
        let result = err.into_validation("department");
        assert_eq!(result.errors[0].code, ValidationErrorCode::InvalidChoice);
        assert_eq!(result.errors[0].field, "department");
    }

    #[test]
    fn test_department_serde_uses_labels() {
        let json = serde_json::to_string(&Department::AllergistsImmunologists).unwrap();
        assert_eq!(json, "\"Allergists/Immunologists\"");
        assert!(serde_json::from_str::<Department>("\"Vet\"").is_err());
    }

    #[test]
    fn test_blood_group_labels() {
        let labels: Vec<&str> = BloodGroup::ALL.iter().map(|g| g.label()).collect();
        assert_eq!(labels, ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"]);
        assert_eq!("AB-".parse::<BloodGroup>().unwrap(), BloodGroup::ABNegative);
        assert!("C+".parse::<BloodGroup>().is_err());
    }

    #[test]
    fn test_doctor_profile_validation() {
        let profile = DoctorProfile::new("123 Doc St", "1234567890");
        assert!(profile.validate().is_valid());

        let mut bad = profile.clone();
        bad.mobile = "555-0123".to_string();
        bad.address = String::new();
        bad.consultation_fee = Money::from_cents(-100);
        let fields: Vec<String> = bad.validate().errors.into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["address", "mobile", "consultation_fee"]);
    }

    #[test]
    fn test_patient_profile_validation() {
        let mut profile = PatientProfile::new("456 Pat St", "0987654321", "Fever");
        assert!(profile.validate().is_valid());

        profile.emergency_contact = Some("not a phone".to_string());
        profile.symptoms = "  ".to_string();
        let result = profile.validate();
        assert!(result.errors.iter().any(|e| e.field == "symptoms"));
        assert!(result.errors.iter().any(|e| e.field == "emergency_contact"));
    }

    #[test]
    fn test_patient_age() {
        let mut profile = PatientProfile::new("a", "0987654321", "Fever");
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(profile.age_on(today), None);

        profile.date_of_birth = NaiveDate::from_ymd_opt(1990, 6, 15);
        assert_eq!(profile.age_on(today), Some(34));

        profile.date_of_birth = NaiveDate::from_ymd_opt(1990, 6, 16);
        assert_eq!(profile.age_on(today), Some(33));
    }

    #[test]
    fn test_stay_dates() {
        let admit = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let stay = StayDetails { admit_date: admit, release_date: admit, day_spent: 1 };
        assert!(stay.validate().is_valid());

        let backwards = StayDetails {
            release_date: NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
            ..stay
        };
        assert_eq!(backwards.validate().errors[0].field, "release_date");
    }

    #[test]
    fn test_expected_total() {
        let charges = Charges {
            room_charge: Money::from_units(100),
            medicine_cost: Money::from_units(50),
            doctor_fee: Money::from_units(200),
            other_charge: Money::from_units(10),
            total: Money::from_units(360),
        };
        assert_eq!(charges.expected_total(), Some(Money::from_units(360)));
        assert!(charges.validate().is_valid());
    }

    #[test]
    fn test_appointment_description_required() {
        let at = DateTime::from_timestamp(1_704_153_600, 0).unwrap();
        assert!(AppointmentDetails::new(at, "Checkup").validate().is_valid());
        assert!(!AppointmentDetails::new(at, "").validate().is_valid());
        assert!(!AppointmentDetails::new(at, "x".repeat(1001)).validate().is_valid());
    }
}
