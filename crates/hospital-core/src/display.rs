//! Human-readable labels for records

use chrono::{DateTime, NaiveDate, Utc};

use crate::identity::UserIdentity;
use crate::model::{DoctorProfile, PatientProfile};

/// Characters of symptoms shown in a patient label
pub const LABEL_SYMPTOMS_CHARS: usize = 30;
/// Characters of symptoms shown in list columns before the ellipsis
pub const COLUMN_SYMPTOMS_CHARS: usize = 50;

const MISSING: &str = "-";

/// Prefix of `value` holding at most `max_chars` characters.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

pub fn doctor_label(identity: &UserIdentity, profile: &DoctorProfile) -> String {
    format!("{} ({})", identity.display_name(), profile.department)
}

pub fn patient_label(identity: &UserIdentity, profile: &PatientProfile) -> String {
    format!(
        "{} ({})",
        identity.display_name(),
        truncate_chars(&profile.symptoms, LABEL_SYMPTOMS_CHARS)
    )
}

/// Symptoms shortened for list columns.
pub fn symptoms_column(symptoms: &str) -> String {
    let short = truncate_chars(symptoms, COLUMN_SYMPTOMS_CHARS);
    if short.len() < symptoms.len() {
        format!("{}...", short)
    } else {
        symptoms.to_string()
    }
}

fn name_or_missing(identity: Option<&UserIdentity>) -> String {
    identity.map_or_else(|| MISSING.to_string(), UserIdentity::display_name)
}

pub fn appointment_label(
    patient: Option<&UserIdentity>,
    doctor: Option<&UserIdentity>,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{} -> {} on {}",
        name_or_missing(patient),
        name_or_missing(doctor),
        at.format("%Y-%m-%d %H:%M:%S%:z")
    )
}

pub fn discharge_label(patient: Option<&UserIdentity>, release_date: NaiveDate) -> String {
    format!("Discharge: {} on {}", name_or_missing(patient), release_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Department;
    use chrono::TimeZone;

    fn pat() -> UserIdentity {
        UserIdentity::new(9, "testpat", "Pat", "Smith")
    }

    #[test]
    fn test_doctor_label() {
        let mut profile = DoctorProfile::new("1 Main St", "1234567890");
        profile.department = Department::EmergencyMedicineSpecialists;
        let doctor = UserIdentity::new(7, "ab", "A", "B");
        assert_eq!(doctor_label(&doctor, &profile), "A B (Emergency Medicine Specialists)");
    }

    #[test]
    fn test_patient_label_cuts_symptoms() {
        let profile = PatientProfile::new(
            "456 Pat St",
            "0987654321",
            "Persistent dry cough with mild fever at night",
        );
        assert_eq!(patient_label(&pat(), &profile), "Pat Smith (Persistent dry cough with mild)");
    }

    #[test]
    fn test_symptoms_column() {
        assert_eq!(symptoms_column("Fever"), "Fever");

        let exact = "x".repeat(COLUMN_SYMPTOMS_CHARS);
        assert_eq!(symptoms_column(&exact), exact);

        let long = "é".repeat(COLUMN_SYMPTOMS_CHARS + 1);
        let shown = symptoms_column(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), COLUMN_SYMPTOMS_CHARS + 3);
    }

    #[test]
    fn test_appointment_and_discharge_labels() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        let doctor = UserIdentity::new(7, "ab", "A", "B");
        assert_eq!(
            appointment_label(Some(&pat()), Some(&doctor), at),
            "Pat Smith -> A B on 2024-03-01 23:30:00+00:00"
        );
        assert_eq!(appointment_label(None, Some(&doctor), at), "- -> A B on 2024-03-01 23:30:00+00:00");

        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(discharge_label(Some(&pat()), day), "Discharge: Pat Smith on 2024-03-05");
    }
}
