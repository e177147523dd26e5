//! Hospital Records Integrity Zome
//!
//! Entry types for users, doctors, patients, appointments and discharge
//! details. Field rules come from `hospital-core`, so the DHT rejects the same
//! records the in-process store does.

use chrono::NaiveDate;
use hdi::prelude::*;
use hospital_core::{
    AppointmentDetails, AppointmentLegacy, Charges, DischargeLegacy, DoctorProfile,
    PatientLegacy, PatientProfile, StayDetails, UserIdentity, ValidationResult,
};

/// Identity record referenced by doctor and patient profiles
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct User {
    pub identity: UserIdentity,
    pub registered_at: Timestamp,
}

#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct Doctor {
    /// Original action hash of the doctor's `User`
    pub user: ActionHash,
    pub profile: DoctorProfile,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct Patient {
    pub user: ActionHash,
    /// Original action hash of the assigned `Doctor`
    pub assigned_doctor: Option<ActionHash>,
    /// Day the record was created, fixed for its lifetime
    pub admit_date: NaiveDate,
    pub profile: PatientProfile,
    pub legacy: PatientLegacy,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct Appointment {
    pub patient: Option<ActionHash>,
    pub doctor: Option<ActionHash>,
    pub details: AppointmentDetails,
    pub legacy: AppointmentLegacy,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct DischargeDetails {
    pub patient: Option<ActionHash>,
    pub assigned_doctor: Option<ActionHash>,
    pub stay: StayDetails,
    pub charges: Charges,
    pub legacy: DischargeLegacy,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[hdk_entry_types]
#[unit_enum(UnitEntryTypes)]
pub enum EntryTypes {
    User(User),
    Doctor(Doctor),
    Patient(Patient),
    Appointment(Appointment),
    DischargeDetails(DischargeDetails),
}

#[hdk_link_types]
pub enum LinkTypes {
    AllUsers,
    AllDoctors,
    AllPatients,
    AllAppointments,
    AllDischarges,
    UserToDoctor,
    UserToPatient,
    DoctorToPatients,
    DoctorToAppointments,
    DoctorToDischarges,
    PatientToAppointments,
    PatientToDischarges,
    UserUpdates,
    DoctorUpdates,
    PatientUpdates,
    AppointmentUpdates,
    DischargeUpdates,
}

impl LinkTypes {
    /// Links from an original record to its later versions
    pub fn is_update_history(self) -> bool {
        matches!(
            self,
            LinkTypes::UserUpdates
                | LinkTypes::DoctorUpdates
                | LinkTypes::PatientUpdates
                | LinkTypes::AppointmentUpdates
                | LinkTypes::DischargeUpdates
        )
    }
}

#[hdk_extern]
pub fn genesis_self_check(_data: GenesisSelfCheckData) -> ExternResult<ValidateCallbackResult> {
    Ok(ValidateCallbackResult::Valid)
}

#[hdk_extern]
pub fn validate(op: Op) -> ExternResult<ValidateCallbackResult> {
    match op.flattened::<EntryTypes, LinkTypes>()? {
        FlatOp::StoreEntry(store_entry) => match store_entry {
            OpEntry::CreateEntry { app_entry, .. } => validate_entry(&app_entry),
            OpEntry::UpdateEntry {
                app_entry, action, ..
            } => {
                let result = validate_entry(&app_entry)?;
                if let ValidateCallbackResult::Invalid(_) = result {
                    return Ok(result);
                }
                validate_update(&app_entry, &action)
            }
            _ => Ok(ValidateCallbackResult::Valid),
        },
        FlatOp::RegisterCreateLink { .. } => Ok(ValidateCallbackResult::Valid),
        FlatOp::RegisterDeleteLink { link_type, .. } => validate_delete_link(link_type),
        _ => Ok(ValidateCallbackResult::Valid),
    }
}

fn outcome(result: ValidationResult) -> ExternResult<ValidateCallbackResult> {
    if result.is_valid() {
        Ok(ValidateCallbackResult::Valid)
    } else {
        Ok(ValidateCallbackResult::Invalid(result.summary()))
    }
}

fn validate_entry(entry: &EntryTypes) -> ExternResult<ValidateCallbackResult> {
    match entry {
        EntryTypes::User(user) => outcome(user.identity.validate()),
        EntryTypes::Doctor(doctor) => outcome(doctor.profile.validate()),
        EntryTypes::Patient(patient) => outcome(patient.profile.validate()),
        EntryTypes::Appointment(appointment) => outcome(appointment.details.validate()),
        EntryTypes::DischargeDetails(discharge) => {
            let mut result = discharge.stay.validate();
            result.merge(discharge.charges.validate());
            outcome(result)
        }
    }
}

/// Rules comparing an update with the version it replaces.
fn validate_update(entry: &EntryTypes, action: &Update) -> ExternResult<ValidateCallbackResult> {
    let EntryTypes::Patient(patient) = entry else {
        return Ok(ValidateCallbackResult::Valid);
    };

    let previous = must_get_valid_record(action.original_action_address.clone())?;
    let previous: Patient = previous
        .entry()
        .to_app_option()
        .map_err(|e| wasm_error!(WasmErrorInner::Guest(e.to_string())))?
        .ok_or(wasm_error!(WasmErrorInner::Guest(
            "Updated record is not a patient".to_string()
        )))?;

    if previous.admit_date != patient.admit_date {
        return Ok(ValidateCallbackResult::Invalid(
            "admit_date cannot be changed after admission".to_string(),
        ));
    }
    if previous.created_at != patient.created_at {
        return Ok(ValidateCallbackResult::Invalid(
            "created_at cannot be changed".to_string(),
        ));
    }

    Ok(ValidateCallbackResult::Valid)
}

fn validate_delete_link(link_type: LinkTypes) -> ExternResult<ValidateCallbackResult> {
    if link_type.is_update_history() {
        return Ok(ValidateCallbackResult::Invalid(
            "Update history links cannot be deleted".to_string(),
        ));
    }
    Ok(ValidateCallbackResult::Valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_history_links() {
        assert!(LinkTypes::PatientUpdates.is_update_history());
        assert!(LinkTypes::DischargeUpdates.is_update_history());
        assert!(!LinkTypes::DoctorToPatients.is_update_history());
        assert!(!LinkTypes::AllUsers.is_update_history());
    }

    #[test]
    fn test_invalid_stay_outcome() {
        let stay = StayDetails {
            admit_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            release_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            day_spent: 0,
        };
        match outcome(stay.validate()).unwrap() {
            ValidateCallbackResult::Invalid(message) => assert!(message.contains("release_date")),
            other => panic!("expected invalid, got {other:?}"),
        }
    }
}
