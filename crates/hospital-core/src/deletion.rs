//! Declared deletion policy
//!
//! One rule per nullable reference: what happens to the dependent record
//! when the record it points at is deleted. Both the in-process store and the
//! coordinator zome walk this table.

use serde::{Deserialize, Serialize};

use crate::records::{EntityKind, RecordId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnDelete {
    /// Delete the dependent record too
    Cascade,
    /// Null the reference and re-sync the dependent's mirrors
    SetNull,
}

/// Reference fields that point at another record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceField {
    PatientAssignedDoctor,
    AppointmentPatient,
    AppointmentDoctor,
    DischargePatient,
    DischargeAssignedDoctor,
}

impl ReferenceField {
    /// Kind of record holding the reference.
    pub fn dependent(self) -> EntityKind {
        match self {
            ReferenceField::PatientAssignedDoctor => EntityKind::Patient,
            ReferenceField::AppointmentPatient | ReferenceField::AppointmentDoctor => {
                EntityKind::Appointment
            }
            ReferenceField::DischargePatient | ReferenceField::DischargeAssignedDoctor => {
                EntityKind::DischargeDetails
            }
        }
    }

    /// Kind of record being pointed at.
    pub fn referenced(self) -> EntityKind {
        match self {
            ReferenceField::PatientAssignedDoctor
            | ReferenceField::AppointmentDoctor
            | ReferenceField::DischargeAssignedDoctor => EntityKind::Doctor,
            ReferenceField::AppointmentPatient | ReferenceField::DischargePatient => {
                EntityKind::Patient
            }
        }
    }

    /// Field name as reported in validation errors.
    pub fn name(self) -> &'static str {
        match self {
            ReferenceField::PatientAssignedDoctor | ReferenceField::DischargeAssignedDoctor => {
                "assigned_doctor"
            }
            ReferenceField::AppointmentPatient | ReferenceField::DischargePatient => "patient",
            ReferenceField::AppointmentDoctor => "doctor",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceRule {
    pub field: ReferenceField,
    pub on_delete: OnDelete,
}

pub const POLICY: [ReferenceRule; 5] = [
    ReferenceRule {
        field: ReferenceField::PatientAssignedDoctor,
        on_delete: OnDelete::SetNull,
    },
    ReferenceRule {
        field: ReferenceField::AppointmentDoctor,
        on_delete: OnDelete::Cascade,
    },
    ReferenceRule {
        field: ReferenceField::DischargeAssignedDoctor,
        on_delete: OnDelete::SetNull,
    },
    ReferenceRule {
        field: ReferenceField::AppointmentPatient,
        on_delete: OnDelete::Cascade,
    },
    ReferenceRule {
        field: ReferenceField::DischargePatient,
        on_delete: OnDelete::Cascade,
    },
];

/// Rules for references pointing at records of `kind`.
pub fn rules_for(kind: EntityKind) -> impl Iterator<Item = &'static ReferenceRule> {
    POLICY.iter().filter(move |rule| rule.field.referenced() == kind)
}

/// What a delete did beyond removing the requested record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    /// Every removed record, the requested one last
    pub deleted: Vec<(EntityKind, RecordId)>,
    /// Dependents whose reference was nulled
    pub nullified: Vec<(EntityKind, RecordId)>,
}

impl DeletionReport {
    pub fn deleted_count(&self, kind: EntityKind) -> usize {
        self.deleted.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn nullified_count(&self, kind: EntityKind) -> usize {
        self.nullified.iter().filter(|(k, _)| *k == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctor_rules() {
        let rules: Vec<_> = rules_for(EntityKind::Doctor).collect();
        assert_eq!(rules.len(), 3);
        assert!(rules.iter().any(|r| r.field == ReferenceField::PatientAssignedDoctor
            && r.on_delete == OnDelete::SetNull));
        assert!(rules.iter().any(|r| r.field == ReferenceField::AppointmentDoctor
            && r.on_delete == OnDelete::Cascade));
        assert!(rules.iter().any(|r| r.field == ReferenceField::DischargeAssignedDoctor
            && r.on_delete == OnDelete::SetNull));
    }

    #[test]
    fn test_patient_rules_cascade() {
        let rules: Vec<_> = rules_for(EntityKind::Patient).collect();
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|r| r.on_delete == OnDelete::Cascade));
    }

    #[test]
    fn test_leaf_records_have_no_dependents() {
        assert_eq!(rules_for(EntityKind::Appointment).count(), 0);
        assert_eq!(rules_for(EntityKind::DischargeDetails).count(), 0);
    }

    #[test]
    fn test_field_names() {
        assert_eq!(ReferenceField::PatientAssignedDoctor.name(), "assigned_doctor");
        assert_eq!(ReferenceField::AppointmentDoctor.name(), "doctor");
        assert_eq!(ReferenceField::DischargePatient.dependent(), EntityKind::DischargeDetails);
    }
}
