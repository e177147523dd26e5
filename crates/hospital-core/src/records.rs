//! Stored records of the in-process store
//!
//! `New*` structs are what callers construct; the store assigns the id,
//! timestamps and legacy mirrors. Updates take the full stored record.

use chrono::{DateTime, NaiveDate, Utc};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::billing::TotalVerification;
use crate::identity::UserId;
use crate::legacy::{AppointmentLegacy, DischargeLegacy, PatientLegacy};
use crate::model::{AppointmentDetails, Charges, DoctorProfile, PatientProfile, StayDetails};

/// Store-assigned primary key
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub const fn new(raw: u64) -> Self {
        RecordId(raw)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Doctor,
    Patient,
    Appointment,
    DischargeDetails,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Doctor => "Doctor",
            EntityKind::Patient => "Patient",
            EntityKind::Appointment => "Appointment",
            EntityKind::DischargeDetails => "Patient Discharge Detail",
        };
        f.write_str(name)
    }
}

/// Bookkeeping shared by every record
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditStamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl AuditStamps {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            is_active: true,
        }
    }

    /// Stamps for a re-save: creation time is kept, update time moves.
    pub(crate) fn touched(&self, incoming: &AuditStamps, now: DateTime<Utc>) -> Self {
        Self {
            created_at: self.created_at,
            updated_at: now,
            is_active: incoming.is_active,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDoctor {
    pub user: UserId,
    pub profile: DoctorProfile,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doctor {
    pub id: RecordId,
    pub user: UserId,
    pub profile: DoctorProfile,
    pub audit: AuditStamps,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPatient {
    pub user: UserId,
    pub assigned_doctor: Option<RecordId>,
    pub profile: PatientProfile,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub id: RecordId,
    pub user: UserId,
    pub assigned_doctor: Option<RecordId>,
    /// Set when the record is created; updates cannot change it
    pub admit_date: NaiveDate,
    pub profile: PatientProfile,
    pub legacy: PatientLegacy,
    pub audit: AuditStamps,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewAppointment {
    pub patient: Option<RecordId>,
    pub doctor: Option<RecordId>,
    pub details: AppointmentDetails,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    pub id: RecordId,
    pub patient: Option<RecordId>,
    pub doctor: Option<RecordId>,
    pub details: AppointmentDetails,
    pub legacy: AppointmentLegacy,
    pub audit: AuditStamps,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDischarge {
    pub patient: Option<RecordId>,
    pub assigned_doctor: Option<RecordId>,
    pub stay: StayDetails,
    pub charges: Charges,
}

impl NewDischarge {
    /// Always [`TotalVerification::Pending`]: the bill is only checked once saved.
    pub fn total_verification(&self) -> TotalVerification {
        TotalVerification::evaluate(false, &self.charges)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DischargeDetails {
    pub id: RecordId,
    pub patient: Option<RecordId>,
    pub assigned_doctor: Option<RecordId>,
    pub stay: StayDetails,
    pub charges: Charges,
    pub legacy: DischargeLegacy,
    pub audit: AuditStamps,
}

impl DischargeDetails {
    pub fn total_verification(&self) -> TotalVerification {
        TotalVerification::evaluate(true, &self.charges)
    }
}
