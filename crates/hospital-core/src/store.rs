//! In-process record store
//!
//! Every write validates the record, resolves its references, runs the
//! legacy synchronizer and only then commits. A rejected write returns before
//! anything is touched, so the store is never left half-written.

use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::billing::TotalVerification;
use crate::clock::Clock;
use crate::config::{ConfigError, HospitalConfig};
use crate::deletion::{self, DeletionReport, OnDelete, ReferenceField};
use crate::display;
use crate::identity::{IdentityProvider, UserId, UserIdentity};
use crate::legacy::{
    AppointmentLegacy, DischargeLegacy, LegacySync, PatientLegacy, PatientSnapshot,
};
use crate::model::PatientProfile;
use crate::records::{
    Appointment, AuditStamps, DischargeDetails, Doctor, EntityKind, NewAppointment,
    NewDischarge, NewDoctor, NewPatient, Patient, RecordId,
};
use crate::validation::{ValidationErrorCode, ValidationErrors, ValidationResult};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: RecordId },
}

pub type StoreResult<T> = Result<T, StoreError>;

fn rejected(entity: EntityKind, errors: ValidationErrors) -> StoreError {
    warn!(%entity, %errors, "rejected write");
    StoreError::Validation(errors)
}

fn not_found(entity: EntityKind, id: RecordId) -> StoreError {
    warn!(%entity, %id, "record not found");
    StoreError::NotFound { entity, id }
}

/// Patient data a discharge mirrors, owned.
type PatientParts = (UserIdentity, PatientProfile);

fn snapshot(parts: &Option<PatientParts>) -> Option<PatientSnapshot<'_>> {
    parts
        .as_ref()
        .map(|(identity, profile)| PatientSnapshot { identity, profile })
}

pub struct HospitalStore<P: IdentityProvider, C: Clock> {
    config: HospitalConfig,
    identities: P,
    clock: C,
    next_id: u64,
    doctors: BTreeMap<RecordId, Doctor>,
    patients: BTreeMap<RecordId, Patient>,
    appointments: BTreeMap<RecordId, Appointment>,
    discharges: BTreeMap<RecordId, DischargeDetails>,
}

#[cfg(feature = "clock")]
impl<P: IdentityProvider> HospitalStore<P, crate::clock::SystemClock> {
    /// Store stamped with wall-clock time.
    pub fn with_system_clock(identities: P, config: HospitalConfig) -> Result<Self, ConfigError> {
        Self::new(identities, crate::clock::SystemClock, config)
    }
}

impl<P: IdentityProvider, C: Clock> HospitalStore<P, C> {
    pub fn new(identities: P, clock: C, config: HospitalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            identities,
            clock,
            next_id: 1,
            doctors: BTreeMap::new(),
            patients: BTreeMap::new(),
            appointments: BTreeMap::new(),
            discharges: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &HospitalConfig {
        &self.config
    }

    pub fn identities(&self) -> &P {
        &self.identities
    }

    /// Identity changes do not touch stored mirrors until the referencing
    /// record is saved again.
    pub fn identities_mut(&mut self) -> &mut P {
        &mut self.identities
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn sync(&self) -> LegacySync {
        LegacySync::new(self.config.cleared_reference)
    }

    fn allocate_id(&mut self) -> RecordId {
        let id = RecordId::new(self.next_id);
        self.next_id += 1;
        id
    }

    // Reference resolution. Each helper records an InvalidReference error
    // and returns None when the target is missing.

    fn check_user(&self, user: UserId, taken: bool, kind: EntityKind, result: &mut ValidationResult) {
        if self.identities.identity(user).is_none() {
            result.add_error(
                "user",
                &format!("User {} does not exist", user),
                ValidationErrorCode::InvalidReference,
            );
        } else if taken {
            result.add_error(
                "user",
                &format!("User {} already has a {} record", user, kind),
                ValidationErrorCode::DuplicateValue,
            );
        }
    }

    fn doctor_identity(&self, id: RecordId) -> Option<UserIdentity> {
        self.doctors
            .get(&id)
            .and_then(|doctor| self.identities.identity(doctor.user))
    }

    fn patient_identity(&self, id: RecordId) -> Option<UserIdentity> {
        self.patients
            .get(&id)
            .and_then(|patient| self.identities.identity(patient.user))
    }

    fn patient_parts(&self, id: RecordId) -> Option<PatientParts> {
        let patient = self.patients.get(&id)?;
        let identity = self.identities.identity(patient.user)?;
        Some((identity, patient.profile.clone()))
    }

    fn resolve<T>(
        reference: Option<RecordId>,
        field: &str,
        kind: EntityKind,
        lookup: impl FnOnce(RecordId) -> Option<T>,
        result: &mut ValidationResult,
    ) -> Option<T> {
        let id = reference?;
        let resolved = lookup(id);
        if resolved.is_none() {
            result.add_error(
                field,
                &format!("{} {} does not exist", kind, id),
                ValidationErrorCode::InvalidReference,
            );
        }
        resolved
    }

    // Doctors

    pub fn create_doctor(&mut self, new: NewDoctor) -> StoreResult<Doctor> {
        let mut result = new.profile.validate();
        let taken = self.doctors.values().any(|d| d.user == new.user);
        self.check_user(new.user, taken, EntityKind::Doctor, &mut result);
        result
            .into_result()
            .map_err(|e| rejected(EntityKind::Doctor, e))?;

        let doctor = Doctor {
            id: self.allocate_id(),
            user: new.user,
            profile: new.profile,
            audit: AuditStamps::new(self.clock.now()),
        };
        self.doctors.insert(doctor.id, doctor.clone());

        info!(id = %doctor.id, user = doctor.user, "created doctor");
        Ok(doctor)
    }

    pub fn update_doctor(&mut self, doctor: Doctor) -> StoreResult<Doctor> {
        let existing = self
            .doctors
            .get(&doctor.id)
            .ok_or_else(|| not_found(EntityKind::Doctor, doctor.id))?;

        let mut result = doctor.profile.validate();
        let taken = self
            .doctors
            .values()
            .any(|d| d.user == doctor.user && d.id != doctor.id);
        self.check_user(doctor.user, taken, EntityKind::Doctor, &mut result);
        result
            .into_result()
            .map_err(|e| rejected(EntityKind::Doctor, e))?;

        let audit = existing.audit.touched(&doctor.audit, self.clock.now());
        let stored = Doctor { audit, ..doctor };
        self.doctors.insert(stored.id, stored.clone());

        info!(id = %stored.id, "updated doctor");
        Ok(stored)
    }

    pub fn delete_doctor(&mut self, id: RecordId) -> StoreResult<DeletionReport> {
        self.delete(EntityKind::Doctor, id)
    }

    pub fn doctor(&self, id: RecordId) -> Option<&Doctor> {
        self.doctors.get(&id)
    }

    /// Newest first.
    pub fn doctors(&self) -> Vec<&Doctor> {
        let mut doctors: Vec<&Doctor> = self.doctors.values().collect();
        doctors.sort_by(|a, b| {
            b.audit
                .created_at
                .cmp(&a.audit.created_at)
                .then(b.id.cmp(&a.id))
        });
        doctors
    }

    // Patients

    pub fn create_patient(&mut self, new: NewPatient) -> StoreResult<Patient> {
        let mut result = new.profile.validate();
        let taken = self.patients.values().any(|p| p.user == new.user);
        self.check_user(new.user, taken, EntityKind::Patient, &mut result);
        let doctor = Self::resolve(
            new.assigned_doctor,
            ReferenceField::PatientAssignedDoctor.name(),
            EntityKind::Doctor,
            |id| self.doctor_identity(id),
            &mut result,
        );
        result
            .into_result()
            .map_err(|e| rejected(EntityKind::Patient, e))?;

        let mut legacy = PatientLegacy::default();
        self.sync().sync_patient(&mut legacy, doctor.as_ref());

        let patient = Patient {
            id: self.allocate_id(),
            user: new.user,
            assigned_doctor: new.assigned_doctor,
            admit_date: self.clock.today(),
            profile: new.profile,
            legacy,
            audit: AuditStamps::new(self.clock.now()),
        };
        self.patients.insert(patient.id, patient.clone());

        info!(id = %patient.id, user = patient.user, "created patient");
        Ok(patient)
    }

    pub fn update_patient(&mut self, patient: Patient) -> StoreResult<Patient> {
        let existing = self
            .patients
            .get(&patient.id)
            .ok_or_else(|| not_found(EntityKind::Patient, patient.id))?;

        let mut result = patient.profile.validate();
        let taken = self
            .patients
            .values()
            .any(|p| p.user == patient.user && p.id != patient.id);
        self.check_user(patient.user, taken, EntityKind::Patient, &mut result);
        let doctor = Self::resolve(
            patient.assigned_doctor,
            ReferenceField::PatientAssignedDoctor.name(),
            EntityKind::Doctor,
            |id| self.doctor_identity(id),
            &mut result,
        );
        result
            .into_result()
            .map_err(|e| rejected(EntityKind::Patient, e))?;

        let mut legacy = existing.legacy.clone();
        self.sync().sync_patient(&mut legacy, doctor.as_ref());

        let stored = Patient {
            admit_date: existing.admit_date,
            legacy,
            audit: existing.audit.touched(&patient.audit, self.clock.now()),
            ..patient
        };
        self.patients.insert(stored.id, stored.clone());

        info!(id = %stored.id, "updated patient");
        Ok(stored)
    }

    pub fn delete_patient(&mut self, id: RecordId) -> StoreResult<DeletionReport> {
        self.delete(EntityKind::Patient, id)
    }

    pub fn patient(&self, id: RecordId) -> Option<&Patient> {
        self.patients.get(&id)
    }

    /// Most recently admitted first.
    pub fn patients(&self) -> Vec<&Patient> {
        let mut patients: Vec<&Patient> = self.patients.values().collect();
        patients.sort_by(|a, b| b.admit_date.cmp(&a.admit_date).then(b.id.cmp(&a.id)));
        patients
    }

    // Appointments

    pub fn create_appointment(&mut self, new: NewAppointment) -> StoreResult<Appointment> {
        let mut result = new.details.validate();
        let patient = Self::resolve(
            new.patient,
            ReferenceField::AppointmentPatient.name(),
            EntityKind::Patient,
            |id| self.patient_identity(id),
            &mut result,
        );
        let doctor = Self::resolve(
            new.doctor,
            ReferenceField::AppointmentDoctor.name(),
            EntityKind::Doctor,
            |id| self.doctor_identity(id),
            &mut result,
        );
        result
            .into_result()
            .map_err(|e| rejected(EntityKind::Appointment, e))?;

        let mut legacy = AppointmentLegacy::default();
        self.sync()
            .sync_appointment(&mut legacy, patient.as_ref(), doctor.as_ref(), &new.details);

        let appointment = Appointment {
            id: self.allocate_id(),
            patient: new.patient,
            doctor: new.doctor,
            details: new.details,
            legacy,
            audit: AuditStamps::new(self.clock.now()),
        };
        self.appointments.insert(appointment.id, appointment.clone());

        info!(id = %appointment.id, "created appointment");
        Ok(appointment)
    }

    pub fn update_appointment(&mut self, appointment: Appointment) -> StoreResult<Appointment> {
        let existing = self
            .appointments
            .get(&appointment.id)
            .ok_or_else(|| not_found(EntityKind::Appointment, appointment.id))?;

        let mut result = appointment.details.validate();
        let patient = Self::resolve(
            appointment.patient,
            ReferenceField::AppointmentPatient.name(),
            EntityKind::Patient,
            |id| self.patient_identity(id),
            &mut result,
        );
        let doctor = Self::resolve(
            appointment.doctor,
            ReferenceField::AppointmentDoctor.name(),
            EntityKind::Doctor,
            |id| self.doctor_identity(id),
            &mut result,
        );
        result
            .into_result()
            .map_err(|e| rejected(EntityKind::Appointment, e))?;

        let mut legacy = existing.legacy.clone();
        self.sync().sync_appointment(
            &mut legacy,
            patient.as_ref(),
            doctor.as_ref(),
            &appointment.details,
        );

        let stored = Appointment {
            legacy,
            audit: existing.audit.touched(&appointment.audit, self.clock.now()),
            ..appointment
        };
        self.appointments.insert(stored.id, stored.clone());

        info!(id = %stored.id, "updated appointment");
        Ok(stored)
    }

    pub fn delete_appointment(&mut self, id: RecordId) -> StoreResult<DeletionReport> {
        self.delete(EntityKind::Appointment, id)
    }

    pub fn appointment(&self, id: RecordId) -> Option<&Appointment> {
        self.appointments.get(&id)
    }

    /// Latest appointment time first.
    pub fn appointments(&self) -> Vec<&Appointment> {
        let mut appointments: Vec<&Appointment> = self.appointments.values().collect();
        appointments.sort_by(|a, b| {
            b.details
                .appointment_date
                .cmp(&a.details.appointment_date)
                .then(b.id.cmp(&a.id))
        });
        appointments
    }

    // Discharges

    pub fn create_discharge(&mut self, new: NewDischarge) -> StoreResult<DischargeDetails> {
        let mut result = new.stay.validate();
        result.merge(new.charges.validate());
        let patient = Self::resolve(
            new.patient,
            ReferenceField::DischargePatient.name(),
            EntityKind::Patient,
            |id| self.patient_parts(id),
            &mut result,
        );
        let doctor = Self::resolve(
            new.assigned_doctor,
            ReferenceField::DischargeAssignedDoctor.name(),
            EntityKind::Doctor,
            |id| self.doctor_identity(id),
            &mut result,
        );
        result
            .into_result()
            .map_err(|e| rejected(EntityKind::DischargeDetails, e))?;

        let mut legacy = DischargeLegacy::default();
        self.sync().sync_discharge(
            &mut legacy,
            snapshot(&patient),
            doctor.as_ref(),
            &new.stay,
            &new.charges,
        );

        let discharge = DischargeDetails {
            id: self.allocate_id(),
            patient: new.patient,
            assigned_doctor: new.assigned_doctor,
            stay: new.stay,
            charges: new.charges,
            legacy,
            audit: AuditStamps::new(self.clock.now()),
        };
        self.discharges.insert(discharge.id, discharge.clone());

        info!(
            id = %discharge.id,
            total = %discharge.charges.total,
            "created discharge"
        );
        Ok(discharge)
    }

    pub fn update_discharge(&mut self, discharge: DischargeDetails) -> StoreResult<DischargeDetails> {
        let existing = self
            .discharges
            .get(&discharge.id)
            .ok_or_else(|| not_found(EntityKind::DischargeDetails, discharge.id))?;

        let mut result = discharge.stay.validate();
        result.merge(discharge.charges.validate());
        let patient = Self::resolve(
            discharge.patient,
            ReferenceField::DischargePatient.name(),
            EntityKind::Patient,
            |id| self.patient_parts(id),
            &mut result,
        );
        let doctor = Self::resolve(
            discharge.assigned_doctor,
            ReferenceField::DischargeAssignedDoctor.name(),
            EntityKind::Doctor,
            |id| self.doctor_identity(id),
            &mut result,
        );
        result
            .into_result()
            .map_err(|e| rejected(EntityKind::DischargeDetails, e))?;

        let mut legacy = existing.legacy.clone();
        self.sync().sync_discharge(
            &mut legacy,
            snapshot(&patient),
            doctor.as_ref(),
            &discharge.stay,
            &discharge.charges,
        );

        let stored = DischargeDetails {
            legacy,
            audit: existing.audit.touched(&discharge.audit, self.clock.now()),
            ..discharge
        };
        self.discharges.insert(stored.id, stored.clone());

        info!(id = %stored.id, "updated discharge");
        Ok(stored)
    }

    pub fn delete_discharge(&mut self, id: RecordId) -> StoreResult<DeletionReport> {
        self.delete(EntityKind::DischargeDetails, id)
    }

    pub fn discharge(&self, id: RecordId) -> Option<&DischargeDetails> {
        self.discharges.get(&id)
    }

    /// Latest release first.
    pub fn discharges(&self) -> Vec<&DischargeDetails> {
        let mut discharges: Vec<&DischargeDetails> = self.discharges.values().collect();
        discharges.sort_by(|a, b| {
            b.stay
                .release_date
                .cmp(&a.stay.release_date)
                .then(b.id.cmp(&a.id))
        });
        discharges
    }

    // Billing

    pub fn verify_total(&self, discharge_id: RecordId) -> StoreResult<TotalVerification> {
        self.discharges
            .get(&discharge_id)
            .map(DischargeDetails::total_verification)
            .ok_or_else(|| not_found(EntityKind::DischargeDetails, discharge_id))
    }

    /// Verification rendered with the configured currency symbol.
    pub fn render_total(&self, discharge_id: RecordId) -> StoreResult<String> {
        let verification = self.verify_total(discharge_id)?;
        Ok(verification.render(&self.config.currency_symbol))
    }

    // Labels use the identities as they are now, not the stored mirrors.

    pub fn doctor_label(&self, id: RecordId) -> Option<String> {
        let doctor = self.doctors.get(&id)?;
        let identity = self.identities.identity(doctor.user)?;
        Some(display::doctor_label(&identity, &doctor.profile))
    }

    pub fn patient_label(&self, id: RecordId) -> Option<String> {
        let (identity, profile) = self.patient_parts(id)?;
        Some(display::patient_label(&identity, &profile))
    }

    pub fn appointment_label(&self, id: RecordId) -> Option<String> {
        let appointment = self.appointments.get(&id)?;
        let patient = appointment.patient.and_then(|p| self.patient_identity(p));
        let doctor = appointment.doctor.and_then(|d| self.doctor_identity(d));
        Some(display::appointment_label(
            patient.as_ref(),
            doctor.as_ref(),
            appointment.details.appointment_date,
        ))
    }

    pub fn discharge_label(&self, id: RecordId) -> Option<String> {
        let discharge = self.discharges.get(&id)?;
        let patient = discharge.patient.and_then(|p| self.patient_identity(p));
        Some(display::discharge_label(patient.as_ref(), discharge.stay.release_date))
    }

    // Deletion

    fn contains(&self, kind: EntityKind, id: RecordId) -> bool {
        match kind {
            EntityKind::Doctor => self.doctors.contains_key(&id),
            EntityKind::Patient => self.patients.contains_key(&id),
            EntityKind::Appointment => self.appointments.contains_key(&id),
            EntityKind::DischargeDetails => self.discharges.contains_key(&id),
        }
    }

    fn delete(&mut self, kind: EntityKind, id: RecordId) -> StoreResult<DeletionReport> {
        if !self.contains(kind, id) {
            return Err(not_found(kind, id));
        }

        let mut report = DeletionReport::default();
        self.remove_with_dependents(kind, id, &mut report);

        info!(
            entity = %kind,
            %id,
            deleted = report.deleted.len(),
            nullified = report.nullified.len(),
            "deleted record"
        );
        Ok(report)
    }

    fn remove_with_dependents(&mut self, kind: EntityKind, id: RecordId, report: &mut DeletionReport) {
        for rule in deletion::rules_for(kind) {
            let dependent_kind = rule.field.dependent();
            for dependent in self.referencing(rule.field, id) {
                match rule.on_delete {
                    OnDelete::Cascade => {
                        self.remove_with_dependents(dependent_kind, dependent, report)
                    }
                    OnDelete::SetNull => {
                        self.clear_reference(rule.field, dependent);
                        report.nullified.push((dependent_kind, dependent));
                    }
                }
            }
        }

        match kind {
            EntityKind::Doctor => {
                self.doctors.remove(&id);
            }
            EntityKind::Patient => {
                self.patients.remove(&id);
            }
            EntityKind::Appointment => {
                self.appointments.remove(&id);
            }
            EntityKind::DischargeDetails => {
                self.discharges.remove(&id);
            }
        }
        report.deleted.push((kind, id));
    }

    /// Ids of records whose `field` points at `target`.
    fn referencing(&self, field: ReferenceField, target: RecordId) -> Vec<RecordId> {
        let target = Some(target);
        match field {
            ReferenceField::PatientAssignedDoctor => self
                .patients
                .values()
                .filter(|p| p.assigned_doctor == target)
                .map(|p| p.id)
                .collect(),
            ReferenceField::AppointmentPatient => self
                .appointments
                .values()
                .filter(|a| a.patient == target)
                .map(|a| a.id)
                .collect(),
            ReferenceField::AppointmentDoctor => self
                .appointments
                .values()
                .filter(|a| a.doctor == target)
                .map(|a| a.id)
                .collect(),
            ReferenceField::DischargePatient => self
                .discharges
                .values()
                .filter(|d| d.patient == target)
                .map(|d| d.id)
                .collect(),
            ReferenceField::DischargeAssignedDoctor => self
                .discharges
                .values()
                .filter(|d| d.assigned_doctor == target)
                .map(|d| d.id)
                .collect(),
        }
    }

    /// Null `field` on record `id` and re-sync its mirrors.
    fn clear_reference(&mut self, field: ReferenceField, id: RecordId) {
        let sync = self.sync();
        let now = self.clock.now();

        match field {
            ReferenceField::PatientAssignedDoctor => {
                if let Some(patient) = self.patients.get_mut(&id) {
                    patient.assigned_doctor = None;
                    sync.sync_patient(&mut patient.legacy, None);
                    patient.audit.updated_at = now;
                }
            }
            ReferenceField::AppointmentPatient | ReferenceField::AppointmentDoctor => {
                let Some(current) = self.appointments.get(&id) else {
                    return;
                };
                let (patient_ref, doctor_ref) = match field {
                    ReferenceField::AppointmentPatient => (None, current.doctor),
                    _ => (current.patient, None),
                };
                let patient = patient_ref.and_then(|p| self.patient_identity(p));
                let doctor = doctor_ref.and_then(|d| self.doctor_identity(d));

                if let Some(appointment) = self.appointments.get_mut(&id) {
                    appointment.patient = patient_ref;
                    appointment.doctor = doctor_ref;
                    sync.sync_appointment(
                        &mut appointment.legacy,
                        patient.as_ref(),
                        doctor.as_ref(),
                        &appointment.details,
                    );
                    appointment.audit.updated_at = now;
                }
            }
            ReferenceField::DischargePatient | ReferenceField::DischargeAssignedDoctor => {
                let Some(current) = self.discharges.get(&id) else {
                    return;
                };
                let (patient_ref, doctor_ref) = match field {
                    ReferenceField::DischargePatient => (None, current.assigned_doctor),
                    _ => (current.patient, None),
                };
                let patient = patient_ref.and_then(|p| self.patient_parts(p));
                let doctor = doctor_ref.and_then(|d| self.doctor_identity(d));

                if let Some(discharge) = self.discharges.get_mut(&id) {
                    discharge.patient = patient_ref;
                    discharge.assigned_doctor = doctor_ref;
                    sync.sync_discharge(
                        &mut discharge.legacy,
                        snapshot(&patient),
                        doctor.as_ref(),
                        &discharge.stay,
                        &discharge.charges,
                    );
                    discharge.audit.updated_at = now;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::identity::IdentityDirectory;
    use crate::model::{AppointmentDetails, DoctorProfile};
    use chrono::{TimeZone, Utc};

    fn store() -> HospitalStore<IdentityDirectory, FixedClock> {
        let mut identities = IdentityDirectory::new();
        identities.register(UserIdentity::new(7, "ab", "A", "B")).unwrap();
        identities.register(UserIdentity::new(9, "testpat", "Pat", "Smith")).unwrap();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        HospitalStore::new(identities, clock, HospitalConfig::default()).unwrap()
    }

    fn new_doctor(user: UserId) -> NewDoctor {
        NewDoctor {
            user,
            profile: DoctorProfile::new("123 Doc St", "1234567890"),
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = HospitalConfig {
            currency_symbol: String::new(),
            ..Default::default()
        };
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert!(HospitalStore::new(IdentityDirectory::new(), clock, config).is_err());
    }

    #[test]
    fn test_unknown_user_is_invalid_reference() {
        let mut store = store();
        let err = store.create_doctor(new_doctor(42)).unwrap_err();
        match err {
            StoreError::Validation(errors) => {
                assert!(errors.has_code("user", ValidationErrorCode::InvalidReference))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.doctors().is_empty());
    }

    #[test]
    fn test_one_doctor_per_user() {
        let mut store = store();
        store.create_doctor(new_doctor(7)).unwrap();
        let err = store.create_doctor(new_doctor(7)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ref e) if e.has_code("user", ValidationErrorCode::DuplicateValue)
        ));
    }

    #[test]
    fn test_update_unknown_record() {
        let mut store = store();
        let doctor = store.create_doctor(new_doctor(7)).unwrap();
        store.delete_doctor(doctor.id).unwrap();

        let err = store.update_doctor(doctor.clone()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: EntityKind::Doctor, id } if id == doctor.id));
        assert!(matches!(store.delete_doctor(doctor.id), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_update_keeps_created_at() {
        let mut store = store();
        let mut doctor = store.create_doctor(new_doctor(7)).unwrap();
        let created = doctor.audit.created_at;

        store.clock().advance(chrono::Duration::days(2));
        doctor.audit.created_at = Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap();
        doctor.profile.status = true;
        let updated = store.update_doctor(doctor).unwrap();

        assert_eq!(updated.audit.created_at, created);
        assert_eq!(updated.audit.updated_at, created + chrono::Duration::days(2));
        assert!(updated.profile.status);
    }

    #[test]
    fn test_caller_legacy_values_are_ignored() {
        let mut store = store();
        let doctor = store.create_doctor(new_doctor(7)).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        let mut appointment = store
            .create_appointment(NewAppointment {
                patient: None,
                doctor: Some(doctor.id),
                details: AppointmentDetails::new(at, "Checkup"),
            })
            .unwrap();

        appointment.legacy.doctor_name = "Forged".to_string();
        appointment.legacy.doctor_id = Some(1000);
        let saved = store.update_appointment(appointment).unwrap();

        assert_eq!(saved.legacy.doctor_name, "A B");
        assert_eq!(saved.legacy.doctor_id, Some(7));
    }

    #[test]
    fn test_lists_are_ordered() {
        let mut store = store();
        let first = store.create_doctor(new_doctor(7)).unwrap();
        store.clock().advance(chrono::Duration::minutes(5));
        let second = store.create_doctor(new_doctor(9)).unwrap();

        let ids: Vec<RecordId> = store.doctors().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
