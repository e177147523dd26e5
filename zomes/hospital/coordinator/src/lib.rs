//! Hospital Records Coordinator Zome
//!
//! Externs for registering users and managing doctors, patients,
//! appointments and discharge details.
//!
//! Records are addressed by the action hash of their first version; updates
//! are found through the `*Updates` links. Each write validates, resolves its
//! references and recomputes legacy mirrors before anything is committed.
//! Deletes apply `hospital_core::deletion::POLICY` inside the same call.

use chrono::{DateTime, NaiveDate, Utc};
use hdk::prelude::*;
use hospital_core::deletion::{self, OnDelete, ReferenceField};
use hospital_core::{
    AppointmentDetails, AppointmentLegacy, Charges, DischargeLegacy, DoctorProfile, EntityKind,
    HospitalConfig, LegacySync, PatientLegacy, PatientProfile, PatientSnapshot, StayDetails,
    TotalVerification, UserIdentity, ValidationErrorCode, ValidationResult,
};
use hospital_integrity::*;

// ============================================================================
// Configuration
// ============================================================================

/// DNA properties carry the same JSON shape as `HospitalConfig`
#[derive(Serialize, Deserialize, SerializedBytes, Debug, Clone)]
#[serde(transparent)]
struct HospitalProperties(HospitalConfig);

/// MessagePack `nil`, what the conductor stores for a DNA without properties
const NIL_PROPERTIES: [u8; 1] = [0xc0];

fn unset(properties: &SerializedBytes) -> bool {
    let bytes = properties.bytes();
    bytes.is_empty() || bytes.as_slice() == NIL_PROPERTIES
}

/// Hospital config from DNA properties. Only absent properties fall back to
/// the defaults; unreadable ones fail the call.
fn config_from_properties(properties: SerializedBytes) -> ExternResult<HospitalConfig> {
    let config = if unset(&properties) {
        debug!("no DNA properties, using default hospital config");
        HospitalConfig::default()
    } else {
        let HospitalProperties(config) = HospitalProperties::try_from(properties).map_err(|error| {
            warn!(?error, "DNA properties are not a hospital config");
            guest(format!("Invalid hospital config in DNA properties: {}", error))
        })?;
        config
    };
    config.validate().map_err(guest)?;
    Ok(config)
}

fn hospital_config() -> ExternResult<HospitalConfig> {
    config_from_properties(dna_info()?.modifiers.properties)
}

fn legacy_sync() -> ExternResult<LegacySync> {
    Ok(LegacySync::new(hospital_config()?.cleared_reference))
}

// ============================================================================
// Helpers
// ============================================================================

fn guest(message: impl ToString) -> WasmError {
    wasm_error!(WasmErrorInner::Guest(message.to_string()))
}

/// Anchor entry for indexing
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct Anchor(pub String);

fn anchor_hash(anchor_text: &str) -> ExternResult<EntryHash> {
    let anchor = Anchor(anchor_text.to_string());
    hash_entry(&anchor)
}

fn today(now: Timestamp) -> ExternResult<NaiveDate> {
    DateTime::<Utc>::from_timestamp_micros(now.as_micros())
        .map(|at| at.date_naive())
        .ok_or_else(|| guest("System time is out of range"))
}

fn ensure_valid(entity: &str, result: ValidationResult) -> ExternResult<()> {
    result.into_result().map_err(|errors| {
        warn!(entity, %errors, "rejected write");
        guest(errors)
    })
}

/// Stored entry types with their index anchor and history links.
trait HospitalEntry: TryFrom<SerializedBytes, Error = SerializedBytesError> + Clone {
    const KIND: &'static str;
    const ANCHOR: &'static str;
    const ALL: LinkTypes;
    const UPDATES: LinkTypes;

    fn into_entry_type(self) -> EntryTypes;
}

impl HospitalEntry for User {
    const KIND: &'static str = "User";
    const ANCHOR: &'static str = "all_users";
    const ALL: LinkTypes = LinkTypes::AllUsers;
    const UPDATES: LinkTypes = LinkTypes::UserUpdates;

    fn into_entry_type(self) -> EntryTypes {
        EntryTypes::User(self)
    }
}

impl HospitalEntry for Doctor {
    const KIND: &'static str = "Doctor";
    const ANCHOR: &'static str = "all_doctors";
    const ALL: LinkTypes = LinkTypes::AllDoctors;
    const UPDATES: LinkTypes = LinkTypes::DoctorUpdates;

    fn into_entry_type(self) -> EntryTypes {
        EntryTypes::Doctor(self)
    }
}

impl HospitalEntry for Patient {
    const KIND: &'static str = "Patient";
    const ANCHOR: &'static str = "all_patients";
    const ALL: LinkTypes = LinkTypes::AllPatients;
    const UPDATES: LinkTypes = LinkTypes::PatientUpdates;

    fn into_entry_type(self) -> EntryTypes {
        EntryTypes::Patient(self)
    }
}

impl HospitalEntry for Appointment {
    const KIND: &'static str = "Appointment";
    const ANCHOR: &'static str = "all_appointments";
    const ALL: LinkTypes = LinkTypes::AllAppointments;
    const UPDATES: LinkTypes = LinkTypes::AppointmentUpdates;

    fn into_entry_type(self) -> EntryTypes {
        EntryTypes::Appointment(self)
    }
}

impl HospitalEntry for DischargeDetails {
    const KIND: &'static str = "Patient Discharge Detail";
    const ANCHOR: &'static str = "all_discharges";
    const ALL: LinkTypes = LinkTypes::AllDischarges;
    const UPDATES: LinkTypes = LinkTypes::DischargeUpdates;

    fn into_entry_type(self) -> EntryTypes {
        EntryTypes::DischargeDetails(self)
    }
}

/// Latest version of a live record
struct Current<T> {
    original: ActionHash,
    latest: ActionHash,
    entry: T,
    record: Record,
}

fn is_deleted(original: &ActionHash) -> ExternResult<bool> {
    match get_details(original.clone(), GetOptions::default())? {
        Some(Details::Record(details)) => Ok(!details.deletes.is_empty()),
        _ => Ok(true),
    }
}

fn fetch<T: HospitalEntry>(original: &ActionHash) -> ExternResult<Option<Current<T>>> {
    if is_deleted(original)? {
        return Ok(None);
    }

    let updates = get_links(
        LinkQuery::try_new(original.clone(), T::UPDATES)?,
        GetStrategy::default(),
    )?;
    let latest = updates
        .into_iter()
        .max_by_key(|link| link.timestamp)
        .and_then(|link| link.target.into_action_hash())
        .unwrap_or_else(|| original.clone());

    let Some(record) = get(latest.clone(), GetOptions::default())? else {
        return Ok(None);
    };
    let entry = record
        .entry()
        .to_app_option::<T>()
        .map_err(guest)?
        .ok_or_else(|| guest(format!("{} entry is malformed", T::KIND)))?;

    Ok(Some(Current {
        original: original.clone(),
        latest,
        entry,
        record,
    }))
}

fn require<T: HospitalEntry>(original: &ActionHash) -> ExternResult<Current<T>> {
    fetch::<T>(original)?.ok_or_else(|| {
        warn!(kind = T::KIND, %original, "record not found");
        guest(format!("{} not found", T::KIND))
    })
}

fn list<T: HospitalEntry>() -> ExternResult<Vec<Current<T>>> {
    let links = get_links(
        LinkQuery::try_new(anchor_hash(T::ANCHOR)?, T::ALL)?,
        GetStrategy::default(),
    )?;

    let mut entries = Vec::new();
    for link in links {
        if let Some(hash) = link.target.into_action_hash() {
            if let Some(current) = fetch::<T>(&hash)? {
                entries.push(current);
            }
        }
    }
    Ok(entries)
}

fn commit_create<T: HospitalEntry>(entry: T) -> ExternResult<(ActionHash, Record)> {
    let hash = create_entry(&entry.into_entry_type())?;
    let record = get(hash.clone(), GetOptions::default())?
        .ok_or(guest(format!("Could not find newly created {}", T::KIND)))?;

    create_link(anchor_hash(T::ANCHOR)?, hash.clone(), T::ALL, ())?;

    Ok((hash, record))
}

fn commit_update<T: HospitalEntry>(current: &Current<T>, entry: T) -> ExternResult<Record> {
    let updated_hash = update_entry(current.latest.clone(), &entry.into_entry_type())?;
    let record = get(updated_hash.clone(), GetOptions::default())?
        .ok_or(guest(format!("Could not find updated {}", T::KIND)))?;

    // History links always hang off the first version
    create_link(current.original.clone(), updated_hash, T::UPDATES, ())?;

    Ok(record)
}

/// Targets of `link_type` links from `base` whose records are not deleted.
fn live_targets(base: ActionHash, link_type: LinkTypes) -> ExternResult<Vec<ActionHash>> {
    let links = get_links(LinkQuery::try_new(base, link_type)?, GetStrategy::default())?;

    let mut targets: Vec<ActionHash> = Vec::new();
    for link in links {
        if let Some(target) = link.target.into_action_hash() {
            if !targets.contains(&target) && !is_deleted(&target)? {
                targets.push(target);
            }
        }
    }
    Ok(targets)
}

fn unlink(base: impl Into<AnyLinkableHash>, target: &ActionHash, link_type: LinkTypes) -> ExternResult<()> {
    let links = get_links(LinkQuery::try_new(base, link_type)?, GetStrategy::default())?;
    for link in links {
        if link.target.into_action_hash().as_ref() == Some(target) {
            delete_link(link.create_link_hash, GetOptions::default())?;
        }
    }
    Ok(())
}

/// Move a reference link when the referenced record changes.
fn relink(
    previous: Option<&ActionHash>,
    next: Option<&ActionHash>,
    target: &ActionHash,
    link_type: LinkTypes,
) -> ExternResult<()> {
    if previous == next {
        return Ok(());
    }
    if let Some(base) = previous {
        unlink(base.clone(), target, link_type)?;
    }
    if let Some(base) = next {
        create_link(base.clone(), target.clone(), link_type, ())?;
    }
    Ok(())
}

// ============================================================================
// Reference resolution
// ============================================================================

fn user_identity(user: &ActionHash) -> ExternResult<Option<UserIdentity>> {
    Ok(fetch::<User>(user)?.map(|current| current.entry.identity))
}

fn doctor_identity(doctor: &ActionHash) -> ExternResult<Option<UserIdentity>> {
    match fetch::<Doctor>(doctor)? {
        Some(current) => user_identity(&current.entry.user),
        None => Ok(None),
    }
}

fn patient_identity(patient: &ActionHash) -> ExternResult<Option<UserIdentity>> {
    match fetch::<Patient>(patient)? {
        Some(current) => user_identity(&current.entry.user),
        None => Ok(None),
    }
}

fn patient_parts(patient: &ActionHash) -> ExternResult<Option<(UserIdentity, PatientProfile)>> {
    let Some(current) = fetch::<Patient>(patient)? else {
        return Ok(None);
    };
    Ok(user_identity(&current.entry.user)?.map(|identity| (identity, current.entry.profile)))
}

fn snapshot(parts: &Option<(UserIdentity, PatientProfile)>) -> Option<PatientSnapshot<'_>> {
    parts
        .as_ref()
        .map(|(identity, profile)| PatientSnapshot { identity, profile })
}

fn lookup<T>(
    reference: Option<&ActionHash>,
    find: impl FnOnce(&ActionHash) -> ExternResult<Option<T>>,
) -> ExternResult<Option<T>> {
    match reference {
        Some(hash) => find(hash),
        None => Ok(None),
    }
}

/// Like [`lookup`], recording an `InvalidReference` error for a dangling reference.
fn resolve<T>(
    reference: Option<&ActionHash>,
    field: ReferenceField,
    find: impl FnOnce(&ActionHash) -> ExternResult<Option<T>>,
    result: &mut ValidationResult,
) -> ExternResult<Option<T>> {
    let resolved = lookup(reference, find)?;
    if let (Some(hash), None) = (reference, &resolved) {
        result.add_error(
            field.name(),
            &format!("{} {} does not exist", field.referenced(), hash),
            ValidationErrorCode::InvalidReference,
        );
    }
    Ok(resolved)
}

/// A user owns at most one profile of each kind.
fn check_profile_owner(
    user: &ActionHash,
    owner_links: LinkTypes,
    owner: Option<&ActionHash>,
    kind: &str,
    result: &mut ValidationResult,
) -> ExternResult<()> {
    if user_identity(user)?.is_none() {
        result.add_error(
            "user",
            &format!("User {} does not exist", user),
            ValidationErrorCode::InvalidReference,
        );
        return Ok(());
    }

    let taken = live_targets(user.clone(), owner_links)?
        .iter()
        .any(|existing| Some(existing) != owner);
    if taken {
        result.add_error(
            "user",
            &format!("User {} already has a {} record", user, kind),
            ValidationErrorCode::DuplicateValue,
        );
    }
    Ok(())
}

fn check_identity_unique(
    identity: &UserIdentity,
    owner: Option<&ActionHash>,
    result: &mut ValidationResult,
) -> ExternResult<()> {
    for user in list::<User>()? {
        if Some(&user.original) == owner {
            continue;
        }
        if user.entry.identity.id == identity.id {
            result.add_error(
                "id",
                &format!("User id {} is already registered", identity.id),
                ValidationErrorCode::DuplicateValue,
            );
        }
        if user.entry.identity.username == identity.username {
            result.add_error(
                "username",
                "A user with that username already exists",
                ValidationErrorCode::DuplicateValue,
            );
        }
    }
    Ok(())
}

// ============================================================================
// Users
// ============================================================================

/// Register an identity that doctor and patient profiles can reference
#[hdk_extern]
pub fn register_user(identity: UserIdentity) -> ExternResult<Record> {
    let mut result = identity.validate();
    check_identity_unique(&identity, None, &mut result)?;
    ensure_valid(User::KIND, result)?;

    let user = User {
        identity,
        registered_at: sys_time()?,
    };
    let (hash, record) = commit_create(user)?;

    debug!(user = %hash, "registered user");
    Ok(record)
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UpdateUserInput {
    pub original_hash: ActionHash,
    pub identity: UserIdentity,
}

/// Change a user's identity. Stored mirrors keep the old values until the
/// records holding them are saved again.
#[hdk_extern]
pub fn update_user(input: UpdateUserInput) -> ExternResult<Record> {
    let current = require::<User>(&input.original_hash)?;

    let mut result = input.identity.validate();
    check_identity_unique(&input.identity, Some(&current.original), &mut result)?;
    ensure_valid(User::KIND, result)?;

    let user = User {
        identity: input.identity,
        registered_at: current.entry.registered_at,
    };
    commit_update(&current, user)
}

#[hdk_extern]
pub fn get_user(original_hash: ActionHash) -> ExternResult<Option<Record>> {
    Ok(fetch::<User>(&original_hash)?.map(|current| current.record))
}

// ============================================================================
// Doctors
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DoctorInput {
    pub user: ActionHash,
    pub profile: DoctorProfile,
}

/// Replacement fields for an existing record
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateInput<T> {
    /// Action hash of the record's first version
    pub original_hash: ActionHash,
    pub record: T,
    pub is_active: bool,
}

pub type UpdateDoctorInput = UpdateInput<DoctorInput>;

#[hdk_extern]
pub fn create_doctor(input: DoctorInput) -> ExternResult<Record> {
    let DoctorInput { user, profile } = input;

    let mut result = profile.validate();
    check_profile_owner(&user, LinkTypes::UserToDoctor, None, Doctor::KIND, &mut result)?;
    ensure_valid(Doctor::KIND, result)?;

    let now = sys_time()?;
    let doctor = Doctor {
        user: user.clone(),
        profile,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let (hash, record) = commit_create(doctor)?;
    create_link(user, hash.clone(), LinkTypes::UserToDoctor, ())?;

    debug!(doctor = %hash, "created doctor");
    Ok(record)
}

#[hdk_extern]
pub fn update_doctor(input: UpdateDoctorInput) -> ExternResult<Record> {
    let current = require::<Doctor>(&input.original_hash)?;
    let DoctorInput { user, profile } = input.record;

    let mut result = profile.validate();
    check_profile_owner(
        &user,
        LinkTypes::UserToDoctor,
        Some(&current.original),
        Doctor::KIND,
        &mut result,
    )?;
    ensure_valid(Doctor::KIND, result)?;

    let doctor = Doctor {
        user: user.clone(),
        profile,
        is_active: input.is_active,
        created_at: current.entry.created_at,
        updated_at: sys_time()?,
    };
    let record = commit_update(&current, doctor)?;
    relink(
        Some(&current.entry.user),
        Some(&user),
        &current.original,
        LinkTypes::UserToDoctor,
    )?;

    Ok(record)
}

#[hdk_extern]
pub fn get_doctor(original_hash: ActionHash) -> ExternResult<Option<Record>> {
    Ok(fetch::<Doctor>(&original_hash)?.map(|current| current.record))
}

/// All doctors, newest first
#[hdk_extern]
pub fn get_all_doctors(_: ()) -> ExternResult<Vec<Record>> {
    let mut doctors = list::<Doctor>()?;
    doctors.sort_by(|a, b| b.entry.created_at.cmp(&a.entry.created_at));
    Ok(doctors.into_iter().map(|current| current.record).collect())
}

/// Delete a doctor. Patients and discharges lose the reference; the doctor's
/// appointments are deleted.
#[hdk_extern]
pub fn delete_doctor(original_hash: ActionHash) -> ExternResult<DeletionSummary> {
    delete_record(EntityKind::Doctor, original_hash)
}

// ============================================================================
// Patients
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PatientInput {
    pub user: ActionHash,
    pub assigned_doctor: Option<ActionHash>,
    pub profile: PatientProfile,
}

pub type UpdatePatientInput = UpdateInput<PatientInput>;

#[hdk_extern]
pub fn create_patient(input: PatientInput) -> ExternResult<Record> {
    let PatientInput {
        user,
        assigned_doctor,
        profile,
    } = input;

    let mut result = profile.validate();
    check_profile_owner(&user, LinkTypes::UserToPatient, None, Patient::KIND, &mut result)?;
    let doctor = resolve(
        assigned_doctor.as_ref(),
        ReferenceField::PatientAssignedDoctor,
        doctor_identity,
        &mut result,
    )?;
    ensure_valid(Patient::KIND, result)?;

    let mut legacy = PatientLegacy::default();
    legacy_sync()?.sync_patient(&mut legacy, doctor.as_ref());

    let now = sys_time()?;
    let patient = Patient {
        user: user.clone(),
        assigned_doctor: assigned_doctor.clone(),
        admit_date: today(now)?,
        profile,
        legacy,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let (hash, record) = commit_create(patient)?;
    create_link(user, hash.clone(), LinkTypes::UserToPatient, ())?;
    relink(None, assigned_doctor.as_ref(), &hash, LinkTypes::DoctorToPatients)?;

    debug!(patient = %hash, "created patient");
    Ok(record)
}

/// Update a patient. `admit_date` keeps its stored value.
#[hdk_extern]
pub fn update_patient(input: UpdatePatientInput) -> ExternResult<Record> {
    let current = require::<Patient>(&input.original_hash)?;
    let PatientInput {
        user,
        assigned_doctor,
        profile,
    } = input.record;

    let mut result = profile.validate();
    check_profile_owner(
        &user,
        LinkTypes::UserToPatient,
        Some(&current.original),
        Patient::KIND,
        &mut result,
    )?;
    let doctor = resolve(
        assigned_doctor.as_ref(),
        ReferenceField::PatientAssignedDoctor,
        doctor_identity,
        &mut result,
    )?;
    ensure_valid(Patient::KIND, result)?;

    let mut legacy = current.entry.legacy.clone();
    legacy_sync()?.sync_patient(&mut legacy, doctor.as_ref());

    let patient = Patient {
        user: user.clone(),
        assigned_doctor: assigned_doctor.clone(),
        admit_date: current.entry.admit_date,
        profile,
        legacy,
        is_active: input.is_active,
        created_at: current.entry.created_at,
        updated_at: sys_time()?,
    };
    let record = commit_update(&current, patient)?;
    relink(
        Some(&current.entry.user),
        Some(&user),
        &current.original,
        LinkTypes::UserToPatient,
    )?;
    relink(
        current.entry.assigned_doctor.as_ref(),
        assigned_doctor.as_ref(),
        &current.original,
        LinkTypes::DoctorToPatients,
    )?;

    Ok(record)
}

#[hdk_extern]
pub fn get_patient(original_hash: ActionHash) -> ExternResult<Option<Record>> {
    Ok(fetch::<Patient>(&original_hash)?.map(|current| current.record))
}

/// All patients, most recently admitted first
#[hdk_extern]
pub fn get_all_patients(_: ()) -> ExternResult<Vec<Record>> {
    let mut patients = list::<Patient>()?;
    patients.sort_by(|a, b| {
        b.entry
            .admit_date
            .cmp(&a.entry.admit_date)
            .then(b.entry.created_at.cmp(&a.entry.created_at))
    });
    Ok(patients.into_iter().map(|current| current.record).collect())
}

/// Delete a patient with their appointments and discharge records
#[hdk_extern]
pub fn delete_patient(original_hash: ActionHash) -> ExternResult<DeletionSummary> {
    delete_record(EntityKind::Patient, original_hash)
}

// ============================================================================
// Appointments
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AppointmentInput {
    pub patient: Option<ActionHash>,
    pub doctor: Option<ActionHash>,
    pub details: AppointmentDetails,
}

pub type UpdateAppointmentInput = UpdateInput<AppointmentInput>;

#[hdk_extern]
pub fn create_appointment(input: AppointmentInput) -> ExternResult<Record> {
    let AppointmentInput {
        patient,
        doctor,
        details,
    } = input;

    let mut result = details.validate();
    let patient_identity = resolve(
        patient.as_ref(),
        ReferenceField::AppointmentPatient,
        patient_identity,
        &mut result,
    )?;
    let doctor_identity = resolve(
        doctor.as_ref(),
        ReferenceField::AppointmentDoctor,
        doctor_identity,
        &mut result,
    )?;
    ensure_valid(Appointment::KIND, result)?;

    let mut legacy = AppointmentLegacy::default();
    legacy_sync()?.sync_appointment(
        &mut legacy,
        patient_identity.as_ref(),
        doctor_identity.as_ref(),
        &details,
    );

    let now = sys_time()?;
    let appointment = Appointment {
        patient: patient.clone(),
        doctor: doctor.clone(),
        details,
        legacy,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let (hash, record) = commit_create(appointment)?;
    relink(None, patient.as_ref(), &hash, LinkTypes::PatientToAppointments)?;
    relink(None, doctor.as_ref(), &hash, LinkTypes::DoctorToAppointments)?;

    debug!(appointment = %hash, "created appointment");
    Ok(record)
}

#[hdk_extern]
pub fn update_appointment(input: UpdateAppointmentInput) -> ExternResult<Record> {
    let current = require::<Appointment>(&input.original_hash)?;
    let AppointmentInput {
        patient,
        doctor,
        details,
    } = input.record;

    let mut result = details.validate();
    let patient_identity = resolve(
        patient.as_ref(),
        ReferenceField::AppointmentPatient,
        patient_identity,
        &mut result,
    )?;
    let doctor_identity = resolve(
        doctor.as_ref(),
        ReferenceField::AppointmentDoctor,
        doctor_identity,
        &mut result,
    )?;
    ensure_valid(Appointment::KIND, result)?;

    let mut legacy = current.entry.legacy.clone();
    legacy_sync()?.sync_appointment(
        &mut legacy,
        patient_identity.as_ref(),
        doctor_identity.as_ref(),
        &details,
    );

    let appointment = Appointment {
        patient: patient.clone(),
        doctor: doctor.clone(),
        details,
        legacy,
        is_active: input.is_active,
        created_at: current.entry.created_at,
        updated_at: sys_time()?,
    };
    let record = commit_update(&current, appointment)?;
    relink(
        current.entry.patient.as_ref(),
        patient.as_ref(),
        &current.original,
        LinkTypes::PatientToAppointments,
    )?;
    relink(
        current.entry.doctor.as_ref(),
        doctor.as_ref(),
        &current.original,
        LinkTypes::DoctorToAppointments,
    )?;

    Ok(record)
}

#[hdk_extern]
pub fn get_appointment(original_hash: ActionHash) -> ExternResult<Option<Record>> {
    Ok(fetch::<Appointment>(&original_hash)?.map(|current| current.record))
}

/// All appointments, latest appointment time first
#[hdk_extern]
pub fn get_all_appointments(_: ()) -> ExternResult<Vec<Record>> {
    let mut appointments = list::<Appointment>()?;
    appointments.sort_by(|a, b| {
        b.entry
            .details
            .appointment_date
            .cmp(&a.entry.details.appointment_date)
    });
    Ok(appointments.into_iter().map(|current| current.record).collect())
}

#[hdk_extern]
pub fn delete_appointment(original_hash: ActionHash) -> ExternResult<DeletionSummary> {
    delete_record(EntityKind::Appointment, original_hash)
}

// ============================================================================
// Discharge details
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DischargeInput {
    pub patient: Option<ActionHash>,
    pub assigned_doctor: Option<ActionHash>,
    pub stay: StayDetails,
    pub charges: Charges,
}

pub type UpdateDischargeInput = UpdateInput<DischargeInput>;

#[hdk_extern]
pub fn create_discharge(input: DischargeInput) -> ExternResult<Record> {
    let DischargeInput {
        patient,
        assigned_doctor,
        stay,
        charges,
    } = input;

    let mut result = stay.validate();
    result.merge(charges.validate());
    let patient_parts = resolve(
        patient.as_ref(),
        ReferenceField::DischargePatient,
        patient_parts,
        &mut result,
    )?;
    let doctor_identity = resolve(
        assigned_doctor.as_ref(),
        ReferenceField::DischargeAssignedDoctor,
        doctor_identity,
        &mut result,
    )?;
    ensure_valid(DischargeDetails::KIND, result)?;

    let mut legacy = DischargeLegacy::default();
    legacy_sync()?.sync_discharge(
        &mut legacy,
        snapshot(&patient_parts),
        doctor_identity.as_ref(),
        &stay,
        &charges,
    );

    let now = sys_time()?;
    let discharge = DischargeDetails {
        patient: patient.clone(),
        assigned_doctor: assigned_doctor.clone(),
        stay,
        charges,
        legacy,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let (hash, record) = commit_create(discharge)?;
    relink(None, patient.as_ref(), &hash, LinkTypes::PatientToDischarges)?;
    relink(None, assigned_doctor.as_ref(), &hash, LinkTypes::DoctorToDischarges)?;

    debug!(discharge = %hash, "created discharge");
    Ok(record)
}

#[hdk_extern]
pub fn update_discharge(input: UpdateDischargeInput) -> ExternResult<Record> {
    let current = require::<DischargeDetails>(&input.original_hash)?;
    let DischargeInput {
        patient,
        assigned_doctor,
        stay,
        charges,
    } = input.record;

    let mut result = stay.validate();
    result.merge(charges.validate());
    let patient_parts = resolve(
        patient.as_ref(),
        ReferenceField::DischargePatient,
        patient_parts,
        &mut result,
    )?;
    let doctor_identity = resolve(
        assigned_doctor.as_ref(),
        ReferenceField::DischargeAssignedDoctor,
        doctor_identity,
        &mut result,
    )?;
    ensure_valid(DischargeDetails::KIND, result)?;

    let mut legacy = current.entry.legacy.clone();
    legacy_sync()?.sync_discharge(
        &mut legacy,
        snapshot(&patient_parts),
        doctor_identity.as_ref(),
        &stay,
        &charges,
    );

    let discharge = DischargeDetails {
        patient: patient.clone(),
        assigned_doctor: assigned_doctor.clone(),
        stay,
        charges,
        legacy,
        is_active: input.is_active,
        created_at: current.entry.created_at,
        updated_at: sys_time()?,
    };
    let record = commit_update(&current, discharge)?;
    relink(
        current.entry.patient.as_ref(),
        patient.as_ref(),
        &current.original,
        LinkTypes::PatientToDischarges,
    )?;
    relink(
        current.entry.assigned_doctor.as_ref(),
        assigned_doctor.as_ref(),
        &current.original,
        LinkTypes::DoctorToDischarges,
    )?;

    Ok(record)
}

#[hdk_extern]
pub fn get_discharge(original_hash: ActionHash) -> ExternResult<Option<Record>> {
    Ok(fetch::<DischargeDetails>(&original_hash)?.map(|current| current.record))
}

/// All discharge records, latest release first
#[hdk_extern]
pub fn get_all_discharges(_: ()) -> ExternResult<Vec<Record>> {
    let mut discharges = list::<DischargeDetails>()?;
    discharges.sort_by(|a, b| b.entry.stay.release_date.cmp(&a.entry.stay.release_date));
    Ok(discharges.into_iter().map(|current| current.record).collect())
}

#[hdk_extern]
pub fn delete_discharge(original_hash: ActionHash) -> ExternResult<DeletionSummary> {
    delete_record(EntityKind::DischargeDetails, original_hash)
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TotalVerificationOutput {
    pub verification: TotalVerification,
    /// Verification rendered with the configured currency symbol
    pub display: String,
}

/// Compare a discharge's stated total with the sum of its charges
#[hdk_extern]
pub fn verify_discharge_total(original_hash: ActionHash) -> ExternResult<TotalVerificationOutput> {
    let current = require::<DischargeDetails>(&original_hash)?;
    // Anything read back from the DHT has been persisted
    let verification = TotalVerification::evaluate(true, &current.entry.charges);
    let config = hospital_config()?;

    Ok(TotalVerificationOutput {
        display: verification.render(&config.currency_symbol),
        verification,
    })
}

// ============================================================================
// Deletion
// ============================================================================

/// Records removed or detached by one delete call
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct DeletionSummary {
    /// Every removed record, the requested one last
    pub deleted: Vec<(EntityKind, ActionHash)>,
    /// Dependents whose reference was nulled
    pub nullified: Vec<(EntityKind, ActionHash)>,
}

fn reference_links(field: ReferenceField) -> LinkTypes {
    match field {
        ReferenceField::PatientAssignedDoctor => LinkTypes::DoctorToPatients,
        ReferenceField::AppointmentPatient => LinkTypes::PatientToAppointments,
        ReferenceField::AppointmentDoctor => LinkTypes::DoctorToAppointments,
        ReferenceField::DischargePatient => LinkTypes::PatientToDischarges,
        ReferenceField::DischargeAssignedDoctor => LinkTypes::DoctorToDischarges,
    }
}

fn index_of(kind: EntityKind) -> (&'static str, LinkTypes) {
    match kind {
        EntityKind::Doctor => (Doctor::ANCHOR, Doctor::ALL),
        EntityKind::Patient => (Patient::ANCHOR, Patient::ALL),
        EntityKind::Appointment => (Appointment::ANCHOR, Appointment::ALL),
        EntityKind::DischargeDetails => (DischargeDetails::ANCHOR, DischargeDetails::ALL),
    }
}

fn exists(kind: EntityKind, original: &ActionHash) -> ExternResult<bool> {
    Ok(match kind {
        EntityKind::Doctor => fetch::<Doctor>(original)?.is_some(),
        EntityKind::Patient => fetch::<Patient>(original)?.is_some(),
        EntityKind::Appointment => fetch::<Appointment>(original)?.is_some(),
        EntityKind::DischargeDetails => fetch::<DischargeDetails>(original)?.is_some(),
    })
}

/// Current value of `field` on the dependent record, if it is still live.
fn current_reference(field: ReferenceField, dependent: &ActionHash) -> ExternResult<Option<ActionHash>> {
    Ok(match field {
        ReferenceField::PatientAssignedDoctor => {
            fetch::<Patient>(dependent)?.and_then(|current| current.entry.assigned_doctor)
        }
        ReferenceField::AppointmentPatient => {
            fetch::<Appointment>(dependent)?.and_then(|current| current.entry.patient)
        }
        ReferenceField::AppointmentDoctor => {
            fetch::<Appointment>(dependent)?.and_then(|current| current.entry.doctor)
        }
        ReferenceField::DischargePatient => {
            fetch::<DischargeDetails>(dependent)?.and_then(|current| current.entry.patient)
        }
        ReferenceField::DischargeAssignedDoctor => {
            fetch::<DischargeDetails>(dependent)?.and_then(|current| current.entry.assigned_doctor)
        }
    })
}

fn delete_record(kind: EntityKind, original: ActionHash) -> ExternResult<DeletionSummary> {
    if !exists(kind, &original)? {
        warn!(entity = %kind, %original, "record not found");
        return Err(guest(format!("{} not found", kind)));
    }

    let sync = legacy_sync()?;
    let mut summary = DeletionSummary::default();
    delete_with_dependents(kind, &original, sync, &mut summary)?;

    debug!(
        entity = %kind,
        deleted = summary.deleted.len(),
        nullified = summary.nullified.len(),
        "deleted record"
    );
    Ok(summary)
}

fn delete_with_dependents(
    kind: EntityKind,
    original: &ActionHash,
    sync: LegacySync,
    summary: &mut DeletionSummary,
) -> ExternResult<()> {
    for rule in deletion::rules_for(kind) {
        let dependent_kind = rule.field.dependent();
        for dependent in live_targets(original.clone(), reference_links(rule.field))? {
            // Links can outlive a reassignment; trust the entry
            if current_reference(rule.field, &dependent)?.as_ref() != Some(original) {
                continue;
            }
            match rule.on_delete {
                OnDelete::Cascade => {
                    delete_with_dependents(dependent_kind, &dependent, sync, summary)?
                }
                OnDelete::SetNull => {
                    clear_reference(rule.field, &dependent, sync)?;
                    unlink(original.clone(), &dependent, reference_links(rule.field))?;
                    summary.nullified.push((dependent_kind, dependent));
                }
            }
        }
    }

    let (anchor, all) = index_of(kind);
    unlink(anchor_hash(anchor)?, original, all)?;
    delete_entry(original.clone())?;
    summary.deleted.push((kind, original.clone()));
    Ok(())
}

/// Null `field` on the dependent record and re-sync its mirrors.
fn clear_reference(field: ReferenceField, dependent: &ActionHash, sync: LegacySync) -> ExternResult<()> {
    match field {
        ReferenceField::PatientAssignedDoctor => {
            let current = require::<Patient>(dependent)?;
            let mut patient = current.entry.clone();
            patient.assigned_doctor = None;
            sync.sync_patient(&mut patient.legacy, None);
            patient.updated_at = sys_time()?;
            commit_update(&current, patient)?;
        }
        ReferenceField::AppointmentPatient | ReferenceField::AppointmentDoctor => {
            let current = require::<Appointment>(dependent)?;
            let mut appointment = current.entry.clone();
            if field == ReferenceField::AppointmentPatient {
                appointment.patient = None;
            } else {
                appointment.doctor = None;
            }
            let patient = lookup(appointment.patient.as_ref(), patient_identity)?;
            let doctor = lookup(appointment.doctor.as_ref(), doctor_identity)?;
            sync.sync_appointment(
                &mut appointment.legacy,
                patient.as_ref(),
                doctor.as_ref(),
                &appointment.details,
            );
            appointment.updated_at = sys_time()?;
            commit_update(&current, appointment)?;
        }
        ReferenceField::DischargePatient | ReferenceField::DischargeAssignedDoctor => {
            let current = require::<DischargeDetails>(dependent)?;
            let mut discharge = current.entry.clone();
            if field == ReferenceField::DischargePatient {
                discharge.patient = None;
            } else {
                discharge.assigned_doctor = None;
            }
            let patient = lookup(discharge.patient.as_ref(), patient_parts)?;
            let doctor = lookup(discharge.assigned_doctor.as_ref(), doctor_identity)?;
            sync.sync_discharge(
                &mut discharge.legacy,
                snapshot(&patient),
                doctor.as_ref(),
                &discharge.stay,
                &discharge.charges,
            );
            discharge.updated_at = sys_time()?;
            commit_update(&current, discharge)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospital_core::ClearedReferencePolicy;

    #[derive(Serialize, Deserialize, SerializedBytes, Debug)]
    struct RawProperties {
        cleared_reference: String,
    }

    fn raw(cleared_reference: &str) -> SerializedBytes {
        SerializedBytes::try_from(RawProperties {
            cleared_reference: cleared_reference.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_absent_properties_use_defaults() {
        let nil = SerializedBytes::try_from(()).unwrap();
        assert_eq!(config_from_properties(nil).unwrap(), HospitalConfig::default());
    }

    #[test]
    fn test_configured_policy_is_read() {
        let config = config_from_properties(raw("retain")).unwrap();
        assert_eq!(config.cleared_reference, ClearedReferencePolicy::Retain);
        assert_eq!(config.currency_symbol, "$");
    }

    #[test]
    fn test_misspelled_policy_is_rejected() {
        assert!(config_from_properties(raw("retian")).is_err());
    }

    #[test]
    fn test_empty_currency_symbol_is_rejected() {
        let properties = SerializedBytes::try_from(HospitalProperties(HospitalConfig {
            currency_symbol: String::new(),
            ..Default::default()
        }))
        .unwrap();
        assert!(config_from_properties(properties).is_err());
    }
}
