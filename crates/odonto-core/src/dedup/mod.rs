//! Duplicate patient detection and merge.
//!
//! Detection walks the patient list in creation order and groups likely
//! duplicates with greedy single-link clustering: a candidate joins a group
//! when it matches ANY member already in it, and every grouped patient is
//! marked processed so it can seed no further group. This is deliberately
//! not a transitive closure (if A~B and B~C but not A~C, C still lands in
//! A's group through B).
//!
//! Merge repoints every owned relation (appointments, medical records,
//! leads) from the duplicates to the chosen main record, backfills contact
//! fields the main record lacks, and deletes the duplicates, all inside a
//! single transaction.

use std::collections::HashSet;

use strsim::levenshtein;
use thiserror::Error;

use crate::db::{self, Database, DbError};
use crate::models::{Patient, PatientWithCounts};

/// Default full-name similarity threshold, in percent.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 80.0;

/// Last-name floor for the name-similarity criterion.
const LAST_NAME_THRESHOLD: f64 = 85.0;
/// First-name floor for the name-similarity criterion. Looser than the
/// last-name floor because first names carry nicknames and short forms.
const FIRST_NAME_THRESHOLD: f64 = 70.0;

/// Merge errors.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("A merge group needs the main patient and at least one duplicate")]
    GroupTooSmall,

    #[error("Main patient {0} is not part of the supplied group")]
    MainNotInGroup(String),

    #[error("Main patient {0} not found")]
    MainNotFound(String),

    #[error("Duplicate patient {0} not found")]
    DuplicateNotFound(String),
}

pub type MergeResult<T> = Result<T, MergeError>;

/// A group of patients judged duplicates of one another, with the record
/// the scoring picked as the one to keep.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub patients: Vec<PatientWithCounts>,
    pub main_patient_id: String,
}

/// What a merge did, or would do under `dry_run`.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSummary {
    pub main_patient_id: String,
    pub merged_count: usize,
    pub appointments_moved: usize,
    pub medical_records_moved: usize,
    pub leads_moved: usize,
    /// Field names copied onto the main record because it lacked them.
    pub backfilled_fields: Vec<String>,
    pub dry_run: bool,
}

/// Name similarity in percent: `(longer - levenshtein) / longer * 100`.
///
/// Two empty strings are identical (100). Case-sensitive; callers fold
/// before comparing.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longer = a.chars().count().max(b.chars().count());
    if longer == 0 {
        return 100.0;
    }
    let distance = levenshtein(a, b);
    (longer as f64 - distance as f64) / longer as f64 * 100.0
}

fn folded(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Whether two patients look like the same person.
///
/// Hard identifiers (national id, phone, email) match exactly or not at
/// all; names go through the similarity metric with per-part floors so a
/// shared common first name alone cannot clear the bar.
fn are_duplicates(a: &Patient, b: &Patient, threshold: f64) -> bool {
    if let (Some(id_a), Some(id_b)) = (&a.national_id, &b.national_id) {
        if id_a == id_b {
            return true;
        }
    }
    if let (Some(phone_a), Some(phone_b)) = (&a.phone, &b.phone) {
        if phone_a == phone_b {
            return true;
        }
    }
    if let (Some(email_a), Some(email_b)) = (&a.email, &b.email) {
        if email_a == email_b {
            return true;
        }
    }

    let full_a = folded(&a.full_name());
    let full_b = folded(&b.full_name());
    if full_a == full_b {
        return true;
    }

    similarity(&full_a, &full_b) >= threshold
        && similarity(&folded(&a.last_name), &folded(&b.last_name)) >= LAST_NAME_THRESHOLD
        && similarity(&folded(&a.first_name), &folded(&b.first_name)) >= FIRST_NAME_THRESHOLD
}

/// Completeness score used to pick the main record of a group. The
/// fractional term is a recency tie-breaker, scaled well below the
/// smallest field weight so it only ever decides ties.
fn completeness_score(patient: &Patient) -> f64 {
    let mut score = 0.0;
    if patient.national_id.is_some() {
        score += 10.0;
    }
    if patient.phone.is_some() {
        score += 5.0;
    }
    if patient.email.is_some() {
        score += 5.0;
    }
    if patient.address.is_some() {
        score += 3.0;
    }
    if patient.birth_date.is_some() {
        score += 2.0;
    }
    score + patient.created_at.timestamp() as f64 * 1e-10
}

fn select_main<'p>(patients: &[&'p Patient]) -> &'p Patient {
    let mut best = patients[0];
    let mut best_score = completeness_score(best);
    for &candidate in &patients[1..] {
        let score = completeness_score(candidate);
        if score > best_score {
            best = candidate;
            best_score = score;
        }
    }
    best
}

/// Duplicate scanner over the patient set.
pub struct DuplicateResolver<'a> {
    db: &'a Database,
}

impl<'a> DuplicateResolver<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Group likely duplicates. Deterministic for an unchanged patient set:
    /// the scan order is the stable creation order from the store.
    pub fn find_duplicate_groups(&self, threshold: f64) -> MergeResult<Vec<DuplicateGroup>> {
        let patients = self.db.list_patients()?;
        let mut processed: HashSet<&str> = HashSet::new();
        let mut groups = Vec::new();

        for (i, seed) in patients.iter().enumerate() {
            if processed.contains(seed.id.as_str()) {
                continue;
            }
            processed.insert(&seed.id);

            let mut members: Vec<&Patient> = vec![seed];
            for candidate in &patients[i + 1..] {
                if processed.contains(candidate.id.as_str()) {
                    continue;
                }
                if members
                    .iter()
                    .any(|member| are_duplicates(member, candidate, threshold))
                {
                    processed.insert(&candidate.id);
                    members.push(candidate);
                }
            }

            if members.len() < 2 {
                continue;
            }

            let main_patient_id = select_main(&members).id.clone();

            let mut with_counts = Vec::with_capacity(members.len());
            for member in members {
                with_counts.push(self.db.patient_with_counts(member.clone())?);
            }
            groups.push(DuplicateGroup {
                patients: with_counts,
                main_patient_id,
            });
        }

        Ok(groups)
    }
}

/// Copy every backfillable field the main record lacks from the duplicate,
/// and fold the duplicate's notes in with a provenance marker. Returns the
/// names of the fields that were filled.
fn absorb(main: &mut Patient, duplicate: &Patient) -> Vec<String> {
    let mut filled = Vec::new();

    if main.national_id.is_none() && duplicate.national_id.is_some() {
        main.national_id = duplicate.national_id.clone();
        filled.push("national_id".to_string());
    }
    if main.phone.is_none() && duplicate.phone.is_some() {
        main.phone = duplicate.phone.clone();
        filled.push("phone".to_string());
    }
    if main.email.is_none() && duplicate.email.is_some() {
        main.email = duplicate.email.clone();
        filled.push("email".to_string());
    }
    if main.address.is_none() && duplicate.address.is_some() {
        main.address = duplicate.address.clone();
        filled.push("address".to_string());
    }
    if main.birth_date.is_none() && duplicate.birth_date.is_some() {
        main.birth_date = duplicate.birth_date.clone();
        filled.push("birth_date".to_string());
    }

    if let Some(duplicate_notes) = &duplicate.notes {
        let marker = format!("--- Notes from merged duplicate (ID: {}) ---", duplicate.id);
        main.notes = Some(match &main.notes {
            Some(existing) => format!("{}\n\n{}\n{}", existing, marker, duplicate_notes),
            None => format!("{}\n{}", marker, duplicate_notes),
        });
    }

    filled
}

/// Merge a duplicate group into its main patient.
///
/// `group_ids` is the whole group, main included. Membership and the main
/// record's existence are checked before any write; each duplicate is then
/// absorbed, repointed, and deleted inside one transaction, so a missing
/// duplicate mid-merge rolls the whole thing back.
pub fn merge_patients(
    db: &mut Database,
    main_patient_id: &str,
    group_ids: &[String],
    dry_run: bool,
) -> MergeResult<MergeSummary> {
    if group_ids.len() < 2 {
        return Err(MergeError::GroupTooSmall);
    }
    if !group_ids.iter().any(|id| id == main_patient_id) {
        return Err(MergeError::MainNotInGroup(main_patient_id.to_string()));
    }
    let main = db
        .get_patient(main_patient_id)?
        .ok_or_else(|| MergeError::MainNotFound(main_patient_id.to_string()))?;

    let duplicate_ids: Vec<&String> = group_ids.iter().filter(|id| *id != main_patient_id).collect();

    let mut summary = MergeSummary {
        main_patient_id: main_patient_id.to_string(),
        merged_count: duplicate_ids.len(),
        appointments_moved: 0,
        medical_records_moved: 0,
        leads_moved: 0,
        backfilled_fields: Vec::new(),
        dry_run,
    };

    if dry_run {
        let mut projected = main;
        for duplicate_id in &duplicate_ids {
            let duplicate = db
                .get_patient(duplicate_id)?
                .ok_or_else(|| MergeError::DuplicateNotFound((*duplicate_id).clone()))?;
            summary
                .backfilled_fields
                .extend(absorb(&mut projected, &duplicate));
            let counts = db.patient_with_counts(duplicate)?;
            summary.appointments_moved += counts.appointments_count as usize;
            summary.medical_records_moved += counts.medical_records_count as usize;
            summary.leads_moved += db.list_leads_for_patient(duplicate_id)?.len();
        }
        return Ok(summary);
    }

    let tx = db.transaction()?;
    let mut merged_main = main;
    for duplicate_id in &duplicate_ids {
        let duplicate = db::get_patient_row(&tx, duplicate_id)?
            .ok_or_else(|| MergeError::DuplicateNotFound((*duplicate_id).clone()))?;

        summary
            .backfilled_fields
            .extend(absorb(&mut merged_main, &duplicate));
        summary.appointments_moved += db::repoint_appointments(&tx, duplicate_id, main_patient_id)?;
        summary.medical_records_moved +=
            db::repoint_medical_records(&tx, duplicate_id, main_patient_id)?;
        summary.leads_moved += db::repoint_leads(&tx, duplicate_id, main_patient_id)?;
        db::delete_patient_row(&tx, duplicate_id)?;
    }
    db::update_patient_row(&tx, &merged_main)?;
    tx.commit().map_err(DbError::from)?;

    tracing::debug!(
        main = main_patient_id,
        merged = summary.merged_count,
        appointments = summary.appointments_moved,
        records = summary.medical_records_moved,
        leads = summary.leads_moved,
        "merged duplicate patients"
    );

    Ok(summary)
}
