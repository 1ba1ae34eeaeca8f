use crate::access::is_valid_email;
use crate::constants::{
    DIAGNOSIS_FIELD, DOCTOR_FIELD, PATIENT_ID_FIELD, PRESCRIPTION_FIELD, VISIT_NOTE_FIELD,
};
use crate::error::{LedgerError, Result};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// One medical-record entry. Fields are private so a record cannot change
/// after it has been created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTransaction")]
pub struct Transaction {
    patient_id: String,
    doctor: String,
    diagnosis: String,
    prescription: String,
    visit_note: String,
    created_at: Timestamp,
}

impl Transaction {
    pub fn new(
        patient_id: &str,
        doctor: &str,
        diagnosis: &str,
        prescription: &str,
        visit_note: &str,
    ) -> Self {
        Self::new_at(
            patient_id,
            doctor,
            diagnosis,
            prescription,
            visit_note,
            Timestamp::now(),
        )
    }

    /// Every text field is cut at its first NUL, has the separators `;`, `/`
    /// and `&` replaced with `_`, and is then cut to fit its fixed-width slot
    /// (one byte is kept for the terminator), never splitting a UTF-8
    /// character.
    pub fn new_at(
        patient_id: &str,
        doctor: &str,
        diagnosis: &str,
        prescription: &str,
        visit_note: &str,
        created_at: Timestamp,
    ) -> Self {
        Self {
            patient_id: bounded(patient_id, PATIENT_ID_FIELD),
            doctor: bounded(doctor, DOCTOR_FIELD),
            diagnosis: bounded(diagnosis, DIAGNOSIS_FIELD),
            prescription: bounded(prescription, PRESCRIPTION_FIELD),
            visit_note: bounded(visit_note, VISIT_NOTE_FIELD),
            created_at,
        }
    }

    /// Sentinel record sealed into every genesis block.
    pub fn genesis(created_at: Timestamp) -> Self {
        Self::new_at(
            "GENESIS",
            "system@blockmed.local",
            "Genesis Block",
            "No Prescription",
            "Initial Block in the chain",
            created_at,
        )
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn doctor(&self) -> &str {
        &self.doctor
    }

    pub fn diagnosis(&self) -> &str {
        &self.diagnosis
    }

    pub fn prescription(&self) -> &str {
        &self.prescription
    }

    pub fn visit_note(&self) -> &str {
        &self.visit_note
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Stable text rendering that feeds the block hash.
    pub fn canonical_text(&self) -> String {
        format!(
            "Patient ID: {}/Doctor: {}/Diagnosis: {}/Prescription: {}/Visit Note: {}/Timestamp: {}",
            self.patient_id,
            self.doctor,
            self.diagnosis,
            self.prescription,
            self.visit_note,
            self.created_at
        )
    }

    pub fn validate_required(&self) -> Result<()> {
        if self.patient_id.trim().is_empty() {
            return Err(LedgerError::InvalidRecord("patient id is empty".into()));
        }
        if !is_valid_email(&self.doctor) {
            return Err(LedgerError::InvalidIdentity(self.doctor.clone()));
        }
        Ok(())
    }
}

/// Deserialization goes through the bounding constructor.
#[derive(Deserialize)]
struct RawTransaction {
    patient_id: String,
    doctor: String,
    diagnosis: String,
    prescription: String,
    visit_note: String,
    created_at: Timestamp,
}

impl From<RawTransaction> for Transaction {
    fn from(raw: RawTransaction) -> Self {
        Self::new_at(
            &raw.patient_id,
            &raw.doctor,
            &raw.diagnosis,
            &raw.prescription,
            &raw.visit_note,
            raw.created_at,
        )
    }
}

const SEPARATORS: [char; 3] = [';', '/', '&'];

fn bounded(s: &str, field_width: usize) -> String {
    let s = s.split('\0').next().unwrap_or_default();
    let max = field_width - 1;
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].replace(SEPARATORS, "_")
}
