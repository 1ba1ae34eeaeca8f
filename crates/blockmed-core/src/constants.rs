pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Persisted widths of the text fields, terminator included.
pub const TIMESTAMP_FIELD: usize = 20;
pub const PATIENT_ID_FIELD: usize = 50;
pub const DOCTOR_FIELD: usize = 100;
pub const DIAGNOSIS_FIELD: usize = 500;
pub const PRESCRIPTION_FIELD: usize = 500;
pub const VISIT_NOTE_FIELD: usize = 1000;
pub const HASH_FIELD: usize = HASH_HEX_SIZE + 1;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 8;
pub const DEFAULT_DIFFICULTY: u8 = 4;
pub const DEFAULT_MAX_ATTEMPTS: u64 = 50_000_000;
pub const MINING_PROGRESS_INTERVAL: u64 = 100_000;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
