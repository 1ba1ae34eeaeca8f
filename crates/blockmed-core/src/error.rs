use crate::access::Role;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("difficulty {0} is outside the supported range 1..=8")]
    InvalidDifficulty(u32),
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("invalid identity {0:?}")]
    InvalidIdentity(String),
    #[error("block index {found} does not extend a ledger of length {expected}")]
    IndexOutOfSequence { expected: u32, found: u32 },
    #[error("ledger is full")]
    LedgerFull,
    #[error("{actor} ({role}) may not {operation}")]
    PermissionDenied {
        actor: String,
        role: Role,
        operation: &'static str,
    },
    #[error("no pending record to mine")]
    NothingPending,
    #[error("mining gave up after {attempts} attempts")]
    MiningExhausted { attempts: u64 },
    #[error("mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },
    #[error("mining timed out after {attempts} attempts")]
    MiningTimedOut { attempts: u64 },
    #[error("ledger validation failed: {0}")]
    Validation(#[from] crate::validation::ValidationError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
