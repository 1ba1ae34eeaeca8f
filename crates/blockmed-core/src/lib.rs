//! Core of the BlockMed ledger: medical-record transactions sealed into
//! hash-linked blocks by a leading-zero proof-of-work search.

pub mod access;
pub mod block;
pub mod chain;
pub mod constants;
pub mod error;
pub mod events;
pub mod hash;
pub mod pow;
pub mod registry;
pub mod time;
pub mod transaction;
pub mod validation;

pub type Hash = [u8; constants::HASH_SIZE];

pub use access::{DomainRoles, IdentityProvider, Role};
pub use block::Block;
pub use chain::{Ledger, LedgerStore};
pub use error::{LedgerError, Result};
pub use events::{EventSink, MemorySink, NullSink, Severity, TracingSink};
pub use pow::{CancelToken, Difficulty, MineOptions, Miner};
pub use registry::{RecordInput, Registry};
pub use time::Timestamp;
pub use transaction::Transaction;
pub use validation::{ValidationError, ValidationReport};
