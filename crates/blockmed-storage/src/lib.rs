//! On-disk persistence for the BlockMed ledger.

pub mod codec;
pub mod file_store;
pub mod integrity;

pub use codec::{decode, encode, StorageError};
pub use file_store::FileStore;
