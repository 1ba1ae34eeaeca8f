//! Ledger file format, version 1. Every field is written one by one at a
//! fixed width, so the layout does not depend on struct padding or on the
//! host's byte order.
//!
//! ```text
//! header  magic "BMLD" (4) | version u16 LE (2) | block count i32 LE (4)
//! block   index i32 LE (4)
//!         timestamp (20)
//!         patient_id (50) | doctor (100) | diagnosis (500)
//!         prescription (500) | visit_note (1000) | created_at (20)
//!         nonce u64 LE (8)
//!         previous hash, 64 hex chars (65)
//!         hash, 64 hex chars (65)
//! ```
//!
//! Text fields are UTF-8, NUL-terminated and NUL-padded to their width.

use blockmed_core::constants::{
    DIAGNOSIS_FIELD, DOCTOR_FIELD, HASH_FIELD, PATIENT_ID_FIELD, PRESCRIPTION_FIELD,
    TIMESTAMP_FIELD, VISIT_NOTE_FIELD,
};
use blockmed_core::{hash, Block, Hash, Ledger, LedgerError, Timestamp, Transaction};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use thiserror::Error;

pub const MAGIC: [u8; 4] = *b"BMLD";
pub const FORMAT_VERSION: u16 = 1;
pub const HEADER_SIZE: u64 = 4 + 2 + 4;
pub const TRANSACTION_SIZE: u64 = (PATIENT_ID_FIELD
    + DOCTOR_FIELD
    + DIAGNOSIS_FIELD
    + PRESCRIPTION_FIELD
    + VISIT_NOTE_FIELD
    + TIMESTAMP_FIELD) as u64;
pub const BLOCK_RECORD_SIZE: u64 =
    4 + TIMESTAMP_FIELD as u64 + TRANSACTION_SIZE + 8 + 2 * HASH_FIELD as u64;
/// Upper bound on the block count a file may declare.
pub const MAX_LEDGER_BLOCKS: i32 = 1_000_000;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not a ledger file (bad magic {0:02x?})")]
    BadMagic([u8; 4]),
    #[error("unsupported ledger format version {0}")]
    UnsupportedVersion(u16),
    #[error("implausible block count {0}")]
    ImplausibleLength(i32),
    #[error("header declares {count} blocks but {available} bytes of block data follow")]
    LengthMismatch { count: i32, available: u64 },
    #[error("truncated header field {0}")]
    TruncatedHeader(&'static str),
    #[error("truncated {field} in block {block}")]
    Truncated { block: u32, field: &'static str },
    #[error("corrupt {field} in block {block}: {reason}")]
    Corrupt {
        block: u32,
        field: &'static str,
        reason: String,
    },
    #[error("{field} of block {block} does not fit its {width}-byte slot")]
    FieldTooLong {
        block: u32,
        field: &'static str,
        width: usize,
    },
    #[error("block {block} could not be linked: {source}")]
    Ledger {
        block: u32,
        #[source]
        source: LedgerError,
    },
    #[error("checksum mismatch: expected {expected}, file hashes to {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub fn encode(ledger: &Ledger) -> Result<Vec<u8>> {
    let size = HEADER_SIZE + BLOCK_RECORD_SIZE * ledger.len() as u64;
    let mut out = Vec::with_capacity(size as usize);
    write_ledger(&mut out, ledger)?;
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<Ledger> {
    let mut rdr = bytes;
    read_ledger(&mut rdr, bytes.len() as u64)
}

pub fn write_ledger<W: Write>(w: &mut W, ledger: &Ledger) -> Result<()> {
    let count = i32::try_from(ledger.len())
        .ok()
        .filter(|c| *c <= MAX_LEDGER_BLOCKS)
        .ok_or(StorageError::ImplausibleLength(i32::MAX))?;
    w.write_all(&MAGIC)?;
    w.write_u16::<LittleEndian>(FORMAT_VERSION)?;
    w.write_i32::<LittleEndian>(count)?;
    for block in ledger {
        write_block(w, block)?;
    }
    Ok(())
}

fn write_block<W: Write>(w: &mut W, block: &Block) -> Result<()> {
    let at = block.index;
    let tx = &block.transaction;
    w.write_i32::<LittleEndian>(block.index as i32)?;
    write_text(w, at, "timestamp", block.timestamp.as_str(), TIMESTAMP_FIELD)?;
    write_text(w, at, "patient_id", tx.patient_id(), PATIENT_ID_FIELD)?;
    write_text(w, at, "doctor", tx.doctor(), DOCTOR_FIELD)?;
    write_text(w, at, "diagnosis", tx.diagnosis(), DIAGNOSIS_FIELD)?;
    write_text(w, at, "prescription", tx.prescription(), PRESCRIPTION_FIELD)?;
    write_text(w, at, "visit_note", tx.visit_note(), VISIT_NOTE_FIELD)?;
    write_text(w, at, "created_at", tx.created_at().as_str(), TIMESTAMP_FIELD)?;
    w.write_u64::<LittleEndian>(block.nonce)?;
    write_text(w, at, "previous_hash", &block.previous_hash_hex(), HASH_FIELD)?;
    write_text(w, at, "hash", &block.hash_hex(), HASH_FIELD)?;
    Ok(())
}

fn write_text<W: Write>(
    w: &mut W,
    block: u32,
    field: &'static str,
    text: &str,
    width: usize,
) -> Result<()> {
    let bytes = text.as_bytes();
    if bytes.contains(&0) {
        return Err(StorageError::Corrupt {
            block,
            field,
            reason: "embedded NUL byte".into(),
        });
    }
    if bytes.len() >= width {
        return Err(StorageError::FieldTooLong {
            block,
            field,
            width,
        });
    }
    let mut slot = vec![0u8; width];
    slot[..bytes.len()].copy_from_slice(bytes);
    w.write_all(&slot)?;
    Ok(())
}

/// Reads a whole ledger. `byte_len` is the total size of the input and is
/// checked against the declared block count before anything is allocated.
pub fn read_ledger<R: Read>(r: &mut R, byte_len: u64) -> Result<Ledger> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)
        .map_err(|e| header_error(e, "magic"))?;
    if magic != MAGIC {
        return Err(StorageError::BadMagic(magic));
    }
    let version = r
        .read_u16::<LittleEndian>()
        .map_err(|e| header_error(e, "version"))?;
    if version != FORMAT_VERSION {
        return Err(StorageError::UnsupportedVersion(version));
    }
    let count = r
        .read_i32::<LittleEndian>()
        .map_err(|e| header_error(e, "block count"))?;
    if !(1..=MAX_LEDGER_BLOCKS).contains(&count) {
        return Err(StorageError::ImplausibleLength(count));
    }
    let available = byte_len.saturating_sub(HEADER_SIZE);
    if available != count as u64 * BLOCK_RECORD_SIZE {
        return Err(StorageError::LengthMismatch { count, available });
    }

    let genesis = read_block(r, 0)?;
    if genesis.index != 0 {
        return Err(StorageError::Ledger {
            block: 0,
            source: LedgerError::IndexOutOfSequence {
                expected: 0,
                found: genesis.index,
            },
        });
    }
    let mut ledger = Ledger::with_genesis(genesis);
    for position in 1..count as u32 {
        let block = read_block(r, position)?;
        ledger
            .append(block)
            .map_err(|source| StorageError::Ledger {
                block: position,
                source,
            })?;
    }
    Ok(ledger)
}

/// `position` is the record's place in the file; it labels errors until the
/// stored index has been read.
fn read_block<R: Read>(r: &mut R, position: u32) -> Result<Block> {
    let raw_index = r
        .read_i32::<LittleEndian>()
        .map_err(|e| field_error(e, position, "index"))?;
    let index = u32::try_from(raw_index).map_err(|_| StorageError::Corrupt {
        block: position,
        field: "index",
        reason: format!("negative index {raw_index}"),
    })?;
    let timestamp = read_timestamp(r, index, "timestamp")?;
    let patient_id = read_text(r, index, "patient_id", PATIENT_ID_FIELD)?;
    let doctor = read_text(r, index, "doctor", DOCTOR_FIELD)?;
    let diagnosis = read_text(r, index, "diagnosis", DIAGNOSIS_FIELD)?;
    let prescription = read_text(r, index, "prescription", PRESCRIPTION_FIELD)?;
    let visit_note = read_text(r, index, "visit_note", VISIT_NOTE_FIELD)?;
    let created_at = read_timestamp(r, index, "created_at")?;
    let nonce = r
        .read_u64::<LittleEndian>()
        .map_err(|e| field_error(e, index, "nonce"))?;
    let previous_hash = read_hash(r, index, "previous_hash")?;
    let hash = read_hash(r, index, "hash")?;

    let transaction = Transaction::new_at(
        &patient_id,
        &doctor,
        &diagnosis,
        &prescription,
        &visit_note,
        created_at,
    );
    Ok(Block {
        index,
        timestamp,
        transaction,
        nonce,
        previous_hash,
        hash,
    })
}

fn read_text<R: Read>(r: &mut R, block: u32, field: &'static str, width: usize) -> Result<String> {
    let mut slot = vec![0u8; width];
    r.read_exact(&mut slot)
        .map_err(|e| field_error(e, block, field))?;
    let end = slot
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| StorageError::Corrupt {
            block,
            field,
            reason: "missing terminator".into(),
        })?;
    slot.truncate(end);
    String::from_utf8(slot).map_err(|e| StorageError::Corrupt {
        block,
        field,
        reason: e.to_string(),
    })
}

fn read_timestamp<R: Read>(r: &mut R, block: u32, field: &'static str) -> Result<Timestamp> {
    let text = read_text(r, block, field, TIMESTAMP_FIELD)?;
    Timestamp::parse(&text).map_err(|e| StorageError::Corrupt {
        block,
        field,
        reason: e.to_string(),
    })
}

fn read_hash<R: Read>(r: &mut R, block: u32, field: &'static str) -> Result<Hash> {
    let text = read_text(r, block, field, HASH_FIELD)?;
    hash::parse_hex(&text).map_err(|e| StorageError::Corrupt {
        block,
        field,
        reason: e.to_string(),
    })
}

fn header_error(e: io::Error, field: &'static str) -> StorageError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        StorageError::TruncatedHeader(field)
    } else {
        StorageError::Io(e)
    }
}

fn field_error(e: io::Error, block: u32, field: &'static str) -> StorageError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        StorageError::Truncated { block, field }
    } else {
        StorageError::Io(e)
    }
}
