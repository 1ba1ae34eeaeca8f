//! Read-only integrity walk over a ledger.
//!
//! Each block is checked in order for:
//! - its position (`index` equals its offset in the ledger),
//! - its link (genesis carries the all-zero sentinel, every other block
//!   references the stored hash of its predecessor),
//! - its hash (recomputing from the current fields yields the stored value).
//!
//! The first failing block ends the walk. Nothing is written back.

use crate::block::Block;
use crate::hash::{self, GENESIS_PREVIOUS_HASH};
use crate::Hash;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("block at position {position} carries index {found}")]
    IndexMismatch { position: u32, found: u32 },
    #[error("genesis block does not carry the zero previous-hash sentinel")]
    BadGenesisLink,
    #[error("block {index} links to {} but its predecessor hashes to {}", short(.found), short(.expected))]
    BrokenLink {
        index: u32,
        expected: Hash,
        found: Hash,
    },
    #[error("block {index} was altered: stored {} but fields hash to {}", short(.stored), short(.computed))]
    HashMismatch {
        index: u32,
        stored: Hash,
        computed: Hash,
    },
}

impl ValidationError {
    /// Index of the block that failed.
    pub fn index(&self) -> u32 {
        match self {
            ValidationError::IndexMismatch { position, .. } => *position,
            ValidationError::BadGenesisLink => 0,
            ValidationError::BrokenLink { index, .. } => *index,
            ValidationError::HashMismatch { index, .. } => *index,
        }
    }

    pub fn invariant(&self) -> &'static str {
        match self {
            ValidationError::IndexMismatch { .. } => "index sequence",
            ValidationError::BadGenesisLink | ValidationError::BrokenLink { .. } => "hash linkage",
            ValidationError::HashMismatch { .. } => "hash correctness",
        }
    }
}

fn short(h: &Hash) -> String {
    let hex = hash::to_hex(h);
    format!("{}...", &hex[..16])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub blocks_checked: u32,
    pub outcome: Result<(), ValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(()) => write!(f, "all {} blocks valid", self.blocks_checked),
            Err(e) => write!(
                f,
                "{} violated at block {} after {} blocks: {}",
                e.invariant(),
                e.index(),
                self.blocks_checked,
                e
            ),
        }
    }
}

pub fn validate_blocks(blocks: &[Block]) -> ValidationReport {
    let mut previous: Option<&Block> = None;
    for (position, block) in blocks.iter().enumerate() {
        if let Err(e) = check_block(position as u32, block, previous) {
            return ValidationReport {
                blocks_checked: position as u32,
                outcome: Err(e),
            };
        }
        previous = Some(block);
    }
    ValidationReport {
        blocks_checked: blocks.len() as u32,
        outcome: Ok(()),
    }
}

fn check_block(
    position: u32,
    block: &Block,
    previous: Option<&Block>,
) -> Result<(), ValidationError> {
    if block.index != position {
        return Err(ValidationError::IndexMismatch {
            position,
            found: block.index,
        });
    }
    match previous {
        None if block.previous_hash != GENESIS_PREVIOUS_HASH => {
            return Err(ValidationError::BadGenesisLink)
        }
        Some(prev) if block.previous_hash != prev.hash => {
            return Err(ValidationError::BrokenLink {
                index: block.index,
                expected: prev.hash,
                found: block.previous_hash,
            })
        }
        _ => {}
    }
    let computed = block.compute_hash();
    if computed != block.hash {
        return Err(ValidationError::HashMismatch {
            index: block.index,
            stored: block.hash,
            computed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::{Difficulty, Miner};
    use crate::time::Timestamp;
    use crate::transaction::Transaction;

    fn ts() -> Timestamp {
        Timestamp::parse("2024-05-01 10:00:00").unwrap()
    }

    fn chain_of(n: u32) -> Vec<Block> {
        let miner = Miner::new(Difficulty::new(1).unwrap());
        let mut blocks = vec![Block::genesis_at(ts())];
        for i in 1..n {
            let tx = Transaction::new_at(
                &format!("P-{i:03}"),
                "dr.who@blockmed.org",
                "Flu",
                "Rest",
                "",
                ts(),
            );
            let prev = blocks.last().unwrap().hash;
            blocks.push(miner.mine(Block::new_at(i, tx, prev, ts())).unwrap());
        }
        blocks
    }

    #[test]
    fn fresh_chain_is_valid() {
        let report = validate_blocks(&chain_of(5));
        assert!(report.is_valid());
        assert_eq!(report.blocks_checked, 5);
    }

    #[test]
    fn tampered_field_fails_at_that_block() {
        let mut blocks = chain_of(4);
        blocks[1].transaction =
            Transaction::new_at("P-001", "dr.who@blockmed.org", "Fku", "Rest", "", ts());
        let report = validate_blocks(&blocks);
        let err = report.outcome.unwrap_err();
        assert_eq!(err.index(), 1);
        assert!(matches!(err, ValidationError::HashMismatch { .. }));
        assert_eq!(report.blocks_checked, 1);
    }

    #[test]
    fn tampered_tail_is_still_checked() {
        let mut blocks = chain_of(3);
        blocks[2].nonce += 1;
        let err = validate_blocks(&blocks).outcome.unwrap_err();
        assert_eq!(err.index(), 2);
        assert_eq!(err.invariant(), "hash correctness");
    }

    #[test]
    fn rewired_link_fails_at_splice_point() {
        let mut blocks = chain_of(4);
        blocks[2].previous_hash = [0x42; 32];
        let err = validate_blocks(&blocks).outcome.unwrap_err();
        assert_eq!(err.index(), 2);
        assert!(matches!(err, ValidationError::BrokenLink { .. }));
    }

    #[test]
    fn genesis_sentinel_is_enforced() {
        let mut blocks = chain_of(2);
        blocks[0].previous_hash = [1u8; 32];
        blocks[0].recompute_hash();
        assert_eq!(
            validate_blocks(&blocks).outcome,
            Err(ValidationError::BadGenesisLink)
        );
    }

    #[test]
    fn index_gap_is_reported() {
        let mut blocks = chain_of(3);
        blocks[2].index = 7;
        let err = validate_blocks(&blocks).outcome.unwrap_err();
        assert_eq!(err, ValidationError::IndexMismatch { position: 2, found: 7 });
        assert_eq!(err.index(), 2);
    }

    #[test]
    fn validation_leaves_stored_hash_alone() {
        let mut blocks = chain_of(2);
        blocks[1].transaction =
            Transaction::new_at("P-001", "dr.who@blockmed.org", "Flu", "Rest", "edited", ts());
        let stored = blocks[1].hash;
        let _ = validate_blocks(&blocks);
        assert_eq!(blocks[1].hash, stored);
    }

    #[test]
    fn report_display() {
        let blocks = chain_of(2);
        assert_eq!(validate_blocks(&blocks).to_string(), "all 2 blocks valid");
    }
}
