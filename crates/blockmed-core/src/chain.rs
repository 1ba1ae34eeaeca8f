use crate::block::Block;
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;
use crate::validation::{validate_blocks, ValidationError, ValidationReport};
use tracing::info;

/// Largest index the on-disk format can carry (it stores a signed 32-bit int).
pub const MAX_INDEX: u32 = i32::MAX as u32;

/// Persistence seam. Lives in the core so the registry can drive any backend
/// without the core depending on one.
pub trait LedgerStore {
    fn save(&self, ledger: &Ledger) -> anyhow::Result<()>;
    fn load(&self) -> anyhow::Result<Ledger>;
}

/// The chain: an owned, ordered run of blocks that always starts with a
/// genesis block. Blocks are only ever added at the tail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    blocks: Vec<Block>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_genesis(Block::genesis())
    }

    pub fn with_genesis(genesis: Block) -> Self {
        Self {
            blocks: vec![genesis],
        }
    }

    /// Rebuilds a ledger block by block through [`Ledger::append`].
    pub fn from_blocks<I>(blocks: I) -> Result<Self>
    where
        I: IntoIterator<Item = Block>,
    {
        let mut iter = blocks.into_iter();
        let genesis = iter.next().ok_or(LedgerError::IndexOutOfSequence {
            expected: 0,
            found: 0,
        })?;
        if genesis.index != 0 {
            return Err(LedgerError::IndexOutOfSequence {
                expected: 0,
                found: genesis.index,
            });
        }
        let mut ledger = Self::with_genesis(genesis);
        for block in iter {
            ledger.append(block)?;
        }
        Ok(ledger)
    }

    /// Adds `block` at the tail. Only the index sequence is enforced here;
    /// hash linkage and correctness are left to [`Ledger::validate`].
    pub fn append(&mut self, block: Block) -> Result<()> {
        let expected = self.next_index()?;
        if block.index != expected {
            return Err(LedgerError::IndexOutOfSequence {
                expected,
                found: block.index,
            });
        }
        info!("block {} appended, length {}", block.index, expected + 1);
        self.blocks.push(block);
        Ok(())
    }

    /// Unsealed candidate that extends the current tail.
    pub fn next_block(&self, transaction: Transaction) -> Result<Block> {
        Ok(Block::new(self.next_index()?, transaction, self.tail().hash))
    }

    fn next_index(&self) -> Result<u32> {
        let len = self.blocks.len() as u64;
        if len > MAX_INDEX as u64 {
            return Err(LedgerError::LedgerFull);
        }
        Ok(len as u32)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true: a ledger always holds its genesis block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn tail(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn get(&self, index: u32) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Number of medical records, i.e. blocks after genesis.
    pub fn record_count(&self) -> usize {
        self.blocks.len() - 1
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.validate_report().outcome
    }

    pub fn validate_report(&self) -> ValidationReport {
        validate_blocks(&self.blocks)
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::{Difficulty, Miner};
    use crate::time::Timestamp;

    fn record(i: u32) -> Transaction {
        record_noted(i, "Recheck in 3 months")
    }

    fn record_noted(i: u32, note: &str) -> Transaction {
        Transaction::new(
            &format!("P-{i:03}"),
            "dr.who@blockmed.org",
            "Hypertension",
            "Lisinopril 10mg",
            note,
        )
    }

    fn grown(n: u32) -> Ledger {
        grown_noted(n, "Recheck in 3 months")
    }

    fn grown_noted(n: u32, note: &str) -> Ledger {
        let miner = Miner::new(Difficulty::new(1).unwrap());
        let mut ledger = Ledger::new();
        for i in 1..=n {
            let block = miner
                .mine(ledger.next_block(record_noted(i, note)).unwrap())
                .unwrap();
            ledger.append(block).unwrap();
        }
        ledger
    }

    #[test]
    fn new_ledger_holds_only_genesis() {
        let ledger = Ledger::new();
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.is_empty());
        assert_eq!(ledger.record_count(), 0);
        assert_eq!(ledger.genesis(), ledger.tail());
        assert!(ledger.validate().is_ok());
    }

    #[test]
    fn sequential_appends_validate() {
        let ledger = grown(6);
        assert_eq!(ledger.len(), 7);
        assert_eq!(ledger.tail().index, 6);
        assert!(ledger.validate().is_ok());
        for pair in ledger.blocks().windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash);
            assert_eq!(pair[1].index, pair[0].index + 1);
        }
    }

    #[test]
    fn append_rejects_out_of_sequence_index() {
        let mut ledger = Ledger::new();
        let block = Block::new(5, record(1), ledger.tail().hash);
        assert!(matches!(
            ledger.append(block),
            Err(LedgerError::IndexOutOfSequence {
                expected: 1,
                found: 5
            })
        ));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn next_block_extends_tail() {
        let ledger = grown(2);
        let candidate = ledger.next_block(record(3)).unwrap();
        assert_eq!(candidate.index, 3);
        assert_eq!(candidate.previous_hash, ledger.tail().hash);
        assert_eq!(candidate.nonce, 0);
    }

    #[test]
    fn from_blocks_round_trips() {
        let ledger = grown(3);
        let rebuilt = Ledger::from_blocks(ledger.clone().into_blocks()).unwrap();
        assert_eq!(rebuilt, ledger);
    }

    #[test]
    fn from_blocks_requires_genesis_first() {
        assert!(Ledger::from_blocks(Vec::new()).is_err());
        let ledger = grown(2);
        let mut blocks = ledger.into_blocks();
        blocks.remove(0);
        assert!(matches!(
            Ledger::from_blocks(blocks),
            Err(LedgerError::IndexOutOfSequence { expected: 0, found: 1 })
        ));
    }

    #[test]
    fn tampering_via_rebuild_is_detected() {
        let mut blocks = grown(3).into_blocks();
        let tx = blocks[1].transaction.clone();
        blocks[1].transaction = Transaction::new_at(
            tx.patient_id(),
            tx.doctor(),
            "Hypotension",
            tx.prescription(),
            tx.visit_note(),
            tx.created_at().clone(),
        );
        let ledger = Ledger::from_blocks(blocks).unwrap();
        assert_eq!(ledger.validate().unwrap_err().index(), 1);
    }

    #[test]
    fn splicing_two_chains_is_detected() {
        let a = grown_noted(3, "chain a").into_blocks();
        let b = grown_noted(3, "chain b").into_blocks();
        let mut spliced: Vec<Block> = a[..2].to_vec();
        spliced.extend_from_slice(&b[2..]);
        let ledger = Ledger::from_blocks(spliced).unwrap();
        let err = ledger.validate().unwrap_err();
        assert_eq!(err.index(), 2);
        assert_eq!(err.invariant(), "hash linkage");
    }

    #[test]
    fn two_geneses_at_same_instant_match() {
        let ts = Timestamp::parse("2025-01-01 00:00:00").unwrap();
        let a = Ledger::with_genesis(Block::genesis_at(ts.clone()));
        let b = Ledger::with_genesis(Block::genesis_at(ts));
        assert_eq!(a.genesis().hash, b.genesis().hash);
        assert_eq!(a, b);
    }

    #[test]
    fn borrowed_iteration() {
        let ledger = grown(2);
        let indices: Vec<u32> = (&ledger).into_iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(ledger.get(1).unwrap().index, 1);
        assert!(ledger.get(9).is_none());
    }
}
