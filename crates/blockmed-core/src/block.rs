use crate::constants::HASH_SIZE;
use crate::hash::{self, GENESIS_PREVIOUS_HASH};
use crate::pow::{meets_difficulty, Difficulty};
use crate::time::Timestamp;
use crate::transaction::Transaction;
use crate::Hash;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u32,
    pub timestamp: Timestamp,
    pub transaction: Transaction,
    pub nonce: u64,
    pub previous_hash: Hash,
    pub hash: Hash,
}

impl Block {
    /// Unsealed candidate: nonce 0 and a zeroed hash until it is mined.
    pub fn new(index: u32, transaction: Transaction, previous_hash: Hash) -> Self {
        Self::new_at(index, transaction, previous_hash, Timestamp::now())
    }

    pub fn new_at(
        index: u32,
        transaction: Transaction,
        previous_hash: Hash,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            index,
            timestamp,
            transaction,
            nonce: 0,
            previous_hash,
            hash: [0u8; HASH_SIZE],
        }
    }

    pub fn genesis() -> Self {
        Self::genesis_at(Timestamp::now())
    }

    /// Genesis is hashed but never mined.
    pub fn genesis_at(timestamp: Timestamp) -> Self {
        let mut block = Self::new_at(
            0,
            Transaction::genesis(timestamp.clone()),
            GENESIS_PREVIOUS_HASH,
            timestamp,
        );
        block.recompute_hash();
        block
    }

    /// Pure function of the current field values.
    pub fn compute_hash(&self) -> Hash {
        self.hash_template().hash_with_nonce(self.nonce)
    }

    pub fn recompute_hash(&mut self) {
        self.hash = self.compute_hash();
    }

    pub fn hash_is_current(&self) -> bool {
        self.compute_hash() == self.hash
    }

    pub fn is_sealed(&self, difficulty: Difficulty) -> bool {
        self.hash_is_current() && meets_difficulty(&self.hash, difficulty)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    pub fn hash_hex(&self) -> String {
        hash::to_hex(&self.hash)
    }

    pub fn previous_hash_hex(&self) -> String {
        hash::to_hex(&self.previous_hash)
    }

    pub(crate) fn hash_template(&self) -> HashTemplate {
        HashTemplate::new(self)
    }
}

/// The hash input is `{index}{timestamp}{transaction}{nonce}{previous_hash}`.
/// Everything before the nonce is fed to SHA-256 once so each mining attempt
/// only hashes the nonce digits and the previous-hash suffix.
#[derive(Clone)]
pub(crate) struct HashTemplate {
    prefix: Sha256,
    suffix: String,
}

impl HashTemplate {
    fn new(block: &Block) -> Self {
        let mut prefix = Sha256::new();
        prefix.update(block.index.to_string().as_bytes());
        prefix.update(block.timestamp.as_str().as_bytes());
        prefix.update(block.transaction.canonical_text().as_bytes());
        Self {
            prefix,
            suffix: hash::to_hex(&block.previous_hash),
        }
    }

    pub(crate) fn hash_with_nonce(&self, nonce: u64) -> Hash {
        let mut hasher = self.prefix.clone();
        let mut buf = [0u8; 20];
        hasher.update(decimal(nonce, &mut buf));
        hasher.update(self.suffix.as_bytes());
        hash::finalize(hasher)
    }
}

fn decimal(mut n: u64, buf: &mut [u8; 20]) -> &[u8] {
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    &buf[pos..]
}
