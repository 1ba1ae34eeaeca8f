#![allow(dead_code)]

use blockmed_core::{Difficulty, Ledger, Miner, Transaction};
use blockmed_storage::FileStore;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tempfile::{tempdir, TempDir};

pub fn create_temp_store() -> (TempDir, FileStore) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let store = FileStore::new(temp_dir.path().join("blockchain.dat"));
    (temp_dir, store)
}

pub fn random_text<R: Rng>(rng: &mut R, max: usize) -> String {
    let len = rng.gen_range(1..=max);
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn random_record<R: Rng>(rng: &mut R) -> Transaction {
    Transaction::new(
        &random_text(rng, 49),
        "dr.grey@blockmed.org",
        &random_text(rng, 499),
        &random_text(rng, 499),
        &random_text(rng, 999),
    )
}

/// Ledger of `records` blocks after genesis, mined at difficulty 1.
pub fn mined_ledger<R: Rng>(rng: &mut R, records: usize) -> Ledger {
    let miner = Miner::new(Difficulty::new(1).expect("valid difficulty"));
    let mut ledger = Ledger::new();
    for _ in 0..records {
        let candidate = ledger
            .next_block(random_record(rng))
            .expect("ledger has room");
        let block = miner.mine(candidate).expect("difficulty 1 always seals");
        ledger.append(block).expect("index in sequence");
    }
    ledger
}
