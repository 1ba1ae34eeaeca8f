//! Proof-of-work: a sealed block's hex hash must start with `difficulty`
//! `'0'` characters. That is a nibble count, coarser than a bit target, and
//! every extra level multiplies the expected work by 16, so difficulty 8
//! needs around four billion attempts and can run for a very long time.

use crate::block::Block;
use crate::constants::{
    DEFAULT_DIFFICULTY, DEFAULT_MAX_ATTEMPTS, MAX_DIFFICULTY, MINING_PROGRESS_INTERVAL,
    MIN_DIFFICULTY,
};
use crate::error::{LedgerError, Result};
use crate::hash;
use crate::Hash;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const DEADLINE_CHECK_MASK: u64 = 0x3ff;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub fn new(level: u8) -> Result<Self> {
        if (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&level) {
            Ok(Self(level))
        } else {
            Err(LedgerError::InvalidDifficulty(level as u32))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self(DEFAULT_DIFFICULTY)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = LedgerError;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> Self {
        d.0
    }
}

/// Number of leading zero hex characters in the rendered hash.
pub fn leading_zero_nibbles(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 2;
        } else {
            if *b < 0x10 {
                total += 1;
            }
            break;
        }
    }
    total
}

/// True iff the first `difficulty` characters of `hex` are `'0'`.
pub fn is_valid_proof(hex: &str, difficulty: u32) -> bool {
    if difficulty == 0 {
        return false;
    }
    let want = difficulty as usize;
    hex.len() >= want && hex.bytes().take(want).all(|c| c == b'0')
}

pub fn meets_difficulty(hash: &Hash, difficulty: Difficulty) -> bool {
    leading_zero_nibbles(hash) >= difficulty.get() as u32
}

/// Shared flag a caller can flip to stop a running search between attempts.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug)]
pub struct MineOptions {
    pub max_attempts: u64,
    pub deadline: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl Default for MineOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            deadline: None,
            cancel: None,
        }
    }
}

enum Stop {
    Cancelled,
    TimedOut,
}

struct Guard<'a> {
    cancel: Option<&'a CancelToken>,
    deadline: Option<Instant>,
}

impl<'a> Guard<'a> {
    fn new(options: &'a MineOptions) -> Self {
        Self {
            cancel: options.cancel.as_ref(),
            deadline: options.deadline.map(|d| Instant::now() + d),
        }
    }

    fn check(&self, check_clock: bool) -> Option<Stop> {
        if self.cancel.is_some_and(CancelToken::is_cancelled) {
            return Some(Stop::Cancelled);
        }
        if check_clock && self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(Stop::TimedOut);
        }
        None
    }
}

/// Mining configuration owned by whoever drives the ledger; nothing here is
/// process-wide.
#[derive(Clone, Debug, Default)]
pub struct Miner {
    difficulty: Difficulty,
    options: MineOptions,
}

impl Miner {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            options: MineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Callers are expected to have checked the actor's role first.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    pub fn options(&self) -> &MineOptions {
        &self.options
    }

    /// Sequential search. The nonce is reset and incremented before every
    /// attempt, so the first candidate tried is 1 and the result is the
    /// smallest such nonce.
    pub fn mine(&self, mut block: Block) -> Result<Block> {
        let template = block.hash_template();
        let guard = Guard::new(&self.options);
        info!(
            "mining block {} at difficulty {}",
            block.index, self.difficulty
        );

        block.nonce = 0;
        while block.nonce < self.options.max_attempts {
            let attempts = block.nonce;
            if let Some(stop) = guard.check(attempts & DEADLINE_CHECK_MASK == 0) {
                return Err(stopped(stop, attempts));
            }
            block.nonce += 1;
            let candidate = template.hash_with_nonce(block.nonce);
            if block.nonce % MINING_PROGRESS_INTERVAL == 0 {
                debug!(
                    "nonce {} hash {}...",
                    block.nonce,
                    &hash::to_hex(&candidate)[..16]
                );
            }
            if meets_difficulty(&candidate, self.difficulty) {
                block.hash = candidate;
                info!(
                    "mined block {} with nonce {} and hash {}",
                    block.index,
                    block.nonce,
                    block.hash_hex()
                );
                return Ok(block);
            }
        }
        Err(LedgerError::MiningExhausted {
            attempts: self.options.max_attempts,
        })
    }

    /// Same search spread over the rayon pool. `find_first` keeps the result
    /// identical to [`Miner::mine`].
    pub fn mine_parallel(&self, mut block: Block) -> Result<Block> {
        let template = block.hash_template();
        let guard = Guard::new(&self.options);
        let attempts = AtomicU64::new(0);
        let stop_seen = AtomicBool::new(false);
        let difficulty = self.difficulty;

        let found = (1..self.options.max_attempts.saturating_add(1))
            .into_par_iter()
            .find_first(|nonce| {
                if stop_seen.load(Ordering::Relaxed) || guard.check(true).is_some() {
                    stop_seen.store(true, Ordering::Relaxed);
                    return true;
                }
                attempts.fetch_add(1, Ordering::Relaxed);
                meets_difficulty(&template.hash_with_nonce(*nonce), difficulty)
            });

        let tried = attempts.load(Ordering::Relaxed);
        match found {
            Some(nonce) => {
                let candidate = template.hash_with_nonce(nonce);
                if !meets_difficulty(&candidate, difficulty) {
                    return Err(stopped(
                        guard.check(true).unwrap_or(Stop::TimedOut),
                        tried,
                    ));
                }
                block.nonce = nonce;
                block.hash = candidate;
                info!(
                    "mined block {} with nonce {} and hash {} ({} attempts in parallel)",
                    block.index,
                    block.nonce,
                    block.hash_hex(),
                    tried
                );
                Ok(block)
            }
            None => Err(LedgerError::MiningExhausted {
                attempts: self.options.max_attempts,
            }),
        }
    }
}

fn stopped(stop: Stop, attempts: u64) -> LedgerError {
    match stop {
        Stop::Cancelled => LedgerError::MiningCancelled { attempts },
        Stop::TimedOut => LedgerError::MiningTimedOut { attempts },
    }
}
