//! Session facade: one ledger, one miner, one pending record, and the
//! collaborators that decide who may do what and hear about it afterwards.

use crate::access::{IdentityProvider, Role};
use crate::block::Block;
use crate::chain::{Ledger, LedgerStore};
use crate::error::{LedgerError, Result};
use crate::events::{EventSink, Severity};
use crate::pow::{Difficulty, Miner};
use crate::transaction::Transaction;
use crate::validation::ValidationReport;

/// Fields a caller supplies for a new record; the doctor is the actor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordInput {
    pub patient_id: String,
    pub diagnosis: String,
    pub prescription: String,
    pub visit_note: String,
}

pub struct Registry<S, I, E> {
    ledger: Ledger,
    miner: Miner,
    pending: Option<Transaction>,
    store: S,
    identities: I,
    events: E,
}

impl<S, I, E> Registry<S, I, E>
where
    S: LedgerStore,
    I: IdentityProvider,
    E: EventSink,
{
    pub fn new(ledger: Ledger, miner: Miner, store: S, identities: I, events: E) -> Self {
        Self {
            ledger,
            miner,
            pending: None,
            store,
            identities,
            events,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn miner(&self) -> &Miner {
        &self.miner
    }

    pub fn difficulty(&self) -> Difficulty {
        self.miner.difficulty()
    }

    pub fn pending(&self) -> Option<&Transaction> {
        self.pending.as_ref()
    }

    /// Restores a pending record kept between sessions.
    pub fn set_pending(&mut self, pending: Option<Transaction>) {
        self.pending = pending;
    }

    pub fn role_of(&self, actor: &str) -> Role {
        self.identities.role_of(actor)
    }

    pub fn add_record(&mut self, actor: &str, input: RecordInput) -> Result<&Transaction> {
        self.authorize(actor, "add records", Role::may_mutate_ledger)?;
        let tx = Transaction::new(
            &input.patient_id,
            actor,
            &input.diagnosis,
            &input.prescription,
            &input.visit_note,
        );
        if let Err(e) = tx.validate_required() {
            self.events
                .record(Severity::Warning, actor, &format!("Rejected record: {e}"));
            return Err(e);
        }
        self.events.record(
            Severity::Info,
            actor,
            &format!("Created new medical record for patient {}", tx.patient_id()),
        );
        Ok(self.pending.insert(tx))
    }

    /// Seals the pending record into a new block and appends it. The pending
    /// slot is only cleared once the block is on the ledger.
    pub fn mine_pending(&mut self, actor: &str) -> Result<&Block> {
        self.authorize(actor, "mine blocks", Role::may_mutate_ledger)?;
        let tx = self.pending.clone().ok_or(LedgerError::NothingPending)?;
        let sealed = self
            .ledger
            .next_block(tx)
            .and_then(|candidate| self.miner.mine(candidate));
        let block = match sealed {
            Ok(block) => block,
            Err(e) => {
                self.events
                    .record(Severity::Error, actor, &format!("Mining failed: {e}"));
                return Err(e);
            }
        };
        let description = format!(
            "Mined block {} with nonce {} at difficulty {}",
            block.index,
            block.nonce,
            self.miner.difficulty()
        );
        self.ledger.append(block)?;
        self.pending = None;
        self.events.record(Severity::Info, actor, &description);
        Ok(self.ledger.tail())
    }

    pub fn view(&self, actor: &str) -> Result<&Ledger> {
        self.authorize(actor, "view the ledger", Role::is_valid)?;
        self.events
            .record(Severity::Info, actor, "Viewed blockchain");
        Ok(&self.ledger)
    }

    pub fn validate(&self, actor: &str) -> Result<ValidationReport> {
        self.authorize(actor, "validate the ledger", Role::is_valid)?;
        let report = self.ledger.validate_report();
        if report.is_valid() {
            self.events.record(
                Severity::Info,
                actor,
                &format!("Validated blockchain: {report}"),
            );
        } else {
            self.events.record(
                Severity::Security,
                actor,
                &format!("Blockchain integrity check failed: {report}"),
            );
        }
        Ok(report)
    }

    pub fn save(&self, actor: &str) -> Result<()> {
        self.save_to(actor, &self.store)
    }

    /// Writes to a store other than the session's own (export).
    pub fn save_to<T: LedgerStore>(&self, actor: &str, store: &T) -> Result<()> {
        self.authorize(actor, "save the ledger", Role::is_valid)?;
        match store.save(&self.ledger) {
            Ok(()) => {
                self.events.record(
                    Severity::Info,
                    actor,
                    &format!("Saved blockchain ({} blocks)", self.ledger.len()),
                );
                Ok(())
            }
            Err(e) => {
                self.events
                    .record(Severity::Error, actor, &format!("Save failed: {e:#}"));
                Err(LedgerError::Storage(e))
            }
        }
    }

    pub fn load(&mut self, actor: &str) -> Result<&Ledger> {
        self.authorize(actor, "load the ledger", Role::may_mutate_ledger)?;
        let loaded = self.store.load();
        self.replace_with(actor, loaded)
    }

    /// Import from `store`. The loaded ledger replaces the current one only
    /// if it validates; otherwise the current ledger is kept and the report
    /// says why.
    pub fn import_from<T: LedgerStore>(
        &mut self,
        actor: &str,
        store: &T,
    ) -> Result<ValidationReport> {
        self.authorize(actor, "load the ledger", Role::may_mutate_ledger)?;
        let loaded = match store.load() {
            Ok(ledger) => ledger,
            Err(e) => {
                self.events
                    .record(Severity::Error, actor, &format!("Load failed: {e:#}"));
                return Err(LedgerError::Storage(e));
            }
        };
        let report = loaded.validate_report();
        if report.is_valid() {
            self.replace_with(actor, Ok(loaded))?;
        } else {
            self.events.record(
                Severity::Security,
                actor,
                &format!("Rejected imported blockchain: {report}"),
            );
        }
        Ok(report)
    }

    fn replace_with(&mut self, actor: &str, loaded: anyhow::Result<Ledger>) -> Result<&Ledger> {
        match loaded {
            Ok(ledger) => {
                self.events.record(
                    Severity::Info,
                    actor,
                    &format!("Loaded blockchain ({} blocks)", ledger.len()),
                );
                self.ledger = ledger;
                Ok(&self.ledger)
            }
            Err(e) => {
                self.events
                    .record(Severity::Error, actor, &format!("Load failed: {e:#}"));
                Err(LedgerError::Storage(e))
            }
        }
    }

    pub fn set_difficulty(&mut self, actor: &str, level: u8) -> Result<Difficulty> {
        self.authorize(actor, "change mining difficulty", Role::may_configure)?;
        let difficulty = Difficulty::new(level)?;
        self.miner.set_difficulty(difficulty);
        self.events.record(
            Severity::Info,
            actor,
            &format!("Set mining difficulty to {difficulty}"),
        );
        Ok(difficulty)
    }

    fn authorize(
        &self,
        actor: &str,
        operation: &'static str,
        allowed: fn(Role) -> bool,
    ) -> Result<Role> {
        let role = self.identities.role_of(actor);
        if allowed(role) {
            return Ok(role);
        }
        self.events.record(
            Severity::Security,
            actor,
            &format!("Attempted to {operation} without permission"),
        );
        Err(LedgerError::PermissionDenied {
            actor: actor.to_string(),
            role,
            operation,
        })
    }
}
