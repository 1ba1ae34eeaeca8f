use blockmed_core::{Block, Ledger, ValidationReport};
use std::fmt::Write;

pub fn ledger(ledger: &Ledger) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "BlockMed ledger: {} blocks", ledger.len());
    for block in ledger {
        out.push('\n');
        out.push_str(&self::block(block));
    }
    out
}

pub fn block(block: &Block) -> String {
    let tx = &block.transaction;
    let title = if block.is_genesis() {
        format!("Block #{} (genesis)", block.index)
    } else {
        format!("Block #{}", block.index)
    };
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let rows = [
        ("Timestamp", block.timestamp.as_str()),
        ("Patient ID", tx.patient_id()),
        ("Doctor", tx.doctor()),
        ("Diagnosis", tx.diagnosis()),
        ("Prescription", tx.prescription()),
        ("Visit Note", tx.visit_note()),
        ("Recorded At", tx.created_at().as_str()),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "  {label:<14} {value}");
    }
    let _ = writeln!(out, "  {:<14} {}", "Nonce", block.nonce);
    let _ = writeln!(out, "  {:<14} {}", "Previous Hash", block.previous_hash_hex());
    let _ = writeln!(out, "  {:<14} {}", "Hash", block.hash_hex());
    out
}

pub fn mined(block: &Block) -> String {
    format!(
        "Mined block #{} with nonce {}\nHash: {}",
        block.index,
        block.nonce,
        block.hash_hex()
    )
}

pub fn validation(report: &ValidationReport) -> String {
    if report.is_valid() {
        format!("Ledger is valid: {report}")
    } else {
        format!("Ledger is COMPROMISED: {report}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockmed_core::Timestamp;

    #[test]
    fn genesis_rendering() {
        let ts = Timestamp::parse("2024-05-01 10:00:00").unwrap();
        let ledger = Ledger::with_genesis(Block::genesis_at(ts));
        let text = super::ledger(&ledger);
        assert!(text.starts_with("BlockMed ledger: 1 blocks\n"));
        assert!(text.contains("Block #0 (genesis)"));
        assert!(text.contains("Patient ID     GENESIS"));
        assert!(text.contains(&"0".repeat(64)));
        assert!(text.contains(&ledger.genesis().hash_hex()));
    }
}
