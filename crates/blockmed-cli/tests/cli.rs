use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const ADMIN: &str = "admin@blockmed.org";
const ADMIN_PW: &str = "admin123";

fn blockmed(data: &Path) -> Command {
    let mut cmd = Command::cargo_bin("blockmed").expect("binary is built");
    cmd.env_remove("BLOCKMED_USER")
        .env_remove("BLOCKMED_PASSWORD")
        .env("BLOCKMED_DATA_DIR", data);
    cmd
}

fn as_admin(data: &Path) -> Command {
    let mut cmd = blockmed(data);
    cmd.args(["--user", ADMIN, "--password", ADMIN_PW]);
    cmd
}

/// Data dir with difficulty 1 so mining stays fast.
fn fast_data_dir() -> TempDir {
    let dir = tempdir().expect("temp dir");
    as_admin(dir.path())
        .args(["set-difficulty", "1"])
        .assert()
        .success();
    dir
}

fn add_and_mine(data: &Path, patient: &str, diagnosis: &str) {
    as_admin(data)
        .args(["add-record", "--patient", patient, "--diagnosis", diagnosis])
        .args(["--prescription", "Rest", "--note", "Follow up"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pending"));
    as_admin(data)
        .arg("mine")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mined block"));
}

#[test]
fn requires_credentials() {
    let dir = tempdir().unwrap();
    blockmed(dir.path())
        .arg("view")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user"));
}

#[test]
fn wrong_password_is_logged_as_security_event() {
    let dir = tempdir().unwrap();
    blockmed(dir.path())
        .args(["--user", ADMIN, "--password", "nope", "view"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("authentication failed"));
    let log = fs::read_to_string(dir.path().join("access.log")).unwrap();
    assert!(log.contains(&format!("[SECURITY] User: {ADMIN}, Operation: Failed login attempt")));
}

#[test]
fn fresh_ledger_has_only_genesis() {
    let dir = tempdir().unwrap();
    as_admin(dir.path())
        .arg("view")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 blocks"))
        .stdout(predicate::str::contains("Block #0 (genesis)"));
    assert!(dir.path().join("users.csv").exists());
}

#[test]
fn add_mine_view_validate() {
    let dir = fast_data_dir();
    add_and_mine(dir.path(), "P-001", "Asthma");
    add_and_mine(dir.path(), "P-002", "Migraine");

    as_admin(dir.path())
        .arg("view")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 blocks"))
        .stdout(predicate::str::contains("Asthma"))
        .stdout(predicate::str::contains("Migraine"));
    as_admin(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("all 3 blocks valid"));
    assert!(!dir.path().join("pending.json").exists());
}

#[test]
fn mine_without_pending_record_fails() {
    let dir = fast_data_dir();
    as_admin(dir.path())
        .arg("mine")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no pending record"));
}

#[test]
fn tampered_file_fails_validation() {
    let dir = fast_data_dir();
    add_and_mine(dir.path(), "P-001", "Asthma");
    add_and_mine(dir.path(), "P-002", "Migraine");

    let path = dir.path().join("blockchain.dat");
    let mut bytes = fs::read(&path).unwrap();
    let at = bytes
        .windows(6)
        .position(|w| w == b"Asthma")
        .expect("diagnosis is stored as text");
    bytes[at] = b'X';
    fs::write(&path, bytes).unwrap();

    as_admin(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("COMPROMISED"))
        .stdout(predicate::str::contains("block 1"));
    let log = fs::read_to_string(dir.path().join("access.log")).unwrap();
    assert!(log.contains("[SECURITY]"));
}

#[test]
fn student_can_view_but_not_write() {
    let dir = fast_data_dir();
    blockmed(dir.path())
        .args(["--password", "study", "register", "kid@students.blockmed.org"])
        .assert()
        .success()
        .stdout(predicate::str::contains("STUDENT"));

    let student = |args: &[&str]| {
        let mut cmd = blockmed(dir.path());
        cmd.args(["--user", "kid@students.blockmed.org", "--password", "study"])
            .args(args);
        cmd
    };
    student(&["view"]).assert().success();
    student(&["add-record", "--patient", "P-9", "--diagnosis", "Flu"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("may not add records"));
    student(&["set-difficulty", "2"]).assert().failure();
}

#[test]
fn intern_cannot_change_difficulty() {
    let dir = fast_data_dir();
    blockmed(dir.path())
        .args(["--password", "pw", "register", "nurse@si.blockmed.org"])
        .assert()
        .success();
    blockmed(dir.path())
        .args(["--user", "nurse@si.blockmed.org", "--password", "pw"])
        .args(["set-difficulty", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("may not change mining difficulty"));
}

#[test]
fn register_rejects_foreign_domain() {
    let dir = tempdir().unwrap();
    blockmed(dir.path())
        .args(["--password", "pw", "register", "someone@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid email domain"));
}

#[test]
fn difficulty_out_of_range_is_rejected() {
    let dir = tempdir().unwrap();
    as_admin(dir.path())
        .args(["set-difficulty", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the supported range"));
}

#[test]
fn export_and_import() {
    let source = fast_data_dir();
    add_and_mine(source.path(), "P-001", "Asthma");
    let export = source.path().join("backup.dat");
    as_admin(source.path())
        .args(["save", "--to"])
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported"));

    let target = tempdir().unwrap();
    as_admin(target.path())
        .args(["load", "--from"])
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("all 2 blocks valid"));
    as_admin(target.path())
        .arg("view")
        .assert()
        .success()
        .stdout(predicate::str::contains("Asthma"));
}

#[test]
fn import_of_garbage_leaves_ledger_alone() {
    let dir = fast_data_dir();
    add_and_mine(dir.path(), "P-001", "Asthma");
    let junk = dir.path().join("junk.dat");
    fs::write(&junk, b"not a ledger").unwrap();
    as_admin(dir.path())
        .args(["load", "--from"])
        .arg(&junk)
        .assert()
        .failure();
    as_admin(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("all 2 blocks valid"));
}

#[test]
fn tampered_import_is_rejected() {
    let dir = fast_data_dir();
    add_and_mine(dir.path(), "P-001", "Asthma");
    let export = dir.path().join("backup.dat");
    as_admin(dir.path())
        .args(["save", "--to"])
        .arg(&export)
        .assert()
        .success();

    let mut bytes = fs::read(&export).unwrap();
    let at = bytes
        .windows(6)
        .position(|w| w == b"Asthma")
        .expect("diagnosis is stored as text");
    bytes[at] = b'X';
    fs::write(&export, bytes).unwrap();

    as_admin(dir.path())
        .args(["load", "--from"])
        .arg(&export)
        .assert()
        .failure()
        .stdout(predicate::str::contains("COMPROMISED"))
        .stderr(predicate::str::contains("current ledger kept"));
    as_admin(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("all 2 blocks valid"));
}

#[test]
fn shell_session() {
    let dir = fast_data_dir();
    as_admin(dir.path())
        .arg("shell")
        .write_stdin("add P-7|Gout|Colchicine|Less red meat\nmine\nvalidate\nbogus\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mined block #1"))
        .stdout(predicate::str::contains("all 2 blocks valid"))
        .stdout(predicate::str::contains("unknown command"))
        .stdout(predicate::str::contains("Goodbye"));
    as_admin(dir.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Blocks: 2"))
        .stdout(predicate::str::contains("Difficulty: 1"));
}
