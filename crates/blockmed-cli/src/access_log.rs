use blockmed_core::{EventSink, Severity, Timestamp, TracingSink};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

/// Appends one line per event to `access.log` and mirrors the event to
/// `tracing`. A failed write is logged and otherwise ignored.
pub struct AccessLog {
    path: PathBuf,
}

impl AccessLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

pub fn format_line(at: &Timestamp, severity: Severity, actor: &str, description: &str) -> String {
    format!("[{at}] [{severity}] User: {actor}, Operation: {description}\n")
}

impl EventSink for AccessLog {
    fn record(&self, severity: Severity, actor: &str, description: &str) {
        TracingSink.record(severity, actor, description);
        let line = format_line(&Timestamp::now(), severity, actor, description);
        if let Err(e) = self.append(&line) {
            warn!(path = %self.path.display(), "access log write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format() {
        let at = Timestamp::parse("2024-05-01 10:00:00").unwrap();
        assert_eq!(
            format_line(&at, Severity::Security, "x@blockmed.org", "Failed login attempt"),
            "[2024-05-01 10:00:00] [SECURITY] User: x@blockmed.org, Operation: Failed login attempt\n"
        );
    }

    #[test]
    fn appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = AccessLog::new(dir.path().join("logs/access.log"));
        log.record(Severity::Info, "a@blockmed.org", "Viewed blockchain");
        log.record(Severity::Error, "a@blockmed.org", "Save failed");
        let text = fs::read_to_string(dir.path().join("logs/access.log")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[INFO] User: a@blockmed.org, Operation: Viewed blockchain"));
        assert!(lines[1].contains("[ERROR]"));
    }

    #[test]
    fn unwritable_log_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the file should be
        let log = AccessLog::new(dir.path());
        log.record(Severity::Info, "a@blockmed.org", "ignored");
    }
}
