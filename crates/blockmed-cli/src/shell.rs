//! Line-oriented session: one login, many commands.

use crate::render;
use crate::session::Session;
use anyhow::{bail, Result};
use blockmed_core::RecordInput;
use std::io::{BufRead, Write};
use std::path::PathBuf;

const HELP: &str = "\
commands:
  add <patient>|<diagnosis>|<prescription>|<note>
  mine
  view
  validate
  save [PATH]
  load [PATH]
  difficulty <1-8>
  help
  exit";

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Add(RecordInput),
    Mine,
    View,
    Validate,
    Save(Option<PathBuf>),
    Load(Option<PathBuf>),
    Difficulty(u8),
    Help,
    Exit,
}

fn parse(line: &str) -> Result<Option<ShellCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let path = || (!rest.is_empty()).then(|| PathBuf::from(rest));
    let cmd = match word.to_ascii_lowercase().as_str() {
        "add" => {
            let mut fields = rest.splitn(4, '|').map(str::trim);
            let patient_id = fields.next().unwrap_or_default().to_string();
            if patient_id.is_empty() {
                bail!("usage: add <patient>|<diagnosis>|<prescription>|<note>");
            }
            ShellCommand::Add(RecordInput {
                patient_id,
                diagnosis: fields.next().unwrap_or_default().to_string(),
                prescription: fields.next().unwrap_or_default().to_string(),
                visit_note: fields.next().unwrap_or_default().to_string(),
            })
        }
        "mine" => ShellCommand::Mine,
        "view" => ShellCommand::View,
        "validate" => ShellCommand::Validate,
        "save" => ShellCommand::Save(path()),
        "load" => ShellCommand::Load(path()),
        "difficulty" => match rest.parse() {
            Ok(level) => ShellCommand::Difficulty(level),
            Err(_) => bail!("usage: difficulty <1-8>"),
        },
        "help" | "?" => ShellCommand::Help,
        "exit" | "quit" => ShellCommand::Exit,
        other => bail!("unknown command {other:?}, try `help`"),
    };
    Ok(Some(cmd))
}

/// Runs commands from `input` until `exit` or end of input, then saves the
/// ledger. A failing command is reported and the session continues.
pub fn run<R: BufRead, W: Write>(session: &mut Session, input: R, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "Logged in as {} ({}). Type `help` for commands.",
        session.actor(),
        session.role()
    )?;
    for line in input.lines() {
        let line = line?;
        let cmd = match parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "error: {e}")?;
                continue;
            }
        };
        if cmd == ShellCommand::Exit {
            break;
        }
        if let Err(e) = execute(session, cmd, out) {
            writeln!(out, "error: {e:#}")?;
        }
    }
    let path = session.save()?;
    writeln!(out, "Ledger saved to {}. Goodbye.", path.display())?;
    Ok(())
}

fn execute<W: Write>(session: &mut Session, cmd: ShellCommand, out: &mut W) -> Result<()> {
    match cmd {
        ShellCommand::Add(input) => writeln!(out, "{}", session.add_record(input)?)?,
        ShellCommand::Mine => writeln!(out, "{}", render::mined(&session.mine()?))?,
        ShellCommand::View => write!(out, "{}", session.view()?)?,
        ShellCommand::Validate => writeln!(out, "{}", render::validation(&session.validate()?))?,
        ShellCommand::Save(None) => {
            let path = session.save()?;
            writeln!(out, "Ledger saved to {}", path.display())?;
        }
        ShellCommand::Save(Some(path)) => {
            session.export(&path)?;
            writeln!(out, "Ledger exported to {}", path.display())?;
        }
        ShellCommand::Load(None) => {
            let report = session.reload()?;
            writeln!(out, "{}", render::validation(&report))?;
        }
        ShellCommand::Load(Some(path)) => {
            let report = session.import(&path)?;
            writeln!(out, "{}", render::validation(&report))?;
            if !report.is_valid() {
                writeln!(out, "Import rejected; current ledger kept")?;
            }
        }
        ShellCommand::Difficulty(level) => {
            let difficulty = session.set_difficulty(level)?;
            writeln!(out, "Mining difficulty set to {difficulty}")?;
        }
        ShellCommand::Help => writeln!(out, "{HELP}")?,
        ShellCommand::Exit => {}
    }
    Ok(())
}
