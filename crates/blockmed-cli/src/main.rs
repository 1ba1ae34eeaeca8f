mod access_log;
mod credentials;
mod pending;
mod render;
mod session;
mod settings;
mod shell;

use access_log::AccessLog;
use anyhow::{bail, Context, Result};
use blockmed_core::{DomainRoles, EventSink, RecordInput, Severity};
use clap::{Parser, Subcommand};
use credentials::Credentials;
use session::{DataDir, Session};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "blockmed")]
#[command(about = "Tamper-evident medical record ledger", version)]
struct Cli {
    /// Directory holding the ledger, accounts, access log and settings
    #[arg(long, env = "BLOCKMED_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,
    /// Account email
    #[arg(long, short = 'u', env = "BLOCKMED_USER", global = true)]
    user: Option<String>,
    /// Account password
    #[arg(
        long,
        short = 'p',
        env = "BLOCKMED_PASSWORD",
        global = true,
        hide_env_values = true
    )]
    password: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a medical record; it stays pending until mined
    AddRecord {
        #[arg(long)]
        patient: String,
        #[arg(long)]
        diagnosis: String,
        #[arg(long, default_value = "")]
        prescription: String,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Seal the pending record into a new block
    Mine,
    /// Print every block
    View,
    /// Check index sequence, hash linkage and stored hashes
    Validate,
    /// Save the ledger, or export it to another file
    Save {
        #[arg(long)]
        to: Option<PathBuf>,
    },
    /// Reload the ledger, or import it from another file, then validate
    Load {
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Set the mining difficulty (1-8)
    SetDifficulty { level: u8 },
    /// Create an account; the role follows the email domain
    Register { email: String },
    /// Show who the credentials belong to
    Whoami,
    /// Start an interactive session
    Shell,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .pretty()
        .init();

    let cli = Cli::parse();
    let dir = DataDir::new(cli.data_dir.clone());
    std::fs::create_dir_all(dir.root())
        .with_context(|| format!("creating {}", dir.root().display()))?;
    let credentials = Credentials::new(dir.users());

    if let Command::Register { email } = &cli.cmd {
        let Some(password) = cli.password.as_deref() else {
            bail!("--password is required to register");
        };
        let role = credentials.register(email, password, &DomainRoles)?;
        AccessLog::new(dir.access_log()).record(Severity::Info, email, "Registered account");
        println!("Registered {email} as {role}");
        return Ok(());
    }

    let actor = login(&cli, &dir, &credentials)?;
    let mut session = Session::open(dir, &actor)?;

    match cli.cmd {
        Command::AddRecord {
            patient,
            diagnosis,
            prescription,
            note,
        } => {
            let input = RecordInput {
                patient_id: patient,
                diagnosis,
                prescription,
                visit_note: note,
            };
            println!("{}", session.add_record(input)?);
        }
        Command::Mine => println!("{}", render::mined(&session.mine()?)),
        Command::View => print!("{}", session.view()?),
        Command::Validate => {
            let report = session.validate()?;
            println!("{}", render::validation(&report));
            if !report.is_valid() {
                bail!("ledger failed validation");
            }
        }
        Command::Save { to: None } => {
            let path = session.save()?;
            println!("Ledger saved to {}", path.display());
        }
        Command::Save { to: Some(path) } => {
            session.export(&path)?;
            println!("Ledger exported to {}", path.display());
        }
        Command::Load { from: None } => {
            let report = session.reload()?;
            println!("{}", render::validation(&report));
            if !report.is_valid() {
                bail!("loaded ledger failed validation");
            }
        }
        Command::Load { from: Some(path) } => {
            let report = session.import(&path)?;
            println!("{}", render::validation(&report));
            if !report.is_valid() {
                bail!("imported ledger failed validation; current ledger kept");
            }
        }
        Command::SetDifficulty { level } => {
            println!("Mining difficulty set to {}", session.set_difficulty(level)?);
        }
        Command::Whoami => {
            println!("{} ({})", session.actor(), session.role());
            println!("Blocks: {}", session.ledger().len());
            println!("Difficulty: {}", session.difficulty());
            if let Some(patient) = session.pending_patient() {
                println!("Pending record for patient {patient}");
            }
        }
        Command::Shell => {
            let stdin = io::stdin();
            shell::run(&mut session, stdin.lock(), &mut io::stdout())?;
        }
        Command::Register { .. } => unreachable!("handled before login"),
    }
    Ok(())
}

fn login(cli: &Cli, dir: &DataDir, credentials: &Credentials) -> Result<String> {
    let (Some(user), Some(password)) = (cli.user.as_deref(), cli.password.as_deref()) else {
        bail!("--user and --password (or BLOCKMED_USER and BLOCKMED_PASSWORD) are required");
    };
    let log = AccessLog::new(dir.access_log());
    match credentials.authenticate(user, password, &DomainRoles) {
        Ok(_) => {
            log.record(Severity::Info, user, "Successful login");
            Ok(user.to_string())
        }
        Err(e) => {
            log.record(Severity::Security, user, "Failed login attempt");
            Err(e)
        }
    }
}
