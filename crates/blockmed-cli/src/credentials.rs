//! `users.csv`: one `email,password_hash,ROLE` line per account.

use anyhow::{bail, Context, Result};
use blockmed_core::access::{is_valid_email, STAFF_DOMAIN, INTERN_DOMAIN, STUDENT_DOMAIN};
use blockmed_core::{hash, IdentityProvider, Role};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@blockmed.org";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

pub fn hash_password(password: &str) -> String {
    hash::digest_hex(format!("BLOCKMED_SALT_{password}_2024").as_bytes())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl UserRecord {
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.trim().splitn(3, ',');
        let email = parts.next()?.trim();
        let password_hash = parts.next()?.trim();
        let role = parts.next()?.trim().parse().ok()?;
        if email.is_empty() || password_hash.is_empty() {
            return None;
        }
        Some(Self {
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
        })
    }

    fn to_line(&self) -> String {
        format!("{},{},{}\n", self.email, self.password_hash, self.role)
    }
}

pub struct Credentials {
    path: PathBuf,
}

impl Credentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the file with the default staff account if it is missing.
    fn ensure_seeded(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let admin = UserRecord {
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password_hash: hash_password(DEFAULT_ADMIN_PASSWORD),
            role: Role::FullAccess,
        };
        fs::write(&self.path, admin.to_line())
            .with_context(|| format!("seeding {}", self.path.display()))?;
        info!(path = %self.path.display(), "seeded default admin account");
        Ok(())
    }

    pub fn users(&self) -> Result<Vec<UserRecord>> {
        self.ensure_seeded()?;
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let mut users = Vec::new();
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match UserRecord::parse(line) {
                Some(user) => users.push(user),
                None => warn!(line = n + 1, "skipping malformed account line"),
            }
        }
        Ok(users)
    }

    /// Checks the password and returns the role the identity provider
    /// assigns to `email`.
    pub fn authenticate<I: IdentityProvider>(
        &self,
        email: &str,
        password: &str,
        identities: &I,
    ) -> Result<Role> {
        let hashed = hash_password(password);
        let known = self
            .users()?
            .into_iter()
            .any(|u| u.email.eq_ignore_ascii_case(email) && u.password_hash == hashed);
        let role = identities.role_of(email);
        if !known || !role.is_valid() {
            bail!("authentication failed for {email}");
        }
        Ok(role)
    }

    pub fn register<I: IdentityProvider>(
        &self,
        email: &str,
        password: &str,
        identities: &I,
    ) -> Result<Role> {
        if !is_valid_email(email) {
            bail!("{email:?} is not a valid email address");
        }
        let role = identities.role_of(email);
        if !role.is_valid() {
            bail!(
                "invalid email domain: must end with {STUDENT_DOMAIN}, {INTERN_DOMAIN} or {STAFF_DOMAIN}"
            );
        }
        if password.is_empty() {
            bail!("password must not be empty");
        }
        if self
            .users()?
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            bail!("{email} is already registered");
        }
        let record = UserRecord {
            email: email.to_string(),
            password_hash: hash_password(password),
            role,
        };
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        file.write_all(record.to_line().as_bytes())?;
        info!(email, %role, "registered account");
        Ok(role)
    }
}
