use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const STAFF_DOMAIN: &str = "@blockmed.org";
pub const INTERN_DOMAIN: &str = "@si.blockmed.org";
pub const STUDENT_DOMAIN: &str = "@students.blockmed.org";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// View and validate only.
    ReadOnly,
    /// May add records, mine and load.
    LimitedWrite,
    /// Everything, including mining configuration.
    FullAccess,
    Invalid,
}

impl Role {
    pub fn is_valid(self) -> bool {
        self != Role::Invalid
    }

    pub fn may_mutate_ledger(self) -> bool {
        matches!(self, Role::LimitedWrite | Role::FullAccess)
    }

    pub fn may_configure(self) -> bool {
        self == Role::FullAccess
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::ReadOnly => "STUDENT",
            Role::LimitedWrite => "INTERN",
            Role::FullAccess => "STAFF",
            Role::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "STUDENT" => Ok(Role::ReadOnly),
            "INTERN" => Ok(Role::LimitedWrite),
            "STAFF" => Ok(Role::FullAccess),
            other => Err(LedgerError::InvalidIdentity(other.to_string())),
        }
    }
}

/// Shape check only: something before a single `@`, and a dot somewhere
/// after it.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .find('.')
                    .is_some_and(|dot| dot > 0 && dot < domain.len() - 1)
        }
        None => false,
    }
}

/// Where the ledger learns what an actor is allowed to do.
pub trait IdentityProvider {
    fn role_of(&self, actor: &str) -> Role;
}

/// Derives the role from the actor's email domain.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomainRoles;

impl IdentityProvider for DomainRoles {
    fn role_of(&self, actor: &str) -> Role {
        if !is_valid_email(actor) {
            return Role::Invalid;
        }
        let actor = actor.to_ascii_lowercase();
        // subdomains first, they also end with the staff domain
        if actor.ends_with(INTERN_DOMAIN) {
            Role::LimitedWrite
        } else if actor.ends_with(STUDENT_DOMAIN) {
            Role::ReadOnly
        } else if actor.ends_with(STAFF_DOMAIN) {
            Role::FullAccess
        } else {
            Role::Invalid
        }
    }
}
