//! Workspace and author addresses.
//!
//! A workspace address looks like `+gardening.a1b2c3`; an author address
//! looks like `@suzy.<64 hex chars of the Ed25519 public key>`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Ed25519PublicKey;
use crate::error::CoreError;

const WORKSPACE_NAME_MAX: usize = 15;
const WORKSPACE_SUFFIX_MAX: usize = 53;
const SHORTNAME_LEN: usize = 4;
const PUBKEY_HEX_LEN: usize = 64;

fn is_lower_alnum(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// Address of a workspace (a replica namespace).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspaceAddress(String);

impl WorkspaceAddress {
    /// Parse and validate a workspace address.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidWorkspaceAddress {
            address: s.to_string(),
            reason: reason.to_string(),
        };

        let rest = s
            .strip_prefix('+')
            .ok_or_else(|| invalid("must start with '+'"))?;
        let (name, suffix) = rest
            .split_once('.')
            .ok_or_else(|| invalid("missing '.' between name and suffix"))?;

        if name.is_empty() || name.len() > WORKSPACE_NAME_MAX {
            return Err(invalid("name must be 1 to 15 characters"));
        }
        if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(invalid("name must start with a lowercase letter"));
        }
        if !name.chars().all(is_lower_alnum) {
            return Err(invalid("name must be lowercase letters and digits"));
        }
        if suffix.is_empty() || suffix.len() > WORKSPACE_SUFFIX_MAX {
            return Err(invalid("suffix must be 1 to 53 characters"));
        }
        if !suffix.chars().all(is_lower_alnum) {
            return Err(invalid("suffix must be lowercase letters and digits"));
        }

        Ok(Self(s.to_string()))
    }

    /// The part between `+` and the first `.`.
    pub fn name(&self) -> &str {
        self.0[1..].split('.').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WorkspaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Workspace({})", self.0)
    }
}

impl fmt::Display for WorkspaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WorkspaceAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WorkspaceAddress {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<WorkspaceAddress> for String {
    fn from(addr: WorkspaceAddress) -> Self {
        addr.0
    }
}

impl AsRef<str> for WorkspaceAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Address of a document author: a shortname plus the Ed25519 public key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AuthorAddress(String);

impl AuthorAddress {
    /// Parse and validate an author address.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidAuthorAddress {
            address: s.to_string(),
            reason: reason.to_string(),
        };

        let rest = s
            .strip_prefix('@')
            .ok_or_else(|| invalid("must start with '@'"))?;
        let (shortname, pubkey) = rest
            .split_once('.')
            .ok_or_else(|| invalid("missing '.' between shortname and key"))?;

        validate_shortname(shortname).map_err(|_| invalid("bad shortname"))?;

        if pubkey.len() != PUBKEY_HEX_LEN
            || !pubkey
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(invalid("key must be 64 lowercase hex characters"));
        }

        Ok(Self(s.to_string()))
    }

    /// Build the address for a shortname and public key.
    pub fn from_parts(shortname: &str, public_key: &Ed25519PublicKey) -> Result<Self, CoreError> {
        validate_shortname(shortname)?;
        Ok(Self(format!("@{}.{}", shortname, public_key.to_hex())))
    }

    /// The part between `@` and the first `.`.
    pub fn shortname(&self) -> &str {
        self.0[1..].split('.').next().unwrap_or_default()
    }

    /// Decode the public key embedded in the address.
    pub fn public_key(&self) -> Result<Ed25519PublicKey, CoreError> {
        let hex = self
            .0
            .split_once('.')
            .map(|(_, key)| key)
            .ok_or(CoreError::InvalidPublicKey)?;
        Ed25519PublicKey::from_hex(hex).map_err(|_| CoreError::InvalidPublicKey)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Shortnames are exactly four lowercase letters or digits, starting with a letter.
pub fn validate_shortname(shortname: &str) -> Result<(), CoreError> {
    let ok = shortname.len() == SHORTNAME_LEN
        && shortname.starts_with(|c: char| c.is_ascii_lowercase())
        && shortname.chars().all(is_lower_alnum);
    if ok {
        Ok(())
    } else {
        Err(CoreError::InvalidShortname(shortname.to_string()))
    }
}

impl fmt::Debug for AuthorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shortname plus a key prefix is enough to tell authors apart in logs
        let key = self.0.split_once('.').map(|(_, k)| k).unwrap_or_default();
        write!(f, "Author(@{}.{})", self.shortname(), &key[..key.len().min(8)])
    }
}

impl fmt::Display for AuthorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AuthorAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AuthorAddress {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<AuthorAddress> for String {
    fn from(addr: AuthorAddress) -> Self {
        addr.0
    }
}

impl AsRef<str> for AuthorAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
