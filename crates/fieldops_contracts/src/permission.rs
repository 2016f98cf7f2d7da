#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::{ContractViolation, Validate};

// Permission keys checked by the core. Grammar: `segment(":" segment){1,3}`,
// `segment = [a-z0-9_]+`; a grant-side key may end in a terminal `*` segment.
pub const JOBS_STATUS_CHANGE: &str = "jobs:status:change";
pub const JOBS_TASKS_CHECKLIST_TOGGLE: &str = "jobs:tasks:checklist:toggle";
pub const FILES_MANAGE: &str = "files:manage";
pub const CLIENT_HUB_VIEW: &str = "client_hub:view";
pub const CLIENT_HUB_POST: &str = "client_hub:post";
pub const CLIENT_HUB_MANAGE_CONTACTS: &str = "client_hub:manage_contacts";
pub const ACCOUNT_REACTIVATE: &str = "account:reactivate";

pub const PERMISSION_KEY_MAX_LEN: usize = 96;
pub const PERMISSION_KEY_MIN_SEGMENTS: usize = 2;
pub const PERMISSION_KEY_MAX_SEGMENTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct PermissionKey(String);

impl PermissionKey {
    /// Accepts a concrete key or a grant-side wildcard (`jobs:*`).
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        validate_key(&v)?;
        Ok(Self(v))
    }

    /// Accepts query-side keys only: a wildcard is never a valid query.
    pub fn parse_query(v: &str) -> Result<Self, ContractViolation> {
        let key = Self::new(v)?;
        if key.is_wildcard() {
            return Err(ContractViolation::InvalidValue {
                field: "permission_key",
                reason: "wildcard is not a valid query key",
            });
        }
        Ok(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.0.ends_with(":*")
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(':')
    }

    /// Grant-side match: exact key, or this key is a wildcard ancestor of
    /// `query` (`jobs:*` grants `jobs:status:change`).
    pub fn grants(&self, query: &PermissionKey) -> bool {
        if self.0 == query.0 {
            return true;
        }
        if !self.is_wildcard() {
            return false;
        }
        let prefix = &self.0[..self.0.len() - 1];
        query.0.starts_with(prefix)
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = ContractViolation;

    fn try_from(v: String) -> Result<Self, ContractViolation> {
        PermissionKey::new(v)
    }
}

impl Validate for PermissionKey {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_key(&self.0)
    }
}

fn validate_key(v: &str) -> Result<(), ContractViolation> {
    if v.is_empty() {
        return Err(ContractViolation::InvalidValue {
            field: "permission_key",
            reason: "must not be empty",
        });
    }
    if v.len() > PERMISSION_KEY_MAX_LEN {
        return Err(ContractViolation::InvalidValue {
            field: "permission_key",
            reason: "exceeds max length",
        });
    }
    let segments: Vec<&str> = v.split(':').collect();
    if segments.len() < PERMISSION_KEY_MIN_SEGMENTS || segments.len() > PERMISSION_KEY_MAX_SEGMENTS
    {
        return Err(ContractViolation::InvalidValue {
            field: "permission_key",
            reason: "must have 2..=4 colon-delimited segments",
        });
    }
    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        if *segment == "*" {
            if i != last {
                return Err(ContractViolation::InvalidValue {
                    field: "permission_key",
                    reason: "wildcard segment must be terminal",
                });
            }
            continue;
        }
        if segment.is_empty()
            || !segment
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ContractViolation::InvalidValue {
                field: "permission_key",
                reason: "segments must be non-empty [a-z0-9_]+",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(v: &str) -> PermissionKey {
        PermissionKey::new(v).unwrap()
    }

    #[test]
    fn at_perm_01_checked_key_constants_are_well_formed() {
        for v in [
            JOBS_STATUS_CHANGE,
            JOBS_TASKS_CHECKLIST_TOGGLE,
            FILES_MANAGE,
            CLIENT_HUB_VIEW,
            CLIENT_HUB_POST,
            CLIENT_HUB_MANAGE_CONTACTS,
            ACCOUNT_REACTIVATE,
        ] {
            assert!(PermissionKey::parse_query(v).is_ok(), "{v}");
        }
    }

    #[test]
    fn at_perm_02_malformed_keys_are_rejected() {
        for v in ["", "jobs", "jobs::change", "Jobs:Status", "a:b:c:d:e", "jobs:*:change"] {
            assert!(PermissionKey::new(v).is_err(), "{v}");
        }
    }

    #[test]
    fn at_perm_03_wildcard_is_grant_side_only() {
        assert!(PermissionKey::new("jobs:*").is_ok());
        assert!(PermissionKey::parse_query("jobs:*").is_err());
    }

    #[test]
    fn at_perm_04_wildcard_ancestor_grants_descendants() {
        let grant = key("jobs:*");
        assert!(grant.grants(&key(JOBS_STATUS_CHANGE)));
        assert!(grant.grants(&key(JOBS_TASKS_CHECKLIST_TOGGLE)));
        assert!(!grant.grants(&key(FILES_MANAGE)));
    }

    #[test]
    fn at_perm_05_exact_match_grants_itself_only() {
        let grant = key(FILES_MANAGE);
        assert!(grant.grants(&key(FILES_MANAGE)));
        assert!(!grant.grants(&key(CLIENT_HUB_VIEW)));
    }
}
