#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use fieldops_contracts::actor::{Actor, Role};
use fieldops_contracts::permission::{
    PermissionKey, ACCOUNT_REACTIVATE, CLIENT_HUB_MANAGE_CONTACTS, CLIENT_HUB_POST,
    CLIENT_HUB_VIEW, FILES_MANAGE, JOBS_STATUS_CHANGE, JOBS_TASKS_CHECKLIST_TOGGLE,
};
use fieldops_contracts::ContractViolation;

/// Immutable role -> permission-key table, loaded once at process start.
/// A role with no entry simply has no permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCatalog {
    grants: BTreeMap<Role, BTreeSet<PermissionKey>>,
}

impl PermissionCatalog {
    /// The shipped role grants. `Role::Unknown` deliberately has no entry.
    pub fn builtin_v1() -> Self {
        let table: &[(Role, &[&str])] = &[
            (
                Role::Admin,
                &[
                    "jobs:*",
                    "files:*",
                    "client_hub:*",
                    "account:*",
                ],
            ),
            (
                Role::OfficeStaff,
                &[
                    JOBS_STATUS_CHANGE,
                    JOBS_TASKS_CHECKLIST_TOGGLE,
                    FILES_MANAGE,
                    CLIENT_HUB_VIEW,
                    CLIENT_HUB_POST,
                    CLIENT_HUB_MANAGE_CONTACTS,
                ],
            ),
            (
                Role::Technician,
                &[JOBS_STATUS_CHANGE, JOBS_TASKS_CHECKLIST_TOGGLE],
            ),
            (Role::ClientContact, &[CLIENT_HUB_VIEW, CLIENT_HUB_POST]),
        ];
        Self::from_grants(
            table
                .iter()
                .map(|(role, keys)| (*role, keys.iter().copied())),
        )
        .expect("builtin catalog keys must be well-formed")
    }

    pub fn from_grants<'a, I, K>(grants: I) -> Result<Self, ContractViolation>
    where
        I: IntoIterator<Item = (Role, K)>,
        K: IntoIterator<Item = &'a str>,
    {
        let mut table: BTreeMap<Role, BTreeSet<PermissionKey>> = BTreeMap::new();
        for (role, keys) in grants {
            let entry = table.entry(role).or_default();
            for key in keys {
                entry.insert(PermissionKey::new(key)?);
            }
        }
        Ok(Self { grants: table })
    }

    pub fn grants_for(&self, role: Role) -> Option<&BTreeSet<PermissionKey>> {
        self.grants.get(&role)
    }
}

/// Pure `allows(actor, key)` evaluator over a catalog. Safe to call on every
/// render/request; nothing here caches or mutates.
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    catalog: PermissionCatalog,
}

impl PermissionEvaluator {
    pub fn new(catalog: PermissionCatalog) -> Self {
        Self { catalog }
    }

    pub fn builtin_v1() -> Self {
        Self::new(PermissionCatalog::builtin_v1())
    }

    /// Fail-closed capability check. Malformed keys, wildcard queries,
    /// unknown roles, missing catalog entries and deactivated actors all
    /// answer `false`; the only key a deactivated actor may still hold is
    /// `account:reactivate`.
    pub fn allows(&self, actor: &Actor, key: &str) -> bool {
        let Ok(query) = PermissionKey::parse_query(key) else {
            return false;
        };
        if !actor.is_active && query.as_str() != ACCOUNT_REACTIVATE {
            return false;
        }
        if actor.role == Role::Unknown {
            return false;
        }
        let Some(grants) = self.catalog.grants_for(actor.role) else {
            return false;
        };
        grants.iter().any(|grant| grant.grants(&query))
    }
}

impl Default for PermissionEvaluator {
    fn default() -> Self {
        Self::builtin_v1()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldops_contracts::actor::ActorId;

    fn actor(role: Role, active: bool) -> Actor {
        Actor::v1(ActorId::new("actor_t").unwrap(), role, active, "Test Actor").unwrap()
    }

    #[test]
    fn at_perm_eval_01_granted_keys_answer_true_everything_else_false() {
        let evaluator = PermissionEvaluator::builtin_v1();
        let office = actor(Role::OfficeStaff, true);
        assert!(evaluator.allows(&office, JOBS_STATUS_CHANGE));
        assert!(evaluator.allows(&office, FILES_MANAGE));
        assert!(!evaluator.allows(&office, ACCOUNT_REACTIVATE));

        let technician = actor(Role::Technician, true);
        assert!(evaluator.allows(&technician, JOBS_TASKS_CHECKLIST_TOGGLE));
        assert!(!evaluator.allows(&technician, FILES_MANAGE));
        assert!(!evaluator.allows(&technician, CLIENT_HUB_VIEW));
    }

    #[test]
    fn at_perm_eval_02_admin_wildcards_cover_descendant_keys() {
        let evaluator = PermissionEvaluator::builtin_v1();
        let admin = actor(Role::Admin, true);
        assert!(evaluator.allows(&admin, JOBS_STATUS_CHANGE));
        assert!(evaluator.allows(&admin, JOBS_TASKS_CHECKLIST_TOGGLE));
        assert!(evaluator.allows(&admin, FILES_MANAGE));
        assert!(evaluator.allows(&admin, CLIENT_HUB_MANAGE_CONTACTS));
        assert!(evaluator.allows(&admin, ACCOUNT_REACTIVATE));
    }

    #[test]
    fn at_perm_eval_03_malformed_and_wildcard_queries_fail_closed() {
        let evaluator = PermissionEvaluator::builtin_v1();
        let admin = actor(Role::Admin, true);
        assert!(!evaluator.allows(&admin, ""));
        assert!(!evaluator.allows(&admin, "jobs"));
        assert!(!evaluator.allows(&admin, "jobs:*"));
        assert!(!evaluator.allows(&admin, "Jobs:Status:Change"));
    }

    #[test]
    fn at_perm_eval_04_deactivated_actor_keeps_only_reactivate() {
        let evaluator = PermissionEvaluator::builtin_v1();
        let inactive_admin = actor(Role::Admin, false);
        assert!(!evaluator.allows(&inactive_admin, JOBS_STATUS_CHANGE));
        assert!(!evaluator.allows(&inactive_admin, FILES_MANAGE));
        assert!(evaluator.allows(&inactive_admin, ACCOUNT_REACTIVATE));

        // The reactivate key is still catalog-gated, not unconditional.
        let inactive_client = actor(Role::ClientContact, false);
        assert!(!evaluator.allows(&inactive_client, ACCOUNT_REACTIVATE));
    }

    #[test]
    fn at_perm_eval_05_unknown_role_always_fails_closed() {
        let evaluator = PermissionEvaluator::builtin_v1();
        let unknown = actor(Role::Unknown, true);
        assert!(!evaluator.allows(&unknown, JOBS_STATUS_CHANGE));
        assert!(!evaluator.allows(&unknown, CLIENT_HUB_VIEW));
    }

    #[test]
    fn at_perm_eval_06_role_without_catalog_entry_has_no_permissions() {
        let evaluator = PermissionEvaluator::new(
            PermissionCatalog::from_grants([(Role::Admin, ["jobs:*"])]).unwrap(),
        );
        let office = actor(Role::OfficeStaff, true);
        assert!(!evaluator.allows(&office, JOBS_STATUS_CHANGE));
    }
}
