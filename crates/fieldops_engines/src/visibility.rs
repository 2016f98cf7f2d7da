#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use fieldops_contracts::actor::Actor;
use fieldops_contracts::contact::{Contact, ContactId};
use fieldops_contracts::file::{ClientFileView, FileRecord};
use fieldops_contracts::permission::FILES_MANAGE;
use fieldops_contracts::workorder::WorkOrder;
use fieldops_contracts::ReasonCodeId;

use crate::permission::PermissionEvaluator;

pub mod reason_codes {
    use fieldops_contracts::ReasonCodeId;

    // Visibility reason-code namespace.
    pub const FILE_VISIBILITY_CHANGED: ReasonCodeId = ReasonCodeId(0x5649_0001);
    pub const FILE_VISIBILITY_UNCHANGED: ReasonCodeId = ReasonCodeId(0x5649_0002);
    pub const FILE_VISIBILITY_FORBIDDEN: ReasonCodeId = ReasonCodeId(0x5649_0010);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityError {
    Forbidden { permission: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityDecision {
    pub file: FileRecord,
    /// False when the toggle was an idempotent no-op; callers must not emit
    /// a change event for an unchanged record.
    pub changed: bool,
    pub reason_code: ReasonCodeId,
}

#[derive(Debug, Default, Clone)]
pub struct VisibilityRuntime;

impl VisibilityRuntime {
    /// Authorized toggle of the client-visibility flag. Requires
    /// `files:manage`; toggling to the held value is a legal no-op.
    pub fn set_client_visibility(
        &self,
        evaluator: &PermissionEvaluator,
        actor: &Actor,
        file: &FileRecord,
        make_visible: bool,
    ) -> Result<VisibilityDecision, VisibilityError> {
        if !evaluator.allows(actor, FILES_MANAGE) {
            return Err(VisibilityError::Forbidden {
                permission: FILES_MANAGE,
            });
        }
        if file.visible_to_client == make_visible {
            return Ok(VisibilityDecision {
                file: file.clone(),
                changed: false,
                reason_code: reason_codes::FILE_VISIBILITY_UNCHANGED,
            });
        }
        let mut updated = file.clone();
        updated.visible_to_client = make_visible;
        Ok(VisibilityDecision {
            file: updated,
            changed: true,
            reason_code: reason_codes::FILE_VISIBILITY_CHANGED,
        })
    }

    /// The only sanctioned client-facing read of a file list: a projection,
    /// not just a filter. Internal fields never cross this boundary.
    pub fn filter_for_client(&self, files: &[FileRecord]) -> Vec<ClientFileView> {
        files
            .iter()
            .filter(|f| f.visible_to_client)
            .map(redact)
            .collect()
    }

    /// A contact is exposed to the Hub iff it is the work order's designated
    /// primary contact or holds an approved additional-contact grant.
    pub fn contact_visible_to_hub(
        &self,
        work_order: &WorkOrder,
        contact: &Contact,
        approved_grants: &BTreeSet<ContactId>,
    ) -> bool {
        if Some(&contact.client_id) != work_order.client_id.as_ref() {
            return false;
        }
        if work_order.pm_contact_id.as_ref() == Some(&contact.contact_id) {
            return true;
        }
        approved_grants.contains(&contact.contact_id)
    }
}

pub fn redact(file: &FileRecord) -> ClientFileView {
    ClientFileView {
        file_id: file.file_id.clone(),
        display_name: file.display_name.clone(),
        category: file.category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldops_contracts::actor::{ActorId, Role};
    use fieldops_contracts::contact::ClientId;
    use fieldops_contracts::file::{FileCategory, FileId};
    use fieldops_contracts::workorder::{WorkOrderId, WorkOrderStatus};

    fn actor(role: Role) -> Actor {
        Actor::v1(ActorId::new("actor_t").unwrap(), role, true, "Test Actor").unwrap()
    }

    fn file(id: &str, visible: bool) -> FileRecord {
        FileRecord::v1(
            FileId::new(id).unwrap(),
            WorkOrderId::new("wo_1").unwrap(),
            visible,
            FileCategory::Photo,
            ActorId::new("actor_up").unwrap(),
            format!("{id}.jpg"),
        )
        .unwrap()
    }

    fn work_order_with_client(pm: Option<&str>) -> WorkOrder {
        WorkOrder::v1(
            WorkOrderId::new("wo_1").unwrap(),
            WorkOrderStatus::Active,
            None,
            ActorId::new("actor_owner").unwrap(),
            Some(ClientId::new("client_1").unwrap()),
            pm.map(|p| ContactId::new(p).unwrap()),
            Default::default(),
            Default::default(),
        )
        .unwrap()
    }

    fn contact(id: &str, client: &str) -> Contact {
        Contact::v1(
            ContactId::new(id).unwrap(),
            ClientId::new(client).unwrap(),
            "Dana Reyes",
            "Harbor Foods",
            None,
        )
        .unwrap()
    }

    #[test]
    fn at_vis_01_toggle_requires_files_manage() {
        let runtime = VisibilityRuntime;
        let evaluator = PermissionEvaluator::builtin_v1();
        let out = runtime.set_client_visibility(
            &evaluator,
            &actor(Role::Technician),
            &file("file_1", false),
            true,
        );
        assert_eq!(
            out,
            Err(VisibilityError::Forbidden {
                permission: FILES_MANAGE,
            })
        );
    }

    #[test]
    fn at_vis_02_toggle_to_held_value_is_a_no_op() {
        let runtime = VisibilityRuntime;
        let evaluator = PermissionEvaluator::builtin_v1();
        let already_visible = file("file_1", true);
        let decision = runtime
            .set_client_visibility(&evaluator, &actor(Role::OfficeStaff), &already_visible, true)
            .unwrap();
        assert!(!decision.changed);
        assert_eq!(decision.file, already_visible);
        assert_eq!(
            decision.reason_code,
            reason_codes::FILE_VISIBILITY_UNCHANGED
        );
    }

    #[test]
    fn at_vis_03_authorized_toggle_flips_the_flag() {
        let runtime = VisibilityRuntime;
        let evaluator = PermissionEvaluator::builtin_v1();
        let decision = runtime
            .set_client_visibility(&evaluator, &actor(Role::OfficeStaff), &file("file_1", false), true)
            .unwrap();
        assert!(decision.changed);
        assert!(decision.file.visible_to_client);
    }

    #[test]
    fn at_vis_04_filter_for_client_projects_visible_records_only() {
        let runtime = VisibilityRuntime;
        let views = runtime.filter_for_client(&[file("file_1", true), file("file_2", false)]);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].file_id.as_str(), "file_1");
        assert_eq!(views[0].display_name, "file_1.jpg");
    }

    #[test]
    fn at_vis_05_primary_contact_is_always_exposed() {
        let runtime = VisibilityRuntime;
        let wo = work_order_with_client(Some("contact_pm"));
        let pm = contact("contact_pm", "client_1");
        assert!(runtime.contact_visible_to_hub(&wo, &pm, &BTreeSet::new()));
    }

    #[test]
    fn at_vis_06_additional_contact_needs_an_approved_grant() {
        let runtime = VisibilityRuntime;
        let wo = work_order_with_client(Some("contact_pm"));
        let extra = contact("contact_extra", "client_1");
        assert!(!runtime.contact_visible_to_hub(&wo, &extra, &BTreeSet::new()));

        let mut grants = BTreeSet::new();
        grants.insert(ContactId::new("contact_extra").unwrap());
        assert!(runtime.contact_visible_to_hub(&wo, &extra, &grants));
    }

    #[test]
    fn at_vis_07_contact_of_another_client_is_never_exposed() {
        let runtime = VisibilityRuntime;
        let wo = work_order_with_client(Some("contact_pm"));
        let foreign = contact("contact_pm", "client_other");
        let mut grants = BTreeSet::new();
        grants.insert(ContactId::new("contact_pm").unwrap());
        assert!(!runtime.contact_visible_to_hub(&wo, &foreign, &grants));
    }
}
