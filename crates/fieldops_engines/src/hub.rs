#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use fieldops_contracts::actor::{Actor, Role};
use fieldops_contracts::contact::ContactId;
use fieldops_contracts::hub::{ClientHubPayload, HubAccess, HubPayload};
use fieldops_contracts::permission::CLIENT_HUB_VIEW;
use fieldops_contracts::workorder::WorkOrder;
use fieldops_contracts::ReasonCodeId;

use crate::permission::PermissionEvaluator;
use crate::visibility::VisibilityRuntime;

pub mod reason_codes {
    use fieldops_contracts::ReasonCodeId;

    // Hub access reason-code namespace.
    pub const HUB_GRANTED_OWNER: ReasonCodeId = ReasonCodeId(0x4855_0001);
    pub const HUB_GRANTED_STAFF_ROLE: ReasonCodeId = ReasonCodeId(0x4855_0002);
    pub const HUB_GRANTED_CLIENT_CONTACT: ReasonCodeId = ReasonCodeId(0x4855_0003);
    pub const HUB_NO_CLIENT: ReasonCodeId = ReasonCodeId(0x4855_0010);
    pub const HUB_DENIED: ReasonCodeId = ReasonCodeId(0x4855_0011);
    pub const HUB_DENIED_INACTIVE: ReasonCodeId = ReasonCodeId(0x4855_0012);
}

/// How the requesting actor is linked to the work order's client, resolved
/// by the caller from contact records and grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactLink {
    pub contact_id: ContactId,
    pub is_primary: bool,
    pub approved_additional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubAccessDecision {
    pub access: HubAccess,
    pub reason_code: ReasonCodeId,
}

/// The single composed "may this actor enter the Hub" gate. UI layers render
/// its tri-state result; nothing else re-derives this logic.
#[derive(Debug, Default, Clone)]
pub struct HubAccessRuntime;

impl HubAccessRuntime {
    pub fn evaluate(
        &self,
        evaluator: &PermissionEvaluator,
        actor: &Actor,
        work_order: &WorkOrder,
        contact_link: Option<&ContactLink>,
    ) -> HubAccessDecision {
        if !actor.is_active {
            return HubAccessDecision {
                access: HubAccess::Denied,
                reason_code: reason_codes::HUB_DENIED_INACTIVE,
            };
        }
        // Ownership outranks the no-client short-circuit: the owner is
        // granted on any work order regardless of role.
        if actor.actor_id == work_order.owner_id {
            return HubAccessDecision {
                access: HubAccess::Granted,
                reason_code: reason_codes::HUB_GRANTED_OWNER,
            };
        }
        if work_order.client_id.is_none() {
            return HubAccessDecision {
                access: HubAccess::NoClient,
                reason_code: reason_codes::HUB_NO_CLIENT,
            };
        }
        // Role-gated staff access. Technicians never qualify through this
        // gate even when a catalog grants them the view key; they enter only
        // as owner or linked contact.
        if actor.role.is_internal_staff()
            && actor.role != Role::Technician
            && evaluator.allows(actor, CLIENT_HUB_VIEW)
        {
            return HubAccessDecision {
                access: HubAccess::Granted,
                reason_code: reason_codes::HUB_GRANTED_STAFF_ROLE,
            };
        }
        if let Some(link) = contact_link {
            if link.is_primary || link.approved_additional {
                return HubAccessDecision {
                    access: HubAccess::Granted,
                    reason_code: reason_codes::HUB_GRANTED_CLIENT_CONTACT,
                };
            }
        }
        HubAccessDecision {
            access: HubAccess::Denied,
            reason_code: reason_codes::HUB_DENIED,
        }
    }

    /// Per-item filtering of Hub-bound data. Access being `Granted` is
    /// necessary but not sufficient; every file and contact is re-checked
    /// here on every call.
    pub fn filter_hub_payload(
        &self,
        visibility: &VisibilityRuntime,
        work_order: &WorkOrder,
        payload: &HubPayload,
        approved_grants: &BTreeSet<ContactId>,
    ) -> ClientHubPayload {
        ClientHubPayload {
            files: visibility.filter_for_client(&payload.files),
            contacts: payload
                .contacts
                .iter()
                .filter(|c| visibility.contact_visible_to_hub(work_order, c, approved_grants))
                .cloned()
                .collect(),
            messages: payload.messages.clone(),
        }
    }
}
