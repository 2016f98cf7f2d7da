#![forbid(unsafe_code)]

use fieldops_contracts::actor::{Actor, ActorId, Role};
use fieldops_contracts::audit::{
    AuditEventInput, AuditEventType, AuditSeverity, PayloadKey, PayloadValue,
};
use fieldops_contracts::hub::{
    ClientHubPayload, HubAccess, HubMessage, HubMessageId, HubPayload, HUB_MESSAGE_BODY_MAX_LEN,
};
use fieldops_contracts::permission::{CLIENT_HUB_POST, CLIENT_HUB_VIEW};
use fieldops_contracts::workorder::{WorkOrder, WorkOrderId};
use fieldops_contracts::{
    ContractViolation, CorrelationId, MonotonicTimeNs, SchemaVersion, Validate,
};
use fieldops_engines::hub::{ContactLink, HubAccessRuntime};
use fieldops_engines::permission::PermissionEvaluator;
use fieldops_engines::visibility::VisibilityRuntime;
use fieldops_storage::FieldStore;

use crate::error::CoreError;
use crate::notify::{fire_and_forget, HubEvent, HubNotifier};

pub const HUB_OP_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// What a granted actor sees: staff and owners read the raw payload, client
/// contacts read the filtered projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubPayloadView {
    Internal(HubPayload),
    Client(ClientHubPayload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubPayloadOutcome {
    NoClient,
    Denied,
    Granted(HubPayloadView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubMessagePostRequest {
    pub schema_version: SchemaVersion,
    pub correlation_id: CorrelationId,
    pub now: MonotonicTimeNs,
    pub actor_id: ActorId,
    pub work_order_id: WorkOrderId,
    pub body: String,
}

impl HubMessagePostRequest {
    pub fn v1(
        correlation_id: CorrelationId,
        now: MonotonicTimeNs,
        actor_id: ActorId,
        work_order_id: WorkOrderId,
        body: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            schema_version: HUB_OP_CONTRACT_VERSION,
            correlation_id,
            now,
            actor_id,
            work_order_id,
            body: body.into(),
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for HubMessagePostRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != HUB_OP_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "hub_message_post_request.schema_version",
                reason: "must match HUB_OP_CONTRACT_VERSION",
            });
        }
        if self.now.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "hub_message_post_request.now",
                reason: "must be > 0",
            });
        }
        self.actor_id.validate()?;
        self.work_order_id.validate()?;
        if self.body.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "hub_message_post_request.body",
                reason: "must not be empty",
            });
        }
        if self.body.len() > HUB_MESSAGE_BODY_MAX_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "hub_message_post_request.body",
                reason: "exceeds max length",
            });
        }
        Ok(())
    }
}

/// The one composed Hub gate. UI layers render its tri-state result; access
/// is re-evaluated per request and every surfaced item re-passes the
/// visibility policy.
#[derive(Debug, Default, Clone)]
pub struct HubRuntime {
    access: HubAccessRuntime,
    visibility: VisibilityRuntime,
}

impl HubRuntime {
    pub fn hub_access(
        &self,
        store: &FieldStore,
        evaluator: &PermissionEvaluator,
        actor_id: &ActorId,
        work_order_id: &WorkOrderId,
    ) -> Result<HubAccess, CoreError> {
        let (actor, work_order) = self.resolve(store, actor_id, work_order_id)?;
        let link = resolve_contact_link(store, &work_order, actor_id);
        Ok(self
            .access
            .evaluate(evaluator, &actor, &work_order, link.as_ref())
            .access)
    }

    pub fn hub_payload(
        &self,
        store: &FieldStore,
        evaluator: &PermissionEvaluator,
        actor_id: &ActorId,
        work_order_id: &WorkOrderId,
    ) -> Result<HubPayloadOutcome, CoreError> {
        let (actor, work_order) = self.resolve(store, actor_id, work_order_id)?;
        let link = resolve_contact_link(store, &work_order, actor_id);
        let decision = self
            .access
            .evaluate(evaluator, &actor, &work_order, link.as_ref());
        match decision.access {
            HubAccess::NoClient => return Ok(HubPayloadOutcome::NoClient),
            HubAccess::Denied => return Ok(HubPayloadOutcome::Denied),
            HubAccess::Granted => {}
        }

        let payload = HubPayload {
            files: store
                .files_for_work_order(work_order_id)
                .into_iter()
                .cloned()
                .collect(),
            contacts: match &work_order.client_id {
                Some(client_id) => store
                    .contacts_for_client(client_id)
                    .into_iter()
                    .cloned()
                    .collect(),
                None => Vec::new(),
            },
            messages: store
                .hub_messages_for(work_order_id)
                .into_iter()
                .cloned()
                .collect(),
        };

        // Hub access is necessary but not sufficient for client contacts;
        // every item re-passes the visibility policy here.
        let view = if actor.role == Role::ClientContact {
            let approved = match &work_order.client_id {
                Some(client_id) => store.approved_contacts(client_id),
                None => Default::default(),
            };
            HubPayloadView::Client(self.access.filter_hub_payload(
                &self.visibility,
                &work_order,
                &payload,
                &approved,
            ))
        } else {
            HubPayloadView::Internal(payload)
        };
        Ok(HubPayloadOutcome::Granted(view))
    }

    /// Post into the channel. Requires `Granted` access; client contacts
    /// additionally need the post key and get tagged with their company
    /// name for display.
    pub fn post_hub_message(
        &self,
        store: &mut FieldStore,
        notifier: &dyn HubNotifier,
        evaluator: &PermissionEvaluator,
        req: &HubMessagePostRequest,
    ) -> Result<HubMessage, CoreError> {
        req.validate()?;
        let (actor, work_order) = self.resolve(store, &req.actor_id, &req.work_order_id)?;
        let link = resolve_contact_link(store, &work_order, &req.actor_id);
        let decision = self
            .access
            .evaluate(evaluator, &actor, &work_order, link.as_ref());
        match decision.access {
            HubAccess::NoClient => {
                return Err(CoreError::NotFound {
                    entity: "client",
                    key: req.work_order_id.as_str().to_string(),
                });
            }
            HubAccess::Denied => {
                return Err(CoreError::Forbidden {
                    permission: CLIENT_HUB_VIEW,
                });
            }
            HubAccess::Granted => {}
        }

        let sender_company_name = if actor.role == Role::ClientContact {
            if !evaluator.allows(&actor, CLIENT_HUB_POST) {
                return Err(CoreError::Forbidden {
                    permission: CLIENT_HUB_POST,
                });
            }
            link.as_ref()
                .and_then(|l| store.get_contact(&l.contact_id))
                .map(|c| c.company_name.clone())
        } else {
            None
        };

        let message_id = HubMessageId::new(format!(
            "msg_{}",
            short_hash_hex(&[
                req.work_order_id.as_str(),
                req.actor_id.as_str(),
                &req.now.0.to_string(),
                req.body.trim(),
            ])
        ))?;
        let message = HubMessage::v1(
            message_id,
            req.work_order_id.clone(),
            actor.actor_id.clone(),
            actor.display_name.clone(),
            sender_company_name,
            req.body.trim(),
            req.now,
        )?;
        store.append_hub_message(message.clone())?;
        store.append_audit_event(AuditEventInput::v1(
            req.now,
            req.correlation_id,
            actor.actor_id.clone(),
            Some(req.work_order_id.clone()),
            AuditEventType::HubMessagePosted,
            AuditSeverity::Info,
            vec![(
                PayloadKey::new("message_id")?,
                PayloadValue::new(message.message_id.as_str())?,
            )],
        )?)?;
        fire_and_forget(
            store,
            notifier,
            req.now,
            req.correlation_id,
            &actor.actor_id,
            &req.work_order_id,
            &HubEvent::HubMessagePosted {
                message_id: message.message_id.clone(),
            },
        );
        Ok(message)
    }

    fn resolve(
        &self,
        store: &FieldStore,
        actor_id: &ActorId,
        work_order_id: &WorkOrderId,
    ) -> Result<(Actor, WorkOrder), CoreError> {
        let actor = store
            .get_actor(actor_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "actor",
                key: actor_id.as_str().to_string(),
            })?;
        let work_order = store
            .get_work_order(work_order_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "work_order",
                key: work_order_id.as_str().to_string(),
            })?;
        Ok((actor, work_order))
    }
}

/// How this actor is linked to the work order's client, if at all.
fn resolve_contact_link(
    store: &FieldStore,
    work_order: &WorkOrder,
    actor_id: &ActorId,
) -> Option<ContactLink> {
    let client_id = work_order.client_id.as_ref()?;
    let contact = store.contact_by_portal_actor(client_id, actor_id)?;
    Some(ContactLink {
        contact_id: contact.contact_id.clone(),
        is_primary: work_order.pm_contact_id.as_ref() == Some(&contact.contact_id),
        approved_additional: store.has_contact_grant(client_id, &contact.contact_id),
    })
}

fn short_hash_hex(parts: &[&str]) -> String {
    // FNV-1a 64-bit; deterministic and bounded for id derivation.
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut h = OFFSET;
    for part in parts {
        for &b in part.as_bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(PRIME);
        }
        h ^= b'|' as u64;
        h = h.wrapping_mul(PRIME);
    }
    format!("{h:016x}")
}
