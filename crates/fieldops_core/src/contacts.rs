#![forbid(unsafe_code)]

use fieldops_contracts::actor::ActorId;
use fieldops_contracts::audit::{
    AuditEventInput, AuditEventType, AuditSeverity, PayloadKey, PayloadValue,
};
use fieldops_contracts::contact::{ClientId, ContactId};
use fieldops_contracts::permission::CLIENT_HUB_MANAGE_CONTACTS;
use fieldops_contracts::{
    ContractViolation, CorrelationId, MonotonicTimeNs, SchemaVersion, Validate,
};
use fieldops_engines::permission::PermissionEvaluator;
use fieldops_storage::FieldStore;

use crate::error::CoreError;

pub const CONTACT_OP_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactGrantRequest {
    pub schema_version: SchemaVersion,
    pub correlation_id: CorrelationId,
    pub now: MonotonicTimeNs,
    pub actor_id: ActorId,
    pub client_id: ClientId,
    pub contact_id: ContactId,
}

impl ContactGrantRequest {
    pub fn v1(
        correlation_id: CorrelationId,
        now: MonotonicTimeNs,
        actor_id: ActorId,
        client_id: ClientId,
        contact_id: ContactId,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            schema_version: CONTACT_OP_CONTRACT_VERSION,
            correlation_id,
            now,
            actor_id,
            client_id,
            contact_id,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for ContactGrantRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != CONTACT_OP_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "contact_grant_request.schema_version",
                reason: "must match CONTACT_OP_CONTRACT_VERSION",
            });
        }
        if self.now.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "contact_grant_request.now",
                reason: "must be > 0",
            });
        }
        self.actor_id.validate()?;
        self.client_id.validate()?;
        self.contact_id.validate()?;
        Ok(())
    }
}

/// Additional-contact grants: who besides the primary contact may be
/// surfaced in (and enter) the Hub for a client's work orders.
#[derive(Debug, Default, Clone)]
pub struct ContactGrantRuntime;

impl ContactGrantRuntime {
    pub fn add_contact_grant(
        &self,
        store: &mut FieldStore,
        evaluator: &PermissionEvaluator,
        req: &ContactGrantRequest,
    ) -> Result<(), CoreError> {
        let actor = self.gate(store, evaluator, req)?;
        store.add_contact_grant(&req.client_id, &req.contact_id)?;
        self.audit(store, req, &actor, AuditEventType::ContactGrantAdded)?;
        Ok(())
    }

    /// Removal hard-deletes the grant; already-rendered Hub history is not
    /// rewritten.
    pub fn remove_contact_grant(
        &self,
        store: &mut FieldStore,
        evaluator: &PermissionEvaluator,
        req: &ContactGrantRequest,
    ) -> Result<(), CoreError> {
        let actor = self.gate(store, evaluator, req)?;
        store.remove_contact_grant(&req.client_id, &req.contact_id)?;
        self.audit(store, req, &actor, AuditEventType::ContactGrantRemoved)?;
        Ok(())
    }

    fn gate(
        &self,
        store: &FieldStore,
        evaluator: &PermissionEvaluator,
        req: &ContactGrantRequest,
    ) -> Result<ActorId, CoreError> {
        req.validate()?;
        let actor = store
            .get_actor(&req.actor_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "actor",
                key: req.actor_id.as_str().to_string(),
            })?;
        if !evaluator.allows(&actor, CLIENT_HUB_MANAGE_CONTACTS) {
            return Err(CoreError::Forbidden {
                permission: CLIENT_HUB_MANAGE_CONTACTS,
            });
        }
        Ok(actor.actor_id)
    }

    fn audit(
        &self,
        store: &mut FieldStore,
        req: &ContactGrantRequest,
        actor_id: &ActorId,
        event_type: AuditEventType,
    ) -> Result<(), CoreError> {
        store.append_audit_event(AuditEventInput::v1(
            req.now,
            req.correlation_id,
            actor_id.clone(),
            None,
            event_type,
            AuditSeverity::Info,
            vec![
                (
                    PayloadKey::new("client_id")?,
                    PayloadValue::new(req.client_id.as_str())?,
                ),
                (
                    PayloadKey::new("contact_id")?,
                    PayloadValue::new(req.contact_id.as_str())?,
                ),
            ],
        )?)?;
        Ok(())
    }
}
