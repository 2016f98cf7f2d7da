#![forbid(unsafe_code)]

use fieldops_contracts::actor::ActorId;
use fieldops_contracts::audit::{
    AuditEventInput, AuditEventType, AuditSeverity, PayloadKey, PayloadValue,
};
use fieldops_contracts::permission::JOBS_STATUS_CHANGE;
use fieldops_contracts::workorder::{
    WorkOrder, WorkOrderId, WorkOrderStatus, WorkOrderStatusEventInput, STATUS_REASON_MAX_LEN,
};
use fieldops_contracts::{
    ContractViolation, CorrelationId, MonotonicTimeNs, SchemaVersion, Validate,
};
use fieldops_engines::lifecycle::{LifecycleRuntime, TransitionRejection};
use fieldops_engines::permission::PermissionEvaluator;
use fieldops_storage::FieldStore;

use crate::error::CoreError;
use crate::notify::{fire_and_forget, HubEvent, HubNotifier};

pub const WORK_ORDER_OP_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransitionRequest {
    pub schema_version: SchemaVersion,
    pub correlation_id: CorrelationId,
    pub now: MonotonicTimeNs,
    pub actor_id: ActorId,
    pub work_order_id: WorkOrderId,
    pub requested_status: WorkOrderStatus,
    pub reason: Option<String>,
}

impl StatusTransitionRequest {
    pub fn v1(
        correlation_id: CorrelationId,
        now: MonotonicTimeNs,
        actor_id: ActorId,
        work_order_id: WorkOrderId,
        requested_status: WorkOrderStatus,
        reason: Option<String>,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            schema_version: WORK_ORDER_OP_CONTRACT_VERSION,
            correlation_id,
            now,
            actor_id,
            work_order_id,
            requested_status,
            reason,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for StatusTransitionRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != WORK_ORDER_OP_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "status_transition_request.schema_version",
                reason: "must match WORK_ORDER_OP_CONTRACT_VERSION",
            });
        }
        if self.now.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "status_transition_request.now",
                reason: "must be > 0",
            });
        }
        self.actor_id.validate()?;
        self.work_order_id.validate()?;
        // Emptiness is the state machine's concern (MissingReason carries the
        // attempted target); only the length bound is a contract matter.
        if let Some(reason) = &self.reason {
            if reason.trim().len() > STATUS_REASON_MAX_LEN {
                return Err(ContractViolation::InvalidValue {
                    field: "status_transition_request.reason",
                    reason: "exceeds max length",
                });
            }
        }
        Ok(())
    }
}

/// Permission gate, then the state machine, then persistence, ledger, audit
/// and fan-out. The gate and the machine stay separate concerns: the machine
/// answers "is this transition well-formed", never "may this actor do it".
#[derive(Debug, Default, Clone)]
pub struct WorkOrderRuntime {
    lifecycle: LifecycleRuntime,
}

impl WorkOrderRuntime {
    pub fn transition_status(
        &self,
        store: &mut FieldStore,
        notifier: &dyn HubNotifier,
        evaluator: &PermissionEvaluator,
        req: &StatusTransitionRequest,
    ) -> Result<WorkOrder, CoreError> {
        req.validate()?;
        let actor = store
            .get_actor(&req.actor_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "actor",
                key: req.actor_id.as_str().to_string(),
            })?;
        let current = store
            .get_work_order(&req.work_order_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "work_order",
                key: req.work_order_id.as_str().to_string(),
            })?;
        if !evaluator.allows(&actor, JOBS_STATUS_CHANGE) {
            return Err(CoreError::Forbidden {
                permission: JOBS_STATUS_CHANGE,
            });
        }

        let change = self
            .lifecycle
            .transition(&current, req.requested_status, req.reason.as_deref())
            .map_err(|rejection| match rejection {
                TransitionRejection::MissingReason { requested } => {
                    CoreError::MissingReason { requested }
                }
                TransitionRejection::Contract(violation) => CoreError::Contract(violation),
            })?;
        let updated = self.lifecycle.apply(&current, &change)?;

        store.update_work_order(updated.clone())?;
        store.append_status_event(WorkOrderStatusEventInput::v1(
            req.now,
            req.correlation_id,
            updated.work_order_id.clone(),
            actor.actor_id.clone(),
            current.status,
            updated.status,
            updated.status_reason.clone(),
        )?)?;
        store.append_audit_event(AuditEventInput::v1(
            req.now,
            req.correlation_id,
            actor.actor_id.clone(),
            Some(updated.work_order_id.clone()),
            AuditEventType::StatusChanged,
            AuditSeverity::Info,
            vec![
                (
                    PayloadKey::new("from_status")?,
                    PayloadValue::new(current.status.as_str())?,
                ),
                (
                    PayloadKey::new("to_status")?,
                    PayloadValue::new(updated.status.as_str())?,
                ),
            ],
        )?)?;
        fire_and_forget(
            store,
            notifier,
            req.now,
            req.correlation_id,
            &actor.actor_id,
            &updated.work_order_id,
            &HubEvent::StatusChanged {
                work_order_id: updated.work_order_id.clone(),
                to_status: updated.status,
            },
        );
        Ok(updated)
    }
}
