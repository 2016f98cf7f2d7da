#![forbid(unsafe_code)]

use fieldops_contracts::workorder::{StatusReason, WorkOrder, WorkOrderStatus};
use fieldops_contracts::{ContractViolation, ReasonCodeId};

pub mod reason_codes {
    use fieldops_contracts::ReasonCodeId;

    // Lifecycle reason-code namespace.
    pub const STATUS_TRANSITION_APPLIED: ReasonCodeId = ReasonCodeId(0x4C43_0001);
    pub const STATUS_REASON_SET: ReasonCodeId = ReasonCodeId(0x4C43_0002);
    pub const STATUS_REASON_CLEARED: ReasonCodeId = ReasonCodeId(0x4C43_0003);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionRejection {
    /// OnHold/Cancelled requested without a justification. Carries the
    /// attempted target so the caller can re-prompt.
    MissingReason { requested: WorkOrderStatus },
    Contract(ContractViolation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: WorkOrderStatus,
    pub status_reason: Option<StatusReason>,
    pub reason_code: ReasonCodeId,
}

/// The machine enforces only the reason invariant; any status may be
/// requested from any other, and a same-status request is a legal no-op.
/// Permission to request a transition is the caller's concern.
#[derive(Debug, Default, Clone)]
pub struct LifecycleRuntime;

impl LifecycleRuntime {
    pub fn transition(
        &self,
        current: &WorkOrder,
        requested: WorkOrderStatus,
        reason: Option<&str>,
    ) -> Result<StatusChange, TransitionRejection> {
        if requested.requires_reason() {
            let trimmed = reason.map(str::trim).unwrap_or("");
            if trimmed.is_empty() {
                return Err(TransitionRejection::MissingReason { requested });
            }
            let status_reason =
                StatusReason::new(trimmed).map_err(TransitionRejection::Contract)?;
            return Ok(StatusChange {
                status: requested,
                status_reason: Some(status_reason),
                reason_code: reason_codes::STATUS_REASON_SET,
            });
        }
        let reason_code = if current.status.requires_reason() {
            reason_codes::STATUS_REASON_CLEARED
        } else {
            reason_codes::STATUS_TRANSITION_APPLIED
        };
        Ok(StatusChange {
            status: requested,
            status_reason: None,
            reason_code,
        })
    }

    /// Produce the post-transition snapshot. Construction re-validates, so
    /// no path can yield a snapshot violating the reason invariant.
    pub fn apply(
        &self,
        current: &WorkOrder,
        change: &StatusChange,
    ) -> Result<WorkOrder, ContractViolation> {
        WorkOrder::v1(
            current.work_order_id.clone(),
            change.status,
            change.status_reason.clone(),
            current.owner_id.clone(),
            current.client_id.clone(),
            current.pm_contact_id.clone(),
            current.assigned_actor_ids.clone(),
            current.team_actor_ids.clone(),
        )
    }
}
