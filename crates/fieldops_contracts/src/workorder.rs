#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::contact::{ClientId, ContactId};
use crate::{ContractViolation, CorrelationId, MonotonicTimeNs, SchemaVersion, Validate};

pub const WORK_ORDER_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

pub const STATUS_REASON_MAX_LEN: usize = 500;

fn validate_id(field: &'static str, value: &str, max_len: usize) -> Result<(), ContractViolation> {
    if value.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if value.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct WorkOrderId(String);

impl WorkOrderId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        validate_id("work_order_id", &v, 128)?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkOrderId {
    type Error = ContractViolation;

    fn try_from(v: String) -> Result<Self, ContractViolation> {
        WorkOrderId::new(v)
    }
}

impl Validate for WorkOrderId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("work_order_id", &self.0, 128)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Open,
    Active,
    OnHold,
    Completed,
    Submitted,
    Invoiced,
    Cancelled,
}

impl WorkOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkOrderStatus::Open => "open",
            WorkOrderStatus::Active => "active",
            WorkOrderStatus::OnHold => "on_hold",
            WorkOrderStatus::Completed => "completed",
            WorkOrderStatus::Submitted => "submitted",
            WorkOrderStatus::Invoiced => "invoiced",
            WorkOrderStatus::Cancelled => "cancelled",
        }
    }

    /// OnHold and Cancelled carry a mandatory justification; every other
    /// status must not carry one.
    pub fn requires_reason(self) -> bool {
        matches!(self, WorkOrderStatus::OnHold | WorkOrderStatus::Cancelled)
    }
}

/// Non-empty, trimmed justification text for OnHold/Cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct StatusReason(String);

impl StatusReason {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "status_reason",
                reason: "must not be empty",
            });
        }
        if trimmed.len() > STATUS_REASON_MAX_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "status_reason",
                reason: "exceeds max length",
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StatusReason {
    type Error = ContractViolation;

    fn try_from(v: String) -> Result<Self, ContractViolation> {
        StatusReason::new(v)
    }
}

impl Validate for StatusReason {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.trim().is_empty() || self.0.trim().len() != self.0.len() {
            return Err(ContractViolation::InvalidValue {
                field: "status_reason",
                reason: "must be non-empty and trimmed",
            });
        }
        if self.0.len() > STATUS_REASON_MAX_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "status_reason",
                reason: "exceeds max length",
            });
        }
        Ok(())
    }
}

/// Work-order snapshot. Deserialization goes through `WorkOrderWire` so the
/// reason invariant holds across persistence round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WorkOrderWire")]
pub struct WorkOrder {
    pub schema_version: SchemaVersion,
    pub work_order_id: WorkOrderId,
    pub status: WorkOrderStatus,
    pub status_reason: Option<StatusReason>,
    pub owner_id: ActorId,
    pub client_id: Option<ClientId>,
    pub pm_contact_id: Option<ContactId>,
    pub assigned_actor_ids: BTreeSet<ActorId>,
    pub team_actor_ids: BTreeSet<ActorId>,
}

impl WorkOrder {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        work_order_id: WorkOrderId,
        status: WorkOrderStatus,
        status_reason: Option<StatusReason>,
        owner_id: ActorId,
        client_id: Option<ClientId>,
        pm_contact_id: Option<ContactId>,
        assigned_actor_ids: BTreeSet<ActorId>,
        team_actor_ids: BTreeSet<ActorId>,
    ) -> Result<Self, ContractViolation> {
        let wo = Self {
            schema_version: WORK_ORDER_CONTRACT_VERSION,
            work_order_id,
            status,
            status_reason,
            owner_id,
            client_id,
            pm_contact_id,
            assigned_actor_ids,
            team_actor_ids,
        };
        wo.validate()?;
        Ok(wo)
    }

    /// New work order in its initial state.
    pub fn open_v1(
        work_order_id: WorkOrderId,
        owner_id: ActorId,
        client_id: Option<ClientId>,
        pm_contact_id: Option<ContactId>,
    ) -> Result<Self, ContractViolation> {
        Self::v1(
            work_order_id,
            WorkOrderStatus::Open,
            None,
            owner_id,
            client_id,
            pm_contact_id,
            BTreeSet::new(),
            BTreeSet::new(),
        )
    }
}

impl Validate for WorkOrder {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != WORK_ORDER_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "work_order.schema_version",
                reason: "must match WORK_ORDER_CONTRACT_VERSION",
            });
        }
        self.work_order_id.validate()?;
        self.owner_id.validate()?;
        if self.status.requires_reason() {
            match &self.status_reason {
                Some(reason) => reason.validate()?,
                None => {
                    return Err(ContractViolation::InvalidValue {
                        field: "work_order.status_reason",
                        reason: "must be present for on_hold/cancelled",
                    });
                }
            }
        } else if self.status_reason.is_some() {
            return Err(ContractViolation::InvalidValue {
                field: "work_order.status_reason",
                reason: "must be absent outside on_hold/cancelled",
            });
        }
        if let Some(client_id) = &self.client_id {
            client_id.validate()?;
        }
        if let Some(pm_contact_id) = &self.pm_contact_id {
            pm_contact_id.validate()?;
            if self.client_id.is_none() {
                return Err(ContractViolation::InvalidValue {
                    field: "work_order.pm_contact_id",
                    reason: "requires client_id",
                });
            }
        }
        for actor_id in self.assigned_actor_ids.iter().chain(&self.team_actor_ids) {
            actor_id.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct WorkOrderWire {
    pub schema_version: SchemaVersion,
    pub work_order_id: WorkOrderId,
    pub status: WorkOrderStatus,
    pub status_reason: Option<StatusReason>,
    pub owner_id: ActorId,
    pub client_id: Option<ClientId>,
    pub pm_contact_id: Option<ContactId>,
    pub assigned_actor_ids: BTreeSet<ActorId>,
    pub team_actor_ids: BTreeSet<ActorId>,
}

impl TryFrom<WorkOrderWire> for WorkOrder {
    type Error = ContractViolation;

    fn try_from(wire: WorkOrderWire) -> Result<Self, ContractViolation> {
        let wo = WorkOrder {
            schema_version: wire.schema_version,
            work_order_id: wire.work_order_id,
            status: wire.status,
            status_reason: wire.status_reason,
            owner_id: wire.owner_id,
            client_id: wire.client_id,
            pm_contact_id: wire.pm_contact_id,
            assigned_actor_ids: wire.assigned_actor_ids,
            team_actor_ids: wire.team_actor_ids,
        };
        wo.validate()?;
        Ok(wo)
    }
}

/// One append-only ledger row per successful status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOrderStatusEventInput {
    pub schema_version: SchemaVersion,
    pub created_at: MonotonicTimeNs,
    pub correlation_id: CorrelationId,
    pub work_order_id: WorkOrderId,
    pub actor_id: ActorId,
    pub from_status: WorkOrderStatus,
    pub to_status: WorkOrderStatus,
    pub status_reason: Option<StatusReason>,
}

impl WorkOrderStatusEventInput {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        created_at: MonotonicTimeNs,
        correlation_id: CorrelationId,
        work_order_id: WorkOrderId,
        actor_id: ActorId,
        from_status: WorkOrderStatus,
        to_status: WorkOrderStatus,
        status_reason: Option<StatusReason>,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            schema_version: WORK_ORDER_CONTRACT_VERSION,
            created_at,
            correlation_id,
            work_order_id,
            actor_id,
            from_status,
            to_status,
            status_reason,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for WorkOrderStatusEventInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != WORK_ORDER_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "work_order_status_event_input.schema_version",
                reason: "must match WORK_ORDER_CONTRACT_VERSION",
            });
        }
        if self.created_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "work_order_status_event_input.created_at",
                reason: "must be > 0",
            });
        }
        self.work_order_id.validate()?;
        self.actor_id.validate()?;
        if self.to_status.requires_reason() {
            match &self.status_reason {
                Some(reason) => reason.validate()?,
                None => {
                    return Err(ContractViolation::InvalidValue {
                        field: "work_order_status_event_input.status_reason",
                        reason: "must be present for on_hold/cancelled",
                    });
                }
            }
        } else if self.status_reason.is_some() {
            return Err(ContractViolation::InvalidValue {
                field: "work_order_status_event_input.status_reason",
                reason: "must be absent outside on_hold/cancelled",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOrderStatusEvent {
    pub schema_version: SchemaVersion,
    pub status_event_id: u64,
    pub created_at: MonotonicTimeNs,
    pub correlation_id: CorrelationId,
    pub work_order_id: WorkOrderId,
    pub actor_id: ActorId,
    pub from_status: WorkOrderStatus,
    pub to_status: WorkOrderStatus,
    pub status_reason: Option<StatusReason>,
}

impl WorkOrderStatusEvent {
    pub fn from_input_v1(
        status_event_id: u64,
        input: WorkOrderStatusEventInput,
    ) -> Result<Self, ContractViolation> {
        input.validate()?;
        let row = Self {
            schema_version: WORK_ORDER_CONTRACT_VERSION,
            status_event_id,
            created_at: input.created_at,
            correlation_id: input.correlation_id,
            work_order_id: input.work_order_id,
            actor_id: input.actor_id,
            from_status: input.from_status,
            to_status: input.to_status,
            status_reason: input.status_reason,
        };
        row.validate()?;
        Ok(row)
    }
}

impl Validate for WorkOrderStatusEvent {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.status_event_id == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "work_order_status_event.status_event_id",
                reason: "must be > 0",
            });
        }
        WorkOrderStatusEventInput {
            schema_version: self.schema_version,
            created_at: self.created_at,
            correlation_id: self.correlation_id,
            work_order_id: self.work_order_id.clone(),
            actor_id: self.actor_id.clone(),
            from_status: self.from_status,
            to_status: self.to_status,
            status_reason: self.status_reason.clone(),
        }
        .validate()
    }
}
