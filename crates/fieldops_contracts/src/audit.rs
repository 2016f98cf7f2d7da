#![forbid(unsafe_code)]

use crate::actor::ActorId;
use crate::workorder::WorkOrderId;
use crate::{ContractViolation, CorrelationId, MonotonicTimeNs, SchemaVersion, Validate};

pub const AUDIT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

pub const AUDIT_PAYLOAD_MAX_ENTRIES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuditEventId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditEventType {
    StatusChanged,
    FileVisibilityChanged,
    ContactGrantAdded,
    ContactGrantRemoved,
    HubMessagePosted,
    ChecklistItemToggled,
    NotifyDeliveryFailed,
}

impl AuditEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEventType::StatusChanged => "STATUS_CHANGED",
            AuditEventType::FileVisibilityChanged => "FILE_VISIBILITY_CHANGED",
            AuditEventType::ContactGrantAdded => "CONTACT_GRANT_ADDED",
            AuditEventType::ContactGrantRemoved => "CONTACT_GRANT_REMOVED",
            AuditEventType::HubMessagePosted => "HUB_MESSAGE_POSTED",
            AuditEventType::ChecklistItemToggled => "CHECKLIST_ITEM_TOGGLED",
            AuditEventType::NotifyDeliveryFailed => "NOTIFY_DELIVERY_FAILED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuditSeverity {
    Info,
    Warn,
}

impl AuditSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditSeverity::Info => "INFO",
            AuditSeverity::Warn => "WARN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PayloadKey(String);

impl PayloadKey {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        if v.is_empty() || v.len() > 48 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_payload_key",
                reason: "must be 1..=48 bytes",
            });
        }
        if !v
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ContractViolation::InvalidValue {
                field: "audit_payload_key",
                reason: "must be [a-z0-9_]+",
            });
        }
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadValue(String);

impl PayloadValue {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        if v.is_empty() || v.len() > 160 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_payload_value",
                reason: "must be 1..=160 bytes",
            });
        }
        if !v.is_ascii() {
            return Err(ContractViolation::InvalidValue {
                field: "audit_payload_value",
                reason: "must be ASCII",
            });
        }
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Bounded key/value detail attached to an audit row. The ledger stores this
/// plus a deterministic hash; free-form prose never lands in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEventInput {
    pub schema_version: SchemaVersion,
    pub created_at: MonotonicTimeNs,
    pub correlation_id: CorrelationId,
    pub actor_id: ActorId,
    pub work_order_id: Option<WorkOrderId>,
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub payload: Vec<(PayloadKey, PayloadValue)>,
}

impl AuditEventInput {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        created_at: MonotonicTimeNs,
        correlation_id: CorrelationId,
        actor_id: ActorId,
        work_order_id: Option<WorkOrderId>,
        event_type: AuditEventType,
        severity: AuditSeverity,
        payload: Vec<(PayloadKey, PayloadValue)>,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            schema_version: AUDIT_CONTRACT_VERSION,
            created_at,
            correlation_id,
            actor_id,
            work_order_id,
            event_type,
            severity,
            payload,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for AuditEventInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != AUDIT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "audit_event_input.schema_version",
                reason: "must match AUDIT_CONTRACT_VERSION",
            });
        }
        if self.created_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_event_input.created_at",
                reason: "must be > 0",
            });
        }
        self.actor_id.validate()?;
        if let Some(work_order_id) = &self.work_order_id {
            work_order_id.validate()?;
        }
        if self.payload.len() > AUDIT_PAYLOAD_MAX_ENTRIES {
            return Err(ContractViolation::InvalidRange {
                field: "audit_event_input.payload",
                min: 0,
                max: AUDIT_PAYLOAD_MAX_ENTRIES as u64,
                got: self.payload.len() as u64,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub schema_version: SchemaVersion,
    pub audit_event_id: AuditEventId,
    pub created_at: MonotonicTimeNs,
    pub correlation_id: CorrelationId,
    pub actor_id: ActorId,
    pub work_order_id: Option<WorkOrderId>,
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub payload: Vec<(PayloadKey, PayloadValue)>,
    pub payload_hash: String,
}

impl AuditEvent {
    pub fn from_input_v1(
        audit_event_id: AuditEventId,
        payload_hash: String,
        input: AuditEventInput,
    ) -> Result<Self, ContractViolation> {
        input.validate()?;
        let row = Self {
            schema_version: AUDIT_CONTRACT_VERSION,
            audit_event_id,
            created_at: input.created_at,
            correlation_id: input.correlation_id,
            actor_id: input.actor_id,
            work_order_id: input.work_order_id,
            event_type: input.event_type,
            severity: input.severity,
            payload: input.payload,
            payload_hash,
        };
        row.validate()?;
        Ok(row)
    }
}

impl Validate for AuditEvent {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.audit_event_id.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_event.audit_event_id",
                reason: "must be > 0",
            });
        }
        if self.payload_hash.is_empty() || self.payload_hash.len() > 64 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_event.payload_hash",
                reason: "must be 1..=64 bytes",
            });
        }
        AuditEventInput {
            schema_version: self.schema_version,
            created_at: self.created_at,
            correlation_id: self.correlation_id,
            actor_id: self.actor_id.clone(),
            work_order_id: self.work_order_id.clone(),
            event_type: self.event_type,
            severity: self.severity,
            payload: self.payload.clone(),
        }
        .validate()
    }
}
