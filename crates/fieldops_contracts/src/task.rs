#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::workorder::WorkOrderId;
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const TASK_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

pub const TASK_MAX_CHECKLIST_ITEMS: usize = 256;

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
pub struct TaskId(String);

impl TaskId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        validate_id("task_id", &v, 128)?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskId {
    type Error = ContractViolation;

    fn try_from(v: String) -> Result<Self, ContractViolation> {
        TaskId::new(v)
    }
}

impl Validate for TaskId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("task_id", &self.0, 128)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ChecklistItemId(String);

impl ChecklistItemId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        validate_id("checklist_item_id", &v, 128)?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChecklistItemId {
    type Error = ContractViolation;

    fn try_from(v: String) -> Result<Self, ContractViolation> {
        ChecklistItemId::new(v)
    }
}

impl Validate for ChecklistItemId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("checklist_item_id", &self.0, 128)
    }
}

/// Completion metadata travels with the flag: an open item carries neither
/// completer nor timestamp, a done item carries both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item_id: ChecklistItemId,
    pub label: String,
    pub done: bool,
    pub completed_by: Option<ActorId>,
    pub completed_at: Option<MonotonicTimeNs>,
}

impl ChecklistItem {
    pub fn open_v1(
        item_id: ChecklistItemId,
        label: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let item = Self {
            item_id,
            label: label.into(),
            done: false,
            completed_by: None,
            completed_at: None,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn completed_v1(
        item_id: ChecklistItemId,
        label: impl Into<String>,
        completed_by: ActorId,
        completed_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let item = Self {
            item_id,
            label: label.into(),
            done: true,
            completed_by: Some(completed_by),
            completed_at: Some(completed_at),
        };
        item.validate()?;
        Ok(item)
    }
}

impl Validate for ChecklistItem {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.item_id.validate()?;
        validate_id("checklist_item.label", &self.label, 200)?;
        if self.done {
            if self.completed_by.is_none() || self.completed_at.is_none() {
                return Err(ContractViolation::InvalidValue {
                    field: "checklist_item.completed_by",
                    reason: "done item requires completer and timestamp",
                });
            }
        } else if self.completed_by.is_some() || self.completed_at.is_some() {
            return Err(ContractViolation::InvalidValue {
                field: "checklist_item.completed_by",
                reason: "open item must not carry completion metadata",
            });
        }
        if let Some(actor_id) = &self.completed_by {
            actor_id.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub schema_version: SchemaVersion,
    pub task_id: TaskId,
    pub work_order_id: WorkOrderId,
    pub items: Vec<ChecklistItem>,
}

impl Task {
    pub fn v1(
        task_id: TaskId,
        work_order_id: WorkOrderId,
        items: Vec<ChecklistItem>,
    ) -> Result<Self, ContractViolation> {
        let task = Self {
            schema_version: TASK_CONTRACT_VERSION,
            task_id,
            work_order_id,
            items,
        };
        task.validate()?;
        Ok(task)
    }
}

impl Validate for Task {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != TASK_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "task.schema_version",
                reason: "must match TASK_CONTRACT_VERSION",
            });
        }
        self.task_id.validate()?;
        self.work_order_id.validate()?;
        if self.items.len() > TASK_MAX_CHECKLIST_ITEMS {
            return Err(ContractViolation::InvalidRange {
                field: "task.items",
                min: 0,
                max: TASK_MAX_CHECKLIST_ITEMS as u64,
                got: self.items.len() as u64,
            });
        }
        let mut seen = std::collections::BTreeSet::new();
        for item in &self.items {
            item.validate()?;
            if !seen.insert(&item.item_id) {
                return Err(ContractViolation::InvalidValue {
                    field: "task.items",
                    reason: "checklist item ids must be unique",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_id(v: &str) -> ChecklistItemId {
        ChecklistItemId::new(v).unwrap()
    }

    #[test]
    fn at_task_01_done_item_requires_completion_metadata() {
        let item = ChecklistItem {
            item_id: item_id("item_1"),
            label: "torque check".to_string(),
            done: true,
            completed_by: None,
            completed_at: None,
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn at_task_02_open_item_must_not_carry_completion_metadata() {
        let item = ChecklistItem {
            item_id: item_id("item_1"),
            label: "torque check".to_string(),
            done: false,
            completed_by: Some(ActorId::new("actor_1").unwrap()),
            completed_at: None,
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn at_task_03_duplicate_item_ids_are_rejected() {
        let out = Task::v1(
            TaskId::new("task_1").unwrap(),
            WorkOrderId::new("wo_1").unwrap(),
            vec![
                ChecklistItem::open_v1(item_id("item_1"), "a").unwrap(),
                ChecklistItem::open_v1(item_id("item_1"), "b").unwrap(),
            ],
        );
        assert!(out.is_err());
    }
}
