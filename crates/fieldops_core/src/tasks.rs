#![forbid(unsafe_code)]

use fieldops_contracts::actor::ActorId;
use fieldops_contracts::audit::{
    AuditEventInput, AuditEventType, AuditSeverity, PayloadKey, PayloadValue,
};
use fieldops_contracts::permission::JOBS_TASKS_CHECKLIST_TOGGLE;
use fieldops_contracts::task::{ChecklistItemId, Task, TaskId};
use fieldops_contracts::{
    ContractViolation, CorrelationId, MonotonicTimeNs, SchemaVersion, Validate,
};
use fieldops_engines::permission::PermissionEvaluator;
use fieldops_engines::progress::progress;
use fieldops_storage::FieldStore;

use crate::error::CoreError;

pub const TASK_OP_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistToggleRequest {
    pub schema_version: SchemaVersion,
    pub correlation_id: CorrelationId,
    pub now: MonotonicTimeNs,
    pub actor_id: ActorId,
    pub task_id: TaskId,
    pub item_id: ChecklistItemId,
    pub done: bool,
}

impl ChecklistToggleRequest {
    pub fn v1(
        correlation_id: CorrelationId,
        now: MonotonicTimeNs,
        actor_id: ActorId,
        task_id: TaskId,
        item_id: ChecklistItemId,
        done: bool,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            schema_version: TASK_OP_CONTRACT_VERSION,
            correlation_id,
            now,
            actor_id,
            task_id,
            item_id,
            done,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for ChecklistToggleRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != TASK_OP_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "checklist_toggle_request.schema_version",
                reason: "must match TASK_OP_CONTRACT_VERSION",
            });
        }
        if self.now.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "checklist_toggle_request.now",
                reason: "must be > 0",
            });
        }
        self.actor_id.validate()?;
        self.task_id.validate()?;
        self.item_id.validate()?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct TaskRuntime;

impl TaskRuntime {
    /// Completion percentage, recomputed from the checklist on every read.
    pub fn task_progress(&self, store: &FieldStore, task_id: &TaskId) -> Result<u8, CoreError> {
        let task = store.get_task(task_id).ok_or_else(|| CoreError::NotFound {
            entity: "task",
            key: task_id.as_str().to_string(),
        })?;
        Ok(progress(task))
    }

    /// Toggle one checklist item. Completion metadata follows the flag;
    /// re-asserting the held state is a no-op without an audit row.
    pub fn toggle_checklist_item(
        &self,
        store: &mut FieldStore,
        evaluator: &PermissionEvaluator,
        req: &ChecklistToggleRequest,
    ) -> Result<Task, CoreError> {
        req.validate()?;
        let actor = store
            .get_actor(&req.actor_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "actor",
                key: req.actor_id.as_str().to_string(),
            })?;
        if !evaluator.allows(&actor, JOBS_TASKS_CHECKLIST_TOGGLE) {
            return Err(CoreError::Forbidden {
                permission: JOBS_TASKS_CHECKLIST_TOGGLE,
            });
        }
        let mut task = store
            .get_task(&req.task_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "task",
                key: req.task_id.as_str().to_string(),
            })?;

        let item = task
            .items
            .iter_mut()
            .find(|item| item.item_id == req.item_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "checklist_item",
                key: req.item_id.as_str().to_string(),
            })?;
        if item.done == req.done {
            return Ok(task);
        }
        if req.done {
            item.done = true;
            item.completed_by = Some(actor.actor_id.clone());
            item.completed_at = Some(req.now);
        } else {
            item.done = false;
            item.completed_by = None;
            item.completed_at = None;
        }

        store.update_task(task.clone())?;
        store.append_audit_event(AuditEventInput::v1(
            req.now,
            req.correlation_id,
            actor.actor_id.clone(),
            Some(task.work_order_id.clone()),
            AuditEventType::ChecklistItemToggled,
            AuditSeverity::Info,
            vec![
                (
                    PayloadKey::new("task_id")?,
                    PayloadValue::new(task.task_id.as_str())?,
                ),
                (
                    PayloadKey::new("item_id")?,
                    PayloadValue::new(req.item_id.as_str())?,
                ),
                (
                    PayloadKey::new("done")?,
                    PayloadValue::new(if req.done { "true" } else { "false" })?,
                ),
            ],
        )?)?;
        Ok(task)
    }
}
