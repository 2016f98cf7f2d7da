#![forbid(unsafe_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use fieldops_contracts::actor::ActorId;
use fieldops_contracts::contact::{ClientId, ContactId};
use fieldops_contracts::file::{FileId, FileRecord};
use fieldops_contracts::hub::{HubAccess, HubMessage};
use fieldops_contracts::task::{ChecklistItemId, TaskId};
use fieldops_contracts::workorder::{WorkOrder, WorkOrderId, WorkOrderStatus};
use fieldops_contracts::{ContractViolation, CorrelationId, MonotonicTimeNs};
use fieldops_core::contacts::{ContactGrantRequest, ContactGrantRuntime};
use fieldops_core::files::{FileVisibilityRequest, FileVisibilityRuntime};
use fieldops_core::hub::{HubMessagePostRequest, HubRuntime};
use fieldops_core::notify::NullNotifier;
use fieldops_core::tasks::{ChecklistToggleRequest, TaskRuntime};
use fieldops_core::workorder::{StatusTransitionRequest, WorkOrderRuntime};
use fieldops_core::CoreError;
use fieldops_engines::permission::PermissionEvaluator;
use fieldops_storage::FieldStore;

// Outcome tags surfaced to the UI layer. The transport binary maps these to
// HTTP status codes; policy rejections stay caller-recoverable.
pub const OUTCOME_OK: &str = "OK";
pub const OUTCOME_FORBIDDEN: &str = "FORBIDDEN";
pub const OUTCOME_MISSING_REASON: &str = "MISSING_REASON";
pub const OUTCOME_NOT_FOUND: &str = "NOT_FOUND";
pub const OUTCOME_INVALID: &str = "INVALID";
pub const OUTCOME_TRANSPORT: &str = "TRANSPORT";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub actor_count: u64,
    pub work_order_count: u64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuthzCheckAdapterRequest {
    pub actor_id: String,
    pub permission_key: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuthzCheckAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub allowed: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatusTransitionAdapterRequest {
    pub correlation_id: u64,
    pub actor_id: String,
    pub work_order_id: String,
    pub requested_status: String,
    pub reason: Option<String>,
    pub now_ns: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WorkOrderAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub work_order: Option<WorkOrder>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FileVisibilityAdapterRequest {
    pub correlation_id: u64,
    pub actor_id: String,
    pub file_id: String,
    pub make_visible: bool,
    pub now_ns: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FileVisibilityAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub file_id: Option<String>,
    pub visible_to_client: Option<bool>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HubAccessAdapterRequest {
    pub actor_id: String,
    pub work_order_id: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HubAccessAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub access: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HubMessageAdapterRequest {
    pub correlation_id: u64,
    pub actor_id: String,
    pub work_order_id: String,
    pub body: String,
    pub now_ns: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HubMessageAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub message_id: Option<String>,
    pub sender_display_name: Option<String>,
    pub sender_company_name: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ContactGrantAdapterRequest {
    pub correlation_id: u64,
    pub actor_id: String,
    pub client_id: String,
    pub contact_id: String,
    pub remove: bool,
    pub now_ns: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ContactGrantAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChecklistToggleAdapterRequest {
    pub correlation_id: u64,
    pub actor_id: String,
    pub task_id: String,
    pub item_id: String,
    pub done: bool,
    pub now_ns: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskProgressAdapterRequest {
    pub task_id: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskProgressAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub progress: Option<u8>,
}

/// Everything the HTTP surface needs behind one struct: the store, the
/// catalog-backed evaluator and the composed runtimes.
#[derive(Debug)]
pub struct AdapterRuntime {
    store: FieldStore,
    evaluator: PermissionEvaluator,
    notifier: NullNotifier,
    work_orders: WorkOrderRuntime,
    files: FileVisibilityRuntime,
    hub: HubRuntime,
    contacts: ContactGrantRuntime,
    tasks: TaskRuntime,
}

impl AdapterRuntime {
    pub fn new_in_memory() -> Self {
        Self {
            store: FieldStore::new_in_memory(),
            evaluator: PermissionEvaluator::builtin_v1(),
            notifier: NullNotifier,
            work_orders: WorkOrderRuntime::default(),
            files: FileVisibilityRuntime::default(),
            hub: HubRuntime::default(),
            contacts: ContactGrantRuntime,
            tasks: TaskRuntime,
        }
    }

    /// Fixture/persistence-sync access for embedding callers and tests.
    pub fn store_mut(&mut self) -> &mut FieldStore {
        &mut self.store
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    pub fn health_report(&self) -> AdapterHealthResponse {
        AdapterHealthResponse {
            status: "ok".to_string(),
            outcome: "HEALTHY".to_string(),
            reason: None,
            actor_count: self.store.actor_count(),
            work_order_count: self.store.work_order_count(),
        }
    }

    pub fn check_authz(&self, request: &AuthzCheckAdapterRequest) -> AuthzCheckAdapterResponse {
        let actor_id = match ActorId::new(request.actor_id.clone()) {
            Ok(actor_id) => actor_id,
            Err(violation) => return authz_error(OUTCOME_INVALID, violation.to_string()),
        };
        let Some(actor) = self.store.get_actor(&actor_id) else {
            return authz_error(OUTCOME_NOT_FOUND, format!("actor {} not found", request.actor_id));
        };
        // Malformed keys are not an error surface: the evaluator fails
        // closed and the caller just sees allowed=false.
        AuthzCheckAdapterResponse {
            status: "ok".to_string(),
            outcome: OUTCOME_OK.to_string(),
            reason: None,
            allowed: self.evaluator.allows(actor, &request.permission_key),
        }
    }

    pub fn transition_status(
        &mut self,
        request: &StatusTransitionAdapterRequest,
    ) -> WorkOrderAdapterResponse {
        let outcome = self.transition_status_inner(request);
        match outcome {
            Ok(work_order) => WorkOrderAdapterResponse {
                status: "ok".to_string(),
                outcome: OUTCOME_OK.to_string(),
                reason: None,
                work_order: Some(work_order),
            },
            Err(err) => {
                let (outcome, reason) = error_outcome(&err);
                WorkOrderAdapterResponse {
                    status: "error".to_string(),
                    outcome: outcome.to_string(),
                    reason: Some(reason),
                    work_order: None,
                }
            }
        }
    }

    fn transition_status_inner(
        &mut self,
        request: &StatusTransitionAdapterRequest,
    ) -> Result<WorkOrder, CoreError> {
        let requested_status = parse_status(&request.requested_status)?;
        let req = StatusTransitionRequest::v1(
            CorrelationId(request.correlation_id),
            now_or_wall_clock(request.now_ns),
            ActorId::new(request.actor_id.clone())?,
            WorkOrderId::new(request.work_order_id.clone())?,
            requested_status,
            request.reason.clone(),
        )?;
        self.work_orders
            .transition_status(&mut self.store, &self.notifier, &self.evaluator, &req)
    }

    pub fn toggle_file_visibility(
        &mut self,
        request: &FileVisibilityAdapterRequest,
    ) -> FileVisibilityAdapterResponse {
        let outcome = (|| -> Result<FileRecord, CoreError> {
            let req = FileVisibilityRequest::v1(
                CorrelationId(request.correlation_id),
                now_or_wall_clock(request.now_ns),
                ActorId::new(request.actor_id.clone())?,
                FileId::new(request.file_id.clone())?,
                request.make_visible,
            )?;
            self.files
                .toggle_file_visibility(&mut self.store, &self.notifier, &self.evaluator, &req)
        })();
        match outcome {
            Ok(file) => FileVisibilityAdapterResponse {
                status: "ok".to_string(),
                outcome: OUTCOME_OK.to_string(),
                reason: None,
                file_id: Some(file.file_id.as_str().to_string()),
                visible_to_client: Some(file.visible_to_client),
            },
            Err(err) => {
                let (outcome, reason) = error_outcome(&err);
                FileVisibilityAdapterResponse {
                    status: "error".to_string(),
                    outcome: outcome.to_string(),
                    reason: Some(reason),
                    file_id: None,
                    visible_to_client: None,
                }
            }
        }
    }

    pub fn hub_access(&self, request: &HubAccessAdapterRequest) -> HubAccessAdapterResponse {
        let outcome = (|| -> Result<HubAccess, CoreError> {
            let actor_id = ActorId::new(request.actor_id.clone())?;
            let work_order_id = WorkOrderId::new(request.work_order_id.clone())?;
            self.hub
                .hub_access(&self.store, &self.evaluator, &actor_id, &work_order_id)
        })();
        match outcome {
            Ok(access) => HubAccessAdapterResponse {
                status: "ok".to_string(),
                outcome: OUTCOME_OK.to_string(),
                reason: None,
                access: Some(access.as_str().to_string()),
            },
            Err(err) => {
                let (outcome, reason) = error_outcome(&err);
                HubAccessAdapterResponse {
                    status: "error".to_string(),
                    outcome: outcome.to_string(),
                    reason: Some(reason),
                    access: None,
                }
            }
        }
    }

    pub fn post_hub_message(
        &mut self,
        request: &HubMessageAdapterRequest,
    ) -> HubMessageAdapterResponse {
        let outcome = (|| -> Result<HubMessage, CoreError> {
            let req = HubMessagePostRequest::v1(
                CorrelationId(request.correlation_id),
                now_or_wall_clock(request.now_ns),
                ActorId::new(request.actor_id.clone())?,
                WorkOrderId::new(request.work_order_id.clone())?,
                request.body.clone(),
            )?;
            self.hub
                .post_hub_message(&mut self.store, &self.notifier, &self.evaluator, &req)
        })();
        match outcome {
            Ok(message) => HubMessageAdapterResponse {
                status: "ok".to_string(),
                outcome: OUTCOME_OK.to_string(),
                reason: None,
                message_id: Some(message.message_id.as_str().to_string()),
                sender_display_name: Some(message.sender_display_name),
                sender_company_name: message.sender_company_name,
            },
            Err(err) => {
                let (outcome, reason) = error_outcome(&err);
                HubMessageAdapterResponse {
                    status: "error".to_string(),
                    outcome: outcome.to_string(),
                    reason: Some(reason),
                    message_id: None,
                    sender_display_name: None,
                    sender_company_name: None,
                }
            }
        }
    }

    pub fn contact_grant(
        &mut self,
        request: &ContactGrantAdapterRequest,
    ) -> ContactGrantAdapterResponse {
        let outcome = (|| -> Result<(), CoreError> {
            let req = ContactGrantRequest::v1(
                CorrelationId(request.correlation_id),
                now_or_wall_clock(request.now_ns),
                ActorId::new(request.actor_id.clone())?,
                ClientId::new(request.client_id.clone())?,
                ContactId::new(request.contact_id.clone())?,
            )?;
            if request.remove {
                self.contacts
                    .remove_contact_grant(&mut self.store, &self.evaluator, &req)
            } else {
                self.contacts
                    .add_contact_grant(&mut self.store, &self.evaluator, &req)
            }
        })();
        match outcome {
            Ok(()) => ContactGrantAdapterResponse {
                status: "ok".to_string(),
                outcome: OUTCOME_OK.to_string(),
                reason: None,
            },
            Err(err) => {
                let (outcome, reason) = error_outcome(&err);
                ContactGrantAdapterResponse {
                    status: "error".to_string(),
                    outcome: outcome.to_string(),
                    reason: Some(reason),
                }
            }
        }
    }

    pub fn toggle_checklist_item(
        &mut self,
        request: &ChecklistToggleAdapterRequest,
    ) -> TaskProgressAdapterResponse {
        let outcome = (|| -> Result<u8, CoreError> {
            let req = ChecklistToggleRequest::v1(
                CorrelationId(request.correlation_id),
                now_or_wall_clock(request.now_ns),
                ActorId::new(request.actor_id.clone())?,
                TaskId::new(request.task_id.clone())?,
                ChecklistItemId::new(request.item_id.clone())?,
                request.done,
            )?;
            self.tasks
                .toggle_checklist_item(&mut self.store, &self.evaluator, &req)?;
            self.tasks
                .task_progress(&self.store, &TaskId::new(request.task_id.clone())?)
        })();
        progress_response(outcome)
    }

    pub fn task_progress(&self, request: &TaskProgressAdapterRequest) -> TaskProgressAdapterResponse {
        let outcome = (|| -> Result<u8, CoreError> {
            let task_id = TaskId::new(request.task_id.clone())?;
            self.tasks.task_progress(&self.store, &task_id)
        })();
        progress_response(outcome)
    }
}

impl Default for AdapterRuntime {
    fn default() -> Self {
        Self::new_in_memory()
    }
}

fn authz_error(outcome: &str, reason: String) -> AuthzCheckAdapterResponse {
    AuthzCheckAdapterResponse {
        status: "error".to_string(),
        outcome: outcome.to_string(),
        reason: Some(reason),
        allowed: false,
    }
}

fn progress_response(outcome: Result<u8, CoreError>) -> TaskProgressAdapterResponse {
    match outcome {
        Ok(progress) => TaskProgressAdapterResponse {
            status: "ok".to_string(),
            outcome: OUTCOME_OK.to_string(),
            reason: None,
            progress: Some(progress),
        },
        Err(err) => {
            let (outcome, reason) = error_outcome(&err);
            TaskProgressAdapterResponse {
                status: "error".to_string(),
                outcome: outcome.to_string(),
                reason: Some(reason),
                progress: None,
            }
        }
    }
}

fn parse_status(v: &str) -> Result<WorkOrderStatus, CoreError> {
    match v {
        "open" => Ok(WorkOrderStatus::Open),
        "active" => Ok(WorkOrderStatus::Active),
        "on_hold" => Ok(WorkOrderStatus::OnHold),
        "completed" => Ok(WorkOrderStatus::Completed),
        "submitted" => Ok(WorkOrderStatus::Submitted),
        "invoiced" => Ok(WorkOrderStatus::Invoiced),
        "cancelled" => Ok(WorkOrderStatus::Cancelled),
        _ => Err(CoreError::Contract(ContractViolation::InvalidValue {
            field: "requested_status",
            reason: "unknown status token",
        })),
    }
}

fn now_or_wall_clock(now_ns: Option<u64>) -> MonotonicTimeNs {
    match now_ns {
        Some(ns) if ns > 0 => MonotonicTimeNs(ns),
        _ => {
            let ns = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(1);
            MonotonicTimeNs(ns.max(1))
        }
    }
}

pub fn error_outcome(err: &CoreError) -> (&'static str, String) {
    match err {
        CoreError::Forbidden { permission } => (
            OUTCOME_FORBIDDEN,
            format!("missing permission {permission}"),
        ),
        CoreError::MissingReason { requested } => (
            OUTCOME_MISSING_REASON,
            format!("status {} requires a reason", requested.as_str()),
        ),
        CoreError::NotFound { entity, key } => {
            (OUTCOME_NOT_FOUND, format!("{entity} {key} not found"))
        }
        CoreError::Transport { detail } => (OUTCOME_TRANSPORT, detail.clone()),
        CoreError::Contract(violation) => (OUTCOME_INVALID, violation.to_string()),
        CoreError::Storage(storage) => (OUTCOME_INVALID, format!("{storage:?}")),
    }
}
