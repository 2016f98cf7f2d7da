#![forbid(unsafe_code)]

use fieldops_contracts::actor::ActorId;
use fieldops_contracts::audit::{
    AuditEventInput, AuditEventType, AuditSeverity, PayloadKey, PayloadValue,
};
use fieldops_contracts::file::{FileId, FileRecord};
use fieldops_contracts::{
    ContractViolation, CorrelationId, MonotonicTimeNs, SchemaVersion, Validate,
};
use fieldops_engines::permission::PermissionEvaluator;
use fieldops_engines::visibility::{VisibilityError, VisibilityRuntime};
use fieldops_storage::FieldStore;

use crate::error::CoreError;
use crate::notify::{fire_and_forget, HubEvent, HubNotifier};

pub const FILE_OP_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVisibilityRequest {
    pub schema_version: SchemaVersion,
    pub correlation_id: CorrelationId,
    pub now: MonotonicTimeNs,
    pub actor_id: ActorId,
    pub file_id: FileId,
    pub make_visible: bool,
}

impl FileVisibilityRequest {
    pub fn v1(
        correlation_id: CorrelationId,
        now: MonotonicTimeNs,
        actor_id: ActorId,
        file_id: FileId,
        make_visible: bool,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            schema_version: FILE_OP_CONTRACT_VERSION,
            correlation_id,
            now,
            actor_id,
            file_id,
            make_visible,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for FileVisibilityRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != FILE_OP_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "file_visibility_request.schema_version",
                reason: "must match FILE_OP_CONTRACT_VERSION",
            });
        }
        if self.now.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "file_visibility_request.now",
                reason: "must be > 0",
            });
        }
        self.actor_id.validate()?;
        self.file_id.validate()?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct FileVisibilityRuntime {
    visibility: VisibilityRuntime,
}

impl FileVisibilityRuntime {
    /// Authorized toggle of a file's client visibility. An idempotent no-op
    /// returns the unchanged record and emits neither audit row nor event.
    pub fn toggle_file_visibility(
        &self,
        store: &mut FieldStore,
        notifier: &dyn HubNotifier,
        evaluator: &PermissionEvaluator,
        req: &FileVisibilityRequest,
    ) -> Result<FileRecord, CoreError> {
        req.validate()?;
        let actor = store
            .get_actor(&req.actor_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "actor",
                key: req.actor_id.as_str().to_string(),
            })?;
        let file = store
            .get_file(&req.file_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "file",
                key: req.file_id.as_str().to_string(),
            })?;

        let decision = self
            .visibility
            .set_client_visibility(evaluator, &actor, &file, req.make_visible)
            .map_err(|VisibilityError::Forbidden { permission }| CoreError::Forbidden {
                permission,
            })?;
        if !decision.changed {
            return Ok(decision.file);
        }

        store.update_file(decision.file.clone())?;
        store.append_audit_event(AuditEventInput::v1(
            req.now,
            req.correlation_id,
            actor.actor_id.clone(),
            Some(decision.file.work_order_id.clone()),
            AuditEventType::FileVisibilityChanged,
            AuditSeverity::Info,
            vec![
                (
                    PayloadKey::new("file_id")?,
                    PayloadValue::new(decision.file.file_id.as_str())?,
                ),
                (
                    PayloadKey::new("visible_to_client")?,
                    PayloadValue::new(if decision.file.visible_to_client {
                        "true"
                    } else {
                        "false"
                    })?,
                ),
            ],
        )?)?;
        fire_and_forget(
            store,
            notifier,
            req.now,
            req.correlation_id,
            &actor.actor_id,
            &decision.file.work_order_id,
            &HubEvent::FileVisibilityChanged {
                file_id: decision.file.file_id.clone(),
                visible_to_client: decision.file.visible_to_client,
            },
        );
        Ok(decision.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::test_support::RecordingNotifier;
    use crate::notify::NullNotifier;
    use fieldops_contracts::actor::{Actor, Role};
    use fieldops_contracts::file::FileCategory;
    use fieldops_contracts::permission::FILES_MANAGE;
    use fieldops_contracts::workorder::{WorkOrder, WorkOrderId};

    fn seeded() -> (FieldStore, ActorId, FileId) {
        let mut store = FieldStore::new_in_memory();
        let staff = ActorId::new("actor_staff").unwrap();
        store
            .insert_actor(Actor::v1(staff.clone(), Role::OfficeStaff, true, "Staff").unwrap())
            .unwrap();
        let tech = ActorId::new("actor_tech").unwrap();
        store
            .insert_actor(Actor::v1(tech, Role::Technician, true, "Tech").unwrap())
            .unwrap();
        let wo_id = WorkOrderId::new("wo_1").unwrap();
        store
            .insert_work_order(WorkOrder::open_v1(wo_id.clone(), staff.clone(), None, None).unwrap())
            .unwrap();
        let file_id = FileId::new("file_1").unwrap();
        store
            .insert_file(
                FileRecord::v1(
                    file_id.clone(),
                    wo_id,
                    false,
                    FileCategory::Photo,
                    staff.clone(),
                    "before.jpg",
                )
                .unwrap(),
            )
            .unwrap();
        (store, staff, file_id)
    }

    fn request(actor: &ActorId, file: &FileId, make_visible: bool) -> FileVisibilityRequest {
        FileVisibilityRequest::v1(
            CorrelationId(6),
            MonotonicTimeNs(200),
            actor.clone(),
            file.clone(),
            make_visible,
        )
        .unwrap()
    }

    #[test]
    fn at_core_file_01_toggle_requires_files_manage() {
        let runtime = FileVisibilityRuntime::default();
        let evaluator = PermissionEvaluator::builtin_v1();
        let (mut store, _staff, file_id) = seeded();

        let tech = ActorId::new("actor_tech").unwrap();
        let out = runtime.toggle_file_visibility(
            &mut store,
            &NullNotifier,
            &evaluator,
            &request(&tech, &file_id, true),
        );
        assert_eq!(
            out,
            Err(CoreError::Forbidden {
                permission: FILES_MANAGE,
            })
        );
        assert!(!store.get_file(&file_id).unwrap().visible_to_client);
    }

    #[test]
    fn at_core_file_02_authorized_toggle_persists_audits_and_notifies() {
        let runtime = FileVisibilityRuntime::default();
        let evaluator = PermissionEvaluator::builtin_v1();
        let notifier = RecordingNotifier::default();
        let (mut store, staff, file_id) = seeded();

        let updated = runtime
            .toggle_file_visibility(
                &mut store,
                &notifier,
                &evaluator,
                &request(&staff, &file_id, true),
            )
            .unwrap();
        assert!(updated.visible_to_client);
        assert!(store.get_file(&file_id).unwrap().visible_to_client);
        assert_eq!(store.audit_events().len(), 1);
        assert_eq!(notifier.delivered_count(), 1);
    }

    #[test]
    fn at_core_file_03_idempotent_toggle_emits_no_duplicate_event() {
        let runtime = FileVisibilityRuntime::default();
        let evaluator = PermissionEvaluator::builtin_v1();
        let notifier = RecordingNotifier::default();
        let (mut store, staff, file_id) = seeded();

        let first = runtime
            .toggle_file_visibility(
                &mut store,
                &notifier,
                &evaluator,
                &request(&staff, &file_id, true),
            )
            .unwrap();
        let second = runtime
            .toggle_file_visibility(
                &mut store,
                &notifier,
                &evaluator,
                &request(&staff, &file_id, true),
            )
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.audit_events().len(), 1);
        assert_eq!(notifier.delivered_count(), 1);
    }

    #[test]
    fn at_core_file_04_missing_file_surfaces_not_found() {
        let runtime = FileVisibilityRuntime::default();
        let evaluator = PermissionEvaluator::builtin_v1();
        let (mut store, staff, _file_id) = seeded();

        let missing = FileId::new("file_missing").unwrap();
        let out = runtime.toggle_file_visibility(
            &mut store,
            &NullNotifier,
            &evaluator,
            &request(&staff, &missing, true),
        );
        assert!(matches!(
            out,
            Err(CoreError::NotFound { entity: "file", .. })
        ));
    }
}
