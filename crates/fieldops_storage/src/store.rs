#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

use fieldops_contracts::actor::{Actor, ActorId};
use fieldops_contracts::audit::{AuditEvent, AuditEventId, AuditEventInput};
use fieldops_contracts::contact::{ClientId, Contact, ContactId};
use fieldops_contracts::file::{FileId, FileRecord};
use fieldops_contracts::hub::{HubMessage, HubMessageId};
use fieldops_contracts::task::{Task, TaskId};
use fieldops_contracts::workorder::{
    WorkOrder, WorkOrderId, WorkOrderStatusEvent, WorkOrderStatusEventInput,
};
use fieldops_contracts::{ContractViolation, Validate};

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    DuplicateKey { table: &'static str, key: String },
    ForeignKeyViolation { table: &'static str, key: String },
    AppendOnlyViolation { table: &'static str },
    RowNotFound { table: &'static str, key: String },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

fn payload_hash_hex(parts: &[(&str, &str)]) -> String {
    let mut hasher = Sha256::new();
    for (k, v) in parts {
        hasher.update(k.as_bytes());
        hasher.update([0x1f]);
        hasher.update(v.as_bytes());
        hasher.update([0x1e]);
    }
    let digest = hasher.finalize();
    // First 16 bytes hex; enough to pin the row, short enough to index.
    let mut out = String::with_capacity(32);
    for byte in &digest[..16] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// In-memory reference store. Stands in for the external persistence
/// collaborator: current-record tables plus append-only status and audit
/// ledgers. Writes are last-write-wins; there is no version token.
#[derive(Debug, Default, Clone)]
pub struct FieldStore {
    actors: BTreeMap<ActorId, Actor>,
    work_orders: BTreeMap<WorkOrderId, WorkOrder>,
    files: BTreeMap<FileId, FileRecord>,
    contacts: BTreeMap<ContactId, Contact>,
    contact_grants: BTreeSet<(ClientId, ContactId)>,
    tasks: BTreeMap<TaskId, Task>,
    hub_messages: Vec<HubMessage>,
    status_events: Vec<WorkOrderStatusEvent>,
    audit_events: Vec<AuditEvent>,
}

impl FieldStore {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    // ---- actors ----

    pub fn insert_actor(&mut self, actor: Actor) -> Result<(), StorageError> {
        actor.validate()?;
        if self.actors.contains_key(&actor.actor_id) {
            return Err(StorageError::DuplicateKey {
                table: "actors",
                key: actor.actor_id.as_str().to_string(),
            });
        }
        self.actors.insert(actor.actor_id.clone(), actor);
        Ok(())
    }

    pub fn get_actor(&self, actor_id: &ActorId) -> Option<&Actor> {
        self.actors.get(actor_id)
    }

    pub fn actor_count(&self) -> u64 {
        self.actors.len() as u64
    }

    pub fn update_actor(&mut self, actor: Actor) -> Result<(), StorageError> {
        actor.validate()?;
        if !self.actors.contains_key(&actor.actor_id) {
            return Err(StorageError::RowNotFound {
                table: "actors",
                key: actor.actor_id.as_str().to_string(),
            });
        }
        self.actors.insert(actor.actor_id.clone(), actor);
        Ok(())
    }

    // ---- work orders ----

    pub fn insert_work_order(&mut self, work_order: WorkOrder) -> Result<(), StorageError> {
        work_order.validate()?;
        if self.work_orders.contains_key(&work_order.work_order_id) {
            return Err(StorageError::DuplicateKey {
                table: "work_orders",
                key: work_order.work_order_id.as_str().to_string(),
            });
        }
        if !self.actors.contains_key(&work_order.owner_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "work_orders",
                key: work_order.owner_id.as_str().to_string(),
            });
        }
        if let Some(pm_contact_id) = &work_order.pm_contact_id {
            self.require_contact_of_client(pm_contact_id, work_order.client_id.as_ref())?;
        }
        self.work_orders
            .insert(work_order.work_order_id.clone(), work_order);
        Ok(())
    }

    pub fn get_work_order(&self, work_order_id: &WorkOrderId) -> Option<&WorkOrder> {
        self.work_orders.get(work_order_id)
    }

    pub fn work_order_count(&self) -> u64 {
        self.work_orders.len() as u64
    }

    /// Last-write-wins; concurrent transitions race and the later write
    /// silently wins.
    pub fn update_work_order(&mut self, work_order: WorkOrder) -> Result<(), StorageError> {
        work_order.validate()?;
        if !self.work_orders.contains_key(&work_order.work_order_id) {
            return Err(StorageError::RowNotFound {
                table: "work_orders",
                key: work_order.work_order_id.as_str().to_string(),
            });
        }
        self.work_orders
            .insert(work_order.work_order_id.clone(), work_order);
        Ok(())
    }

    // ---- files ----

    pub fn insert_file(&mut self, file: FileRecord) -> Result<(), StorageError> {
        file.validate()?;
        if self.files.contains_key(&file.file_id) {
            return Err(StorageError::DuplicateKey {
                table: "files",
                key: file.file_id.as_str().to_string(),
            });
        }
        if !self.work_orders.contains_key(&file.work_order_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "files",
                key: file.work_order_id.as_str().to_string(),
            });
        }
        if !self.actors.contains_key(&file.uploaded_by) {
            return Err(StorageError::ForeignKeyViolation {
                table: "files",
                key: file.uploaded_by.as_str().to_string(),
            });
        }
        self.files.insert(file.file_id.clone(), file);
        Ok(())
    }

    pub fn get_file(&self, file_id: &FileId) -> Option<&FileRecord> {
        self.files.get(file_id)
    }

    pub fn update_file(&mut self, file: FileRecord) -> Result<(), StorageError> {
        file.validate()?;
        if !self.files.contains_key(&file.file_id) {
            return Err(StorageError::RowNotFound {
                table: "files",
                key: file.file_id.as_str().to_string(),
            });
        }
        self.files.insert(file.file_id.clone(), file);
        Ok(())
    }

    pub fn files_for_work_order(&self, work_order_id: &WorkOrderId) -> Vec<&FileRecord> {
        self.files
            .values()
            .filter(|f| &f.work_order_id == work_order_id)
            .collect()
    }

    // ---- contacts and grants ----

    pub fn insert_contact(&mut self, contact: Contact) -> Result<(), StorageError> {
        contact.validate()?;
        if self.contacts.contains_key(&contact.contact_id) {
            return Err(StorageError::DuplicateKey {
                table: "contacts",
                key: contact.contact_id.as_str().to_string(),
            });
        }
        if let Some(portal_actor_id) = &contact.portal_actor_id {
            if !self.actors.contains_key(portal_actor_id) {
                return Err(StorageError::ForeignKeyViolation {
                    table: "contacts",
                    key: portal_actor_id.as_str().to_string(),
                });
            }
        }
        self.contacts.insert(contact.contact_id.clone(), contact);
        Ok(())
    }

    pub fn get_contact(&self, contact_id: &ContactId) -> Option<&Contact> {
        self.contacts.get(contact_id)
    }

    /// Hard delete of the contact and every grant that references it.
    pub fn remove_contact(&mut self, contact_id: &ContactId) -> Result<Contact, StorageError> {
        let removed = self.contacts.remove(contact_id).ok_or_else(|| {
            StorageError::RowNotFound {
                table: "contacts",
                key: contact_id.as_str().to_string(),
            }
        })?;
        self.contact_grants
            .retain(|(_, granted)| granted != contact_id);
        Ok(removed)
    }

    pub fn contacts_for_client(&self, client_id: &ClientId) -> Vec<&Contact> {
        self.contacts
            .values()
            .filter(|c| &c.client_id == client_id)
            .collect()
    }

    pub fn contact_by_portal_actor(
        &self,
        client_id: &ClientId,
        actor_id: &ActorId,
    ) -> Option<&Contact> {
        self.contacts.values().find(|c| {
            &c.client_id == client_id && c.portal_actor_id.as_ref() == Some(actor_id)
        })
    }

    pub fn add_contact_grant(
        &mut self,
        client_id: &ClientId,
        contact_id: &ContactId,
    ) -> Result<(), StorageError> {
        self.require_contact_of_client(contact_id, Some(client_id))?;
        if !self
            .contact_grants
            .insert((client_id.clone(), contact_id.clone()))
        {
            return Err(StorageError::DuplicateKey {
                table: "contact_grants",
                key: format!("{}:{}", client_id.as_str(), contact_id.as_str()),
            });
        }
        Ok(())
    }

    /// Grant removal is a hard delete, not a soft hide.
    pub fn remove_contact_grant(
        &mut self,
        client_id: &ClientId,
        contact_id: &ContactId,
    ) -> Result<(), StorageError> {
        if !self
            .contact_grants
            .remove(&(client_id.clone(), contact_id.clone()))
        {
            return Err(StorageError::RowNotFound {
                table: "contact_grants",
                key: format!("{}:{}", client_id.as_str(), contact_id.as_str()),
            });
        }
        Ok(())
    }

    pub fn has_contact_grant(&self, client_id: &ClientId, contact_id: &ContactId) -> bool {
        self.contact_grants
            .contains(&(client_id.clone(), contact_id.clone()))
    }

    pub fn approved_contacts(&self, client_id: &ClientId) -> BTreeSet<ContactId> {
        self.contact_grants
            .iter()
            .filter(|(granted_client, _)| granted_client == client_id)
            .map(|(_, contact_id)| contact_id.clone())
            .collect()
    }

    fn require_contact_of_client(
        &self,
        contact_id: &ContactId,
        client_id: Option<&ClientId>,
    ) -> Result<(), StorageError> {
        let contact = self.contacts.get(contact_id).ok_or_else(|| {
            StorageError::ForeignKeyViolation {
                table: "contact_grants",
                key: contact_id.as_str().to_string(),
            }
        })?;
        if Some(&contact.client_id) != client_id {
            return Err(StorageError::ForeignKeyViolation {
                table: "contact_grants",
                key: contact_id.as_str().to_string(),
            });
        }
        Ok(())
    }

    // ---- tasks ----

    pub fn insert_task(&mut self, task: Task) -> Result<(), StorageError> {
        task.validate()?;
        if self.tasks.contains_key(&task.task_id) {
            return Err(StorageError::DuplicateKey {
                table: "tasks",
                key: task.task_id.as_str().to_string(),
            });
        }
        if !self.work_orders.contains_key(&task.work_order_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "tasks",
                key: task.work_order_id.as_str().to_string(),
            });
        }
        self.tasks.insert(task.task_id.clone(), task);
        Ok(())
    }

    pub fn get_task(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn update_task(&mut self, task: Task) -> Result<(), StorageError> {
        task.validate()?;
        if !self.tasks.contains_key(&task.task_id) {
            return Err(StorageError::RowNotFound {
                table: "tasks",
                key: task.task_id.as_str().to_string(),
            });
        }
        self.tasks.insert(task.task_id.clone(), task);
        Ok(())
    }

    // ---- hub messages ----

    pub fn append_hub_message(&mut self, message: HubMessage) -> Result<(), StorageError> {
        message.validate()?;
        if !self.work_orders.contains_key(&message.work_order_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "hub_messages",
                key: message.work_order_id.as_str().to_string(),
            });
        }
        if self
            .hub_messages
            .iter()
            .any(|m| m.message_id == message.message_id)
        {
            return Err(StorageError::DuplicateKey {
                table: "hub_messages",
                key: message.message_id.as_str().to_string(),
            });
        }
        self.hub_messages.push(message);
        Ok(())
    }

    pub fn hub_messages_for(&self, work_order_id: &WorkOrderId) -> Vec<&HubMessage> {
        self.hub_messages
            .iter()
            .filter(|m| &m.work_order_id == work_order_id)
            .collect()
    }

    pub fn get_hub_message(&self, message_id: &HubMessageId) -> Option<&HubMessage> {
        self.hub_messages
            .iter()
            .find(|m| &m.message_id == message_id)
    }

    // ---- status ledger ----

    pub fn append_status_event(
        &mut self,
        input: WorkOrderStatusEventInput,
    ) -> Result<u64, StorageError> {
        if !self.work_orders.contains_key(&input.work_order_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "work_order_status_events",
                key: input.work_order_id.as_str().to_string(),
            });
        }
        let status_event_id = self.status_events.len() as u64 + 1;
        let row = WorkOrderStatusEvent::from_input_v1(status_event_id, input)?;
        self.status_events.push(row);
        Ok(status_event_id)
    }

    pub fn status_events(&self) -> &[WorkOrderStatusEvent] {
        &self.status_events
    }

    pub fn status_events_for(&self, work_order_id: &WorkOrderId) -> Vec<&WorkOrderStatusEvent> {
        self.status_events
            .iter()
            .filter(|e| &e.work_order_id == work_order_id)
            .collect()
    }

    /// Ledger rows are immutable once appended.
    pub fn attempt_overwrite_status_event(&mut self, _status_event_id: u64) -> Result<(), StorageError> {
        Err(StorageError::AppendOnlyViolation {
            table: "work_order_status_events",
        })
    }

    // ---- audit ledger ----

    pub fn append_audit_event(&mut self, input: AuditEventInput) -> Result<AuditEventId, StorageError> {
        let audit_event_id = AuditEventId(self.audit_events.len() as u64 + 1);
        let parts: Vec<(&str, &str)> = std::iter::once((
            "event_type",
            input.event_type.as_str(),
        ))
        .chain(
            input
                .payload
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )
        .collect();
        let payload_hash = payload_hash_hex(&parts);
        let row = AuditEvent::from_input_v1(audit_event_id, payload_hash, input)?;
        self.audit_events.push(row);
        Ok(audit_event_id)
    }

    pub fn audit_events(&self) -> &[AuditEvent] {
        &self.audit_events
    }

    pub fn attempt_overwrite_audit_event(&mut self, _audit_event_id: AuditEventId) -> Result<(), StorageError> {
        Err(StorageError::AppendOnlyViolation {
            table: "audit_events",
        })
    }
}
