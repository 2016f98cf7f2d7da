#![forbid(unsafe_code)]

use fieldops_contracts::actor::{Actor, ActorId, Role};
use fieldops_contracts::audit::{
    AuditEventInput, AuditEventType, AuditSeverity, PayloadKey, PayloadValue,
};
use fieldops_contracts::{CorrelationId, MonotonicTimeNs};
use fieldops_storage::{FieldStore, StorageError};

fn seeded_store() -> (FieldStore, ActorId) {
    let mut store = FieldStore::new_in_memory();
    let actor = ActorId::new("actor_staff").unwrap();
    store
        .insert_actor(Actor::v1(actor.clone(), Role::OfficeStaff, true, "Staff").unwrap())
        .unwrap();
    (store, actor)
}

fn input(t: u64, actor: ActorId, payload: Vec<(PayloadKey, PayloadValue)>) -> AuditEventInput {
    AuditEventInput::v1(
        MonotonicTimeNs(t),
        CorrelationId(9),
        actor,
        None,
        AuditEventType::StatusChanged,
        AuditSeverity::Info,
        payload,
    )
    .unwrap()
}

fn kv(k: &str, v: &str) -> (PayloadKey, PayloadValue) {
    (PayloadKey::new(k).unwrap(), PayloadValue::new(v).unwrap())
}

#[test]
fn at_audit_db_01_event_ids_are_dense_and_ascending() {
    let (mut store, actor) = seeded_store();
    let a = store
        .append_audit_event(input(10, actor.clone(), vec![kv("to_status", "active")]))
        .unwrap();
    let b = store
        .append_audit_event(input(11, actor, vec![kv("to_status", "on_hold")]))
        .unwrap();
    assert_eq!(a.0, 1);
    assert_eq!(b.0, 2);
    assert_eq!(store.audit_events().len(), 2);
}

#[test]
fn at_audit_db_02_ledger_is_append_only() {
    let (mut store, actor) = seeded_store();
    let id = store
        .append_audit_event(input(10, actor, vec![]))
        .unwrap();
    assert!(matches!(
        store.attempt_overwrite_audit_event(id),
        Err(StorageError::AppendOnlyViolation {
            table: "audit_events",
        })
    ));
}

#[test]
fn at_audit_db_03_payload_hash_is_deterministic_per_content() {
    let (mut store, actor) = seeded_store();
    store
        .append_audit_event(input(10, actor.clone(), vec![kv("to_status", "active")]))
        .unwrap();
    store
        .append_audit_event(input(20, actor.clone(), vec![kv("to_status", "active")]))
        .unwrap();
    store
        .append_audit_event(input(30, actor, vec![kv("to_status", "completed")]))
        .unwrap();

    let rows = store.audit_events();
    assert_eq!(rows[0].payload_hash, rows[1].payload_hash);
    assert_ne!(rows[0].payload_hash, rows[2].payload_hash);
    assert_eq!(rows[0].payload_hash.len(), 32);
}
