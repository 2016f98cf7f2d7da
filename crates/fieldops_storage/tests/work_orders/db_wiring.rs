#![forbid(unsafe_code)]

use fieldops_contracts::actor::{Actor, ActorId, Role};
use fieldops_contracts::workorder::{
    StatusReason, WorkOrder, WorkOrderId, WorkOrderStatus, WorkOrderStatusEventInput,
};
use fieldops_contracts::{CorrelationId, MonotonicTimeNs};
use fieldops_storage::{FieldStore, StorageError};

fn actor_id(v: &str) -> ActorId {
    ActorId::new(v).unwrap()
}

fn wo_id(v: &str) -> WorkOrderId {
    WorkOrderId::new(v).unwrap()
}

fn seed_owner(store: &mut FieldStore, id: &str) -> ActorId {
    let owner = actor_id(id);
    store
        .insert_actor(Actor::v1(owner.clone(), Role::OfficeStaff, true, "Owner").unwrap())
        .unwrap();
    owner
}

fn status_event(
    t: u64,
    work_order_id: WorkOrderId,
    actor: ActorId,
    from: WorkOrderStatus,
    to: WorkOrderStatus,
    reason: Option<&str>,
) -> WorkOrderStatusEventInput {
    WorkOrderStatusEventInput::v1(
        MonotonicTimeNs(t),
        CorrelationId(77),
        work_order_id,
        actor,
        from,
        to,
        reason.map(|r| StatusReason::new(r).unwrap()),
    )
    .unwrap()
}

#[test]
fn at_wo_db_01_insert_requires_existing_owner() {
    let mut store = FieldStore::new_in_memory();
    let wo = WorkOrder::open_v1(wo_id("wo_1"), actor_id("actor_ghost"), None, None).unwrap();
    assert!(matches!(
        store.insert_work_order(wo),
        Err(StorageError::ForeignKeyViolation { table: "work_orders", .. })
    ));
}

#[test]
fn at_wo_db_02_duplicate_work_order_id_is_rejected() {
    let mut store = FieldStore::new_in_memory();
    let owner = seed_owner(&mut store, "actor_owner");
    let wo = WorkOrder::open_v1(wo_id("wo_1"), owner.clone(), None, None).unwrap();
    store.insert_work_order(wo.clone()).unwrap();
    assert!(matches!(
        store.insert_work_order(wo),
        Err(StorageError::DuplicateKey { table: "work_orders", .. })
    ));
}

#[test]
fn at_wo_db_03_update_is_last_write_wins() {
    let mut store = FieldStore::new_in_memory();
    let owner = seed_owner(&mut store, "actor_owner");
    let wo = WorkOrder::open_v1(wo_id("wo_1"), owner.clone(), None, None).unwrap();
    store.insert_work_order(wo.clone()).unwrap();

    let mut first = wo.clone();
    first.status = WorkOrderStatus::Active;
    let mut second = wo.clone();
    second.status = WorkOrderStatus::Completed;

    store.update_work_order(first).unwrap();
    store.update_work_order(second).unwrap();
    assert_eq!(
        store.get_work_order(&wo_id("wo_1")).unwrap().status,
        WorkOrderStatus::Completed
    );
}

#[test]
fn at_wo_db_04_status_ledger_is_append_only() {
    let mut store = FieldStore::new_in_memory();
    let owner = seed_owner(&mut store, "actor_owner");
    let wo = WorkOrder::open_v1(wo_id("wo_1"), owner.clone(), None, None).unwrap();
    store.insert_work_order(wo).unwrap();

    let event_id = store
        .append_status_event(status_event(
            10,
            wo_id("wo_1"),
            owner,
            WorkOrderStatus::Open,
            WorkOrderStatus::Active,
            None,
        ))
        .unwrap();
    assert_eq!(event_id, 1);
    assert!(matches!(
        store.attempt_overwrite_status_event(event_id),
        Err(StorageError::AppendOnlyViolation {
            table: "work_order_status_events",
        })
    ));
}

#[test]
fn at_wo_db_05_status_ledger_replays_to_current_snapshot() {
    let mut store = FieldStore::new_in_memory();
    let owner = seed_owner(&mut store, "actor_owner");
    let wo = WorkOrder::open_v1(wo_id("wo_1"), owner.clone(), None, None).unwrap();
    store.insert_work_order(wo.clone()).unwrap();

    let steps = [
        (WorkOrderStatus::Open, WorkOrderStatus::Active, None),
        (
            WorkOrderStatus::Active,
            WorkOrderStatus::OnHold,
            Some("parts delay"),
        ),
        (WorkOrderStatus::OnHold, WorkOrderStatus::Completed, None),
    ];
    let mut current = wo;
    for (i, (from, to, reason)) in steps.iter().enumerate() {
        store
            .append_status_event(status_event(
                10 + i as u64,
                wo_id("wo_1"),
                owner.clone(),
                *from,
                *to,
                *reason,
            ))
            .unwrap();
        current.status = *to;
        current.status_reason = reason.map(|r| StatusReason::new(r).unwrap());
        store.update_work_order(current.clone()).unwrap();
    }

    let last = store.status_events_for(&wo_id("wo_1")).pop().unwrap().clone();
    let stored = store.get_work_order(&wo_id("wo_1")).unwrap();
    assert_eq!(stored.status, last.to_status);
    assert_eq!(stored.status_reason, last.status_reason);
    assert_eq!(store.status_events().len(), 3);
}

#[test]
fn at_wo_db_06_rejected_event_rows_never_land_in_the_ledger() {
    let mut store = FieldStore::new_in_memory();
    let owner = seed_owner(&mut store, "actor_owner");
    let wo = WorkOrder::open_v1(wo_id("wo_1"), owner, None, None).unwrap();
    store.insert_work_order(wo).unwrap();

    // Ledger rows FK onto work_orders.
    let orphan = status_event(
        10,
        wo_id("wo_missing"),
        actor_id("actor_owner"),
        WorkOrderStatus::Open,
        WorkOrderStatus::Active,
        None,
    );
    assert!(matches!(
        store.append_status_event(orphan),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
    assert!(store.status_events().is_empty());
}
