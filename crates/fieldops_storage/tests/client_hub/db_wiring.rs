#![forbid(unsafe_code)]

use fieldops_contracts::actor::{Actor, ActorId, Role};
use fieldops_contracts::contact::{ClientId, Contact, ContactId};
use fieldops_contracts::hub::{HubMessage, HubMessageId};
use fieldops_contracts::workorder::{WorkOrder, WorkOrderId};
use fieldops_contracts::MonotonicTimeNs;
use fieldops_storage::{FieldStore, StorageError};

fn client(v: &str) -> ClientId {
    ClientId::new(v).unwrap()
}

fn contact_id(v: &str) -> ContactId {
    ContactId::new(v).unwrap()
}

fn seeded_store() -> (FieldStore, ActorId, WorkOrderId) {
    let mut store = FieldStore::new_in_memory();
    let owner = ActorId::new("actor_owner").unwrap();
    store
        .insert_actor(Actor::v1(owner.clone(), Role::OfficeStaff, true, "Owner").unwrap())
        .unwrap();
    let wo_id = WorkOrderId::new("wo_1").unwrap();
    store
        .insert_work_order(
            WorkOrder::open_v1(wo_id.clone(), owner.clone(), Some(client("client_1")), None)
                .unwrap(),
        )
        .unwrap();
    (store, owner, wo_id)
}

fn seed_contact(store: &mut FieldStore, id: &str, client_id: &str) {
    store
        .insert_contact(
            Contact::v1(
                contact_id(id),
                client(client_id),
                "Dana Reyes",
                "Harbor Foods",
                None,
            )
            .unwrap(),
        )
        .unwrap();
}

#[test]
fn at_hub_db_01_grant_requires_contact_of_the_same_client() {
    let (mut store, _owner, _wo) = seeded_store();
    seed_contact(&mut store, "contact_other", "client_other");

    assert!(matches!(
        store.add_contact_grant(&client("client_1"), &contact_id("contact_missing")),
        Err(StorageError::ForeignKeyViolation { table: "contact_grants", .. })
    ));
    assert!(matches!(
        store.add_contact_grant(&client("client_1"), &contact_id("contact_other")),
        Err(StorageError::ForeignKeyViolation { table: "contact_grants", .. })
    ));
}

#[test]
fn at_hub_db_02_duplicate_grant_is_rejected() {
    let (mut store, _owner, _wo) = seeded_store();
    seed_contact(&mut store, "contact_1", "client_1");

    store
        .add_contact_grant(&client("client_1"), &contact_id("contact_1"))
        .unwrap();
    assert!(matches!(
        store.add_contact_grant(&client("client_1"), &contact_id("contact_1")),
        Err(StorageError::DuplicateKey { table: "contact_grants", .. })
    ));
}

#[test]
fn at_hub_db_03_grant_removal_is_a_hard_delete() {
    let (mut store, _owner, _wo) = seeded_store();
    seed_contact(&mut store, "contact_1", "client_1");

    store
        .add_contact_grant(&client("client_1"), &contact_id("contact_1"))
        .unwrap();
    assert!(store.has_contact_grant(&client("client_1"), &contact_id("contact_1")));

    store
        .remove_contact_grant(&client("client_1"), &contact_id("contact_1"))
        .unwrap();
    assert!(!store.has_contact_grant(&client("client_1"), &contact_id("contact_1")));
    assert!(store.approved_contacts(&client("client_1")).is_empty());

    // A second removal finds nothing; the grant is gone, not hidden.
    assert!(matches!(
        store.remove_contact_grant(&client("client_1"), &contact_id("contact_1")),
        Err(StorageError::RowNotFound { table: "contact_grants", .. })
    ));
}

#[test]
fn at_hub_db_04_removing_a_contact_sweeps_its_grants() {
    let (mut store, _owner, _wo) = seeded_store();
    seed_contact(&mut store, "contact_1", "client_1");
    store
        .add_contact_grant(&client("client_1"), &contact_id("contact_1"))
        .unwrap();

    store.remove_contact(&contact_id("contact_1")).unwrap();
    assert!(store.get_contact(&contact_id("contact_1")).is_none());
    assert!(!store.has_contact_grant(&client("client_1"), &contact_id("contact_1")));
}

#[test]
fn at_hub_db_05_contact_removal_keeps_hub_history() {
    let (mut store, owner, wo_id) = seeded_store();
    seed_contact(&mut store, "contact_1", "client_1");
    store
        .append_hub_message(
            HubMessage::v1(
                HubMessageId::new("msg_1").unwrap(),
                wo_id.clone(),
                owner,
                "Owner",
                None,
                "crew arrives at 8am",
                MonotonicTimeNs(50),
            )
            .unwrap(),
        )
        .unwrap();

    store.remove_contact(&contact_id("contact_1")).unwrap();
    assert_eq!(store.hub_messages_for(&wo_id).len(), 1);
}

#[test]
fn at_hub_db_06_hub_messages_fk_onto_work_orders_and_dedupe_by_id() {
    let (mut store, owner, wo_id) = seeded_store();
    let message = HubMessage::v1(
        HubMessageId::new("msg_1").unwrap(),
        wo_id,
        owner.clone(),
        "Owner",
        None,
        "crew arrives at 8am",
        MonotonicTimeNs(50),
    )
    .unwrap();
    store.append_hub_message(message.clone()).unwrap();
    assert!(matches!(
        store.append_hub_message(message),
        Err(StorageError::DuplicateKey { table: "hub_messages", .. })
    ));

    let orphan = HubMessage::v1(
        HubMessageId::new("msg_2").unwrap(),
        WorkOrderId::new("wo_missing").unwrap(),
        owner,
        "Owner",
        None,
        "lost message",
        MonotonicTimeNs(51),
    )
    .unwrap();
    assert!(matches!(
        store.append_hub_message(orphan),
        Err(StorageError::ForeignKeyViolation { table: "hub_messages", .. })
    ));
}

#[test]
fn at_hub_db_07_portal_actor_lookup_is_client_scoped() {
    let (mut store, _owner, _wo) = seeded_store();
    let portal = ActorId::new("actor_portal").unwrap();
    store
        .insert_actor(Actor::v1(portal.clone(), Role::ClientContact, true, "Dana").unwrap())
        .unwrap();
    store
        .insert_contact(
            Contact::v1(
                contact_id("contact_1"),
                client("client_1"),
                "Dana Reyes",
                "Harbor Foods",
                Some(portal.clone()),
            )
            .unwrap(),
        )
        .unwrap();

    assert!(store
        .contact_by_portal_actor(&client("client_1"), &portal)
        .is_some());
    assert!(store
        .contact_by_portal_actor(&client("client_other"), &portal)
        .is_none());
}
