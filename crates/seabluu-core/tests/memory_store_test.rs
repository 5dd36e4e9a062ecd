//! Behavior of the in-memory store used by bot and API tests.
//!
//! These tests pin down the semantics the PostgreSQL repositories share:
//! case-insensitive order ids, normalized usernames, newest-first listings.

use seabluu_core::{
    models::{AdminRole, NewAddress, NewOrder, UserId, STATUSES},
    store::{mock::MemoryStore, BotStore},
    CoreError,
};

fn order(order_id: &str, status: &str) -> NewOrder {
    NewOrder {
        order_id: order_id.to_string(),
        client_name: Some("@alice_1 @bob_22".to_string()),
        phone: Some("+7 700 123-45-67".to_string()),
        origin: Some("CN".to_string()),
        status: status.to_string(),
        note: Some("Partia Marka".to_string()),
        country: Some("CN".to_string()),
    }
}

#[tokio::test]
async fn orders_are_found_case_insensitively_and_upsert_replaces() {
    let store = MemoryStore::new();
    let created = store.upsert_order(&order("CN-100", STATUSES[0])).await.unwrap();

    let found = store.find_order("cn-100").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);

    let replaced = store.upsert_order(&order("CN-100", STATUSES[3])).await.unwrap();
    assert_eq!(replaced.id, created.id);
    assert_eq!(replaced.status, STATUSES[3]);
    assert_eq!(store.recent_orders(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn recent_orders_are_newest_first() {
    let store = MemoryStore::new();
    store.upsert_order(&order("CN-1", STATUSES[0])).await.unwrap();
    store.upsert_order(&order("CN-2", STATUSES[0])).await.unwrap();
    store.update_order_status("cn-1", STATUSES[1]).await.unwrap();

    let ids: Vec<String> =
        store.recent_orders(5).await.unwrap().into_iter().map(|o| o.order_id).collect();
    assert_eq!(ids, vec!["CN-1", "CN-2"]);
    assert!(!store.update_order_status("CN-404", STATUSES[1]).await.unwrap());
}

#[tokio::test]
async fn lookups_by_note_username_and_phone() {
    let store = MemoryStore::new();
    store.upsert_order(&order("CN-1", STATUSES[0])).await.unwrap();
    store.ensure_participants("CN-1", &["@Alice_1".to_string()]).await.unwrap();

    assert_eq!(store.orders_by_note("marka").await.unwrap().len(), 1);
    assert!(store.orders_by_note("  ").await.unwrap().is_empty());
    assert_eq!(store.orders_by_username("@ALICE_1").await.unwrap().len(), 1);
    assert_eq!(store.orders_by_phone("87001234567").await.unwrap().len(), 0);
    assert_eq!(store.orders_by_phone("7 700 123 45 67").await.unwrap().len(), 1);
    assert!(store.orders_by_phone("abc").await.unwrap().is_empty());
}

#[tokio::test]
async fn participants_toggle_and_group_debtors() {
    let store = MemoryStore::new();
    let names = vec!["@zed_user".to_string(), "alice_1".to_string(), "alice_1".to_string()];
    store.ensure_participants("CN-1", &names).await.unwrap();
    store.ensure_participants("KR-2", &["@bob_22".to_string()]).await.unwrap();

    let list = store.participants("cn-1").await.unwrap();
    assert_eq!(list.iter().map(|p| p.username.as_str()).collect::<Vec<_>>(), ["alice_1", "zed_user"]);

    assert_eq!(store.toggle_paid("CN-1", "@alice_1").await.unwrap(), Some(true));
    assert_eq!(store.toggle_paid("CN-1", "nobody").await.unwrap(), None);
    assert_eq!(store.unpaid_usernames("CN-1").await.unwrap(), vec!["zed_user"]);

    let grouped = store.unpaid_grouped().await.unwrap();
    assert_eq!(
        grouped,
        vec![
            ("CN-1".to_string(), vec!["zed_user".to_string()]),
            ("KR-2".to_string(), vec!["bob_22".to_string()]),
        ]
    );

    assert!(store.set_paid("KR-2", "bob_22", true).await.unwrap());
    assert_eq!(store.unpaid_grouped().await.unwrap().len(), 1);
}

#[tokio::test]
async fn subscriptions_are_idempotent_and_show_current_status() {
    let store = MemoryStore::new();
    let user = UserId(42);
    store.upsert_order(&order("CN-1", STATUSES[2])).await.unwrap();

    store.subscribe(user, "CN-1").await.unwrap();
    store.subscribe(user, "cn-1").await.unwrap();
    assert_eq!(store.subscribers("CN-1").await.unwrap().len(), 1);
    assert!(store.is_subscribed(user, "cn-1").await.unwrap());

    store.set_last_sent_status(user, "CN-1", Some(STATUSES[2])).await.unwrap();
    let views = store.subscriptions_for_user(user).await.unwrap();
    assert_eq!(views[0].status.as_deref(), Some(STATUSES[2]));
    assert_eq!(views[0].last_sent_status.as_deref(), Some(STATUSES[2]));

    store.reset_last_sent("CN-1").await.unwrap();
    assert_eq!(store.subscribers("CN-1").await.unwrap()[0].last_sent_status, None);

    assert!(store.unsubscribe(user, "CN-1").await.unwrap());
    assert!(!store.unsubscribe(user, "CN-1").await.unwrap());
}

#[tokio::test]
async fn saving_an_address_registers_the_client() {
    let store = MemoryStore::new();
    let address = NewAddress {
        user_id: 7,
        username: "@Carol_Q".to_string(),
        full_name: "Carol Q".to_string(),
        phone: "87001112233".to_string(),
        city: "Астана".to_string(),
        address: "пр. Абая 1".to_string(),
        postcode: "010000".to_string(),
    };
    store.save_address(&address).await.unwrap();

    assert_eq!(store.user_ids_by_usernames(&["carol_q".to_string()]).await.unwrap(), vec![UserId(7)]);
    let records = store.client_records(&["@CAROL_Q".to_string()]).await.unwrap();
    assert_eq!(records[0].city.as_deref(), Some("Астана"));

    let (page, total) = store.clients_page(0, 5, Some("1112")).await.unwrap();
    assert_eq!((page.len(), total), (1, 1));
    let (_, total) = store.clients_page(0, 5, Some("nobody")).await.unwrap();
    assert_eq!(total, 0);

    assert_eq!(store.recent_addresses(Some("carol_q"), 20).await.unwrap().len(), 1);
    assert!(store.delete_address(UserId(7)).await.unwrap());
    assert!(store.address_for_user(UserId(7)).await.unwrap().is_none());
}

#[tokio::test]
async fn admins_and_chat() {
    let store = MemoryStore::new();
    store.upsert_owner("Root", "hash", Some("/a.png")).await.unwrap();
    assert!(store.create_admin("Ops", "h2", AdminRole::Admin, None).await.unwrap());
    assert!(!store.create_admin("ops", "h3", AdminRole::Admin, None).await.unwrap());

    let admins = store.list_admins().await.unwrap();
    assert_eq!(admins[0].login, "root");
    assert_eq!(admins[0].role, AdminRole::Owner);

    store.send_chat("root", "hi", Some("CN-1")).await.unwrap();
    store.send_chat("ops", "hello", None).await.unwrap();
    let all = store.chat_messages(0, 120).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].avatar.as_deref(), Some("/a.png"));
    assert_eq!(store.chat_messages(1, 120).await.unwrap()[0].text, "hello");
    assert_eq!(store.chat_messages(0, 1).await.unwrap()[0].id, 2);
}

#[tokio::test]
async fn injected_failure_hits_next_call_only() {
    let store = MemoryStore::new();
    store.inject_failure("connection reset").await;

    let err = store.recent_orders(5).await.unwrap_err();
    assert!(matches!(err, CoreError::Database(msg) if msg == "connection reset"));
    assert!(store.recent_orders(5).await.is_ok());
}

#[tokio::test]
async fn upsert_without_client_data_keeps_recorded_values() {
    let store = MemoryStore::new();
    store.upsert_order(&order("KR-7", STATUSES[0])).await.unwrap();

    let bare = NewOrder { client_name: None, phone: None, ..order("KR-7", STATUSES[1]) };
    let saved = store.upsert_order(&bare).await.unwrap();

    assert_eq!(saved.status, STATUSES[1]);
    assert_eq!(saved.client_name.as_deref(), Some("@alice_1 @bob_22"));
    assert_eq!(saved.phone.as_deref(), Some("+7 700 123-45-67"));

    let renamed = NewOrder { client_name: Some("Dana".to_string()), ..bare };
    let saved = store.upsert_order(&renamed).await.unwrap();
    assert_eq!(saved.client_name.as_deref(), Some("Dana"));
    assert_eq!(saved.phone.as_deref(), Some("+7 700 123-45-67"));
}

#[tokio::test]
async fn broken_order_fails_only_its_own_status_updates() {
    let store = MemoryStore::new();
    store.upsert_order(&order("CN-1", STATUSES[0])).await.unwrap();
    store.upsert_order(&order("CN-2", STATUSES[0])).await.unwrap();
    store.fail_status_updates("cn-2").await;

    assert!(store.update_order_status("CN-1", STATUSES[4]).await.unwrap());
    let err = store.update_order_status("CN-2", STATUSES[4]).await.unwrap_err();
    assert!(matches!(err, CoreError::Database(_)));
    assert_eq!(store.find_order("CN-2").await.unwrap().unwrap().status, STATUSES[0]);
}
