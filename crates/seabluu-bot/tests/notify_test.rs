//! Notifier tests against the in-memory store and the recording Bot API.

use std::sync::Arc;

use seabluu_bot::Notifier;
use seabluu_core::{store::mock::MemoryStore, BotStore, NewOrder, UserId, STATUSES};
use seabluu_telegram::{mock::RecordingBot, TelegramError};

struct Fixture {
    store: Arc<MemoryStore>,
    bot: Arc<RecordingBot>,
    notifier: Notifier,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let bot = Arc::new(RecordingBot::new());
    let notifier = Notifier::new(store.clone(), bot.clone());
    Fixture { store, bot, notifier }
}

async fn seed_order(store: &MemoryStore, order_id: &str, usernames: &[&str]) {
    store
        .upsert_order(&NewOrder {
            order_id: order_id.to_string(),
            status: STATUSES[0].to_string(),
            ..NewOrder::default()
        })
        .await
        .unwrap();
    let usernames: Vec<String> = usernames.iter().map(|u| u.to_string()).collect();
    store.ensure_participants(order_id, &usernames).await.unwrap();
}

#[tokio::test]
async fn subscribers_get_status_updates_and_last_sent_is_recorded() {
    let f = fixture();
    seed_order(&f.store, "CN-1", &[]).await;
    f.store.subscribe(UserId(11), "CN-1").await.unwrap();
    f.store.subscribe(UserId(12), "CN-1").await.unwrap();

    let delivered = f.notifier.notify_subscribers("CN-1", STATUSES[3]).await.unwrap();

    assert_eq!(delivered, 2);
    let texts = f.bot.texts_to(11).await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("*CN-1*"));
    assert!(texts[0].contains(STATUSES[3]));
    let subs = f.store.all_subscriptions().await;
    assert!(subs.iter().all(|s| s.last_sent_status.as_deref() == Some(STATUSES[3])));
}

#[tokio::test]
async fn a_failed_subscriber_does_not_stop_the_rest() {
    let f = fixture();
    seed_order(&f.store, "CN-1", &[]).await;
    f.store.subscribe(UserId(11), "CN-1").await.unwrap();
    f.store.subscribe(UserId(12), "CN-1").await.unwrap();
    f.bot.fail_chat(11, TelegramError::api(403, "Forbidden: bot was blocked by the user")).await;

    let delivered = f.notifier.notify_subscribers("CN-1", STATUSES[1]).await.unwrap();

    assert_eq!(delivered, 1);
    assert_eq!(f.bot.texts_to(12).await.len(), 1);
    let subs = f.store.all_subscriptions().await;
    let failed = subs.iter().find(|s| s.user_id == UserId(11)).unwrap();
    assert_eq!(failed.last_sent_status, None);
}

#[tokio::test]
async fn new_order_subscribes_known_participants_only() {
    let f = fixture();
    f.store.add_client(21, "alice_k").await;
    seed_order(&f.store, "KR-5", &["alice_k", "ghost_user"]).await;

    let usernames = vec!["alice_k".to_string(), "ghost_user".to_string()];
    let delivered = f.notifier.notify_new_order("KR-5", STATUSES[0], &usernames).await.unwrap();

    assert_eq!(delivered, 1);
    assert!(f.store.is_subscribed(UserId(21), "KR-5").await.unwrap());
    assert!(f.bot.texts_to(21).await[0].starts_with("🆕 Создан новый разбор *KR-5*"));
}

#[tokio::test]
async fn reminders_report_each_debtor() {
    let f = fixture();
    f.store.add_client(21, "alice_k").await;
    f.store.add_client(22, "bob_ok").await;
    seed_order(&f.store, "CN-7", &["alice_k", "bob_ok", "nobody_here"]).await;
    f.bot.fail_chat(22, TelegramError::api(403, "Forbidden: bot was blocked by the user")).await;

    let report = f.notifier.remind_unpaid("CN-7").await.unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 2);
    assert!(report.text.starts_with("📩 Уведомления по ID разбора — CN-7"));
    assert!(report.text.contains("• ✅ @alice_k"));
    assert!(report.text.contains("• ❌ @bob_ok — бот заблокирован"));
    assert!(report.text.contains("• ❌ @nobody_here — нет chat_id"));
    assert!(report.text.ends_with("_Итого:_ ✅ 1  ❌ 2"));
    assert!(f.store.is_subscribed(UserId(21), "CN-7").await.unwrap());
}

#[tokio::test]
async fn reminders_for_unknown_or_settled_orders() {
    let f = fixture();
    seed_order(&f.store, "CN-8", &["alice_k"]).await;
    f.store.toggle_paid("CN-8", "alice_k").await.unwrap();

    let missing = f.notifier.remind_unpaid("CN-404").await.unwrap();
    assert_eq!(missing.text, "🙈 Заказ не найден.");

    let settled = f.notifier.remind_unpaid("CN-8").await.unwrap();
    assert_eq!(settled.text, "🎉 По заказу *CN-8* должников нет — красота!");
    assert!(f.bot.sent().await.is_empty());
}

#[tokio::test]
async fn broadcast_covers_every_order_with_debtors() {
    let f = fixture();
    f.store.add_client(21, "alice_k").await;
    f.store.add_client(22, "bob_ok").await;
    seed_order(&f.store, "CN-1", &["alice_k"]).await;
    seed_order(&f.store, "KR-2", &["bob_ok"]).await;

    let report = f.notifier.remind_all_unpaid().await.unwrap();

    assert_eq!(report.orders.len(), 2);
    assert_eq!(report.delivered, 2);
    assert!(report.text.ends_with("_Итого по всем:_ ✅ 2  ❌ 0"));
}

#[tokio::test]
async fn broadcast_without_debtors_says_so() {
    let f = fixture();
    let report = f.notifier.remind_all_unpaid().await.unwrap();
    assert_eq!(report.text, "🎉 Должников по всем разборам нет — супер!");
}

#[tokio::test]
async fn store_failures_surface_as_errors() {
    let f = fixture();
    f.store.inject_failure("connection reset").await;
    let err = f.notifier.notify_subscribers("CN-1", STATUSES[0]).await.unwrap_err();
    assert!(err.to_string().contains("connection reset"));
}
