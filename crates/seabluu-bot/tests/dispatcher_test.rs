//! End-to-end conversation tests: updates in, recorded Bot API calls out.

use std::sync::Arc;

use seabluu_bot::{keyboards, Dispatcher};
use seabluu_core::{store::mock::MemoryStore, BotStore, NewOrder, UserId, STATUSES};
use seabluu_telegram::{
    mock::{Call, RecordingBot},
    CallbackQuery, Chat, Message, ReplyMarkup, Update, User,
};

const ADMIN: i64 = 1;
const CLIENT: i64 = 500;

struct Harness {
    store: Arc<MemoryStore>,
    bot: Arc<RecordingBot>,
    dispatcher: Dispatcher,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let bot = Arc::new(RecordingBot::new());
        let dispatcher = Dispatcher::new(store.clone(), bot.clone(), [ADMIN]);
        Self { store, bot, dispatcher }
    }

    async fn say(&self, user_id: i64, text: &str) {
        let update = Update {
            update_id: 1,
            message: Some(Message {
                message_id: 10,
                from: Some(user(user_id)),
                chat: Chat { id: user_id, kind: "private".to_string() },
                date: 0,
                text: Some(text.to_string()),
            }),
            callback_query: None,
        };
        self.dispatcher.handle_update(&update).await;
    }

    async fn press(&self, user_id: i64, data: &str) {
        let update = Update {
            update_id: 2,
            message: None,
            callback_query: Some(CallbackQuery {
                id: "cb-1".to_string(),
                from: user(user_id),
                message: Some(Message {
                    message_id: 77,
                    from: None,
                    chat: Chat { id: user_id, kind: "private".to_string() },
                    date: 0,
                    text: None,
                }),
                data: Some(data.to_string()),
            }),
        };
        self.dispatcher.handle_update(&update).await;
    }

    async fn last_text(&self, chat_id: i64) -> String {
        self.bot.texts_to(chat_id).await.pop().unwrap_or_default()
    }

    async fn seed_order(&self, order_id: &str, usernames: &[&str]) {
        self.store
            .upsert_order(&NewOrder {
                order_id: order_id.to_string(),
                client_name: Some(usernames.iter().map(|u| format!("@{u}")).collect::<Vec<_>>().join(" ")),
                status: STATUSES[0].to_string(),
                origin: Some("CN".to_string()),
                ..NewOrder::default()
            })
            .await
            .unwrap();
        let usernames: Vec<String> = usernames.iter().map(|u| u.to_string()).collect();
        self.store.ensure_participants(order_id, &usernames).await.unwrap();
    }
}

fn user(id: i64) -> User {
    User {
        id,
        is_bot: false,
        first_name: "Алиса".to_string(),
        last_name: None,
        username: Some(format!("user_{id}")),
    }
}

#[tokio::test]
async fn start_registers_the_client_and_shows_the_menu() {
    let h = Harness::new();
    h.say(CLIENT, "/start").await;

    let sent = h.bot.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("SEABLUU"));
    assert_eq!(sent[0].reply_markup, Some(ReplyMarkup::from(keyboards::main_menu())));
    let ids = h.store.user_ids_by_usernames(&["user_500".to_string()]).await.unwrap();
    assert_eq!(ids, vec![UserId(CLIENT)]);
}

#[tokio::test]
async fn tracking_an_order_offers_a_subscription() {
    let h = Harness::new();
    h.seed_order("CN-12345", &[]).await;

    h.say(CLIENT, keyboards::BTN_TRACK).await;
    h.say(CLIENT, "cn 12345").await;

    let reply = h.bot.sent().await.pop().unwrap();
    assert!(reply.text.starts_with("📦 Заказ *CN-12345*"));
    assert_eq!(reply.reply_markup, Some(ReplyMarkup::from(keyboards::subscribe("CN-12345"))));

    h.press(CLIENT, "sub:CN-12345").await;
    assert!(h.store.is_subscribed(UserId(CLIENT), "CN-12345").await.unwrap());
    let calls = h.bot.calls().await;
    assert!(calls.iter().any(|c| matches!(c, Call::Answer { callback_id, .. } if callback_id == "cb-1")));
    assert!(calls.iter().any(|c| matches!(
        c,
        Call::EditMarkup { message_id: 77, markup: Some(m), .. } if *m == keyboards::unsubscribe("CN-12345")
    )));
}

#[tokio::test]
async fn unknown_order_gets_a_friendly_reply() {
    let h = Harness::new();
    h.say(CLIENT, keyboards::BTN_TRACK).await;
    h.say(CLIENT, "KR-0").await;
    assert_eq!(
        h.last_text(CLIENT).await,
        "🙈 Такой заказ не найден. Проверьте номер или повторите позже."
    );
}

#[tokio::test]
async fn address_wizard_validates_and_subscribes_to_own_orders() {
    let h = Harness::new();
    h.seed_order("CN-9", &["user_500"]).await;

    h.press(CLIENT, "addr:add").await;
    assert_eq!(h.last_text(CLIENT).await, "👤 ФИО:");
    h.say(CLIENT, "Иванова Алиса").await;
    h.say(CLIENT, "12345").await;
    assert!(h.last_text(CLIENT).await.starts_with("Нужно 11 цифр и обязательно с 8."));
    h.say(CLIENT, "+7 700 123 45 67").await;
    h.say(CLIENT, "Астана").await;
    h.say(CLIENT, "ул. Абая 1").await;
    h.say(CLIENT, "01").await;
    assert!(h.last_text(CLIENT).await.starts_with("Индекс выглядит странно."));
    h.say(CLIENT, "010000").await;

    let saved = h.last_text(CLIENT).await;
    assert!(saved.starts_with("✅ Адрес сохранён!"));
    assert!(saved.contains("📞 Телефон: 87001234567"));
    let address = h.store.address_for_user(UserId(CLIENT)).await.unwrap().unwrap();
    assert_eq!(address.postcode, "010000");
    assert!(h.store.is_subscribed(UserId(CLIENT), "CN-9").await.unwrap());
    assert!(h.dispatcher.sessions().load(CLIENT).await.client_mode.is_none());
}

#[tokio::test]
async fn cancel_leaves_the_wizard() {
    let h = Harness::new();
    h.press(CLIENT, "addr:add").await;
    h.say(CLIENT, "отмена").await;
    assert_eq!(h.last_text(CLIENT).await, "Отменили действие. Что дальше? 🙂");
    assert!(h.dispatcher.sessions().is_empty().await);
}

#[tokio::test]
async fn clients_cannot_open_the_admin_panel() {
    let h = Harness::new();
    h.say(CLIENT, "/admin").await;
    assert!(h.bot.sent().await.is_empty());

    h.say(CLIENT, "/find").await;
    assert_eq!(h.last_text(CLIENT).await, "Доступно только администраторам.");

    h.press(CLIENT, "adm:set_status:CN-1:3").await;
    h.say(CLIENT, "что-то непонятное").await;
    assert!(h.last_text(CLIENT).await.starts_with("Хмм, не понял."));
}

#[tokio::test]
async fn admin_adds_an_order_through_the_wizard() {
    let h = Harness::new();
    h.store.add_client(CLIENT, "user_500").await;

    h.say(ADMIN, "/admin").await;
    assert_eq!(h.last_text(ADMIN).await, "🛠 Открываю админ-панель…");
    h.say(ADMIN, keyboards::BTN_ADMIN_ADD).await;
    h.say(ADMIN, "XX-1").await;
    assert_eq!(h.last_text(ADMIN).await, "Неверный order_id. Пример: CN-12345");
    h.say(ADMIN, "kr-777").await;
    h.say(ADMIN, "@user_500 @someone_else").await;
    h.press(ADMIN, "adm:pick_status_id:1").await;
    assert_eq!(h.last_text(ADMIN).await, "Примечание (или '-' если нет):");
    h.say(ADMIN, "-").await;

    assert_eq!(h.last_text(ADMIN).await, "✅ Заказ *KR-777* добавлен");
    let order = h.store.find_order("KR-777").await.unwrap().unwrap();
    assert_eq!(order.status, STATUSES[1]);
    assert_eq!(order.note, None);
    assert_eq!(order.country.as_deref(), Some("KR"));
    assert_eq!(h.store.participants("KR-777").await.unwrap().len(), 2);
    assert!(h.store.is_subscribed(UserId(CLIENT), "KR-777").await.unwrap());
    assert!(h.last_text(CLIENT).await.starts_with("🆕 Создан новый разбор *KR-777*"));
}

#[tokio::test]
async fn admin_status_change_notifies_subscribers() {
    let h = Harness::new();
    h.seed_order("CN-1", &[]).await;
    h.store.subscribe(UserId(CLIENT), "CN-1").await.unwrap();

    h.press(ADMIN, "adm:set_status:CN-1:10").await;

    assert_eq!(h.last_text(ADMIN).await, format!("✅ Статус *CN-1* обновлён: {}", STATUSES[10]));
    assert_eq!(h.store.find_order("CN-1").await.unwrap().unwrap().status, STATUSES[10]);
    assert!(h.last_text(CLIENT).await.contains(STATUSES[10]));

    h.press(ADMIN, "adm:set_status:CN-404:1").await;
    assert_eq!(h.last_text(ADMIN).await, "🙈 Не нашёл такой заказ.");
}

#[tokio::test]
async fn multi_search_finds_by_id_username_and_phone() {
    let h = Harness::new();
    h.seed_order("CN-1", &["alice_k"]).await;
    h.seed_order("KR-2", &["bob_ok"]).await;
    h.store
        .upsert_order(&NewOrder {
            order_id: "CN-3".to_string(),
            phone: Some("8 700 555 44 33".to_string()),
            status: STATUSES[0].to_string(),
            ..NewOrder::default()
        })
        .await
        .unwrap();

    h.say(ADMIN, "/find").await;
    h.say(ADMIN, "cn-1, @bob_ok 87005554433 @alice_k").await;

    let texts = h.bot.texts_to(ADMIN).await;
    assert!(texts.iter().any(|t| t == "⏳ Ищу…"));
    assert_eq!(texts.last().unwrap(), "Найдено заказов: *3*. Выберите:");
    let session = h.dispatcher.sessions().load(ADMIN).await;
    assert_eq!(session.find_results, vec!["CN-1", "KR-2", "CN-3"]);
    assert!(!session.find_expecting);
    assert!(h.bot.calls().await.iter().any(|c| matches!(c, Call::Delete(ADMIN, _))));
}

#[tokio::test]
async fn menu_buttons_during_search_get_a_reminder() {
    let h = Harness::new();
    h.say(ADMIN, "/find").await;
    h.say(ADMIN, keyboards::BTN_ADMIN_REPORTS).await;
    assert!(h.last_text(ADMIN).await.starts_with("🔎 *Поиск заказов*"));
    assert!(h.dispatcher.sessions().load(ADMIN).await.find_expecting);

    h.say(ADMIN, keyboards::BTN_BACK_TO_ADMIN).await;
    assert_eq!(h.last_text(ADMIN).await, "🛠 Открываю админ-панель…");
    assert!(!h.dispatcher.sessions().load(ADMIN).await.find_expecting);
}

#[tokio::test]
async fn search_then_bulk_status_change() {
    let h = Harness::new();
    h.seed_order("CN-1", &["alice_k"]).await;
    h.seed_order("CN-2", &["alice_k"]).await;

    h.say(ADMIN, "/find").await;
    h.say(ADMIN, "@alice_k").await;
    h.press(ADMIN, "find:bulk:ask").await;
    assert_eq!(h.last_text(ADMIN).await, "Выбери новый статус для *2* заказов:");
    h.press(ADMIN, "findbulk:pick:3").await;

    let summary = h.last_text(ADMIN).await;
    assert!(summary.starts_with("✏️ Массовая смена статусов (из поиска) — итог"));
    for oid in ["CN-1", "CN-2"] {
        assert_eq!(h.store.find_order(oid).await.unwrap().unwrap().status, STATUSES[3]);
    }

    h.press(ADMIN, "findbulk:pick:3").await;
    assert_eq!(h.last_text(ADMIN).await, "Нечего обновлять.");
}

#[tokio::test]
async fn mass_status_by_id_list() {
    let h = Harness::new();
    h.seed_order("CN-1", &[]).await;

    h.say(ADMIN, keyboards::BTN_ADMIN_MASS).await;
    h.press(ADMIN, "mass:pick_status_id:10").await;
    h.say(ADMIN, "CN-1 CN-404").await;

    let summary = h.last_text(ADMIN).await;
    assert!(summary.starts_with("✏️ Массовая смена статусов — итог"));
    assert!(summary.contains("CN-404"));
    assert_eq!(h.store.find_order("CN-1").await.unwrap().unwrap().status, STATUSES[10]);
}

#[tokio::test]
async fn paid_toggle_redraws_participants() {
    let h = Harness::new();
    h.seed_order("CN-1", &["alice_k", "bob_ok"]).await;

    h.press(ADMIN, "pp:toggle:CN-1:alice_k").await;

    let participants = h.store.participants("CN-1").await.unwrap();
    assert!(participants.iter().any(|p| p.username == "alice_k" && p.paid));
    let page = h.last_text(ADMIN).await;
    assert!(page.contains("✅ @alice_k"));
    assert!(page.contains("❌ @bob_ok"));

    h.press(ADMIN, "pp:refresh:CN-1:0").await;
    assert_eq!(h.bot.edited_texts().await.len(), 1);
}

#[tokio::test]
async fn unpaid_report_and_reminders_by_id() {
    let h = Harness::new();
    h.store.add_client(CLIENT, "alice_k").await;
    h.seed_order("CN-1", &["alice_k"]).await;

    h.say(ADMIN, keyboards::BTN_REPORT_UNPAID).await;
    assert!(h.last_text(ADMIN).await.contains("• CN-1: @alice_k"));

    h.say(ADMIN, keyboards::BTN_BROADCAST_BY_ORDER).await;
    h.say(ADMIN, "cn-1").await;
    assert!(h.last_text(ADMIN).await.contains("• ✅ @alice_k"));
    assert!(h.last_text(CLIENT).await.starts_with("💳 Напоминание по разбору *CN-1*"));
}

#[tokio::test]
async fn admin_edits_a_client_address() {
    let h = Harness::new();
    h.store.add_client(CLIENT, "alice_k").await;

    h.say(ADMIN, keyboards::BTN_EDIT_ADDRESS).await;
    h.say(ADMIN, "@nobody_known").await;
    assert_eq!(
        h.last_text(ADMIN).await,
        "Пользователь не найден по username (нет записи в адресах/клиентах)."
    );

    h.say(ADMIN, keyboards::BTN_EDIT_ADDRESS).await;
    for answer in ["@alice_k", "Алиса К", "87001112233", "Алматы", "Толе би 5", "050000"] {
        h.say(ADMIN, answer).await;
    }
    assert_eq!(h.last_text(ADMIN).await, "✅ Данные клиента обновлены");
    let address = h.store.address_for_user(UserId(CLIENT)).await.unwrap().unwrap();
    assert_eq!(address.city, "Алматы");
}

#[tokio::test]
async fn admin_fallback_repeats_the_current_prompt() {
    let h = Harness::new();
    h.say(ADMIN, "привет").await;
    assert_eq!(h.last_text(ADMIN).await, "Вы в админ-панели. Выберите действие:");

    h.say(ADMIN, keyboards::BTN_ADMIN_MASS).await;
    h.say(ADMIN, "что-то").await;
    assert_eq!(
        h.last_text(ADMIN).await,
        "⚠️ Не понял. Выбери новый статус для нескольких заказов:"
    );
}

#[tokio::test]
async fn store_errors_are_contained_in_one_update() {
    let h = Harness::new();
    h.say(CLIENT, keyboards::BTN_TRACK).await;
    h.store.inject_failure("pool timed out").await;
    h.say(CLIENT, "CN-1").await;

    h.say(CLIENT, keyboards::BTN_TRACK).await;
    assert_eq!(h.last_text(CLIENT).await, "🔎 Отправьте номер заказа (например: CN-12345):");
}

#[tokio::test]
async fn forged_page_numbers_land_on_the_last_page() {
    let h = Harness::new();
    for id in 600..603 {
        h.store.add_client(id, &format!("client_{id}")).await;
    }

    h.press(ADMIN, "clients:list:18446744073709551615").await;
    let edited = h.bot.edited_texts().await;
    assert!(edited.last().expect("clients page shown").starts_with("📚 Список клиентов (1/1)"));

    h.press(ADMIN, "find:page:18446744073709551615").await;
    assert!(h.bot.calls().await.iter().any(|c| matches!(c, Call::EditMarkup { .. })));
}
