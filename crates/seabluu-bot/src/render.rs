//! Text rendering for bot replies.
//!
//! Everything here is pure: the dispatcher fetches data and picks keyboards,
//! these functions only turn it into message text. Most texts are sent
//! without a parse mode because usernames often contain `_`, which breaks
//! Telegram Markdown.

use chrono::{DateTime, Utc};
use seabluu_core::{
    country_flag,
    parse::{slice_page, PageSlice},
    Address, ClientRecord, Order, Participant, SubscriptionView,
};

use crate::{
    keyboards::{CLIENTS_PER_PAGE, PARTICIPANTS_PER_PAGE, UNPAID_PER_PAGE},
    session::{AddressDraft, AddressStep, AdminMode, EditAddressStep},
};

/// `/start` greeting, Markdown.
pub const GREETING: &str = "✨ Привет! Я *SEABLUU* Helper — помогу отследить разборы, адреса и подписки.\n\n\
• 🔍 Отследить разбор — статус по `order_id` (например, `CN-12345`).\n\
• 🔔 Подписки — уведомлю, когда статус заказа изменится.\n\
• 🏠 Мои адреса — сохраню/обновлю адрес для доставки.\n\
• 👤 Профиль — ваши данные и связанные разборы.\n\n\
Если что-то пошло не так — нажми «Отмена» или используй /help.";

/// `/help` text.
pub const HELP: &str = "📘 Помощь:\n\
• 🔍 Отследить разбор — статус по номеру\n\
• 🏠 Мои адреса — добавить/изменить адрес\n\
• 🔔 Мои подписки — список подписок\n\
• 👤 Профиль — общая информация\n\
• /admin — админ-панель (для админов)";

/// Search prompt after `/find`, Markdown.
pub const FIND_PROMPT: &str = "🔎 *Поиск заказов*\n\
Пришлите *одно или несколько* значений (можно смешивать):\n\
• `order_id` (например, CN-12345)\n\
• `@username`\n\
• телефон (в любом формате)\n\n\
Разделяйте пробелами, запятыми или с новой строки.";

/// Reminder of the search format, Markdown.
pub const FIND_REMINDER: &str = "🔎 *Поиск заказов*\n\
Пришлите `order_id`, `@username` или телефон.\n\
Чтобы выйти — нажмите «⬅️ Назад, в админ-панель».";

/// Fallback for clients.
pub const CLIENT_FALLBACK: &str =
    "Хмм, не понял. Выберите кнопку ниже или введите номер заказа. Если что — «Отмена».";

/// Admin menu prompt.
pub const ADMIN_MENU_PROMPT: &str = "Вы в админ-панели. Выберите действие:";

/// Order ids list prompt for the mass update.
pub const MASS_IDS_PROMPT: &str =
    "Пришли список order_id (через пробел/запятые/новые строки), например: CN-1001 CN-1002, KR-2003";

/// Prompt repeated when an admin flow gets unexpected input.
pub const fn admin_prompt(mode: AdminMode) -> &'static str {
    match mode {
        AdminMode::AddOrderId => "Введи order_id (например: CN-12345):",
        AdminMode::AddOrderClient => "Имя клиента (можно несколько @username):",
        AdminMode::AddOrderStatus => "Выбери стартовый статус кнопкой ниже или напиши точный:",
        AdminMode::AddOrderNote => "Примечание (или '-' если нет):",
        AdminMode::RemindUnpaid => "Введи order_id/список для рассылки неплательщикам:",
        AdminMode::MassPickStatus => "Выбери новый статус для нескольких заказов:",
        AdminMode::MassUpdateIds => MASS_IDS_PROMPT,
        AdminMode::ExportAddresses => {
            "Пришли список @username (через пробел/запятую/новые строки):"
        },
        AdminMode::EditAddress(EditAddressStep::Username) => {
            "Пришли @username пользователя, чей адрес нужно изменить:"
        },
        AdminMode::EditAddress(EditAddressStep::Field(step)) => match step {
            AddressStep::FullName => "ФИО (новое значение):",
            AddressStep::Phone => "Телефон:",
            AddressStep::City => "Город:",
            AddressStep::Street => "Адрес:",
            AddressStep::Postcode => "Почтовый индекс:",
        },
        AdminMode::ExportOrdersByNote => "Пришли метку/слово из note (по ней выгружу разборы):",
        AdminMode::ClientsSearch => {
            "Отправь текст для поиска (username/часть ФИО/цифры телефона). Чтобы показать всех — пришли `-`."
        },
    }
}

/// Prompt for a client address wizard step.
pub const fn address_prompt(step: AddressStep) -> &'static str {
    match step {
        AddressStep::FullName => "👤 ФИО:",
        AddressStep::Phone => "📞 Телефон (пример: 87001234567):",
        AddressStep::City => "🏙 Город (пример: Астана):",
        AddressStep::Street => "🏠 Адрес (свободный формат):",
        AddressStep::Postcode => "📮 Почтовый индекс (пример: 010000):",
    }
}

fn hh_mm(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(|t| t.format("%H:%M").to_string())
}

fn or_dash(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("—")
}

/// One page of participants with paid marks.
pub fn participants_text(order_id: &str, participants: &[Participant], page: usize) -> String {
    let slice = slice_page(participants.len(), page, PARTICIPANTS_PER_PAGE);
    let mut lines =
        vec![format!("Разбор {order_id} — участники ({}/{}):", slice.page + 1, slice.pages)];
    if slice.range.is_empty() {
        lines.push("Список участников пуст.".to_string());
    }
    for p in &participants[slice.range] {
        let mark = if p.paid { "✅" } else { "❌" };
        lines.push(format!("{mark} @{}", p.username));
    }
    lines.join("\n")
}

/// One page of the debtors report and the page it ended up on.
pub fn unpaid_page(grouped: &[(String, Vec<String>)], page: usize) -> (String, PageSlice) {
    let slice = slice_page(grouped.len(), page, UNPAID_PER_PAGE);
    let mut lines = vec![format!("📋 Отчёт по должникам ({}/{}):", slice.page + 1, slice.pages)];
    for (order_id, users) in &grouped[slice.range.clone()] {
        let list = if users.is_empty() {
            "—".to_string()
        } else {
            users.iter().map(|u| format!("@{u}")).collect::<Vec<_>>().join(", ")
        };
        lines.push(format!("• {order_id}: {list}"));
    }
    (lines.join("\n"), slice)
}

/// Number of pages for `total` clients.
pub fn clients_pages(total: i64) -> usize {
    let total = usize::try_from(total).unwrap_or(0);
    total.div_ceil(CLIENTS_PER_PAGE).max(1)
}

fn client_block(client: &ClientRecord) -> String {
    let username = client
        .username
        .as_deref()
        .filter(|u| !u.is_empty())
        .map_or_else(|| "—".to_string(), |u| format!("@{}", u.trim_start_matches('@')));
    format!(
        "{username}\nФИО: {}\nТелефон: {}\nГород: {}\nАдрес: {}\nИндекс: {}",
        client.full_name.as_deref().unwrap_or(""),
        client.phone.as_deref().unwrap_or(""),
        client.city.as_deref().unwrap_or(""),
        client.address.as_deref().unwrap_or(""),
        client.postcode.as_deref().unwrap_or(""),
    )
}

/// A page of clients, each with their active orders.
pub fn clients_page(
    items: &[(ClientRecord, Vec<Order>)],
    total: i64,
    page: usize,
    query: Option<&str>,
) -> String {
    if items.is_empty() {
        return if query.is_some() { "Клиенты не найдены." } else { "Пока нет клиентов." }
            .to_string();
    }

    let mut head = format!("📚 Список клиентов ({}/{})", page + 1, clients_pages(total));
    if let Some(q) = query {
        head.push_str(&format!(" — поиск: «{q}»"));
    }

    let mut lines = vec![head];
    for (client, orders) in items {
        let active = if orders.is_empty() {
            "—".to_string()
        } else {
            orders
                .iter()
                .map(|o| format!("{} ({})", o.order_id, o.status))
                .collect::<Vec<_>>()
                .join(", ")
        };
        lines.push(format!("{}\nАктивные разборы: {active}\n—", client_block(client)));
    }
    lines.join("\n")
}

/// Latest orders with aligned ids; `Пусто.` when there are none.
pub fn last_orders(orders: &[Order]) -> String {
    let Some(first) = orders.first() else {
        return "Пусто.".to_string();
    };
    let mut head = "🕒 Последние разборы".to_string();
    if let Some(at) = first.updated_at {
        head.push_str(&format!(" — {}", at.format("%Y-%m-%d")));
    }
    head.push(':');

    let width = orders.iter().map(|o| o.order_id.chars().count()).max().unwrap_or(0);
    let mut lines = vec![head];
    for o in orders {
        let country = o.country_code();
        lines.push(format!(
            "{:<width$} · {} · {} {} · {}",
            o.order_id,
            or_dash(Some(o.status.as_str())),
            country_flag(&country),
            or_dash(Some(country.as_str())),
            hh_mm(o.updated_at).unwrap_or_default(),
        ));
    }
    lines.join("\n")
}

/// Compact cards of search results with debtor counts.
pub fn found_cards(orders: &[(Order, usize)]) -> String {
    let width = orders.iter().map(|(o, _)| o.order_id.chars().count()).max().unwrap_or(0);
    let mut lines = vec!["🔎 Найденные заказы:".to_string()];
    for (o, unpaid) in orders {
        let country = o.country_code();
        lines.push(format!(
            "{:<width$} · {} · {} {} · {} · клиенты: {} · долги: {unpaid}",
            o.order_id,
            or_dash(Some(o.status.as_str())),
            country_flag(&country),
            or_dash(Some(country.as_str())),
            hh_mm(o.updated_at).unwrap_or_else(|| "--:--".to_string()),
            or_dash(o.client_name.as_deref()),
        ));
    }
    lines.join("\n")
}

/// Full order card for admins, plain text.
pub fn order_card(order: &Order) -> String {
    let country = or_dash(order.country.as_deref().or(order.origin.as_deref())).to_string();
    let mut lines = vec![
        format!("order_id: {}", order.order_id),
        format!("client_name: {}", or_dash(order.client_name.as_deref())),
        format!("status: {}", or_dash(Some(order.status.as_str()))),
        format!("note: {}", or_dash(order.note.as_deref())),
        format!("country: {country}"),
    ];
    if let Some(origin) = order.origin.as_deref().filter(|o| !o.is_empty() && *o != country) {
        lines.push(format!("origin: {origin}"));
    }
    if let Some(at) = order.updated_at {
        lines.push(format!("updated_at: {}", at.format("%Y-%m-%d %H:%M")));
    }
    lines.join("\n")
}

/// Status reply for a tracked order, Markdown.
pub fn order_status(order: &Order) -> String {
    let status = Some(order.status.trim()).filter(|s| !s.is_empty()).unwrap_or("статус не указан");
    let mut text = format!("📦 Заказ *{}*\nСтатус: *{status}*", order.order_id);
    if let Some(origin) = order.origin.as_deref().filter(|o| !o.trim().is_empty()) {
        text.push_str(&format!("\nСтрана/источник: {origin}"));
    }
    text
}

/// The saved delivery address.
pub fn address_list(address: &Address) -> String {
    format!(
        "📍 Ваш адрес доставки:\n• {} — {}\n{}, {}, {}",
        address.full_name, address.phone, address.city, address.address, address.postcode
    )
}

/// Confirmation after the address wizard.
pub fn address_saved(draft: &AddressDraft, postcode: &str) -> String {
    format!(
        "✅ Адрес сохранён!\n\n👤 ФИО: {}\n📞 Телефон: {}\n🏙 Город: {}\n🏠 Адрес: {}\n📮 Индекс: {postcode}",
        draft.full_name, draft.phone, draft.city, draft.address
    )
}

/// The user's subscriptions, or a hint when there are none.
pub fn subscriptions(subs: &[SubscriptionView]) -> String {
    if subs.is_empty() {
        return "Пока нет подписок. Отследите заказ и нажмите «Подписаться».".to_string();
    }
    let lines: Vec<String> = subs
        .iter()
        .map(|s| format!("• {} — последний статус: {}", s.order_id, or_dash(s.last_sent_status.as_deref())))
        .collect();
    format!("🔔 Ваши подписки:\n{}", lines.join("\n"))
}

/// Profile summary with the address and up to ten related orders.
pub fn profile(username: &str, name: &str, address: Option<&Address>, orders: &[Order]) -> String {
    let (full_name, phone, city, street, postcode) = match address {
        Some(a) => (
            a.full_name.as_str(),
            a.phone.as_str(),
            a.city.as_str(),
            a.address.as_str(),
            a.postcode.as_str(),
        ),
        None => ("—", "—", "—", "—", "—"),
    };
    let mut order_lines: Vec<String> = orders
        .iter()
        .take(10)
        .map(|o| format!("• {} — {}", o.order_id, or_dash(Some(o.status.as_str()))))
        .collect();
    if order_lines.is_empty() {
        order_lines.push("—".to_string());
    }
    let mut text = format!(
        "👤 Профиль - @{}\n\nИмя - {}\n\nВаши данные:\nФИО: {}\nТелефон: {}\nГород: {}\nАдрес: {}\nИндекс: {}\n\nВаши разборы:\n{}",
        username.to_lowercase(),
        name.trim(),
        full_name,
        phone,
        city,
        street,
        postcode,
        order_lines.join("\n"),
    );
    if orders.len() > 10 {
        text.push_str(&format!("\n… и ещё {}", orders.len() - 10));
    }
    text
}

/// Address export for admins.
pub fn client_export(records: &[ClientRecord]) -> String {
    records
        .iter()
        .map(|r| {
            let created = r
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            format!("{}\ncreated_at: {created}\n—", client_block(r))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Orders tagged with a note marker.
pub fn orders_by_note(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "Ничего не найдено.".to_string();
    }
    orders
        .iter()
        .map(|o| {
            let updated =
                o.updated_at.map(|t| t.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default();
            format!(
                "order_id: `{}`\n*client_name:* {}\n*status:* {}\n*country:* {}\n*updated_at:* {updated}\n—",
                o.order_id,
                o.client_name.as_deref().unwrap_or(""),
                o.status,
                o.country_code(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Outcome of a status change over several orders.
pub fn mass_update_summary(title: &str, total: usize, updated: usize, failed: &[String]) -> String {
    let mut lines = vec![
        title.to_string(),
        format!("Всего: {total}"),
        format!("✅ Обновлено: {updated}"),
        format!("❌ Ошибки: {}", failed.len()),
    ];
    if !failed.is_empty() {
        lines.push(format!("Не удалось: {}", failed.join(", ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use insta::assert_snapshot;
    use seabluu_core::{UserId, STATUSES};

    use super::*;

    fn order(order_id: &str, status: &str) -> Order {
        Order {
            id: 1,
            order_id: order_id.into(),
            client_name: Some("@alice_k, @bob_ok".into()),
            phone: None,
            origin: None,
            status: status.into(),
            note: None,
            country: Some("CN".into()),
            created_at: None,
            updated_at: Some(Utc.with_ymd_and_hms(2024, 5, 17, 14, 5, 0).unwrap()),
        }
    }

    fn participant(username: &str, paid: bool) -> Participant {
        Participant {
            order_id: "CN-1".into(),
            username: username.into(),
            paid,
            qty: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn address() -> Address {
        Address {
            user_id: UserId(7),
            username: Some("alice_k".into()),
            full_name: "Алиса Ким".into(),
            phone: "87001234567".into(),
            city: "Астана".into(),
            address: "пр. Мира 1".into(),
            postcode: "010000".into(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn participants_page_marks_paid_users() {
        let list = vec![participant("alice_k", true), participant("bob_ok", false)];
        assert_snapshot!(participants_text("CN-1", &list, 0), @r"
        Разбор CN-1 — участники (1/1):
        ✅ @alice_k
        ❌ @bob_ok
        ");
    }

    #[test]
    fn empty_participants_page() {
        assert_eq!(
            participants_text("KR-2", &[], 4),
            "Разбор KR-2 — участники (1/1):\nСписок участников пуст."
        );
    }

    #[test]
    fn unpaid_report_pages_by_fifteen() {
        let grouped: Vec<(String, Vec<String>)> =
            (1..=16).map(|i| (format!("CN-{i:02}"), vec!["alice_k".to_string()])).collect();
        let (text, slice) = unpaid_page(&grouped, 1);
        assert_eq!(slice.page, 1);
        assert_eq!(slice.pages, 2);
        assert_eq!(text, "📋 Отчёт по должникам (2/2):\n• CN-16: @alice_k");

        let (text, _) = unpaid_page(&grouped[..1], 9);
        assert!(text.starts_with("📋 Отчёт по должникам (1/1):"));
    }

    #[test]
    fn last_orders_are_aligned_with_flags() {
        let mut kr = order("KR-1234", STATUSES[3]);
        kr.country = Some("KR".into());
        let orders = vec![order("CN-1", STATUSES[0]), kr];
        assert_snapshot!(last_orders(&orders), @r"
        🕒 Последние разборы — 2024-05-17:
        CN-1    · 🛒 выкуплен · 🇨🇳 CN · 14:05
        KR-1234 · 📬 приехал на адрес (Корея) · 🇰🇷 KR · 14:05
        ");
        assert_eq!(last_orders(&[]), "Пусто.");
    }

    #[test]
    fn found_cards_show_clients_and_debts() {
        let mut no_time = order("CN-77", STATUSES[1]);
        no_time.updated_at = None;
        no_time.client_name = None;
        assert_snapshot!(found_cards(&[(order("CN-1", STATUSES[0]), 2), (no_time, 0)]), @r"
        🔎 Найденные заказы:
        CN-1  · 🛒 выкуплен · 🇨🇳 CN · 14:05 · клиенты: @alice_k, @bob_ok · долги: 2
        CN-77 · 📦 отправка на адрес (Корея) · 🇨🇳 CN · --:-- · клиенты: — · долги: 0
        ");
    }

    #[test]
    fn order_card_lists_fields() {
        let mut o = order("CN-1", STATUSES[0]);
        o.note = Some("anna".into());
        o.origin = Some("KR".into());
        assert_snapshot!(order_card(&o), @r"
        order_id: CN-1
        client_name: @alice_k, @bob_ok
        status: 🛒 выкуплен
        note: anna
        country: CN
        origin: KR
        updated_at: 2024-05-17 14:05
        ");
    }

    #[test]
    fn order_status_mentions_origin_when_known() {
        let mut o = order("CN-1", STATUSES[0]);
        assert_eq!(order_status(&o), "📦 Заказ *CN-1*\nСтатус: *🛒 выкуплен*");
        o.origin = Some("CN".into());
        o.status = " ".into();
        assert_eq!(order_status(&o), "📦 Заказ *CN-1*\nСтатус: *статус не указан*\nСтрана/источник: CN");
    }

    #[test]
    fn profile_without_address_uses_dashes() {
        let text = profile("Alice_K", "Алиса ", None, &[]);
        assert_snapshot!(text, @r"
        👤 Профиль - @alice_k

        Имя - Алиса

        Ваши данные:
        ФИО: —
        Телефон: —
        Город: —
        Адрес: —
        Индекс: —

        Ваши разборы:
        —
        ");
    }

    #[test]
    fn profile_truncates_orders() {
        let orders: Vec<Order> = (1..=12).map(|i| order(&format!("CN-{i}"), STATUSES[0])).collect();
        let text = profile("alice_k", "Алиса", Some(&address()), &orders);
        assert!(text.contains("ФИО: Алиса Ким\nТелефон: 87001234567"));
        assert!(text.contains("• CN-10 — 🛒 выкуплен"));
        assert!(!text.contains("CN-11"));
        assert!(text.ends_with("\n… и ещё 2"));
    }

    #[test]
    fn clients_page_with_query() {
        let record = ClientRecord {
            user_id: UserId(7),
            username: Some("alice_k".into()),
            full_name: Some("Алиса Ким".into()),
            phone: Some("87001234567".into()),
            city: Some("Астана".into()),
            address: Some("пр. Мира 1".into()),
            postcode: Some("010000".into()),
            created_at: None,
            updated_at: None,
        };
        let text = clients_page(&[(record, vec![order("CN-1", STATUSES[0])])], 6, 0, Some("алиса"));
        assert_snapshot!(text, @r"
        📚 Список клиентов (1/2) — поиск: «алиса»
        @alice_k
        ФИО: Алиса Ким
        Телефон: 87001234567
        Город: Астана
        Адрес: пр. Мира 1
        Индекс: 010000
        Активные разборы: CN-1 (🛒 выкуплен)
        —
        ");
        assert_eq!(clients_page(&[], 0, 0, Some("x")), "Клиенты не найдены.");
        assert_eq!(clients_page(&[], 0, 0, None), "Пока нет клиентов.");
    }

    #[test]
    fn subscriptions_fall_back_to_dash() {
        let subs = vec![SubscriptionView {
            order_id: "CN-1".into(),
            status: Some(STATUSES[0].into()),
            last_sent_status: None,
        }];
        assert_eq!(subscriptions(&subs), "🔔 Ваши подписки:\n• CN-1 — последний статус: —");
        assert!(subscriptions(&[]).starts_with("Пока нет подписок."));
    }

    #[test]
    fn mass_summary_lists_failures() {
        assert_snapshot!(
            mass_update_summary("✏️ Массовая смена статусов — итог", 3, 1, &["CN-2".into(), "KR-3".into()]),
            @r"
        ✏️ Массовая смена статусов — итог
        Всего: 3
        ✅ Обновлено: 1
        ❌ Ошибки: 2
        Не удалось: CN-2, KR-3
        "
        );
    }

    #[test]
    fn address_texts() {
        assert_eq!(
            address_list(&address()),
            "📍 Ваш адрес доставки:\n• Алиса Ким — 87001234567\nАстана, пр. Мира 1, 010000"
        );
        let draft = AddressDraft {
            full_name: "Алиса Ким".into(),
            phone: "87001234567".into(),
            city: "Астана".into(),
            address: "пр. Мира 1".into(),
        };
        assert!(address_saved(&draft, "010000").ends_with("🏠 Адрес: пр. Мира 1\n📮 Индекс: 010000"));
    }

    #[test]
    fn note_export_uses_country_code() {
        let text = orders_by_note(&[order("CN-1", STATUSES[0])]);
        assert!(text.contains("country: CN\n*updated_at:* 2024-05-17 14:05\n—"));
        assert_eq!(orders_by_note(&[]), "Ничего не найдено.");
    }
}
