//! Reply and inline keyboards.
//!
//! Button labels double as commands: reply keyboard buttons send their text
//! back, so [`crate::menu::MenuAction::parse`] matches on the constants
//! defined here. Inline buttons carry `prefix:arg` callback data routed by
//! the dispatcher.

use seabluu_core::{parse::slice_page, Participant, STATUSES};
use seabluu_telegram::{InlineKeyboardButton, InlineKeyboardMarkup, ReplyKeyboardMarkup};

/// Client menu: track an order.
pub const BTN_TRACK: &str = "🔍 Отследить разбор";
/// Client menu: saved address.
pub const BTN_ADDRESSES: &str = "🏠 Мои адреса";
/// Client menu: subscriptions.
pub const BTN_SUBSCRIPTIONS: &str = "🔔 Мои подписки";
/// Client menu: profile.
pub const BTN_PROFILE: &str = "👤 Профиль";
/// Client menu: cancel the current flow.
pub const BTN_CANCEL: &str = "❌ Отмена";

/// Admin menu: create an order.
pub const BTN_ADMIN_ADD: &str = "➕ Добавить разбор";
/// Admin menu: multi search.
pub const BTN_ADMIN_SEARCH: &str = "🔎 Поиск";
/// Admin menu: broadcast submenu.
pub const BTN_ADMIN_BROADCAST: &str = "📣 Админ: Рассылка";
/// Admin menu: clients submenu.
pub const BTN_ADMIN_CLIENTS: &str = "👤 Клиенты";
/// Admin menu: reports submenu.
pub const BTN_ADMIN_REPORTS: &str = "📊 Отчёты";
/// Admin menu: mass status change.
pub const BTN_ADMIN_MASS: &str = "🧰 Массовая смена статусов";
/// Admin menu: leave the admin panel.
pub const BTN_ADMIN_EXIT: &str = "🚪 Выйти из админ-панели";
/// Back to the admin menu from a submenu.
pub const BTN_BACK_TO_ADMIN: &str = "⬅️ Назад, в админ-панель";

/// Broadcast: remind every debtor.
pub const BTN_BROADCAST_ALL: &str = "📨 Уведомления всем должникам";
/// Broadcast: remind debtors of chosen orders.
pub const BTN_BROADCAST_BY_ORDER: &str = "📩 Уведомления по ID разбора";

/// Clients: export addresses by usernames.
pub const BTN_EXPORT_ADDRESSES: &str = "📤 Выгрузить адреса клиентов";
/// Clients: edit an address by username.
pub const BTN_EDIT_ADDRESS: &str = "✏️ Изменить адрес по username";
/// Clients: paged list with search.
pub const BTN_LIST_CLIENTS: &str = "🔎 Список/поиск клиентов";

/// Reports: orders tagged with a note marker.
pub const BTN_REPORT_BY_NOTE: &str = "🧾 Выгрузить разборы админа";
/// Reports: debtors.
pub const BTN_REPORT_UNPAID: &str = "🧮 Отчёт по должникам";
/// Reports: latest orders.
pub const BTN_REPORT_LAST: &str = "🕒 Последние разборы";

/// Participants shown per page.
pub const PARTICIPANTS_PER_PAGE: usize = 8;
/// Search results listed per page.
pub const FIND_PER_PAGE: usize = 8;
/// Orders per page of the debtors report.
pub const UNPAID_PER_PAGE: usize = 15;
/// Clients per page of the clients list.
pub const CLIENTS_PER_PAGE: usize = 5;

/// Status picker callback prefix for the order wizard.
pub const PICK_STATUS_PREFIX: &str = "adm:pick_status_id";
/// Status picker callback prefix for the mass update.
pub const MASS_STATUS_PREFIX: &str = "mass:pick_status_id";
/// Status picker callback prefix for the bulk change from search.
pub const FIND_BULK_PREFIX: &str = "findbulk:pick";

fn button(text: impl Into<String>, data: impl Into<String>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, data)
}

/// Client main menu.
pub fn main_menu() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::from_rows(&[
        &[BTN_TRACK],
        &[BTN_ADDRESSES, BTN_SUBSCRIPTIONS],
        &[BTN_PROFILE],
        &[BTN_CANCEL],
    ])
}

/// Admin panel menu.
pub fn admin_menu() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::from_rows(&[
        &[BTN_ADMIN_ADD, BTN_ADMIN_SEARCH],
        &[BTN_ADMIN_BROADCAST, BTN_ADMIN_CLIENTS],
        &[BTN_ADMIN_REPORTS, BTN_ADMIN_MASS],
        &[BTN_ADMIN_EXIT],
    ])
}

/// Broadcast submenu.
pub fn broadcast_menu() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::from_rows(&[
        &[BTN_BROADCAST_ALL],
        &[BTN_BROADCAST_BY_ORDER],
        &[BTN_BACK_TO_ADMIN],
    ])
}

/// Clients submenu.
pub fn clients_menu() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::from_rows(&[
        &[BTN_EXPORT_ADDRESSES],
        &[BTN_LIST_CLIENTS],
        &[BTN_EDIT_ADDRESS],
        &[BTN_BACK_TO_ADMIN],
    ])
}

/// Reports submenu.
pub fn reports_menu() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::from_rows(&[
        &[BTN_REPORT_BY_NOTE],
        &[BTN_REPORT_UNPAID],
        &[BTN_REPORT_LAST],
        &[BTN_BACK_TO_ADMIN],
    ])
}

/// Single "back to admin" button, shown while searching.
pub fn back_to_admin() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::from_rows(&[&[BTN_BACK_TO_ADMIN]])
}

/// Every status as a button with `{prefix}:{index}` data, two per row.
pub fn status_picker(prefix: &str) -> InlineKeyboardMarkup {
    let rows = STATUSES
        .iter()
        .enumerate()
        .map(|(i, status)| button(*status, format!("{prefix}:{i}")))
        .collect::<Vec<_>>()
        .chunks(2)
        .map(<[InlineKeyboardButton]>::to_vec)
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Offer to follow an order.
pub fn subscribe(order_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        "🔔 Подписаться на обновления",
        format!("sub:{order_id}"),
    )]])
}

/// Offer to stop following an order.
pub fn unsubscribe(order_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("🔕 Отписаться", format!("unsub:{order_id}"))]])
}

/// One unsubscribe button per followed order.
pub fn subscriptions_list(order_ids: &[String]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        order_ids
            .iter()
            .map(|oid| vec![button(format!("🗑 Отписаться от {oid}"), format!("unsub:{oid}"))])
            .collect(),
    )
}

/// Admin actions under an order card.
pub fn order_card(order_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        "✏️ Изменить статус",
        format!("adm:status_menu:{order_id}"),
    )]])
}

/// Paid toggles for one page of participants, with navigation.
pub fn participants(order_id: &str, participants: &[Participant], page: usize) -> InlineKeyboardMarkup {
    let slice = slice_page(participants.len(), page, PARTICIPANTS_PER_PAGE);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = participants[slice.range.clone()]
        .iter()
        .map(|p| {
            let mark = if p.paid { "✅" } else { "❌" };
            vec![button(
                format!("{mark} @{}", p.username),
                format!("pp:toggle:{order_id}:{}", p.username),
            )]
        })
        .collect();

    let page = slice.page;
    let mut nav = Vec::new();
    if page > 0 {
        nav.push(button("« Назад", format!("pp:page:{order_id}:{}", page - 1)));
    }
    nav.push(button("🔄 Обновить", format!("pp:refresh:{order_id}:{page}")));
    if (page + 1) * PARTICIPANTS_PER_PAGE < participants.len() {
        nav.push(button("Вперёд »", format!("pp:page:{order_id}:{}", page + 1)));
    }
    rows.push(nav);
    InlineKeyboardMarkup::new(rows)
}

/// Search results as buttons opening each order, plus the bulk action.
/// Out-of-range pages show the last page.
pub fn find_results(order_ids: &[String], page: usize) -> InlineKeyboardMarkup {
    let slice = slice_page(order_ids.len(), page, FIND_PER_PAGE);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = order_ids[slice.range.clone()]
        .iter()
        .map(|oid| vec![button(format!("📦 {oid}"), format!("find:open:{oid}"))])
        .collect();

    let page = slice.page;
    let mut nav = Vec::new();
    if page > 0 {
        nav.push(button("◀︎", format!("find:page:{}", page - 1)));
    }
    if slice.range.end < order_ids.len() {
        nav.push(button("▶︎", format!("find:page:{}", page + 1)));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }
    if !order_ids.is_empty() {
        rows.push(vec![button("✏️ Изменить статус всем найденным", "find:bulk:ask")]);
    }
    InlineKeyboardMarkup::new(rows)
}

/// Debtors report navigation; `None` when everything fits one page.
pub fn unpaid_nav(page: usize, pages: usize) -> Option<InlineKeyboardMarkup> {
    let mut nav = Vec::new();
    if page > 0 {
        nav.push(button("◀︎", format!("unpaid:page:{}", page - 1)));
    }
    if page + 1 < pages {
        nav.push(button("▶︎", format!("unpaid:page:{}", page + 1)));
    }
    (!nav.is_empty()).then(|| InlineKeyboardMarkup::new(vec![nav]))
}

/// Clients list search button and navigation.
pub fn clients_nav(page: usize, pages: usize) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![button("🔎 Поиск", "clients:search:ask")]];
    let mut nav = Vec::new();
    if page > 0 {
        nav.push(button("◀︎", format!("clients:list:{}", page - 1)));
    }
    if page + 1 < pages {
        nav.push(button("▶︎", format!("clients:list:{}", page + 1)));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }
    InlineKeyboardMarkup::new(rows)
}

/// Actions under the saved address, or an offer to add one.
pub fn address_actions(has_address: bool) -> InlineKeyboardMarkup {
    if has_address {
        InlineKeyboardMarkup::new(vec![
            vec![button("✏️ Изменить адрес", "addr:add")],
            vec![button("🗑 Удалить адрес", "addr:del")],
        ])
    } else {
        InlineKeyboardMarkup::new(vec![vec![button("➕ Добавить адрес", "addr:add")]])
    }
}

/// Actions under the profile.
pub fn profile_actions() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("✏️ Изменить адрес", "addr:add")],
        vec![button(BTN_SUBSCRIPTIONS, "client:subs")],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn data(markup: &InlineKeyboardMarkup) -> Vec<Vec<&str>> {
        markup
            .inline_keyboard
            .iter()
            .map(|row| row.iter().map(|b| b.callback_data.as_str()).collect())
            .collect()
    }

    #[test]
    fn status_picker_has_two_columns_and_indexes() {
        let markup = status_picker(MASS_STATUS_PREFIX);
        assert_eq!(markup.inline_keyboard.len(), 6);
        assert_eq!(markup.inline_keyboard[0][1].callback_data, "mass:pick_status_id:1");
        assert_eq!(markup.inline_keyboard[5].len(), 1);
        assert_eq!(markup.inline_keyboard[5][0].text, STATUSES[10]);
    }

    #[test]
    fn participants_keyboard_pages_with_refresh() {
        let list: Vec<_> = (0..10).map(|i| participant(&format!("user_{i:02}"), i % 2 == 0)).collect();

        let first = participants("CN-1", &list, 0);
        assert_eq!(first.inline_keyboard.len(), 9);
        assert_eq!(first.inline_keyboard[0][0].text, "✅ @user_00");
        assert_eq!(first.inline_keyboard[1][0].callback_data, "pp:toggle:CN-1:user_01");
        assert_eq!(data(&first)[8], vec!["pp:refresh:CN-1:0", "pp:page:CN-1:1"]);

        let second = participants("CN-1", &list, 1);
        assert_eq!(second.inline_keyboard.len(), 3);
        assert_eq!(data(&second)[2], vec!["pp:page:CN-1:0", "pp:refresh:CN-1:1"]);
    }

    #[test]
    fn empty_participants_still_offer_refresh() {
        let markup = participants("KR-7", &[], 3);
        assert_eq!(data(&markup), vec![vec!["pp:refresh:KR-7:0"]]);
    }

    #[test]
    fn find_results_paginate_and_offer_bulk_change() {
        let ids: Vec<String> = (1..=9).map(|i| format!("CN-{i}")).collect();
        let first = find_results(&ids, 0);
        assert_eq!(first.inline_keyboard.len(), 10);
        assert_eq!(data(&first)[8], vec!["find:page:1"]);
        assert_eq!(data(&first)[9], vec!["find:bulk:ask"]);

        let second = find_results(&ids, 1);
        assert_eq!(data(&second), vec![vec!["find:open:CN-9"], vec!["find:page:0"], vec!["find:bulk:ask"]]);

        assert!(find_results(&[], 0).inline_keyboard.is_empty());
    }

    #[test]
    fn find_results_clamp_forged_pages() {
        let ids: Vec<String> = (1..=9).map(|i| format!("CN-{i}")).collect();
        let last = find_results(&ids, usize::MAX);
        assert_eq!(data(&last), vec![vec!["find:open:CN-9"], vec!["find:page:0"], vec!["find:bulk:ask"]]);
    }

    #[test]
    fn unpaid_nav_is_hidden_for_single_page() {
        assert!(unpaid_nav(0, 1).is_none());
        let nav = unpaid_nav(1, 3).unwrap();
        assert_eq!(data(&nav), vec![vec!["unpaid:page:0", "unpaid:page:2"]]);
    }

    #[test]
    fn clients_nav_always_offers_search() {
        assert_eq!(data(&clients_nav(0, 1)), vec![vec!["clients:search:ask"]]);
        assert_eq!(data(&clients_nav(0, 2))[1], vec!["clients:list:1"]);
    }

    #[test]
    fn main_menu_layout() {
        let menu = main_menu();
        let labels: Vec<Vec<&str>> = menu
            .keyboard
            .iter()
            .map(|row| row.iter().map(|b| b.text.as_str()).collect())
            .collect();
        assert_eq!(
            labels,
            vec![vec![BTN_TRACK], vec![BTN_ADDRESSES, BTN_SUBSCRIPTIONS], vec![BTN_PROFILE], vec![BTN_CANCEL]]
        );
        assert!(menu.resize_keyboard);
    }
}
