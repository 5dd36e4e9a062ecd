//! Mapping of reply keyboard texts to menu actions.

use crate::keyboards::*;

/// A reply keyboard button, recognized from its label or a plain-word alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Look up an order status.
    Track,
    /// Show the saved address.
    Addresses,
    /// List subscriptions.
    Subscriptions,
    /// Show the profile.
    Profile,
    /// Abort the current client flow.
    Cancel,
    /// Start the order wizard.
    AddOrder,
    /// Start a multi search.
    Search,
    /// Open the broadcast submenu.
    Broadcast,
    /// Open the clients submenu.
    Clients,
    /// Open the reports submenu.
    Reports,
    /// Start a mass status change.
    MassStatus,
    /// Leave the admin panel.
    ExitAdmin,
    /// Return to the admin panel.
    BackToAdmin,
    /// Remind every debtor.
    BroadcastAll,
    /// Remind debtors of chosen orders.
    BroadcastByOrder,
    /// Export client addresses.
    ExportAddresses,
    /// Edit a client's address.
    EditAddress,
    /// Paged clients list.
    ListClients,
    /// Export orders by note marker.
    ReportByNote,
    /// Debtors report.
    ReportUnpaid,
    /// Latest orders.
    ReportLastOrders,
}

const ALIASES: &[(MenuAction, &[&str])] = &[
    (MenuAction::Track, &[BTN_TRACK, "отследить разбор"]),
    (MenuAction::Addresses, &[BTN_ADDRESSES, "мои адреса"]),
    (MenuAction::Subscriptions, &[BTN_SUBSCRIPTIONS, "мои подписки"]),
    (MenuAction::Profile, &[BTN_PROFILE, "профиль"]),
    (MenuAction::Cancel, &[BTN_CANCEL, "отмена", "cancel"]),
    (MenuAction::AddOrder, &[BTN_ADMIN_ADD, "добавить разбор"]),
    (MenuAction::Search, &[BTN_ADMIN_SEARCH, "поиск"]),
    (MenuAction::Broadcast, &[BTN_ADMIN_BROADCAST, "админ: рассылка"]),
    (MenuAction::Clients, &[BTN_ADMIN_CLIENTS, "админ: адреса", "клиенты"]),
    (MenuAction::Reports, &[BTN_ADMIN_REPORTS, "отчёты"]),
    (MenuAction::MassStatus, &[BTN_ADMIN_MASS, "массовая смена статусов"]),
    (MenuAction::ExitAdmin, &[BTN_ADMIN_EXIT, "выйти из админ-панели"]),
    (MenuAction::BackToAdmin, &[BTN_BACK_TO_ADMIN, "назад, в админ-панель"]),
    (MenuAction::BroadcastAll, &[BTN_BROADCAST_ALL, "уведомления всем должникам"]),
    (MenuAction::BroadcastByOrder, &[BTN_BROADCAST_BY_ORDER, "уведомления по id разбора"]),
    (
        MenuAction::ExportAddresses,
        &[BTN_EXPORT_ADDRESSES, "выгрузить адреса", "выгрузить адреса клиентов"],
    ),
    (MenuAction::EditAddress, &[BTN_EDIT_ADDRESS, "изменить адрес по username"]),
    (MenuAction::ListClients, &[BTN_LIST_CLIENTS, "список/поиск клиентов"]),
    (MenuAction::ReportByNote, &[BTN_REPORT_BY_NOTE, "выгрузить разборы админа"]),
    (MenuAction::ReportUnpaid, &[BTN_REPORT_UNPAID, "отчёт по должникам"]),
    (MenuAction::ReportLastOrders, &[BTN_REPORT_LAST, "последние разборы"]),
];

impl MenuAction {
    /// Matches trimmed text against labels and aliases, ignoring case.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        ALIASES
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|alias| alias.to_lowercase() == text))
            .map(|(action, _)| *action)
    }

    /// Whether the action belongs to the admin panel.
    pub const fn is_admin(self) -> bool {
        !matches!(
            self,
            Self::Track | Self::Addresses | Self::Subscriptions | Self::Profile | Self::Cancel
        )
    }
}
