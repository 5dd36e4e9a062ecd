//! Per-user conversation state.
//!
//! Telegram delivers each message on its own, so multi-step flows (the
//! address wizard, order creation, search) keep their progress here between
//! updates. State lives in memory and is lost on restart, which only drops
//! half-finished wizards.

use std::{collections::HashMap, sync::Arc};

use seabluu_core::UserId;
use tokio::sync::RwLock;

/// Step of a client-side flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    /// Waiting for an order id to look up.
    Track,
    /// Address wizard.
    Address(AddressStep),
}

/// Address wizard fields, in input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressStep {
    /// Recipient full name.
    FullName,
    /// Phone.
    Phone,
    /// City.
    City,
    /// Street address.
    Street,
    /// Postcode, the final step.
    Postcode,
}

/// Steps of the admin "edit address by username" flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAddressStep {
    /// Waiting for the target `@username`.
    Username,
    /// Address fields after the target is known.
    Field(AddressStep),
}

/// Step of an admin flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminMode {
    /// Order wizard: id.
    AddOrderId,
    /// Order wizard: client text.
    AddOrderClient,
    /// Order wizard: starting status.
    AddOrderStatus,
    /// Order wizard: note, the final step.
    AddOrderNote,
    /// Waiting for order ids to remind debtors of.
    RemindUnpaid,
    /// Mass status change: waiting for a status pick.
    MassPickStatus,
    /// Mass status change: waiting for order ids.
    MassUpdateIds,
    /// Waiting for usernames to export addresses of.
    ExportAddresses,
    /// Editing a client's address.
    EditAddress(EditAddressStep),
    /// Waiting for a note marker.
    ExportOrdersByNote,
    /// Waiting for a clients search query.
    ClientsSearch,
}

/// Order being created by an admin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDraft {
    /// Normalized order id.
    pub order_id: String,
    /// Country code taken from the id prefix.
    pub country: String,
    /// Client text.
    pub client_name: String,
    /// Starting status.
    pub status: String,
}

/// Address fields collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressDraft {
    /// Recipient full name.
    pub full_name: String,
    /// Phone.
    pub phone: String,
    /// City.
    pub city: String,
    /// Street address.
    pub address: String,
}

/// Everything the bot remembers about one user between updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Active client flow.
    pub client_mode: Option<ClientMode>,
    /// Active admin flow.
    pub admin_mode: Option<AdminMode>,
    /// Order wizard draft.
    pub order_draft: OrderDraft,
    /// Address wizard draft, shared by the client and admin flows.
    pub address_draft: AddressDraft,
    /// User whose address an admin is editing.
    pub edit_target: Option<(UserId, String)>,
    /// The next text is a search query.
    pub find_expecting: bool,
    /// Order ids of the last search.
    pub find_results: Vec<String>,
    /// Order ids picked for a bulk status change from search.
    pub find_bulk_ids: Vec<String>,
    /// Status chosen for a mass update.
    pub mass_status: Option<String>,
    /// Debtors snapshot shown in the unpaid report.
    pub unpaid: Vec<(String, Vec<String>)>,
    /// Current page of the unpaid report.
    pub unpaid_page: usize,
    /// Active clients search query.
    pub clients_query: Option<String>,
    /// Current page of the clients list.
    pub clients_page: usize,
}

impl Session {
    /// Drops admin wizard progress, keeping reports and search results.
    pub fn reset_admin(&mut self) {
        self.admin_mode = None;
        self.order_draft = OrderDraft::default();
        self.edit_target = None;
    }
}

/// Sessions of all users, keyed by Telegram user id.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<i64, Session>>>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the user's session, or a fresh one.
    pub async fn load(&self, user_id: i64) -> Session {
        self.sessions.read().await.get(&user_id).cloned().unwrap_or_default()
    }

    /// Stores the user's session. Empty sessions are dropped.
    pub async fn save(&self, user_id: i64, session: Session) {
        let mut sessions = self.sessions.write().await;
        if session == Session::default() {
            sessions.remove(&user_id);
        } else {
            sessions.insert(user_id, session);
        }
    }

    /// Forgets the user's session.
    pub async fn clear(&self, user_id: i64) {
        self.sessions.write().await.remove(&user_id);
    }

    /// Number of users with a stored session.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no user has a stored session.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
