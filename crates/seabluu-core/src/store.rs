//! Storage seam shared by the bot and the admin API.
//!
//! `BotStore` is the only way the conversation engine and HTTP handlers
//! touch persistent state. Production uses the PostgreSQL-backed
//! [`Storage`]; tests use [`mock::MemoryStore`], which keeps the same
//! semantics in memory.

use async_trait::async_trait;

use crate::{
    error::Result,
    models::{
        Address, AdminAccount, AdminRole, ChatMessage, ClientProfile, ClientRecord, NewAddress,
        NewOrder, Order, Participant, Subscription, SubscriptionView, UserId,
    },
    storage::Storage,
};

/// Persistent state operations used by the bot and the admin API.
///
/// Order ids are compared case-insensitively and usernames are normalized
/// (no `@`, lowercase) by every implementation.
#[async_trait]
pub trait BotStore: Send + Sync {
    /// Verifies the backing store is reachable.
    async fn health_check(&self) -> Result<()>;

    /// Finds an order by id.
    async fn find_order(&self, order_id: &str) -> Result<Option<Order>>;

    /// Inserts or replaces an order, keeping a recorded client name and
    /// phone when the new ones are absent.
    async fn upsert_order(&self, order: &NewOrder) -> Result<Order>;

    /// Sets an order status; false when the order does not exist.
    async fn update_order_status(&self, order_id: &str, status: &str) -> Result<bool>;

    /// Most recently updated orders.
    async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>>;

    /// Orders in a given status.
    async fn orders_by_status(&self, status: &str, limit: i64) -> Result<Vec<Order>>;

    /// Orders whose note contains a marker, ignoring case.
    async fn orders_by_note(&self, marker: &str) -> Result<Vec<Order>>;

    /// Orders a username participates in.
    async fn orders_by_username(&self, username: &str) -> Result<Vec<Order>>;

    /// Orders whose phone digits equal the digits of `phone`.
    async fn orders_by_phone(&self, phone: &str) -> Result<Vec<Order>>;

    /// Adds participants to an order, ignoring duplicates.
    async fn ensure_participants(&self, order_id: &str, usernames: &[String]) -> Result<()>;

    /// Participants of an order sorted by username.
    async fn participants(&self, order_id: &str) -> Result<Vec<Participant>>;

    /// Flips a participant's paid flag; `None` when not a participant.
    async fn toggle_paid(&self, order_id: &str, username: &str) -> Result<Option<bool>>;

    /// Sets a participant's paid flag; false when not a participant.
    async fn set_paid(&self, order_id: &str, username: &str, paid: bool) -> Result<bool>;

    /// Usernames that still owe delivery payment for an order.
    async fn unpaid_usernames(&self, order_id: &str) -> Result<Vec<String>>;

    /// All debtors grouped by order id, sorted by order id.
    async fn unpaid_grouped(&self) -> Result<Vec<(String, Vec<String>)>>;

    /// Subscribes a user to an order.
    async fn subscribe(&self, user_id: UserId, order_id: &str) -> Result<()>;

    /// Removes a subscription; false when there was none.
    async fn unsubscribe(&self, user_id: UserId, order_id: &str) -> Result<bool>;

    /// Whether a user follows an order.
    async fn is_subscribed(&self, user_id: UserId, order_id: &str) -> Result<bool>;

    /// A user's subscriptions with current statuses, newest first.
    async fn subscriptions_for_user(&self, user_id: UserId) -> Result<Vec<SubscriptionView>>;

    /// Subscribers of an order.
    async fn subscribers(&self, order_id: &str) -> Result<Vec<Subscription>>;

    /// Records the last status sent to a subscriber.
    async fn set_last_sent_status(
        &self,
        user_id: UserId,
        order_id: &str,
        status: Option<&str>,
    ) -> Result<()>;

    /// Forgets the last sent status for every subscriber of an order.
    async fn reset_last_sent(&self, order_id: &str) -> Result<()>;

    /// Inserts or refreshes a known user; missing fields keep their old value.
    async fn upsert_client(&self, client: &ClientProfile) -> Result<()>;

    /// Chat ids for usernames; unknown usernames are skipped.
    async fn user_ids_by_usernames(&self, usernames: &[String]) -> Result<Vec<UserId>>;

    /// Clients joined with addresses for usernames.
    async fn client_records(&self, usernames: &[String]) -> Result<Vec<ClientRecord>>;

    /// A page of clients and the total match count.
    async fn clients_page(
        &self,
        page: i64,
        size: i64,
        query: Option<&str>,
    ) -> Result<(Vec<ClientRecord>, i64)>;

    /// Saves a user's address, replacing any previous one.
    async fn save_address(&self, address: &NewAddress) -> Result<Address>;

    /// A user's address.
    async fn address_for_user(&self, user_id: UserId) -> Result<Option<Address>>;

    /// Deletes a user's address; false when there was none.
    async fn delete_address(&self, user_id: UserId) -> Result<bool>;

    /// Latest addresses, optionally for one username.
    async fn recent_addresses(&self, username: Option<&str>, limit: i64) -> Result<Vec<Address>>;

    /// Finds an admin by login.
    async fn find_admin(&self, login: &str) -> Result<Option<AdminAccount>>;

    /// All admins, owner first.
    async fn list_admins(&self) -> Result<Vec<AdminAccount>>;

    /// Creates an admin; false when the login is taken.
    async fn create_admin(
        &self,
        login: &str,
        password_hash: &str,
        role: AdminRole,
        avatar: Option<&str>,
    ) -> Result<bool>;

    /// Sets an admin's avatar; false when the admin does not exist.
    async fn set_admin_avatar(&self, login: &str, avatar: &str) -> Result<bool>;

    /// Creates or refreshes the owner account.
    async fn upsert_owner(
        &self,
        login: &str,
        password_hash: &str,
        avatar: Option<&str>,
    ) -> Result<()>;

    /// Chat messages in ascending order.
    async fn chat_messages(&self, since_id: i64, limit: i64) -> Result<Vec<ChatMessage>>;

    /// Posts a chat message.
    async fn send_chat(
        &self,
        login: &str,
        text: &str,
        reference: Option<&str>,
    ) -> Result<ChatMessage>;
}

#[async_trait]
impl BotStore for Storage {
    async fn health_check(&self) -> Result<()> {
        Storage::health_check(self).await
    }

    async fn find_order(&self, order_id: &str) -> Result<Option<Order>> {
        self.orders.find(order_id).await
    }

    async fn upsert_order(&self, order: &NewOrder) -> Result<Order> {
        self.orders.upsert(order).await
    }

    async fn update_order_status(&self, order_id: &str, status: &str) -> Result<bool> {
        self.orders.update_status(order_id, status).await
    }

    async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>> {
        self.orders.recent(limit).await
    }

    async fn orders_by_status(&self, status: &str, limit: i64) -> Result<Vec<Order>> {
        self.orders.by_status(status, limit).await
    }

    async fn orders_by_note(&self, marker: &str) -> Result<Vec<Order>> {
        self.orders.by_note(marker).await
    }

    async fn orders_by_username(&self, username: &str) -> Result<Vec<Order>> {
        self.orders.by_username(username).await
    }

    async fn orders_by_phone(&self, phone: &str) -> Result<Vec<Order>> {
        self.orders.by_phone(phone).await
    }

    async fn ensure_participants(&self, order_id: &str, usernames: &[String]) -> Result<()> {
        self.participants.ensure(order_id, usernames).await
    }

    async fn participants(&self, order_id: &str) -> Result<Vec<Participant>> {
        self.participants.list(order_id).await
    }

    async fn toggle_paid(&self, order_id: &str, username: &str) -> Result<Option<bool>> {
        self.participants.toggle_paid(order_id, username).await
    }

    async fn set_paid(&self, order_id: &str, username: &str, paid: bool) -> Result<bool> {
        self.participants.set_paid(order_id, username, paid).await
    }

    async fn unpaid_usernames(&self, order_id: &str) -> Result<Vec<String>> {
        self.participants.unpaid_usernames(order_id).await
    }

    async fn unpaid_grouped(&self) -> Result<Vec<(String, Vec<String>)>> {
        self.participants.unpaid_grouped().await
    }

    async fn subscribe(&self, user_id: UserId, order_id: &str) -> Result<()> {
        self.subscriptions.subscribe(user_id, order_id).await
    }

    async fn unsubscribe(&self, user_id: UserId, order_id: &str) -> Result<bool> {
        self.subscriptions.unsubscribe(user_id, order_id).await
    }

    async fn is_subscribed(&self, user_id: UserId, order_id: &str) -> Result<bool> {
        self.subscriptions.is_subscribed(user_id, order_id).await
    }

    async fn subscriptions_for_user(&self, user_id: UserId) -> Result<Vec<SubscriptionView>> {
        self.subscriptions.for_user(user_id).await
    }

    async fn subscribers(&self, order_id: &str) -> Result<Vec<Subscription>> {
        self.subscriptions.for_order(order_id).await
    }

    async fn set_last_sent_status(
        &self,
        user_id: UserId,
        order_id: &str,
        status: Option<&str>,
    ) -> Result<()> {
        self.subscriptions.set_last_sent_status(user_id, order_id, status).await
    }

    async fn reset_last_sent(&self, order_id: &str) -> Result<()> {
        self.subscriptions.reset_last_sent(order_id).await
    }

    async fn upsert_client(&self, client: &ClientProfile) -> Result<()> {
        self.clients.upsert(client).await
    }

    async fn user_ids_by_usernames(&self, usernames: &[String]) -> Result<Vec<UserId>> {
        self.clients.user_ids_by_usernames(usernames).await
    }

    async fn client_records(&self, usernames: &[String]) -> Result<Vec<ClientRecord>> {
        self.clients.records_by_usernames(usernames).await
    }

    async fn clients_page(
        &self,
        page: i64,
        size: i64,
        query: Option<&str>,
    ) -> Result<(Vec<ClientRecord>, i64)> {
        self.clients.page(page, size, query).await
    }

    async fn save_address(&self, address: &NewAddress) -> Result<Address> {
        self.addresses.upsert(address).await
    }

    async fn address_for_user(&self, user_id: UserId) -> Result<Option<Address>> {
        self.addresses.for_user(user_id).await
    }

    async fn delete_address(&self, user_id: UserId) -> Result<bool> {
        self.addresses.delete(user_id).await
    }

    async fn recent_addresses(&self, username: Option<&str>, limit: i64) -> Result<Vec<Address>> {
        self.addresses.recent(username, limit).await
    }

    async fn find_admin(&self, login: &str) -> Result<Option<AdminAccount>> {
        self.admins.find(login).await
    }

    async fn list_admins(&self) -> Result<Vec<AdminAccount>> {
        self.admins.list().await
    }

    async fn create_admin(
        &self,
        login: &str,
        password_hash: &str,
        role: AdminRole,
        avatar: Option<&str>,
    ) -> Result<bool> {
        self.admins.create(login, password_hash, role, avatar).await
    }

    async fn set_admin_avatar(&self, login: &str, avatar: &str) -> Result<bool> {
        self.admins.set_avatar(login, avatar).await
    }

    async fn upsert_owner(
        &self,
        login: &str,
        password_hash: &str,
        avatar: Option<&str>,
    ) -> Result<()> {
        self.admins.upsert_owner(login, password_hash, avatar).await
    }

    async fn chat_messages(&self, since_id: i64, limit: i64) -> Result<Vec<ChatMessage>> {
        self.chat.list(since_id, limit).await
    }

    async fn send_chat(
        &self,
        login: &str,
        text: &str,
        reference: Option<&str>,
    ) -> Result<ChatMessage> {
        self.chat.send(login, text, reference).await
    }
}

pub mod mock {
    //! In-memory store for testing without a database.
    //!
    //! Mirrors the PostgreSQL repositories closely enough for the bot and
    //! API tests: case-insensitive order ids, normalized usernames, newest
    //! first listings. A single failure can be injected to exercise error
    //! paths.

    use std::{
        collections::{BTreeMap, HashMap, HashSet},
        sync::Arc,
    };

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::RwLock;

    use super::BotStore;
    use crate::{
        error::{CoreError, Result},
        models::{
            Address, AdminAccount, AdminRole, ChatMessage, ClientProfile, ClientRecord,
            NewAddress, NewOrder, Order, Participant, Subscription, SubscriptionView, UserId,
        },
        parse::{digits_only, normalize_username},
    };

    #[derive(Default)]
    struct State {
        /// Monotonic counter standing in for timestamps in orderings
        seq: u64,
        next_order_row: i32,
        orders: HashMap<String, (u64, Order)>,
        participants: Vec<Participant>,
        subscriptions: Vec<(u64, Subscription)>,
        clients: HashMap<UserId, (u64, ClientProfile)>,
        addresses: HashMap<UserId, (u64, Address)>,
        admins: Vec<AdminAccount>,
        chat: Vec<ChatMessage>,
    }

    impl State {
        fn tick(&mut self) -> u64 {
            self.seq += 1;
            self.seq
        }

        fn sorted_orders<F>(&self, keep: F) -> Vec<Order>
        where
            F: Fn(&Order) -> bool,
        {
            let mut rows: Vec<&(u64, Order)> =
                self.orders.values().filter(|(_, o)| keep(o)).collect();
            rows.sort_by(|a, b| b.0.cmp(&a.0));
            rows.into_iter().map(|(_, o)| o.clone()).collect()
        }

        fn record(&self, user_id: UserId) -> Option<(u64, ClientRecord)> {
            let (seq, client) = self.clients.get(&user_id)?;
            let address = self.addresses.get(&user_id).map(|(_, a)| a);
            Some((
                *seq,
                ClientRecord {
                    user_id,
                    username: client.username.clone(),
                    full_name: address
                        .map(|a| a.full_name.clone())
                        .or_else(|| client.full_name.clone()),
                    phone: address.map(|a| a.phone.clone()).or_else(|| client.phone.clone()),
                    city: address.map(|a| a.city.clone()),
                    address: address.map(|a| a.address.clone()),
                    postcode: address.map(|a| a.postcode.clone()),
                    created_at: address.and_then(|a| a.created_at),
                    updated_at: address.and_then(|a| a.updated_at),
                },
            ))
        }

        fn avatar_of(&self, login: &str) -> Option<String> {
            self.admins
                .iter()
                .find(|a| a.login.eq_ignore_ascii_case(login))
                .and_then(|a| a.avatar.clone())
        }
    }

    fn same_order(a: &str, b: &str) -> bool {
        a.trim().to_lowercase() == b.trim().to_lowercase()
    }

    fn normalized(usernames: &[String]) -> Vec<String> {
        usernames.iter().map(|u| normalize_username(u)).filter(|u| !u.is_empty()).collect()
    }

    /// In-memory `BotStore` for tests.
    pub struct MemoryStore {
        state: Arc<RwLock<State>>,
        failure: Arc<RwLock<Option<String>>>,
        broken_orders: Arc<RwLock<HashSet<String>>>,
    }

    impl MemoryStore {
        /// Creates an empty store.
        pub fn new() -> Self {
            Self {
                state: Arc::new(RwLock::new(State::default())),
                failure: Arc::default(),
                broken_orders: Arc::default(),
            }
        }

        /// Makes the next store operation fail with `CoreError::Database`.
        pub async fn inject_failure(&self, message: impl Into<String>) {
            *self.failure.write().await = Some(message.into());
        }

        /// Makes every status update of `order_id` fail with
        /// `CoreError::Database`, leaving other orders untouched.
        pub async fn fail_status_updates(&self, order_id: &str) {
            self.broken_orders.write().await.insert(order_id.trim().to_lowercase());
        }

        /// Registers a Telegram user so usernames resolve to chat ids.
        pub async fn add_client(&self, user_id: i64, username: &str) {
            let mut state = self.state.write().await;
            let seq = state.tick();
            state.clients.insert(
                UserId(user_id),
                (
                    seq,
                    ClientProfile {
                        user_id: UserId(user_id),
                        username: Some(normalize_username(username)),
                        full_name: None,
                        phone: None,
                    },
                ),
            );
        }

        /// All subscriptions, for assertions.
        pub async fn all_subscriptions(&self) -> Vec<Subscription> {
            self.state.read().await.subscriptions.iter().map(|(_, s)| s.clone()).collect()
        }

        async fn check(&self) -> Result<()> {
            match self.failure.write().await.take() {
                Some(message) => Err(CoreError::Database(message)),
                None => Ok(()),
            }
        }
    }

    impl Default for MemoryStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl BotStore for MemoryStore {
        async fn health_check(&self) -> Result<()> {
            self.check().await
        }

        async fn find_order(&self, order_id: &str) -> Result<Option<Order>> {
            self.check().await?;
            let state = self.state.read().await;
            Ok(state.orders.get(&order_id.trim().to_lowercase()).map(|(_, o)| o.clone()))
        }

        async fn upsert_order(&self, order: &NewOrder) -> Result<Order> {
            self.check().await?;
            if order.order_id.trim().is_empty() {
                return Err(CoreError::InvalidInput("order_id required".to_string()));
            }
            let mut state = self.state.write().await;
            let seq = state.tick();
            let key = order.order_id.trim().to_lowercase();
            let now = Utc::now();
            let (id, created_at, client_name, phone) = match state.orders.get(&key) {
                Some((_, existing)) => (
                    existing.id,
                    existing.created_at,
                    order.client_name.clone().or_else(|| existing.client_name.clone()),
                    order.phone.clone().or_else(|| existing.phone.clone()),
                ),
                None => {
                    state.next_order_row += 1;
                    (state.next_order_row, Some(now), order.client_name.clone(), order.phone.clone())
                },
            };
            let saved = Order {
                id,
                order_id: order.order_id.clone(),
                client_name,
                phone,
                origin: order.origin.clone(),
                status: order.status.clone(),
                note: order.note.clone(),
                country: order.country.clone(),
                created_at,
                updated_at: Some(now),
            };
            state.orders.insert(key, (seq, saved.clone()));
            Ok(saved)
        }

        async fn update_order_status(&self, order_id: &str, status: &str) -> Result<bool> {
            self.check().await?;
            let key = order_id.trim().to_lowercase();
            if self.broken_orders.read().await.contains(&key) {
                return Err(CoreError::Database(format!("status update of {order_id} failed")));
            }
            let mut state = self.state.write().await;
            let seq = state.tick();
            match state.orders.get_mut(&key) {
                Some(entry) => {
                    entry.0 = seq;
                    entry.1.status = status.to_string();
                    entry.1.updated_at = Some(Utc::now());
                    Ok(true)
                },
                None => Ok(false),
            }
        }

        async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>> {
            self.check().await?;
            let state = self.state.read().await;
            let mut orders = state.sorted_orders(|_| true);
            orders.truncate(usize::try_from(limit).unwrap_or(0));
            Ok(orders)
        }

        async fn orders_by_status(&self, status: &str, limit: i64) -> Result<Vec<Order>> {
            self.check().await?;
            let state = self.state.read().await;
            let mut orders = state.sorted_orders(|o| o.status == status);
            orders.truncate(usize::try_from(limit).unwrap_or(0));
            Ok(orders)
        }

        async fn orders_by_note(&self, marker: &str) -> Result<Vec<Order>> {
            self.check().await?;
            let marker = marker.trim().to_lowercase();
            if marker.is_empty() {
                return Ok(Vec::new());
            }
            let state = self.state.read().await;
            Ok(state.sorted_orders(|o| {
                o.note.as_deref().is_some_and(|n| n.to_lowercase().contains(&marker))
            }))
        }

        async fn orders_by_username(&self, username: &str) -> Result<Vec<Order>> {
            self.check().await?;
            let username = normalize_username(username);
            if username.is_empty() {
                return Ok(Vec::new());
            }
            let state = self.state.read().await;
            let joined: Vec<&str> = state
                .participants
                .iter()
                .filter(|p| p.username == username)
                .map(|p| p.order_id.as_str())
                .collect();
            Ok(state.sorted_orders(|o| joined.iter().any(|oid| same_order(oid, &o.order_id))))
        }

        async fn orders_by_phone(&self, phone: &str) -> Result<Vec<Order>> {
            self.check().await?;
            let digits = digits_only(phone);
            if digits.is_empty() {
                return Ok(Vec::new());
            }
            let state = self.state.read().await;
            Ok(state.sorted_orders(|o| o.phone.as_deref().map(digits_only) == Some(digits.clone())))
        }

        async fn ensure_participants(&self, order_id: &str, usernames: &[String]) -> Result<()> {
            self.check().await?;
            let mut state = self.state.write().await;
            for username in normalized(usernames) {
                let exists = state
                    .participants
                    .iter()
                    .any(|p| same_order(&p.order_id, order_id) && p.username == username);
                if !exists {
                    let now = Some(Utc::now());
                    state.participants.push(Participant {
                        order_id: order_id.to_string(),
                        username,
                        paid: false,
                        qty: None,
                        created_at: now,
                        updated_at: now,
                    });
                }
            }
            Ok(())
        }

        async fn participants(&self, order_id: &str) -> Result<Vec<Participant>> {
            self.check().await?;
            let state = self.state.read().await;
            let mut list: Vec<Participant> = state
                .participants
                .iter()
                .filter(|p| same_order(&p.order_id, order_id))
                .cloned()
                .collect();
            list.sort_by(|a, b| a.username.cmp(&b.username));
            Ok(list)
        }

        async fn toggle_paid(&self, order_id: &str, username: &str) -> Result<Option<bool>> {
            self.check().await?;
            let username = normalize_username(username);
            let mut state = self.state.write().await;
            Ok(state
                .participants
                .iter_mut()
                .find(|p| same_order(&p.order_id, order_id) && p.username == username)
                .map(|p| {
                    p.paid = !p.paid;
                    p.updated_at = Some(Utc::now());
                    p.paid
                }))
        }

        async fn set_paid(&self, order_id: &str, username: &str, paid: bool) -> Result<bool> {
            self.check().await?;
            let username = normalize_username(username);
            let mut state = self.state.write().await;
            match state
                .participants
                .iter_mut()
                .find(|p| same_order(&p.order_id, order_id) && p.username == username)
            {
                Some(p) => {
                    p.paid = paid;
                    p.updated_at = Some(Utc::now());
                    Ok(true)
                },
                None => Ok(false),
            }
        }

        async fn unpaid_usernames(&self, order_id: &str) -> Result<Vec<String>> {
            self.check().await?;
            let state = self.state.read().await;
            let mut names: Vec<String> = state
                .participants
                .iter()
                .filter(|p| same_order(&p.order_id, order_id) && !p.paid)
                .map(|p| p.username.clone())
                .collect();
            names.sort();
            Ok(names)
        }

        async fn unpaid_grouped(&self) -> Result<Vec<(String, Vec<String>)>> {
            self.check().await?;
            let state = self.state.read().await;
            let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for p in state.participants.iter().filter(|p| !p.paid) {
                grouped.entry(p.order_id.clone()).or_default().push(p.username.clone());
            }
            Ok(grouped
                .into_iter()
                .map(|(oid, mut names)| {
                    names.sort();
                    (oid, names)
                })
                .collect())
        }

        async fn subscribe(&self, user_id: UserId, order_id: &str) -> Result<()> {
            self.check().await?;
            let mut state = self.state.write().await;
            let exists = state
                .subscriptions
                .iter()
                .any(|(_, s)| s.user_id == user_id && same_order(&s.order_id, order_id));
            if !exists {
                let seq = state.tick();
                let now = Some(Utc::now());
                state.subscriptions.push((
                    seq,
                    Subscription {
                        user_id,
                        order_id: order_id.to_string(),
                        last_sent_status: None,
                        created_at: now,
                        updated_at: now,
                    },
                ));
            }
            Ok(())
        }

        async fn unsubscribe(&self, user_id: UserId, order_id: &str) -> Result<bool> {
            self.check().await?;
            let mut state = self.state.write().await;
            let before = state.subscriptions.len();
            state
                .subscriptions
                .retain(|(_, s)| !(s.user_id == user_id && same_order(&s.order_id, order_id)));
            Ok(state.subscriptions.len() < before)
        }

        async fn is_subscribed(&self, user_id: UserId, order_id: &str) -> Result<bool> {
            self.check().await?;
            let state = self.state.read().await;
            Ok(state
                .subscriptions
                .iter()
                .any(|(_, s)| s.user_id == user_id && same_order(&s.order_id, order_id)))
        }

        async fn subscriptions_for_user(&self, user_id: UserId) -> Result<Vec<SubscriptionView>> {
            self.check().await?;
            let state = self.state.read().await;
            let mut subs: Vec<&(u64, Subscription)> =
                state.subscriptions.iter().filter(|(_, s)| s.user_id == user_id).collect();
            subs.sort_by(|a, b| b.0.cmp(&a.0));
            Ok(subs
                .into_iter()
                .map(|(_, s)| SubscriptionView {
                    order_id: s.order_id.clone(),
                    status: state
                        .orders
                        .get(&s.order_id.trim().to_lowercase())
                        .map(|(_, o)| o.status.clone()),
                    last_sent_status: s.last_sent_status.clone(),
                })
                .collect())
        }

        async fn subscribers(&self, order_id: &str) -> Result<Vec<Subscription>> {
            self.check().await?;
            let state = self.state.read().await;
            Ok(state
                .subscriptions
                .iter()
                .filter(|(_, s)| same_order(&s.order_id, order_id))
                .map(|(_, s)| s.clone())
                .collect())
        }

        async fn set_last_sent_status(
            &self,
            user_id: UserId,
            order_id: &str,
            status: Option<&str>,
        ) -> Result<()> {
            self.check().await?;
            let mut state = self.state.write().await;
            for (_, s) in state
                .subscriptions
                .iter_mut()
                .filter(|(_, s)| s.user_id == user_id && same_order(&s.order_id, order_id))
            {
                s.last_sent_status = status.map(str::to_string);
                s.updated_at = Some(Utc::now());
            }
            Ok(())
        }

        async fn reset_last_sent(&self, order_id: &str) -> Result<()> {
            self.check().await?;
            let mut state = self.state.write().await;
            for (_, s) in
                state.subscriptions.iter_mut().filter(|(_, s)| same_order(&s.order_id, order_id))
            {
                s.last_sent_status = None;
            }
            Ok(())
        }

        async fn upsert_client(&self, client: &ClientProfile) -> Result<()> {
            self.check().await?;
            let mut state = self.state.write().await;
            let seq = state.tick();
            let mut client = client.clone();
            client.username =
                client.username.as_deref().map(normalize_username).filter(|u| !u.is_empty());
            if let Some((_, previous)) = state.clients.get(&client.user_id) {
                client.username = client.username.or_else(|| previous.username.clone());
                client.full_name =
                    client.full_name.filter(|s| !s.is_empty()).or_else(|| previous.full_name.clone());
                client.phone = client.phone.filter(|s| !s.is_empty()).or_else(|| previous.phone.clone());
            }
            state.clients.insert(client.user_id, (seq, client));
            Ok(())
        }

        async fn user_ids_by_usernames(&self, usernames: &[String]) -> Result<Vec<UserId>> {
            self.check().await?;
            let wanted = normalized(usernames);
            let state = self.state.read().await;
            let mut ids: Vec<UserId> = state
                .clients
                .values()
                .filter(|(_, c)| c.username.as_ref().is_some_and(|u| wanted.contains(u)))
                .map(|(_, c)| c.user_id)
                .collect();
            ids.sort();
            Ok(ids)
        }

        async fn client_records(&self, usernames: &[String]) -> Result<Vec<ClientRecord>> {
            self.check().await?;
            let wanted = normalized(usernames);
            let state = self.state.read().await;
            let mut records: Vec<ClientRecord> = state
                .clients
                .values()
                .filter(|(_, c)| c.username.as_ref().is_some_and(|u| wanted.contains(u)))
                .filter_map(|(_, c)| state.record(c.user_id).map(|(_, r)| r))
                .collect();
            records.sort_by(|a, b| a.username.cmp(&b.username));
            Ok(records)
        }

        async fn clients_page(
            &self,
            page: i64,
            size: i64,
            query: Option<&str>,
        ) -> Result<(Vec<ClientRecord>, i64)> {
            self.check().await?;
            let q = query.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());
            let needle = q.as_deref().map(|q| q.trim_start_matches('@').to_string());
            let digits = q.as_deref().map(digits_only).filter(|d| !d.is_empty());

            let state = self.state.read().await;
            let mut matched: Vec<(u64, ClientRecord)> = state
                .clients
                .keys()
                .filter_map(|id| state.record(*id))
                .filter(|(_, r)| {
                    let Some(needle) = needle.as_deref() else {
                        return true;
                    };
                    let username = r.username.as_deref().unwrap_or_default().to_lowercase();
                    let name = r.full_name.as_deref().unwrap_or_default().to_lowercase();
                    let phone = r.phone.as_deref().map(digits_only).unwrap_or_default();
                    username.contains(needle)
                        || name.contains(needle)
                        || digits.as_deref().is_some_and(|d| phone.contains(d))
                })
                .collect();
            matched.sort_by(|a, b| b.0.cmp(&a.0));

            let total = i64::try_from(matched.len()).unwrap_or(i64::MAX);
            let size = usize::try_from(size).unwrap_or(0);
            let skip = usize::try_from(page.max(0)).unwrap_or(0).saturating_mul(size);
            let items = matched.into_iter().skip(skip).take(size).map(|(_, r)| r).collect();
            Ok((items, total))
        }

        async fn save_address(&self, address: &NewAddress) -> Result<Address> {
            self.check().await?;
            let mut state = self.state.write().await;
            let seq = state.tick();
            let user_id = UserId(address.user_id);
            let username =
                Some(normalize_username(&address.username)).filter(|u| !u.is_empty());
            let now = Utc::now();

            let previous_username = state.clients.get(&user_id).and_then(|(_, c)| c.username.clone());
            state.clients.insert(
                user_id,
                (
                    seq,
                    ClientProfile {
                        user_id,
                        username: username.clone().or(previous_username),
                        full_name: Some(address.full_name.clone()),
                        phone: Some(address.phone.clone()),
                    },
                ),
            );

            let created_at = state.addresses.get(&user_id).and_then(|(_, a)| a.created_at);
            let saved = Address {
                user_id,
                username,
                full_name: address.full_name.clone(),
                phone: address.phone.clone(),
                city: address.city.clone(),
                address: address.address.clone(),
                postcode: address.postcode.clone(),
                created_at: created_at.or(Some(now)),
                updated_at: Some(now),
            };
            state.addresses.insert(user_id, (seq, saved.clone()));
            Ok(saved)
        }

        async fn address_for_user(&self, user_id: UserId) -> Result<Option<Address>> {
            self.check().await?;
            let state = self.state.read().await;
            Ok(state.addresses.get(&user_id).map(|(_, a)| a.clone()))
        }

        async fn delete_address(&self, user_id: UserId) -> Result<bool> {
            self.check().await?;
            Ok(self.state.write().await.addresses.remove(&user_id).is_some())
        }

        async fn recent_addresses(
            &self,
            username: Option<&str>,
            limit: i64,
        ) -> Result<Vec<Address>> {
            self.check().await?;
            let username = username.map(normalize_username).filter(|u| !u.is_empty());
            let state = self.state.read().await;
            let mut rows: Vec<&(u64, Address)> = state
                .addresses
                .values()
                .filter(|(_, a)| username.is_none() || a.username == username)
                .collect();
            rows.sort_by(|a, b| b.0.cmp(&a.0));
            Ok(rows
                .into_iter()
                .take(usize::try_from(limit).unwrap_or(0))
                .map(|(_, a)| a.clone())
                .collect())
        }

        async fn find_admin(&self, login: &str) -> Result<Option<AdminAccount>> {
            self.check().await?;
            let state = self.state.read().await;
            Ok(state.admins.iter().find(|a| a.login.eq_ignore_ascii_case(login.trim())).cloned())
        }

        async fn list_admins(&self) -> Result<Vec<AdminAccount>> {
            self.check().await?;
            let mut admins = self.state.read().await.admins.clone();
            admins.sort_by(|a, b| {
                (b.role == AdminRole::Owner)
                    .cmp(&(a.role == AdminRole::Owner))
                    .then_with(|| a.login.cmp(&b.login))
            });
            Ok(admins)
        }

        async fn create_admin(
            &self,
            login: &str,
            password_hash: &str,
            role: AdminRole,
            avatar: Option<&str>,
        ) -> Result<bool> {
            self.check().await?;
            let login = login.trim().to_lowercase();
            let mut state = self.state.write().await;
            if state.admins.iter().any(|a| a.login.eq_ignore_ascii_case(&login)) {
                return Ok(false);
            }
            state.admins.push(AdminAccount {
                login,
                password_hash: password_hash.to_string(),
                role,
                avatar: avatar.map(str::to_string),
                created_at: Some(Utc::now()),
            });
            Ok(true)
        }

        async fn set_admin_avatar(&self, login: &str, avatar: &str) -> Result<bool> {
            self.check().await?;
            let mut state = self.state.write().await;
            match state.admins.iter_mut().find(|a| a.login.eq_ignore_ascii_case(login.trim())) {
                Some(admin) => {
                    admin.avatar = Some(avatar.to_string());
                    Ok(true)
                },
                None => Ok(false),
            }
        }

        async fn upsert_owner(
            &self,
            login: &str,
            password_hash: &str,
            avatar: Option<&str>,
        ) -> Result<()> {
            self.check().await?;
            let login = login.trim().to_lowercase();
            let avatar = avatar.filter(|a| !a.is_empty()).map(str::to_string);
            let mut state = self.state.write().await;
            match state.admins.iter_mut().find(|a| a.login == login) {
                Some(admin) => {
                    admin.password_hash = password_hash.to_string();
                    admin.role = AdminRole::Owner;
                    if avatar.is_some() {
                        admin.avatar = avatar;
                    }
                },
                None => state.admins.push(AdminAccount {
                    login,
                    password_hash: password_hash.to_string(),
                    role: AdminRole::Owner,
                    avatar,
                    created_at: Some(Utc::now()),
                }),
            }
            Ok(())
        }

        async fn chat_messages(&self, since_id: i64, limit: i64) -> Result<Vec<ChatMessage>> {
            self.check().await?;
            let state = self.state.read().await;
            let limit = usize::try_from(limit).unwrap_or(0);
            let selected: Vec<&ChatMessage> = if since_id > 0 {
                state.chat.iter().filter(|m| m.id > since_id).take(limit).collect()
            } else {
                let skip = state.chat.len().saturating_sub(limit);
                state.chat.iter().skip(skip).collect()
            };
            Ok(selected
                .into_iter()
                .map(|m| ChatMessage { avatar: state.avatar_of(&m.login), ..m.clone() })
                .collect())
        }

        async fn send_chat(
            &self,
            login: &str,
            text: &str,
            reference: Option<&str>,
        ) -> Result<ChatMessage> {
            self.check().await?;
            let mut state = self.state.write().await;
            let id = i64::try_from(state.chat.len()).unwrap_or(i64::MAX) + 1;
            let message = ChatMessage {
                id,
                login: login.to_string(),
                avatar: state.avatar_of(login),
                text: text.to_string(),
                reference: reference.filter(|r| !r.is_empty()).map(str::to_string),
                created_at: Utc::now(),
            };
            state.chat.push(message.clone());
            Ok(message)
        }
    }
}
