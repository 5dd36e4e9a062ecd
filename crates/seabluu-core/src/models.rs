//! Core domain models and strongly-typed identifiers.
//!
//! Orders move through a fixed list of shipping statuses. Participants are
//! the Telegram usernames that share an order and owe delivery payment,
//! subscriptions link Telegram users to orders they want status updates for.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

type PgDb = sqlx::Postgres;
type PgValueRef<'r> = sqlx::postgres::PgValueRef<'r>;
type PgTypeInfo = sqlx::postgres::PgTypeInfo;
type PgArgumentBuffer = sqlx::postgres::PgArgumentBuffer;
type EncodeResult =
    Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync + 'static>>;
type BoxDynError = sqlx::error::BoxDynError;

/// The fixed, ordered list of shipping statuses.
///
/// Index positions are part of the callback protocol (`adm:set_status:{oid}:{i}`)
/// and of the web admin `pick_index`, so the order must never change.
pub const STATUSES: [&str; 11] = [
    "🛒 выкуплен",
    "📦 отправка на адрес (Корея)",
    "📦 отправка на адрес (Китай)",
    "📬 приехал на адрес (Корея)",
    "📬 приехал на адрес (Китай)",
    "🛫 ожидает доставку в Казахстан",
    "🚚 отправлен на адрес в Казахстан",
    "🏠 приехал админу в Казахстан",
    "📦 ожидает отправку по Казахстану",
    "🚚 отправлен по Казахстану",
    "✅ получен заказчиком",
];

/// Returns the status at `index` in [`STATUSES`].
pub fn status_by_index(index: usize) -> Option<&'static str> {
    STATUSES.get(index).copied()
}

/// Maps free text onto a status from [`STATUSES`], ignoring case and
/// surrounding whitespace.
pub fn canonical_status(input: &str) -> Option<&'static str> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    STATUSES.iter().copied().find(|s| s.to_lowercase() == needle)
}

/// Whether the status marks a finished order.
pub fn is_delivered(status: &str) -> bool {
    status.trim_start().starts_with('✅')
}

/// Strongly-typed Telegram user identifier.
///
/// Telegram user ids double as private chat ids, so this is also the
/// destination for direct notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl sqlx::Type<PgDb> for UserId {
    fn type_info() -> PgTypeInfo {
        <i64 as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for UserId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let id = <i64 as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(id))
    }
}

impl sqlx::Encode<'_, PgDb> for UserId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <i64 as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Warehouse country an order ships from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Country {
    /// China warehouse.
    #[serde(rename = "CN")]
    China,
    /// Korea warehouse.
    #[serde(rename = "KR")]
    Korea,
}

impl Country {
    /// Parses a two-letter code, ignoring case.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "CN" => Some(Self::China),
            "KR" => Some(Self::Korea),
            _ => None,
        }
    }

    /// Two-letter code as stored in the database.
    pub const fn code(self) -> &'static str {
        match self {
            Self::China => "CN",
            Self::Korea => "KR",
        }
    }

    /// Flag emoji.
    pub const fn flag(self) -> &'static str {
        match self {
            Self::China => "🇨🇳",
            Self::Korea => "🇰🇷",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Flag emoji for a country code; unknown codes get a white flag.
pub fn country_flag(code: &str) -> &'static str {
    Country::from_code(code).map_or("🏳️", Country::flag)
}

/// A group-buy order ("разбор") tracked by the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    /// Surrogate row id.
    pub id: i32,
    /// Normalized public id, `PREFIX-SUFFIX`.
    pub order_id: String,
    /// Free-form client text, usually a list of @usernames.
    pub client_name: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Origin warehouse code.
    pub origin: Option<String>,
    /// Current status, normally one of [`STATUSES`].
    pub status: String,
    /// Admin note; admins tag their orders with a marker word here.
    pub note: Option<String>,
    /// Country code.
    pub country: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Country code for display: origin, then country, then the id prefix.
    pub fn country_code(&self) -> String {
        self.origin
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.country.as_deref().filter(|s| !s.trim().is_empty()))
            .map(|s| s.trim().to_uppercase())
            .or_else(|| self.order_id.split_once('-').map(|(p, _)| p.to_uppercase()))
            .unwrap_or_default()
    }

    /// Whether the order has not reached the final status yet.
    pub fn is_active(&self) -> bool {
        !is_delivered(&self.status)
    }
}

/// Input for creating or replacing an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Normalized public id.
    pub order_id: String,
    /// Free-form client text.
    pub client_name: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Origin warehouse code.
    pub origin: Option<String>,
    /// Initial status.
    pub status: String,
    /// Admin note.
    pub note: Option<String>,
    /// Country code.
    pub country: Option<String>,
}

/// A username taking part in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
    /// Order the participant belongs to.
    pub order_id: String,
    /// Normalized username without `@`.
    pub username: String,
    /// Whether delivery has been paid.
    pub paid: bool,
    /// Item quantity, if tracked.
    pub qty: Option<i32>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A user's subscription to status updates of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    /// Subscriber.
    pub user_id: UserId,
    /// Order being followed.
    pub order_id: String,
    /// Last status the subscriber was notified about.
    pub last_sent_status: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Subscription joined with the current order status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionView {
    /// Order being followed.
    pub order_id: String,
    /// Current order status, if the order still exists.
    pub status: Option<String>,
    /// Last status the subscriber was notified about.
    pub last_sent_status: Option<String>,
}

/// Delivery address of a Telegram user. One per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    /// Owner.
    pub user_id: UserId,
    /// Username at the time of saving.
    pub username: Option<String>,
    /// Recipient full name.
    pub full_name: String,
    /// Normalized phone.
    pub phone: String,
    /// City.
    pub city: String,
    /// Street address.
    pub address: String,
    /// Postcode.
    pub postcode: String,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for saving an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    /// Owner.
    pub user_id: i64,
    /// Username, with or without `@`.
    pub username: String,
    /// Recipient full name.
    pub full_name: String,
    /// Phone.
    pub phone: String,
    /// City.
    pub city: String,
    /// Street address.
    pub address: String,
    /// Postcode.
    pub postcode: String,
}

/// Known Telegram user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClientProfile {
    /// Telegram user id.
    pub user_id: UserId,
    /// Normalized username.
    pub username: Option<String>,
    /// Full name.
    pub full_name: Option<String>,
    /// Phone.
    pub phone: Option<String>,
}

/// Client joined with their address, as listed to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClientRecord {
    /// Telegram user id.
    pub user_id: UserId,
    /// Normalized username.
    pub username: Option<String>,
    /// Full name.
    pub full_name: Option<String>,
    /// Phone.
    pub phone: Option<String>,
    /// City from the address.
    pub city: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Postcode.
    pub postcode: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Web admin role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    /// May manage other admins.
    Owner,
    /// Regular operator.
    Admin,
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl sqlx::Type<PgDb> for AdminRole {
    fn type_info() -> PgTypeInfo {
        <str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for AdminRole {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid admin role: {s}").into()),
        }
    }
}

impl sqlx::Encode<'_, PgDb> for AdminRole {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <String as sqlx::Encode<PgDb>>::encode_by_ref(&self.to_string(), buf)
    }
}

/// Web admin account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminAccount {
    /// Login, compared case-insensitively.
    pub login: String,
    /// Salted sha256 of login, password and server secret.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role.
    pub role: AdminRole,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

/// Message in the internal admin chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    /// Monotonic id.
    pub id: i64,
    /// Author login.
    pub login: String,
    /// Author avatar at read time.
    pub avatar: Option<String>,
    /// Message text.
    pub text: String,
    /// Optional reference, usually an order id.
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(order_id: &str, origin: Option<&str>, country: Option<&str>) -> Order {
        Order {
            id: 1,
            order_id: order_id.to_string(),
            client_name: None,
            phone: None,
            origin: origin.map(String::from),
            status: STATUSES[0].to_string(),
            note: None,
            country: country.map(String::from),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn canonical_status_ignores_case_and_whitespace() {
        assert_eq!(canonical_status("  🛒 ВЫКУПЛЕН "), Some("🛒 выкуплен"));
        assert_eq!(canonical_status("✅ получен заказчиком"), Some(STATUSES[10]));
        assert_eq!(canonical_status("выкуплен"), None);
        assert_eq!(canonical_status(""), None);
    }

    #[test]
    fn status_index_bounds() {
        assert_eq!(status_by_index(0), Some("🛒 выкуплен"));
        assert_eq!(status_by_index(10), Some("✅ получен заказчиком"));
        assert_eq!(status_by_index(11), None);
    }

    #[test]
    fn delivered_orders_are_inactive() {
        let mut o = order("CN-1", None, None);
        assert!(o.is_active());
        o.status = STATUSES[10].to_string();
        assert!(!o.is_active());
    }

    #[test]
    fn country_code_falls_back_through_origin_country_and_prefix() {
        assert_eq!(order("CN-1", Some("kr"), Some("CN")).country_code(), "KR");
        assert_eq!(order("CN-1", Some(" "), Some("cn")).country_code(), "CN");
        assert_eq!(order("KR-77", None, None).country_code(), "KR");
    }

    #[test]
    fn flags_by_country() {
        assert_eq!(country_flag("cn"), "🇨🇳");
        assert_eq!(country_flag("KR"), "🇰🇷");
        assert_eq!(country_flag("US"), "🏳️");
    }
}
