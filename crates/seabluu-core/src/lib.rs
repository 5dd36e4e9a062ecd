//! Core domain models, validation and storage for the SEABLUU bot.
//!
//! Provides the order and client models, text normalization for order ids,
//! usernames and phones, the PostgreSQL repositories, and the `BotStore`
//! seam the bot and the admin API are written against.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod parse;
pub mod storage;
pub mod store;
pub mod time;

pub use error::{CoreError, Result, ValidationError};
pub use models::{
    canonical_status, country_flag, is_delivered, status_by_index, Address, AdminAccount,
    AdminRole, ChatMessage, ClientProfile, ClientRecord, Country, NewAddress, NewOrder, Order,
    Participant, Subscription, SubscriptionView, UserId, STATUSES,
};
pub use storage::Storage;
pub use store::BotStore;
pub use time::{Clock, RealClock, TestClock};
