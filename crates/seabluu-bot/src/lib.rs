//! Conversation engine of the SEABLUU Telegram bot.
//!
//! Turns webhook updates into replies: client order tracking, subscriptions
//! and addresses, and the admin panel for orders, payments, broadcasts and
//! reports. Talks to storage through [`seabluu_core::BotStore`] and to
//! Telegram through [`seabluu_telegram::BotApi`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatcher;
pub mod error;
pub mod keyboards;
pub mod menu;
pub mod notify;
pub mod render;
pub mod session;

pub use dispatcher::{Callback, Dispatcher};
pub use error::{BotError, Result};
pub use menu::MenuAction;
pub use notify::{BroadcastReport, Notifier, ReminderReport};
pub use session::{Session, SessionStore};
