//! Telegram Bot API client for the SEABLUU bot.
//!
//! Wire types for updates and outgoing messages, a reqwest-based client,
//! and the [`BotApi`] trait the conversation engine is written against.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use api::{mock, BotApi};
pub use client::{ClientConfig, TelegramClient};
pub use error::{Result, TelegramError};
pub use types::{
    CallbackQuery, Chat, ChatAction, EditMessageText, InlineKeyboardButton, InlineKeyboardMarkup,
    KeyboardButton, Message, OutgoingMessage, ParseMode, ReplyKeyboardMarkup, ReplyMarkup, Update,
    UpdateKind, User,
};
