//! Bot API seam used by the conversation engine.
//!
//! The bot talks to Telegram only through [`BotApi`], so tests can swap the
//! HTTP client for [`mock::RecordingBot`] and assert on what would have been
//! sent.

use async_trait::async_trait;

use crate::{
    client::TelegramClient,
    error::Result,
    types::{ChatAction, EditMessageText, InlineKeyboardMarkup, Message, OutgoingMessage},
};

/// Outgoing Telegram operations.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Sends a message.
    async fn send_message(&self, message: &OutgoingMessage) -> Result<Message>;

    /// Edits a sent message's text.
    async fn edit_message_text(&self, edit: &EditMessageText) -> Result<()>;

    /// Replaces or removes a sent message's inline keyboard.
    async fn edit_message_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<()>;

    /// Acknowledges a callback query.
    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    /// Shows a chat action.
    async fn send_chat_action(&self, chat_id: i64, action: ChatAction) -> Result<()>;

    /// Deletes a message.
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;

    /// Registers the webhook URL.
    async fn set_webhook(&self, url: &str) -> Result<()>;
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<Message> {
        TelegramClient::send_message(self, message).await
    }

    async fn edit_message_text(&self, edit: &EditMessageText) -> Result<()> {
        TelegramClient::edit_message_text(self, edit).await
    }

    async fn edit_message_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        TelegramClient::edit_message_reply_markup(self, chat_id, message_id, markup).await
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        TelegramClient::answer_callback_query(self, callback_id, text).await
    }

    async fn send_chat_action(&self, chat_id: i64, action: ChatAction) -> Result<()> {
        TelegramClient::send_chat_action(self, chat_id, action).await
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        TelegramClient::delete_message(self, chat_id, message_id).await
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        TelegramClient::set_webhook(self, url).await
    }
}

pub mod mock {
    //! Recording Bot API double for tests.

    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicI64, Ordering},
            Arc,
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use tokio::sync::RwLock;

    use super::BotApi;
    use crate::{
        error::{Result, TelegramError},
        types::{
            Chat, ChatAction, EditMessageText, InlineKeyboardMarkup, Message, OutgoingMessage,
        },
    };

    /// One recorded Bot API call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        /// `sendMessage`
        Send(OutgoingMessage),
        /// `editMessageText`
        EditText(EditMessageText),
        /// `editMessageReplyMarkup`
        EditMarkup {
            /// Chat id
            chat_id: i64,
            /// Message id
            message_id: i64,
            /// New keyboard
            markup: Option<InlineKeyboardMarkup>,
        },
        /// `answerCallbackQuery`
        Answer {
            /// Callback query id
            callback_id: String,
            /// Toast text
            text: Option<String>,
        },
        /// `sendChatAction`
        Action(i64, ChatAction),
        /// `deleteMessage`
        Delete(i64, i64),
        /// `setWebhook`
        SetWebhook(String),
    }

    /// Bot API double that records calls and fails on demand per chat.
    pub struct RecordingBot {
        calls: Arc<RwLock<Vec<Call>>>,
        failures: Arc<RwLock<HashMap<i64, TelegramError>>>,
        next_message_id: AtomicI64,
        send_delay: Option<Duration>,
    }

    impl RecordingBot {
        /// Creates a bot that accepts everything.
        pub fn new() -> Self {
            Self {
                calls: Arc::default(),
                failures: Arc::default(),
                next_message_id: AtomicI64::new(1000),
                send_delay: None,
            }
        }

        /// Makes every `sendMessage` take `delay`, like a slow Bot API.
        #[must_use]
        pub fn with_send_delay(mut self, delay: Duration) -> Self {
            self.send_delay = Some(delay);
            self
        }

        /// Makes every message sent to `chat_id` fail with `error`.
        pub async fn fail_chat(&self, chat_id: i64, error: TelegramError) {
            self.failures.write().await.insert(chat_id, error);
        }

        /// All recorded calls in order.
        pub async fn calls(&self) -> Vec<Call> {
            self.calls.read().await.clone()
        }

        /// Sent messages in order.
        pub async fn sent(&self) -> Vec<OutgoingMessage> {
            self.calls
                .read()
                .await
                .iter()
                .filter_map(|c| match c {
                    Call::Send(m) => Some(m.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Texts sent to one chat, in order.
        pub async fn texts_to(&self, chat_id: i64) -> Vec<String> {
            self.sent().await.into_iter().filter(|m| m.chat_id == chat_id).map(|m| m.text).collect()
        }

        /// Texts of message edits, in order.
        pub async fn edited_texts(&self) -> Vec<String> {
            self.calls
                .read()
                .await
                .iter()
                .filter_map(|c| match c {
                    Call::EditText(e) => Some(e.text.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Forgets recorded calls.
        pub async fn clear(&self) {
            self.calls.write().await.clear();
        }

        async fn record(&self, call: Call) {
            self.calls.write().await.push(call);
        }

        async fn failure_for(&self, chat_id: i64) -> Option<TelegramError> {
            self.failures.read().await.get(&chat_id).cloned()
        }
    }

    impl Default for RecordingBot {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl BotApi for RecordingBot {
        async fn send_message(&self, message: &OutgoingMessage) -> Result<Message> {
            if let Some(delay) = self.send_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(err) = self.failure_for(message.chat_id).await {
                return Err(err);
            }
            self.record(Call::Send(message.clone())).await;
            Ok(Message {
                message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
                from: None,
                chat: Chat { id: message.chat_id, kind: "private".to_string() },
                date: 0,
                text: Some(message.text.clone()),
            })
        }

        async fn edit_message_text(&self, edit: &EditMessageText) -> Result<()> {
            if let Some(err) = self.failure_for(edit.chat_id).await {
                return Err(err);
            }
            self.record(Call::EditText(edit.clone())).await;
            Ok(())
        }

        async fn edit_message_reply_markup(
            &self,
            chat_id: i64,
            message_id: i64,
            markup: Option<&InlineKeyboardMarkup>,
        ) -> Result<()> {
            self.record(Call::EditMarkup { chat_id, message_id, markup: markup.cloned() }).await;
            Ok(())
        }

        async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
            self.record(Call::Answer {
                callback_id: callback_id.to_string(),
                text: text.map(str::to_string),
            })
            .await;
            Ok(())
        }

        async fn send_chat_action(&self, chat_id: i64, action: ChatAction) -> Result<()> {
            self.record(Call::Action(chat_id, action)).await;
            Ok(())
        }

        async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
            self.record(Call::Delete(chat_id, message_id)).await;
            Ok(())
        }

        async fn set_webhook(&self, url: &str) -> Result<()> {
            self.record(Call::SetWebhook(url.to_string())).await;
            Ok(())
        }
    }
}
