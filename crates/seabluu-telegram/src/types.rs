//! Telegram Bot API wire types.
//!
//! Only the fields the bot reads are modelled. Unknown fields are ignored
//! and optional fields default, so newer API versions keep parsing.

use serde::{Deserialize, Serialize};

/// Incoming update delivered to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Monotonic update id.
    pub update_id: i64,
    /// New incoming message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Inline button press.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
}

/// What an update carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// A message.
    Message,
    /// A callback query.
    CallbackQuery,
    /// Anything the bot does not handle.
    Other,
}

impl UpdateKind {
    /// Name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::CallbackQuery => "callback_query",
            Self::Other => "other",
        }
    }
}

impl Update {
    /// Classifies the update.
    pub fn kind(&self) -> UpdateKind {
        if self.message.is_some() {
            UpdateKind::Message
        } else if self.callback_query.is_some() {
            UpdateKind::CallbackQuery
        } else {
            UpdateKind::Other
        }
    }
}

/// Telegram user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    /// User id, also the private chat id.
    pub id: i64,
    /// Whether the user is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Username without `@`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl User {
    /// First and last name joined with a space.
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref().filter(|s| !s.is_empty()) {
            Some(last) => format!("{} {last}", self.first_name).trim().to_string(),
            None => self.first_name.trim().to_string(),
        }
    }
}

/// Chat a message belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Chat {
    /// Chat id.
    pub id: i64,
    /// `private`, `group`, `supergroup` or `channel`.
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Id unique within the chat.
    pub message_id: i64,
    /// Sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Chat.
    pub chat: Chat,
    /// Unix send time.
    #[serde(default)]
    pub date: i64,
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Inline button press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Query id, needed to answer it.
    pub id: String,
    /// Who pressed the button.
    pub from: User,
    /// Message the button was attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Callback data of the button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Inline button carrying callback data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    /// Label.
    pub text: String,
    /// Data sent back in the callback query.
    pub callback_data: String,
}

impl InlineKeyboardButton {
    /// Creates a callback button.
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self { text: text.into(), callback_data: data.into() }
    }
}

/// Keyboard attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    /// Rows of buttons.
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// Creates a markup from rows.
    pub fn new(rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        Self { inline_keyboard: rows }
    }
}

/// Reply keyboard button; pressing it sends its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    /// Label and sent text.
    pub text: String,
}

/// Custom reply keyboard replacing the user's keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyKeyboardMarkup {
    /// Rows of buttons.
    pub keyboard: Vec<Vec<KeyboardButton>>,
    /// Fit the keyboard height to its buttons.
    #[serde(default)]
    pub resize_keyboard: bool,
}

impl ReplyKeyboardMarkup {
    /// Creates a resized keyboard from rows of labels.
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        Self {
            keyboard: rows
                .iter()
                .map(|row| row.iter().map(|t| KeyboardButton { text: (*t).to_string() }).collect())
                .collect(),
            resize_keyboard: true,
        }
    }
}

/// Either kind of keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    /// Inline keyboard.
    Inline(InlineKeyboardMarkup),
    /// Reply keyboard.
    Reply(ReplyKeyboardMarkup),
}

impl From<InlineKeyboardMarkup> for ReplyMarkup {
    fn from(markup: InlineKeyboardMarkup) -> Self {
        Self::Inline(markup)
    }
}

impl From<ReplyKeyboardMarkup> for ReplyMarkup {
    fn from(markup: ReplyKeyboardMarkup) -> Self {
        Self::Reply(markup)
    }
}

/// Text formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// Legacy Markdown.
    Markdown,
}

/// Chat action shown while the bot works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    /// "typing…"
    Typing,
}

/// `sendMessage` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Destination chat.
    pub chat_id: i64,
    /// Text.
    pub text: String,
    /// Formatting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    /// Keyboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

impl OutgoingMessage {
    /// Plain text message.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self { chat_id, text: text.into(), parse_mode: None, reply_markup: None }
    }

    /// Markdown message.
    pub fn markdown(chat_id: i64, text: impl Into<String>) -> Self {
        Self { parse_mode: Some(ParseMode::Markdown), ..Self::text(chat_id, text) }
    }

    /// Attaches a keyboard.
    #[must_use]
    pub fn with_markup(mut self, markup: impl Into<ReplyMarkup>) -> Self {
        self.reply_markup = Some(markup.into());
        self
    }
}

/// `editMessageText` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditMessageText {
    /// Chat of the message.
    pub chat_id: i64,
    /// Message to edit.
    pub message_id: i64,
    /// New text.
    pub text: String,
    /// Formatting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    /// New inline keyboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn message_update_parses_with_unknown_fields() {
        let raw = json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "from": {"id": 42, "is_bot": false, "first_name": "Ann", "language_code": "ru"},
                "chat": {"id": 42, "type": "private"},
                "date": 1700000000,
                "text": "/start",
                "entities": [{"type": "bot_command", "offset": 0, "length": 6}]
            }
        });
        let update: Update = serde_json::from_value(raw).unwrap();
        assert_eq!(update.kind(), UpdateKind::Message);
        let message = update.message.unwrap();
        assert_eq!(message.text.as_deref(), Some("/start"));
        assert_eq!(message.from.unwrap().username, None);
    }

    #[test]
    fn callback_update_and_other_kinds() {
        let callback: Update = serde_json::from_value(json!({
            "update_id": 11,
            "callback_query": {"id": "q1", "from": {"id": 7, "first_name": "B"}, "data": "sub:CN-1"}
        }))
        .unwrap();
        assert_eq!(callback.kind(), UpdateKind::CallbackQuery);

        let other: Update =
            serde_json::from_value(json!({"update_id": 12, "edited_message": {}})).unwrap();
        assert_eq!(other.kind().as_str(), "other");
    }

    #[test]
    fn outgoing_message_serializes_markup_untagged() {
        let msg = OutgoingMessage::markdown(1, "*hi*").with_markup(InlineKeyboardMarkup::new(vec![
            vec![InlineKeyboardButton::callback("Go", "go")],
        ]));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "chat_id": 1,
                "text": "*hi*",
                "parse_mode": "Markdown",
                "reply_markup": {"inline_keyboard": [[{"text": "Go", "callback_data": "go"}]]}
            })
        );

        let reply = OutgoingMessage::text(1, "x").with_markup(ReplyKeyboardMarkup::from_rows(&[&["A", "B"]]));
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["reply_markup"]["resize_keyboard"], json!(true));
        assert!(value.get("parse_mode").is_none());
    }

    #[test]
    fn full_name_skips_missing_last_name() {
        let user = User { id: 1, first_name: "Ann".into(), last_name: Some("Lee".into()), ..User::default() };
        assert_eq!(user.full_name(), "Ann Lee");
        assert_eq!(User { first_name: "Ann".into(), ..User::default() }.full_name(), "Ann");
    }
}
