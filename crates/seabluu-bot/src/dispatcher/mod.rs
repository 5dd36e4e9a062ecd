//! Update routing for the bot.
//!
//! The dispatcher turns each webhook update into replies. Messages are
//! routed to commands or the text handler, button presses to the callback
//! router. Conversation state survives between updates in the
//! [`SessionStore`]. Errors stay inside one update: they are logged and the
//! webhook still answers 200, so Telegram never redelivers a poisoned
//! update.

mod admin;
mod callbacks;
mod client;

use std::{collections::HashSet, sync::Arc};

use seabluu_core::{BotStore, ClientProfile, UserId};
use seabluu_telegram::{BotApi, ChatAction, Message, OutgoingMessage, Update, User};
use tracing::{debug, error, instrument};

use crate::{
    error::Result,
    keyboards,
    menu::MenuAction,
    notify::Notifier,
    render,
    session::{Session, SessionStore},
};

pub use callbacks::Callback;

/// Where a reply goes and who triggered it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ctx<'a> {
    chat_id: i64,
    user: &'a User,
    /// Message carrying the pressed inline keyboard.
    message_id: Option<i64>,
}

impl Ctx<'_> {
    fn user_id(&self) -> UserId {
        UserId(self.user.id)
    }
}

/// Routes Telegram updates to handlers.
pub struct Dispatcher {
    store: Arc<dyn BotStore>,
    api: Arc<dyn BotApi>,
    notifier: Notifier,
    sessions: SessionStore,
    admins: HashSet<i64>,
}

impl Dispatcher {
    /// Creates a dispatcher; `admins` are the Telegram user ids allowed into
    /// the admin panel.
    pub fn new(
        store: Arc<dyn BotStore>,
        api: Arc<dyn BotApi>,
        admins: impl IntoIterator<Item = i64>,
    ) -> Self {
        let notifier = Notifier::new(store.clone(), api.clone());
        Self { store, api, notifier, sessions: SessionStore::new(), admins: admins.into_iter().collect() }
    }

    /// Notifier sharing this dispatcher's store and Bot API.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Conversation state of all users.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Whether the user may use the admin panel.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }

    /// Handles one update. Never fails: errors are logged.
    #[instrument(skip(self, update), fields(update_id = update.update_id, kind = update.kind().as_str()))]
    pub async fn handle_update(&self, update: &Update) {
        let result = if let Some(message) = &update.message {
            self.handle_message(message).await
        } else if let Some(query) = &update.callback_query {
            self.handle_callback(query).await
        } else {
            debug!("ignoring update");
            Ok(())
        };

        if let Err(e) = result {
            error!(error = %e, "update handling failed");
        }
    }

    async fn handle_message(&self, message: &Message) -> Result<()> {
        let (Some(user), Some(text)) = (&message.from, message.text.as_deref()) else {
            debug!("ignoring message without sender or text");
            return Ok(());
        };
        let ctx = Ctx { chat_id: message.chat.id, user, message_id: None };

        let mut session = self.sessions.load(user.id).await;
        let result = match command(text) {
            Some(cmd) => self.handle_command(ctx, &mut session, cmd).await,
            None => self.handle_text(ctx, &mut session, text.trim()).await,
        };
        self.sessions.save(user.id, session).await;
        result
    }

    async fn handle_command(&self, ctx: Ctx<'_>, session: &mut Session, cmd: &str) -> Result<()> {
        match cmd {
            "start" => {
                self.register_client(ctx.user).await;
                self.reply(
                    OutgoingMessage::markdown(ctx.chat_id, render::GREETING)
                        .with_markup(keyboards::main_menu()),
                )
                .await
            },
            "help" => self.reply(OutgoingMessage::text(ctx.chat_id, render::HELP)).await,
            "admin" if self.is_admin(ctx.user.id) => self.open_admin_menu(ctx, session).await,
            "find" => self.find_start(ctx, session).await,
            other => {
                debug!(command = other, "ignoring command");
                Ok(())
            },
        }
    }

    /// Routes free text. Order matters: a pending search wins, then admin
    /// menus and flows, then client menus and flows.
    async fn handle_text(&self, ctx: Ctx<'_>, session: &mut Session, raw: &str) -> Result<()> {
        let action = MenuAction::parse(raw);

        if session.find_expecting {
            match action {
                Some(MenuAction::BackToAdmin) => {
                    session.find_expecting = false;
                    return self.open_admin_menu(ctx, session).await;
                },
                // A menu button is not a query; keep waiting for one.
                Some(_) => {
                    return self
                        .reply(
                            OutgoingMessage::markdown(ctx.chat_id, render::FIND_REMINDER)
                                .with_markup(keyboards::back_to_admin()),
                        )
                        .await;
                },
                None => {
                    session.find_expecting = false;
                    return self.multi_search(ctx, session, raw).await;
                },
            }
        }

        if self.is_admin(ctx.user.id) && self.handle_admin_text(ctx, session, raw, action).await? {
            return Ok(());
        }

        if self.handle_client_text(ctx, session, raw, action).await? {
            return Ok(());
        }

        self.fallback(ctx, session).await
    }

    async fn fallback(&self, ctx: Ctx<'_>, session: &Session) -> Result<()> {
        if !self.is_admin(ctx.user.id) {
            return self
                .reply(
                    OutgoingMessage::text(ctx.chat_id, render::CLIENT_FALLBACK)
                        .with_markup(keyboards::main_menu()),
                )
                .await;
        }

        let message = match session.admin_mode {
            Some(mode) => {
                let text = format!("⚠️ Не понял. {}", render::admin_prompt(mode));
                let message = OutgoingMessage::text(ctx.chat_id, text);
                match admin::prompt_keyboard(mode) {
                    Some(markup) => message.with_markup(markup),
                    None => message.with_markup(keyboards::admin_menu()),
                }
            },
            None => OutgoingMessage::text(ctx.chat_id, render::ADMIN_MENU_PROMPT)
                .with_markup(keyboards::admin_menu()),
        };
        self.reply(message).await
    }

    /// Remembers a user so reminders can reach them by username.
    async fn register_client(&self, user: &User) {
        let profile = ClientProfile {
            user_id: UserId(user.id),
            username: user.username.clone(),
            full_name: Some(user.full_name()).filter(|n| !n.is_empty()),
            phone: None,
        };
        if let Err(e) = self.store.upsert_client(&profile).await {
            debug!(user_id = user.id, error = %e, "client registration failed");
        }
    }

    /// Sends a message after a short "typing…" indicator.
    async fn reply(&self, message: OutgoingMessage) -> Result<()> {
        self.send(message).await.map(|_| ())
    }

    async fn send(&self, message: OutgoingMessage) -> Result<Message> {
        if let Err(e) = self.api.send_chat_action(message.chat_id, ChatAction::Typing).await {
            debug!(error = %e, "chat action failed");
        }
        Ok(self.api.send_message(&message).await?)
    }

    /// Posts a temporary progress message.
    async fn show_loader(&self, chat_id: i64, text: &str) -> Option<i64> {
        match self.api.send_message(&OutgoingMessage::text(chat_id, text)).await {
            Ok(message) => Some(message.message_id),
            Err(e) => {
                debug!(error = %e, "loader message failed");
                None
            },
        }
    }

    async fn clear_loader(&self, chat_id: i64, loader: Option<i64>) {
        if let Some(message_id) = loader {
            if let Err(e) = self.api.delete_message(chat_id, message_id).await {
                debug!(error = %e, "loader cleanup failed");
            }
        }
    }
}

/// Command name of a `/command` message, without a `@botname` suffix.
fn command(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split_once('@').map_or(name, |(name, _)| name);
    (!name.is_empty()).then_some(name)
}
