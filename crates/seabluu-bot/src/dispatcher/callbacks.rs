//! Inline button presses.

use seabluu_core::status_by_index;
use seabluu_telegram::{CallbackQuery, EditMessageText, InlineKeyboardMarkup, OutgoingMessage};
use tracing::{debug, info, warn};

use super::{Ctx, Dispatcher};
use crate::{
    error::Result,
    keyboards::{self, FIND_BULK_PREFIX},
    render,
    session::{AdminMode, Session},
};

/// Parsed callback data of an inline button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback<'a> {
    /// `sub:{order_id}`
    Subscribe(&'a str),
    /// `unsub:{order_id}`
    Unsubscribe(&'a str),
    /// `addr:add`
    AddAddress,
    /// `addr:del`
    DeleteAddress,
    /// `client:subs`
    ClientSubscriptions,
    /// `pp:toggle:{order_id}:{username}`
    TogglePaid {
        /// Order.
        order_id: &'a str,
        /// Participant.
        username: &'a str,
    },
    /// `pp:page:{order_id}:{page}` and `pp:refresh:{order_id}:{page}`
    ParticipantsPage {
        /// Order.
        order_id: &'a str,
        /// Zero-based page.
        page: usize,
    },
    /// `unpaid:page:{page}`
    UnpaidPage(usize),
    /// `adm:status_menu:{order_id}`
    StatusMenu(&'a str),
    /// `adm:set_status:{order_id}:{index}`
    SetStatus {
        /// Order.
        order_id: &'a str,
        /// Index into the status list.
        index: usize,
    },
    /// `adm:pick_status_id:{index}`, the order wizard's status step.
    PickStatus(usize),
    /// `mass:pick_status_id:{index}`
    MassPickStatus(usize),
    /// `find:open:{order_id}`
    FindOpen(&'a str),
    /// `find:page:{page}`
    FindPage(usize),
    /// `find:bulk:ask`
    FindBulkAsk,
    /// `findbulk:pick:{index}`
    FindBulkPick(usize),
    /// `clients:list:{page}`
    ClientsList(usize),
    /// `clients:search:ask`
    ClientsSearchAsk,
}

impl<'a> Callback<'a> {
    /// Parses callback data; unknown or malformed data gives `None`.
    pub fn parse(data: &'a str) -> Option<Self> {
        let num = |s: &str| s.trim().parse::<usize>().ok();

        let parsed = match data {
            "addr:add" => Self::AddAddress,
            "addr:del" => Self::DeleteAddress,
            "client:subs" => Self::ClientSubscriptions,
            "find:bulk:ask" => Self::FindBulkAsk,
            "clients:search:ask" => Self::ClientsSearchAsk,
            _ => {
                let (head, rest) = data.split_once(':')?;
                match head {
                    "sub" => Self::Subscribe(non_empty(rest)?),
                    "unsub" => Self::Unsubscribe(non_empty(rest)?),
                    "pp" => {
                        let (action, rest) = rest.split_once(':')?;
                        let (order_id, tail) = rest.rsplit_once(':')?;
                        let order_id = non_empty(order_id)?;
                        match action {
                            "toggle" => Self::TogglePaid { order_id, username: non_empty(tail)? },
                            "page" | "refresh" => Self::ParticipantsPage { order_id, page: num(tail)? },
                            _ => return None,
                        }
                    },
                    "unpaid" => Self::UnpaidPage(num(rest.strip_prefix("page:")?)?),
                    "adm" => {
                        let (action, rest) = rest.split_once(':')?;
                        match action {
                            "status_menu" => Self::StatusMenu(non_empty(rest)?),
                            "set_status" => {
                                let (order_id, index) = rest.rsplit_once(':')?;
                                Self::SetStatus { order_id: non_empty(order_id)?, index: num(index)? }
                            },
                            "pick_status_id" => Self::PickStatus(num(rest)?),
                            _ => return None,
                        }
                    },
                    "mass" => Self::MassPickStatus(num(rest.strip_prefix("pick_status_id:")?)?),
                    "find" => {
                        let (action, rest) = rest.split_once(':')?;
                        match action {
                            "open" => Self::FindOpen(non_empty(rest)?),
                            "page" => Self::FindPage(num(rest)?),
                            _ => return None,
                        }
                    },
                    "findbulk" => Self::FindBulkPick(num(rest.strip_prefix("pick:")?)?),
                    "clients" => Self::ClientsList(num(rest.strip_prefix("list:")?)?),
                    _ => return None,
                }
            },
        };
        Some(parsed)
    }

    /// Whether only admins may press the button.
    pub const fn is_admin_only(&self) -> bool {
        !matches!(
            self,
            Self::Subscribe(_)
                | Self::Unsubscribe(_)
                | Self::AddAddress
                | Self::DeleteAddress
                | Self::ClientSubscriptions
        )
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

impl Dispatcher {
    pub(super) async fn handle_callback(&self, query: &CallbackQuery) -> Result<()> {
        if let Err(e) = self.api.answer_callback_query(&query.id, None).await {
            debug!(error = %e, "callback answer failed");
        }

        let Some(data) = query.data.as_deref() else {
            return Ok(());
        };
        let Some(callback) = Callback::parse(data) else {
            debug!(data, "unknown callback data");
            return Ok(());
        };
        if callback.is_admin_only() && !self.is_admin(query.from.id) {
            warn!(user_id = query.from.id, data, "admin callback from non-admin");
            return Ok(());
        }

        let ctx = Ctx {
            chat_id: query.message.as_ref().map_or(query.from.id, |m| m.chat.id),
            user: &query.from,
            message_id: query.message.as_ref().map(|m| m.message_id),
        };

        let mut session = self.sessions.load(query.from.id).await;
        let result = self.route_callback(ctx, &mut session, callback).await;
        self.sessions.save(query.from.id, session).await;
        result
    }

    async fn route_callback(&self, ctx: Ctx<'_>, session: &mut Session, callback: Callback<'_>) -> Result<()> {
        let chat = ctx.chat_id;
        match callback {
            Callback::Subscribe(order_id) => {
                self.store.subscribe(ctx.user_id(), order_id).await?;
                self.swap_markup(ctx, &keyboards::unsubscribe(order_id)).await
            },
            Callback::Unsubscribe(order_id) => {
                self.store.unsubscribe(ctx.user_id(), order_id).await?;
                self.swap_markup(ctx, &keyboards::subscribe(order_id)).await
            },
            Callback::AddAddress => self.start_address_wizard(ctx, session).await,
            Callback::DeleteAddress => {
                let text = if self.store.delete_address(ctx.user_id()).await? {
                    "🗑 Адрес удалён"
                } else {
                    "Адресов не было"
                };
                self.reply(OutgoingMessage::text(chat, text)).await
            },
            Callback::ClientSubscriptions => self.show_subscriptions(ctx).await,
            Callback::TogglePaid { order_id, username } => {
                let paid = self.store.toggle_paid(order_id, username).await?;
                info!(%order_id, %username, ?paid, "paid flag toggled");
                self.send_participants(chat, order_id).await
            },
            Callback::ParticipantsPage { order_id, page } => {
                let participants = self.store.participants(order_id).await?;
                let text = render::participants_text(order_id, &participants, page);
                let markup = keyboards::participants(order_id, &participants, page);
                self.edit_or_send(ctx, text, markup, false).await
            },
            Callback::UnpaidPage(page) => {
                if session.unpaid.is_empty() {
                    session.unpaid = self.store.unpaid_grouped().await?;
                }
                if session.unpaid.is_empty() {
                    return self
                        .reply(OutgoingMessage::text(chat, "🎉 Должников не найдено — красота!"))
                        .await;
                }
                let (text, slice) = render::unpaid_page(&session.unpaid, page);
                session.unpaid_page = slice.page;
                let markup = keyboards::unpaid_nav(slice.page, slice.pages)
                    .unwrap_or_else(|| InlineKeyboardMarkup::new(Vec::new()));
                self.edit_or_send(ctx, text, markup, true).await
            },
            Callback::StatusMenu(order_id) => {
                let prefix = format!("adm:set_status:{order_id}");
                self.reply(
                    OutgoingMessage::text(chat, "Выбери статус:")
                        .with_markup(keyboards::status_picker(&prefix)),
                )
                .await
            },
            Callback::SetStatus { order_id, index } => {
                let Some(status) = status_by_index(index) else {
                    return self.reply(OutgoingMessage::text(chat, "Неизвестный статус.")).await;
                };
                if !self.store.update_order_status(order_id, status).await? {
                    return self.reply(OutgoingMessage::text(chat, "🙈 Не нашёл такой заказ.")).await;
                }
                self.reply(OutgoingMessage::markdown(
                    chat,
                    format!("✅ Статус *{order_id}* обновлён: {status}"),
                ))
                .await?;
                if let Err(e) = self.notifier.notify_subscribers(order_id, status).await {
                    warn!(%order_id, error = %e, "subscriber notification failed");
                }
                Ok(())
            },
            Callback::PickStatus(index) => {
                match (session.admin_mode, status_by_index(index)) {
                    (Some(AdminMode::AddOrderStatus), Some(status)) => {
                        self.accept_order_status(ctx, session, status).await
                    },
                    _ => {
                        debug!(index, "status pick outside the order wizard");
                        Ok(())
                    },
                }
            },
            Callback::MassPickStatus(index) => {
                let Some(status) = status_by_index(index) else {
                    return self.reply(OutgoingMessage::text(chat, "Неизвестный статус.")).await;
                };
                session.mass_status = Some(status.to_string());
                session.admin_mode = Some(AdminMode::MassUpdateIds);
                self.reply(OutgoingMessage::text(chat, render::MASS_IDS_PROMPT)).await
            },
            Callback::FindOpen(order_id) => {
                let Some(order) = self.store.find_order(order_id).await? else {
                    return self.reply(OutgoingMessage::text(chat, "🙈 Заказ не найден.")).await;
                };
                self.reply(
                    OutgoingMessage::text(chat, render::order_card(&order))
                        .with_markup(keyboards::order_card(&order.order_id)),
                )
                .await?;
                self.send_participants(chat, &order.order_id).await
            },
            Callback::FindPage(page) => {
                let markup = keyboards::find_results(&session.find_results, page);
                if let Some(message_id) = ctx.message_id {
                    match self.api.edit_message_reply_markup(chat, message_id, Some(&markup)).await {
                        Ok(()) => return Ok(()),
                        Err(e) if e.is_not_modified() => return Ok(()),
                        Err(e) => debug!(error = %e, "results page edit failed"),
                    }
                }
                self.reply(OutgoingMessage::text(chat, "Страница обновлена.").with_markup(markup)).await
            },
            Callback::FindBulkAsk => {
                if session.find_results.is_empty() {
                    return self.reply(OutgoingMessage::text(chat, "Сначала выполните поиск.")).await;
                }
                session.find_bulk_ids = session.find_results.clone();
                self.reply(
                    OutgoingMessage::markdown(
                        chat,
                        format!("Выбери новый статус для *{}* заказов:", session.find_bulk_ids.len()),
                    )
                    .with_markup(keyboards::status_picker(FIND_BULK_PREFIX)),
                )
                .await
            },
            Callback::FindBulkPick(index) => {
                let ids = std::mem::take(&mut session.find_bulk_ids);
                if ids.is_empty() {
                    return self.reply(OutgoingMessage::text(chat, "Нечего обновлять.")).await;
                }
                let Some(status) = status_by_index(index) else {
                    return self.reply(OutgoingMessage::text(chat, "Неизвестный статус.")).await;
                };
                let loader = self.show_loader(chat, "⏳ Обновляю статусы…").await;
                let (updated, failed) = self.update_statuses(&ids, status).await;
                self.clear_loader(chat, loader).await;
                let summary = render::mass_update_summary(
                    "✏️ Массовая смена статусов (из поиска) — итог",
                    ids.len(),
                    updated,
                    &failed,
                );
                self.reply(OutgoingMessage::text(chat, summary)).await
            },
            Callback::ClientsList(page) => {
                session.clients_page = page;
                self.show_clients_page(ctx, session).await
            },
            Callback::ClientsSearchAsk => {
                session.admin_mode = Some(AdminMode::ClientsSearch);
                self.reply(OutgoingMessage::markdown(chat, render::admin_prompt(AdminMode::ClientsSearch)))
                    .await
            },
        }
    }

    /// Sends page 0 of an order's participants.
    async fn send_participants(&self, chat_id: i64, order_id: &str) -> Result<()> {
        let participants = self.store.participants(order_id).await?;
        self.reply(
            OutgoingMessage::text(chat_id, render::participants_text(order_id, &participants, 0))
                .with_markup(keyboards::participants(order_id, &participants, 0)),
        )
        .await
    }

    async fn swap_markup(&self, ctx: Ctx<'_>, markup: &InlineKeyboardMarkup) -> Result<()> {
        let Some(message_id) = ctx.message_id else {
            return Ok(());
        };
        match self.api.edit_message_reply_markup(ctx.chat_id, message_id, Some(markup)).await {
            Err(e) if !e.is_not_modified() => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Rewrites the pressed message. "Not modified" counts as success; other
    /// failures send a new message when `fallback` is set.
    async fn edit_or_send(
        &self,
        ctx: Ctx<'_>,
        text: String,
        markup: InlineKeyboardMarkup,
        fallback: bool,
    ) -> Result<()> {
        if let Some(message_id) = ctx.message_id {
            let edit = EditMessageText {
                chat_id: ctx.chat_id,
                message_id,
                text: text.clone(),
                parse_mode: None,
                reply_markup: Some(markup.clone()),
            };
            match self.api.edit_message_text(&edit).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_not_modified() => return Ok(()),
                Err(e) if !fallback => return Err(e.into()),
                Err(e) => debug!(error = %e, "edit failed, sending anew"),
            }
        }
        self.reply(OutgoingMessage::text(ctx.chat_id, text).with_markup(markup)).await
    }
}
