//! Client menus, order tracking and the address wizard.

use seabluu_core::{
    parse::{extract_order_id, normalize_phone, validate_postcode},
    NewAddress,
};
use seabluu_telegram::OutgoingMessage;
use tracing::{info, warn};

use super::{Ctx, Dispatcher};
use crate::{
    error::Result,
    keyboards,
    menu::MenuAction,
    render,
    session::{AddressDraft, AddressStep, ClientMode, Session},
};

impl Dispatcher {
    /// Handles client menu buttons and client flows. Returns false when the
    /// text means nothing here.
    pub(super) async fn handle_client_text(
        &self,
        ctx: Ctx<'_>,
        session: &mut Session,
        raw: &str,
        action: Option<MenuAction>,
    ) -> Result<bool> {
        let chat = ctx.chat_id;
        match action {
            Some(MenuAction::Cancel) => {
                session.client_mode = None;
                session.address_draft = AddressDraft::default();
                self.reply(
                    OutgoingMessage::text(chat, "Отменили действие. Что дальше? 🙂")
                        .with_markup(keyboards::main_menu()),
                )
                .await?;
            },
            Some(MenuAction::Track) => {
                session.client_mode = Some(ClientMode::Track);
                self.reply(OutgoingMessage::text(
                    chat,
                    "🔎 Отправьте номер заказа (например: CN-12345):",
                ))
                .await?;
            },
            Some(MenuAction::Addresses) => self.show_address(ctx).await?,
            Some(MenuAction::Subscriptions) => self.show_subscriptions(ctx).await?,
            Some(MenuAction::Profile) => self.show_profile(ctx).await?,
            _ => return self.handle_client_mode(ctx, session, raw).await,
        }
        Ok(true)
    }

    async fn handle_client_mode(&self, ctx: Ctx<'_>, session: &mut Session, raw: &str) -> Result<bool> {
        match session.client_mode {
            Some(ClientMode::Track) => {
                session.client_mode = None;
                self.query_status(ctx, raw).await?;
                Ok(true)
            },
            Some(ClientMode::Address(step)) => {
                self.address_step(ctx, session, step, raw).await?;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn query_status(&self, ctx: Ctx<'_>, raw: &str) -> Result<()> {
        let order_id = extract_order_id(raw).unwrap_or_else(|| raw.to_uppercase());
        let Some(order) = self.store.find_order(&order_id).await? else {
            return self
                .reply(OutgoingMessage::text(
                    ctx.chat_id,
                    "🙈 Такой заказ не найден. Проверьте номер или повторите позже.",
                ))
                .await;
        };

        let subscribed = self.store.is_subscribed(ctx.user_id(), &order.order_id).await?;
        let markup = if subscribed {
            keyboards::unsubscribe(&order.order_id)
        } else {
            keyboards::subscribe(&order.order_id)
        };
        self.reply(OutgoingMessage::markdown(ctx.chat_id, render::order_status(&order)).with_markup(markup))
            .await
    }

    pub(super) async fn show_address(&self, ctx: Ctx<'_>) -> Result<()> {
        let message = match self.store.address_for_user(ctx.user_id()).await? {
            Some(address) => OutgoingMessage::text(ctx.chat_id, render::address_list(&address))
                .with_markup(keyboards::address_actions(true)),
            None => OutgoingMessage::text(ctx.chat_id, "У вас пока нет адреса. Добавим?")
                .with_markup(keyboards::address_actions(false)),
        };
        self.reply(message).await
    }

    pub(super) async fn show_subscriptions(&self, ctx: Ctx<'_>) -> Result<()> {
        let subs = self.store.subscriptions_for_user(ctx.user_id()).await?;
        let mut message = OutgoingMessage::text(ctx.chat_id, render::subscriptions(&subs));
        if !subs.is_empty() {
            let ids: Vec<String> = subs.iter().map(|s| s.order_id.clone()).collect();
            message = message.with_markup(keyboards::subscriptions_list(&ids));
        }
        self.reply(message).await
    }

    async fn show_profile(&self, ctx: Ctx<'_>) -> Result<()> {
        let address = self.store.address_for_user(ctx.user_id()).await?;
        let username = ctx.user.username.clone().unwrap_or_default();
        let mut orders = if username.is_empty() {
            Vec::new()
        } else {
            self.store.orders_by_username(&username).await?
        };
        orders.truncate(10);

        let text = render::profile(&username, &ctx.user.full_name(), address.as_ref(), &orders);
        self.reply(OutgoingMessage::text(ctx.chat_id, text).with_markup(keyboards::profile_actions()))
            .await
    }

    /// Starts the address wizard.
    pub(super) async fn start_address_wizard(&self, ctx: Ctx<'_>, session: &mut Session) -> Result<()> {
        session.client_mode = Some(ClientMode::Address(AddressStep::FullName));
        session.address_draft = AddressDraft::default();
        self.reply(OutgoingMessage::text(ctx.chat_id, render::address_prompt(AddressStep::FullName)))
            .await
    }

    async fn address_step(
        &self,
        ctx: Ctx<'_>,
        session: &mut Session,
        step: AddressStep,
        raw: &str,
    ) -> Result<()> {
        let chat = ctx.chat_id;
        let draft = &mut session.address_draft;
        let next = match step {
            AddressStep::FullName => {
                draft.full_name = raw.to_string();
                AddressStep::Phone
            },
            AddressStep::Phone => match normalize_phone(raw) {
                Ok(phone) => {
                    draft.phone = phone;
                    AddressStep::City
                },
                Err(_) => {
                    return self
                        .reply(OutgoingMessage::text(
                            chat,
                            "Нужно 11 цифр и обязательно с 8. Пример: 87001234567\n\
                             Введи номер ещё раз или нажми «Отмена».",
                        ))
                        .await;
                },
            },
            AddressStep::City => {
                draft.city = raw.to_string();
                AddressStep::Street
            },
            AddressStep::Street => {
                draft.address = raw.to_string();
                AddressStep::Postcode
            },
            AddressStep::Postcode => {
                let Ok(postcode) = validate_postcode(raw) else {
                    return self
                        .reply(OutgoingMessage::text(
                            chat,
                            "Индекс выглядит странно. Пример: 010000\n\
                             Введи индекс ещё раз или нажми «Отмена».",
                        ))
                        .await;
                };
                return self.finish_address(ctx, session, postcode).await;
            },
        };

        session.client_mode = Some(ClientMode::Address(next));
        self.reply(OutgoingMessage::text(chat, render::address_prompt(next))).await
    }

    async fn finish_address(&self, ctx: Ctx<'_>, session: &mut Session, postcode: String) -> Result<()> {
        let draft = std::mem::take(&mut session.address_draft);
        session.client_mode = None;
        let username = ctx.user.username.clone().unwrap_or_default();

        self.store
            .save_address(&NewAddress {
                user_id: ctx.user.id,
                username: username.clone(),
                full_name: draft.full_name.clone(),
                phone: draft.phone.clone(),
                city: draft.city.clone(),
                address: draft.address.clone(),
                postcode: postcode.clone(),
            })
            .await?;

        if !username.is_empty() {
            self.subscribe_to_own_orders(ctx, &username).await;
        }

        self.reply(
            OutgoingMessage::text(ctx.chat_id, render::address_saved(&draft, &postcode))
                .with_markup(keyboards::main_menu()),
        )
        .await
    }

    /// Follows every order the user takes part in.
    async fn subscribe_to_own_orders(&self, ctx: Ctx<'_>, username: &str) {
        let orders = match self.store.orders_by_username(username).await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(error = %e, "participant orders lookup failed");
                return;
            },
        };
        let mut subscribed = 0;
        for order in &orders {
            match self.store.subscribe(ctx.user_id(), &order.order_id).await {
                Ok(()) => subscribed += 1,
                Err(e) => warn!(order_id = %order.order_id, error = %e, "auto-subscribe failed"),
            }
        }
        info!(user_id = ctx.user.id, subscribed, "subscribed to participant orders");
    }
}
