//! Admin panel: menus, wizards, search and reports.

use seabluu_core::{
    canonical_status,
    parse::{digits_only, extract_order_id, extract_order_ids, extract_usernames, split_tokens},
    Country, NewAddress, NewOrder, Order,
};
use seabluu_telegram::{EditMessageText, OutgoingMessage, ReplyMarkup};
use tracing::{info, instrument, warn};

use super::{Ctx, Dispatcher};
use crate::{
    error::Result,
    keyboards::{self, CLIENTS_PER_PAGE, MASS_STATUS_PREFIX, PICK_STATUS_PREFIX},
    menu::MenuAction,
    render,
    session::{AddressStep, AdminMode, EditAddressStep, Session},
};

/// Keyboard repeated with an admin prompt, if the step has one.
pub(super) fn prompt_keyboard(mode: AdminMode) -> Option<ReplyMarkup> {
    match mode {
        AdminMode::AddOrderStatus => Some(keyboards::status_picker(PICK_STATUS_PREFIX).into()),
        AdminMode::MassPickStatus => Some(keyboards::status_picker(MASS_STATUS_PREFIX).into()),
        _ => None,
    }
}

impl Dispatcher {
    pub(super) async fn open_admin_menu(&self, ctx: Ctx<'_>, session: &mut Session) -> Result<()> {
        session.reset_admin();
        self.reply(
            OutgoingMessage::text(ctx.chat_id, "🛠 Открываю админ-панель…")
                .with_markup(keyboards::admin_menu()),
        )
        .await
    }

    pub(super) async fn find_start(&self, ctx: Ctx<'_>, session: &mut Session) -> Result<()> {
        if !self.is_admin(ctx.user.id) {
            return self
                .reply(OutgoingMessage::text(ctx.chat_id, "Доступно только администраторам."))
                .await;
        }
        session.find_expecting = true;
        self.reply(
            OutgoingMessage::markdown(ctx.chat_id, render::FIND_PROMPT)
                .with_markup(keyboards::back_to_admin()),
        )
        .await
    }

    /// Handles admin menu buttons and active admin flows. Returns false when
    /// the text is not for the admin panel.
    pub(super) async fn handle_admin_text(
        &self,
        ctx: Ctx<'_>,
        session: &mut Session,
        raw: &str,
        action: Option<MenuAction>,
    ) -> Result<bool> {
        let chat = ctx.chat_id;
        match action {
            Some(MenuAction::ExitAdmin) => {
                *session = Session::default();
                self.reply(
                    OutgoingMessage::text(chat, "🚪 Готово, вышли из админ-панели.")
                        .with_markup(keyboards::main_menu()),
                )
                .await?;
            },
            Some(MenuAction::AddOrder) => {
                session.reset_admin();
                session.admin_mode = Some(AdminMode::AddOrderId);
                self.reply(OutgoingMessage::markdown(
                    chat,
                    "➕ Введи *order_id* (например: `CN-12345`):",
                ))
                .await?;
            },
            Some(MenuAction::Reports) => {
                self.reply(
                    OutgoingMessage::text(chat, "📊 Раздел «Отчёты»")
                        .with_markup(keyboards::reports_menu()),
                )
                .await?;
            },
            Some(MenuAction::Broadcast) => {
                self.reply(
                    OutgoingMessage::text(chat, "📣 Раздел «Рассылка»")
                        .with_markup(keyboards::broadcast_menu()),
                )
                .await?;
            },
            Some(MenuAction::Clients) => {
                self.reply(
                    OutgoingMessage::text(chat, "👤 Раздел «Клиенты»")
                        .with_markup(keyboards::clients_menu()),
                )
                .await?;
            },
            Some(MenuAction::MassStatus) => {
                session.admin_mode = Some(AdminMode::MassPickStatus);
                self.reply(
                    OutgoingMessage::text(chat, render::admin_prompt(AdminMode::MassPickStatus))
                        .with_markup(keyboards::status_picker(MASS_STATUS_PREFIX)),
                )
                .await?;
            },
            Some(MenuAction::BackToAdmin) => self.open_admin_menu(ctx, session).await?,
            Some(MenuAction::BroadcastAll) => self.broadcast_all(ctx).await?,
            Some(MenuAction::BroadcastByOrder) => {
                session.admin_mode = Some(AdminMode::RemindUnpaid);
                self.reply(OutgoingMessage::markdown(
                    chat,
                    "✉️ Введи *order_id* или *список order_id* для рассылки неплательщикам:",
                ))
                .await?;
            },
            Some(MenuAction::ExportAddresses) => {
                session.admin_mode = Some(AdminMode::ExportAddresses);
                self.reply(OutgoingMessage::text(
                    chat,
                    render::admin_prompt(AdminMode::ExportAddresses),
                ))
                .await?;
            },
            Some(MenuAction::EditAddress) => {
                let mode = AdminMode::EditAddress(EditAddressStep::Username);
                session.admin_mode = Some(mode);
                self.reply(OutgoingMessage::text(chat, render::admin_prompt(mode))).await?;
            },
            Some(MenuAction::ListClients) => {
                session.clients_query = None;
                session.clients_page = 0;
                self.show_clients_page(ctx, session).await?;
            },
            Some(MenuAction::ReportByNote) => {
                session.admin_mode = Some(AdminMode::ExportOrdersByNote);
                self.reply(OutgoingMessage::markdown(
                    chat,
                    "🧾 Пришли метку/слово из *note*, по которому помечены твои разборы:",
                ))
                .await?;
            },
            Some(MenuAction::ReportUnpaid) => self.report_unpaid(ctx, session).await?,
            Some(MenuAction::ReportLastOrders) => self.show_last_orders(ctx, 5).await?,
            Some(MenuAction::Search) if session.admin_mode.is_none() => {
                self.find_start(ctx, session).await?;
            },
            Some(action) if !action.is_admin() => return Ok(false),
            _ => return self.handle_admin_mode(ctx, session, raw).await,
        }
        Ok(true)
    }

    async fn handle_admin_mode(&self, ctx: Ctx<'_>, session: &mut Session, raw: &str) -> Result<bool> {
        let Some(mode) = session.admin_mode else {
            return Ok(false);
        };
        let chat = ctx.chat_id;

        match mode {
            AdminMode::ClientsSearch => {
                session.clients_query =
                    (!matches!(raw, "-" | "—") && !raw.is_empty()).then(|| raw.to_string());
                session.clients_page = 0;
                session.admin_mode = None;
                self.show_clients_page(ctx, session).await?;
            },
            AdminMode::AddOrderId => {
                let order_id = extract_order_id(raw).unwrap_or_else(|| raw.to_uppercase());
                let country = order_id.split_once('-').and_then(|(prefix, _)| Country::from_code(prefix));
                let Some(country) = country else {
                    self.reply(OutgoingMessage::text(chat, "Неверный order_id. Пример: CN-12345")).await?;
                    return Ok(true);
                };
                session.order_draft.order_id = order_id;
                session.order_draft.country = country.code().to_string();
                session.admin_mode = Some(AdminMode::AddOrderClient);
                self.reply(OutgoingMessage::text(chat, render::admin_prompt(AdminMode::AddOrderClient)))
                    .await?;
            },
            AdminMode::AddOrderClient => {
                session.order_draft.client_name = raw.to_string();
                session.admin_mode = Some(AdminMode::AddOrderStatus);
                self.reply(
                    OutgoingMessage::text(chat, render::admin_prompt(AdminMode::AddOrderStatus))
                        .with_markup(keyboards::status_picker(PICK_STATUS_PREFIX)),
                )
                .await?;
            },
            AdminMode::AddOrderStatus => match canonical_status(raw) {
                Some(status) => self.accept_order_status(ctx, session, status).await?,
                None => {
                    self.reply(
                        OutgoingMessage::text(chat, "Выбери статус кнопкой ниже или напиши точный:")
                            .with_markup(keyboards::status_picker(PICK_STATUS_PREFIX)),
                    )
                    .await?;
                },
            },
            AdminMode::AddOrderNote => {
                let note = (raw != "-").then(|| raw.to_string());
                let outcome = self.create_order(session, note).await;
                session.reset_admin();
                match outcome {
                    Ok(order_id) => {
                        self.reply(OutgoingMessage::markdown(
                            chat,
                            format!("✅ Заказ *{order_id}* добавлен"),
                        ))
                        .await?;
                    },
                    Err(e) => self.reply(OutgoingMessage::text(chat, format!("Ошибка: {e}"))).await?,
                }
            },
            AdminMode::RemindUnpaid => {
                let ids = extract_order_ids(raw);
                if ids.is_empty() {
                    self.reply(OutgoingMessage::markdown(
                        chat,
                        "🙈 Не понял. Пришли один или несколько *order_id*.",
                    ))
                    .await?;
                    return Ok(true);
                }
                let loader = self.show_loader(chat, "⏳ Рассылаю…").await;
                let mut reports = Vec::with_capacity(ids.len());
                let mut outcome = Ok(());
                for order_id in &ids {
                    match self.notifier.remind_unpaid(order_id).await {
                        Ok(report) => reports.push(report.text),
                        Err(e) => {
                            outcome = Err(e);
                            break;
                        },
                    }
                }
                self.clear_loader(chat, loader).await;
                session.admin_mode = None;
                outcome?;
                self.reply(OutgoingMessage::text(chat, reports.join("\n\n"))).await?;
            },
            AdminMode::MassUpdateIds => {
                let ids = extract_order_ids(raw);
                if ids.is_empty() {
                    self.reply(OutgoingMessage::text(
                        chat,
                        format!("⚠️ Не понял. {}", render::MASS_IDS_PROMPT),
                    ))
                    .await?;
                    return Ok(true);
                }
                session.admin_mode = None;
                let Some(status) = session.mass_status.take() else {
                    self.reply(OutgoingMessage::text(chat, "Сначала выбери новый статус.")).await?;
                    return Ok(true);
                };
                let loader = self.show_loader(chat, "⏳ Обновляю статусы…").await;
                let (updated, failed) = self.update_statuses(&ids, &status).await;
                self.clear_loader(chat, loader).await;
                let summary = render::mass_update_summary(
                    "✏️ Массовая смена статусов — итог",
                    ids.len(),
                    updated,
                    &failed,
                );
                self.reply(OutgoingMessage::text(chat, summary)).await?;
            },
            AdminMode::ExportAddresses => {
                let usernames = extract_usernames(raw);
                if usernames.is_empty() {
                    self.reply(OutgoingMessage::text(chat, "Пришли список @username.")).await?;
                    return Ok(true);
                }
                let records = self.store.client_records(&usernames).await?;
                session.admin_mode = None;
                let text = if records.is_empty() {
                    "Клиенты не найдены.".to_string()
                } else {
                    render::client_export(&records)
                };
                self.reply(OutgoingMessage::text(chat, text)).await?;
            },
            AdminMode::EditAddress(step) => self.edit_address_step(ctx, session, step, raw).await?,
            AdminMode::ExportOrdersByNote => {
                if raw.is_empty() {
                    self.reply(OutgoingMessage::text(chat, "Пришли метку/слово для поиска в note.")).await?;
                    return Ok(true);
                }
                let orders = self.store.orders_by_note(raw).await?;
                session.admin_mode = None;
                self.reply(OutgoingMessage::text(chat, render::orders_by_note(&orders))).await?;
            },
            AdminMode::MassPickStatus => return Ok(false),
        }
        Ok(true)
    }

    /// Stores the wizard's starting status and asks for the note.
    pub(super) async fn accept_order_status(
        &self,
        ctx: Ctx<'_>,
        session: &mut Session,
        status: &str,
    ) -> Result<()> {
        session.order_draft.status = status.to_string();
        session.admin_mode = Some(AdminMode::AddOrderNote);
        self.reply(OutgoingMessage::text(ctx.chat_id, render::admin_prompt(AdminMode::AddOrderNote)))
            .await
    }

    #[instrument(skip(self, session, note), fields(order_id = %session.order_draft.order_id))]
    async fn create_order(&self, session: &Session, note: Option<String>) -> Result<String> {
        let draft = &session.order_draft;
        let order = self
            .store
            .upsert_order(&NewOrder {
                order_id: draft.order_id.clone(),
                client_name: Some(draft.client_name.clone()).filter(|c| !c.is_empty()),
                phone: None,
                origin: Some(draft.country.clone()),
                status: draft.status.clone(),
                note,
                country: Some(draft.country.clone()),
            })
            .await?;

        let usernames = extract_usernames(&draft.client_name);
        if !usernames.is_empty() {
            self.store.ensure_participants(&order.order_id, &usernames).await?;
            if let Err(e) =
                self.notifier.notify_new_order(&order.order_id, &order.status, &usernames).await
            {
                warn!(error = %e, "new order notification failed");
            }
        }
        info!(participants = usernames.len(), "order created from bot");
        Ok(order.order_id)
    }

    async fn edit_address_step(
        &self,
        ctx: Ctx<'_>,
        session: &mut Session,
        step: EditAddressStep,
        raw: &str,
    ) -> Result<()> {
        let chat = ctx.chat_id;
        let next = |step: AddressStep| AdminMode::EditAddress(EditAddressStep::Field(step));

        let step = match step {
            EditAddressStep::Username => {
                let Some(username) = extract_usernames(raw).into_iter().next() else {
                    return self.reply(OutgoingMessage::text(chat, "Пришли @username.")).await;
                };
                let ids = self.store.user_ids_by_usernames(std::slice::from_ref(&username)).await?;
                let Some(user_id) = ids.first().copied() else {
                    session.admin_mode = None;
                    return self
                        .reply(OutgoingMessage::text(
                            chat,
                            "Пользователь не найден по username (нет записи в адресах/клиентах).",
                        ))
                        .await;
                };
                session.edit_target = Some((user_id, username));
                session.address_draft = Default::default();
                session.admin_mode = Some(next(AddressStep::FullName));
                return self
                    .reply(OutgoingMessage::text(chat, render::admin_prompt(next(AddressStep::FullName))))
                    .await;
            },
            EditAddressStep::Field(step) => step,
        };

        let draft = &mut session.address_draft;
        let following = match step {
            AddressStep::FullName => {
                draft.full_name = raw.to_string();
                AddressStep::Phone
            },
            AddressStep::Phone => {
                draft.phone = raw.to_string();
                AddressStep::City
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
                let outcome = match session.edit_target.clone() {
                    Some((user_id, username)) => {
                        let draft = &session.address_draft;
                        self.store
                            .save_address(&NewAddress {
                                user_id: user_id.0,
                                username,
                                full_name: draft.full_name.clone(),
                                phone: draft.phone.clone(),
                                city: draft.city.clone(),
                                address: draft.address.clone(),
                                postcode: raw.to_string(),
                            })
                            .await
                            .map(|_| ())
                            .map_err(|e| e.to_string())
                    },
                    None => Err("нет пользователя".to_string()),
                };
                session.reset_admin();
                session.address_draft = Default::default();
                let text = match outcome {
                    Ok(()) => "✅ Данные клиента обновлены".to_string(),
                    Err(e) => format!("Ошибка: {e}"),
                };
                return self.reply(OutgoingMessage::text(chat, text)).await;
            },
        };

        session.admin_mode = Some(next(following));
        self.reply(OutgoingMessage::text(chat, render::admin_prompt(next(following)))).await
    }

    /// Sets one status on several orders and notifies subscribers of each.
    /// Returns the number updated and the ids that failed.
    pub(super) async fn update_statuses(&self, ids: &[String], status: &str) -> (usize, Vec<String>) {
        let mut updated = 0;
        let mut failed = Vec::new();
        for order_id in ids {
            match self.store.update_order_status(order_id, status).await {
                Ok(true) => {
                    updated += 1;
                    if let Err(e) = self.notifier.notify_subscribers(order_id, status).await {
                        warn!(%order_id, error = %e, "subscriber notification failed");
                    }
                },
                Ok(false) => failed.push(order_id.clone()),
                Err(e) => {
                    warn!(%order_id, error = %e, "status update failed");
                    failed.push(order_id.clone());
                },
            }
        }
        info!(updated, failed = failed.len(), %status, "bulk status change");
        (updated, failed)
    }

    /// Finds orders by any mix of order ids, usernames and phones.
    #[instrument(skip(self, ctx, session))]
    pub(super) async fn multi_search(&self, ctx: Ctx<'_>, session: &mut Session, raw: &str) -> Result<()> {
        let chat = ctx.chat_id;
        let tokens = split_tokens(raw);
        if tokens.is_empty() {
            return self
                .reply(OutgoingMessage::text(chat, "Пусто. Пришлите order_id / @username / телефон."))
                .await;
        }

        let loader = self.show_loader(chat, "⏳ Ищу…").await;
        let found = self.search_orders(&tokens).await;
        self.clear_loader(chat, loader).await;
        let found = found?;

        if found.is_empty() {
            return self.reply(OutgoingMessage::text(chat, "Ничего не нашёл по запросу.")).await;
        }

        let mut cards = Vec::with_capacity(found.len());
        for order in &found {
            let unpaid = self.store.participants(&order.order_id).await?.iter().filter(|p| !p.paid).count();
            cards.push((order.clone(), unpaid));
        }
        session.find_results = found.iter().map(|o| o.order_id.clone()).collect();

        self.reply(OutgoingMessage::text(chat, render::found_cards(&cards))).await?;
        self.reply(
            OutgoingMessage::markdown(chat, format!("Найдено заказов: *{}*. Выберите:", found.len()))
                .with_markup(keyboards::find_results(&session.find_results, 0)),
        )
        .await
    }

    async fn search_orders(&self, tokens: &[String]) -> Result<Vec<Order>> {
        fn push(found: &mut Vec<Order>, order: Order) {
            if !found.iter().any(|o| o.order_id.eq_ignore_ascii_case(&order.order_id)) {
                found.push(order);
            }
        }

        let mut found: Vec<Order> = Vec::new();

        for token in tokens {
            if let Some(order_id) = extract_order_id(token) {
                if let Some(order) = self.store.find_order(&order_id).await? {
                    push(&mut found, order);
                }
            }
        }
        for token in tokens.iter().filter(|t| t.starts_with('@')) {
            for order in self.store.orders_by_username(token).await? {
                push(&mut found, order);
            }
        }
        for token in tokens {
            let phone_like = digits_only(token).len() >= 6
                && !token.starts_with('@')
                && extract_order_id(token).is_none();
            if phone_like {
                for order in self.store.orders_by_phone(token).await? {
                    push(&mut found, order);
                }
            }
        }
        Ok(found)
    }

    async fn report_unpaid(&self, ctx: Ctx<'_>, session: &mut Session) -> Result<()> {
        let grouped = self.store.unpaid_grouped().await?;
        if grouped.is_empty() {
            return self
                .reply(OutgoingMessage::text(ctx.chat_id, "🎉 Должников не найдено — красота!"))
                .await;
        }
        let (text, slice) = render::unpaid_page(&grouped, 0);
        session.unpaid = grouped;
        session.unpaid_page = slice.page;

        let mut message = OutgoingMessage::text(ctx.chat_id, text);
        if let Some(nav) = keyboards::unpaid_nav(slice.page, slice.pages) {
            message = message.with_markup(nav);
        }
        self.reply(message).await
    }

    async fn broadcast_all(&self, ctx: Ctx<'_>) -> Result<()> {
        let loader = self.show_loader(ctx.chat_id, "⏳ Отправляю уведомления…").await;
        let report = self.notifier.remind_all_unpaid().await;
        self.clear_loader(ctx.chat_id, loader).await;
        let report = report?;
        info!(delivered = report.delivered, failed = report.failed, "debtors broadcast finished");
        self.reply(OutgoingMessage::text(ctx.chat_id, report.text)).await
    }

    async fn show_last_orders(&self, ctx: Ctx<'_>, limit: i64) -> Result<()> {
        let loader = self.show_loader(ctx.chat_id, "⏳ Собираю последние разборы…").await;
        let orders = self.store.recent_orders(limit).await;
        self.clear_loader(ctx.chat_id, loader).await;
        self.reply(OutgoingMessage::text(ctx.chat_id, render::last_orders(&orders?))).await
    }

    /// Shows the current clients page, editing the pressed message when
    /// there is one.
    pub(super) async fn show_clients_page(&self, ctx: Ctx<'_>, session: &mut Session) -> Result<()> {
        let loader = self.show_loader(ctx.chat_id, "⏳ Загружаю клиентов…").await;
        let page = self.render_clients_page(session).await;
        self.clear_loader(ctx.chat_id, loader).await;
        let (text, markup, page) = page?;
        session.clients_page = page;

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
                Err(e) => warn!(error = %e, "clients page edit failed, sending anew"),
            }
        }
        self.reply(OutgoingMessage::text(ctx.chat_id, text).with_markup(markup)).await
    }

    /// Renders the session's clients page. A page past the end falls back
    /// to the last one, which is returned alongside the text.
    async fn render_clients_page(
        &self,
        session: &Session,
    ) -> Result<(String, seabluu_telegram::InlineKeyboardMarkup, usize)> {
        let query = session.clients_query.as_deref();
        let per_page = CLIENTS_PER_PAGE as i64;
        let mut page = session.clients_page;
        let requested = i64::try_from(page).unwrap_or(i64::MAX);
        let (mut items, total) = self.store.clients_page(requested, per_page, query).await?;
        let last = render::clients_pages(total) - 1;
        if page > last {
            page = last;
            (items, _) = self.store.clients_page(last as i64, per_page, query).await?;
        }

        let mut rows = Vec::with_capacity(items.len());
        for client in items {
            let active = match client.username.as_deref().filter(|u| !u.is_empty()) {
                Some(username) => self
                    .store
                    .orders_by_username(username)
                    .await?
                    .into_iter()
                    .filter(Order::is_active)
                    .collect(),
                None => Vec::new(),
            };
            rows.push((client, active));
        }

        let text = render::clients_page(&rows, total, page, query);
        let markup = if rows.is_empty() {
            keyboards::clients_nav(0, 1)
        } else {
            keyboards::clients_nav(page, render::clients_pages(total))
        };
        Ok((text, markup, page))
    }
}
