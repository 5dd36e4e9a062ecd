//! Outgoing notifications: status updates, new orders and payment reminders.
//!
//! A failed send to one user never aborts the rest of a batch. Failures are
//! logged and, for reminders, counted into the report shown to the admin.

use std::sync::Arc;

use seabluu_core::{BotStore, UserId};
use seabluu_telegram::{BotApi, OutgoingMessage};
use tracing::{debug, info, instrument, warn};

use crate::error::Result;

/// Result of reminding one order's debtors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderReport {
    /// Order the reminders were about.
    pub order_id: String,
    /// Reminders delivered.
    pub delivered: usize,
    /// Debtors that could not be reached.
    pub failed: usize,
    /// Report text for the admin.
    pub text: String,
}

/// Result of reminding debtors of every order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Per-order reports.
    pub orders: Vec<ReminderReport>,
    /// Reminders delivered across all orders.
    pub delivered: usize,
    /// Failures across all orders.
    pub failed: usize,
    /// Report text for the admin.
    pub text: String,
}

/// Sends notifications through the Bot API and records what was sent.
#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn BotStore>,
    api: Arc<dyn BotApi>,
}

impl Notifier {
    /// Creates a notifier.
    pub fn new(store: Arc<dyn BotStore>, api: Arc<dyn BotApi>) -> Self {
        Self { store, api }
    }

    /// Tells every subscriber of an order about its new status.
    ///
    /// Returns the number of subscribers reached.
    ///
    /// # Errors
    ///
    /// Returns an error only when the subscriber list cannot be loaded.
    #[instrument(skip(self))]
    pub async fn notify_subscribers(&self, order_id: &str, status: &str) -> Result<usize> {
        let subscribers = self.store.subscribers(order_id).await?;
        let text = format!("🔄 Обновление по заказу *{order_id}*\nНовый статус: *{status}*");

        let mut delivered = 0;
        for sub in subscribers {
            let message = OutgoingMessage::markdown(sub.user_id.0, text.clone());
            match self.api.send_message(&message).await {
                Ok(_) => {
                    delivered += 1;
                    if let Err(e) =
                        self.store.set_last_sent_status(sub.user_id, order_id, Some(status)).await
                    {
                        warn!(user_id = %sub.user_id, error = %e, "failed to record last sent status");
                    }
                },
                Err(e) => warn!(user_id = %sub.user_id, error = %e, "status notification failed"),
            }
        }

        info!(delivered, "subscribers notified");
        Ok(delivered)
    }

    /// Subscribes known participants of a new order and tells them about it.
    ///
    /// # Errors
    ///
    /// Returns an error when usernames cannot be resolved.
    #[instrument(skip(self, usernames), fields(participants = usernames.len()))]
    pub async fn notify_new_order(
        &self,
        order_id: &str,
        status: &str,
        usernames: &[String],
    ) -> Result<usize> {
        if usernames.is_empty() {
            return Ok(0);
        }
        let user_ids = self.store.user_ids_by_usernames(usernames).await?;
        let text = format!("🆕 Создан новый разбор *{order_id}*. Текущий статус: *{status}*");

        let mut delivered = 0;
        for user_id in user_ids {
            if let Err(e) = self.store.subscribe(user_id, order_id).await {
                warn!(%user_id, error = %e, "auto-subscribe failed");
            }
            match self.api.send_message(&OutgoingMessage::markdown(user_id.0, text.clone())).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(%user_id, error = %e, "new order notification failed"),
            }
        }
        Ok(delivered)
    }

    /// Reminds the debtors of one order to pay for delivery.
    ///
    /// Works from the participants list even when the order row is missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the order or its debtors cannot be loaded.
    #[instrument(skip(self))]
    pub async fn remind_unpaid(&self, order_id: &str) -> Result<ReminderReport> {
        let order = self.store.find_order(order_id).await?;
        let debtors = self.store.unpaid_usernames(order_id).await?;
        let mut report = ReminderReport { order_id: order_id.to_string(), ..ReminderReport::default() };

        if order.is_none() && debtors.is_empty() {
            report.text = "🙈 Заказ не найден.".to_string();
            return Ok(report);
        }
        if debtors.is_empty() {
            report.text = format!("🎉 По заказу *{order_id}* должников нет — красота!");
            return Ok(report);
        }

        let mut lines = vec![format!("📩 Уведомления по ID разбора — {order_id}")];
        for username in debtors {
            let ids = self.store.user_ids_by_usernames(std::slice::from_ref(&username)).await?;
            let Some(user_id) = ids.first().copied() else {
                report.failed += 1;
                lines.push(format!("• ❌ @{username} — нет chat_id"));
                continue;
            };

            match self.send_reminder(user_id, order_id).await {
                Ok(()) => {
                    report.delivered += 1;
                    lines.push(format!("• ✅ @{username}"));
                },
                Err(reason) => {
                    report.failed += 1;
                    lines.push(format!("• ❌ @{username} — {reason}"));
                },
            }
        }

        lines.push(String::new());
        lines.push(format!("_Итого:_ ✅ {}  ❌ {}", report.delivered, report.failed));
        report.text = lines.join("\n");

        info!(delivered = report.delivered, failed = report.failed, "payment reminders sent");
        Ok(report)
    }

    async fn send_reminder(&self, user_id: UserId, order_id: &str) -> std::result::Result<(), &'static str> {
        if let Err(e) = self.store.subscribe(user_id, order_id).await {
            debug!(%user_id, error = %e, "subscribe before reminder failed");
        }
        let text = format!(
            "💳 Напоминание по разбору *{order_id}*\nСтатус: *Доставка не оплачена*\n\n\
             Пожалуйста, оплатите доставку. Если уже оплатили — можно игнорировать."
        );
        self.api
            .send_message(&OutgoingMessage::markdown(user_id.0, text))
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!(%user_id, error = %e, "payment reminder failed");
                e.reason()
            })
    }

    /// Reminds the debtors of every order that has any.
    ///
    /// # Errors
    ///
    /// Returns an error when the debtors list cannot be loaded.
    #[instrument(skip(self))]
    pub async fn remind_all_unpaid(&self) -> Result<BroadcastReport> {
        let grouped = self.store.unpaid_grouped().await?;
        if grouped.is_empty() {
            return Ok(BroadcastReport {
                text: "🎉 Должников по всем разборам нет — супер!".to_string(),
                ..BroadcastReport::default()
            });
        }

        let mut broadcast = BroadcastReport::default();
        for (order_id, _) in grouped {
            let report = self.remind_unpaid(&order_id).await?;
            broadcast.delivered += report.delivered;
            broadcast.failed += report.failed;
            broadcast.orders.push(report);
        }

        let mut parts: Vec<&str> = broadcast.orders.iter().map(|r| r.text.as_str()).collect();
        let total = format!("_Итого по всем:_ ✅ {}  ❌ {}", broadcast.delivered, broadcast.failed);
        parts.push(&total);
        broadcast.text = parts.join("\n\n");
        Ok(broadcast)
    }
}
