//! HTTP client for the Telegram Bot API.
//!
//! Every method is a `POST {api_url}/bot{token}/{method}` with a JSON body.
//! Telegram wraps results in an envelope with an `ok` flag; failures are
//! mapped onto [`TelegramError`] categories.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{info_span, Instrument};

use crate::{
    error::{Result, TelegramError},
    types::{ChatAction, EditMessageText, InlineKeyboardMarkup, Message, OutgoingMessage},
};

/// Configuration for the Telegram client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bot API base URL, without a trailing slash.
    pub api_url: String,
    /// Timeout for each request.
    pub timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.telegram.org".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("SEABLUU-Bot/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Telegram Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    config: ClientConfig,
    token: String,
}

impl TelegramClient {
    /// Creates a client for the bot identified by `token`.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError::Configuration` if the token is empty or the
    /// HTTP client cannot be built.
    pub fn new(token: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(TelegramError::configuration("bot token is empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TelegramError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config, token })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.config.api_url.trim_end_matches('/'), self.token)
    }

    /// Calls a Bot API method and returns its `result`.
    ///
    /// # Errors
    ///
    /// - `Timeout` and `Network` for transport failures
    /// - `RateLimited` for HTTP 429 or a `retry_after` hint
    /// - `Api` for `ok: false` responses
    /// - `Decode` when the body is not a Bot API envelope
    pub async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let span = info_span!("telegram_call", method);

        async move {
            let response = match self.client.post(self.method_url(method)).json(body).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(error = %e, "telegram request failed");
                    if e.is_timeout() {
                        return Err(TelegramError::Timeout {
                            timeout_seconds: self.config.timeout.as_secs(),
                        });
                    }
                    return Err(TelegramError::network(e.to_string()));
                },
            };

            let status = response.status();
            let bytes =
                response.bytes().await.map_err(|e| TelegramError::network(e.to_string()))?;

            let envelope: Envelope<T> = match serde_json::from_slice(&bytes) {
                Ok(envelope) => envelope,
                Err(e) => {
                    return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                        TelegramError::RateLimited { retry_after_seconds: 1 }
                    } else if status.is_success() {
                        TelegramError::decode(e.to_string())
                    } else {
                        TelegramError::api(
                            i64::from(status.as_u16()),
                            String::from_utf8_lossy(&bytes).chars().take(200).collect::<String>(),
                        )
                    });
                },
            };

            let retry_after = envelope.parameters.and_then(|p| p.retry_after);
            if status == StatusCode::TOO_MANY_REQUESTS || retry_after.is_some() {
                tracing::warn!(retry_after, "telegram flood control");
                return Err(TelegramError::RateLimited {
                    retry_after_seconds: retry_after.unwrap_or(1),
                });
            }

            if !envelope.ok {
                let error_code = envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16()));
                let description = envelope.description.unwrap_or_default();
                tracing::debug!(error_code, %description, "telegram api error");
                return Err(TelegramError::api(error_code, description));
            }

            envelope.result.ok_or_else(|| TelegramError::decode("missing result"))
        }
        .instrument(span)
        .await
    }

    /// Sends a message and returns it as stored by Telegram.
    ///
    /// # Errors
    ///
    /// See [`TelegramClient::call`].
    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<Message> {
        self.call("sendMessage", message).await
    }

    /// Replaces the text (and optionally keyboard) of a sent message.
    ///
    /// # Errors
    ///
    /// See [`TelegramClient::call`].
    pub async fn edit_message_text(&self, edit: &EditMessageText) -> Result<()> {
        self.call::<_, serde_json::Value>("editMessageText", edit).await.map(|_| ())
    }

    /// Replaces or removes the inline keyboard of a sent message.
    ///
    /// # Errors
    ///
    /// See [`TelegramClient::call`].
    pub async fn edit_message_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reply_markup": markup.cloned().unwrap_or_default(),
        });
        self.call::<_, serde_json::Value>("editMessageReplyMarkup", &body).await.map(|_| ())
    }

    /// Acknowledges a button press, optionally with a toast.
    ///
    /// # Errors
    ///
    /// See [`TelegramClient::call`].
    pub async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        self.call::<_, bool>("answerCallbackQuery", &body).await.map(|_| ())
    }

    /// Shows a chat action such as "typing…".
    ///
    /// # Errors
    ///
    /// See [`TelegramClient::call`].
    pub async fn send_chat_action(&self, chat_id: i64, action: ChatAction) -> Result<()> {
        let body = json!({ "chat_id": chat_id, "action": action });
        self.call::<_, bool>("sendChatAction", &body).await.map(|_| ())
    }

    /// Deletes a message.
    ///
    /// # Errors
    ///
    /// See [`TelegramClient::call`].
    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let body = json!({ "chat_id": chat_id, "message_id": message_id });
        self.call::<_, bool>("deleteMessage", &body).await.map(|_| ())
    }

    /// Points Telegram at the webhook URL.
    ///
    /// # Errors
    ///
    /// See [`TelegramClient::call`].
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        let body = json!({
            "url": url,
            "allowed_updates": ["message", "callback_query"],
        });
        self.call::<_, bool>("setWebhook", &body).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client_for(server: &MockServer) -> TelegramClient {
        let config = ClientConfig { api_url: server.uri(), ..ClientConfig::default() };
        TelegramClient::new("123:abc", config).unwrap()
    }

    #[tokio::test]
    async fn send_message_returns_sent_message() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/bot123:abc/sendMessage"))
            .and(matchers::body_partial_json(json!({"chat_id": 42, "text": "hi"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 9, "chat": {"id": 42, "type": "private"}, "date": 1, "text": "hi"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let sent = client.send_message(&OutgoingMessage::text(42, "hi")).await.unwrap();
        assert_eq!(sent.message_id, 9);
    }

    #[tokio::test]
    async fn api_errors_carry_code_and_description() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.send_message(&OutgoingMessage::text(1, "x")).await.unwrap_err();
        assert_eq!(err, TelegramError::api(403, "Forbidden: bot was blocked by the user"));
        assert_eq!(err.reason(), "бот заблокирован");
    }

    #[tokio::test]
    async fn flood_control_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 7",
                "parameters": {"retry_after": 7}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.delete_message(1, 2).await.unwrap_err();
        assert_eq!(err, TelegramError::RateLimited { retry_after_seconds: 7 });
    }

    #[tokio::test]
    async fn non_json_error_body_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.set_webhook("https://example.com/telegram").await.unwrap_err();
        assert_eq!(err, TelegramError::api(502, "Bad Gateway"));
    }

    #[tokio::test]
    async fn timeouts_are_reported() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "result": true}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = ClientConfig {
            api_url: server.uri(),
            timeout: Duration::from_millis(50),
            ..ClientConfig::default()
        };
        let client = TelegramClient::new("t", config).unwrap();
        let err = client.send_chat_action(1, ChatAction::Typing).await.unwrap_err();
        assert!(matches!(err, TelegramError::Timeout { .. }));
    }

    #[test]
    fn empty_token_is_rejected() {
        let err = TelegramClient::new(" ", ClientConfig::default()).unwrap_err();
        assert!(matches!(err, TelegramError::Configuration { .. }));
    }
}
