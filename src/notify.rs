use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

use crate::error::ApiError;

/// Notifier
///
/// Abstract contract for the outbound notification collaborator that relays
/// contact-form submissions to the institute staff. Consumed as an opaque
/// service: the record is committed before delivery is attempted, and a
/// delivery failure surfaces upstream without rolling the row back.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), ApiError>;
}

/// The concrete type used to share the notifier across the application state.
pub type NotifierState = Arc<dyn Notifier>;

/// TelegramNotifier
///
/// Relays messages to a staff chat through the Telegram Bot API. Credentials
/// come from AppConfig at construction time; when either is absent, delivery
/// reports an upstream configuration failure instead of silently dropping
/// the message.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramNotifier {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token,
            chat_id,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), ApiError> {
        let (token, chat_id) = match (&self.bot_token, &self.chat_id) {
            (Some(token), Some(chat_id)) => (token, chat_id),
            _ => {
                return Err(ApiError::Upstream(
                    "notifier configuration is missing".to_string(),
                ));
            }
        };

        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let response = self
            .client
            .post(url)
            .json(&json!({
                "chat_id": chat_id,
                "text": format!("{subject}\n\n{body}"),
            }))
            .send()
            .await
            .map_err(|e| ApiError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "telegram relay returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// MockNotifier
///
/// Test double recording delivered messages, with a failing variant for
/// exercising the upstream-failure path.
#[derive(Clone, Default)]
pub struct MockNotifier {
    pub should_fail: bool,
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), ApiError> {
        if self.should_fail {
            return Err(ApiError::Upstream(
                "mock notifier error: simulation requested".to_string(),
            ));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((subject.to_string(), body.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_telegram_notifier_reports_upstream_failure() {
        let notifier = TelegramNotifier::new(None, None);
        let result = notifier.notify("subject", "body").await;
        assert!(matches!(result, Err(ApiError::Upstream(_))));
    }

    #[tokio::test]
    async fn mock_records_deliveries() {
        let mock = MockNotifier::new();
        mock.notify("New message", "hello").await.unwrap();
        assert_eq!(
            mock.sent_messages(),
            vec![("New message".to_string(), "hello".to_string())]
        );
    }
}
