//! Alerting collaborators.
//!
//! Alerts are fire-and-forget: delivery problems are logged and swallowed so
//! they never change the outcome of the operation that raised the alert.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::http_client::{HttpClient, HttpRequest};

/// Boxed future returned by [`Alerter::notify`].
pub type AlertFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Receives operator alerts.
pub trait Alerter: Send + Sync {
    fn notify<'a>(&'a self, message: &'a str) -> AlertFuture<'a>;
}

/// Writes alerts to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerter;

impl Alerter for LogAlerter {
    fn notify<'a>(&'a self, message: &'a str) -> AlertFuture<'a> {
        Box::pin(async move {
            tracing::error!(alert = %message, "operator alert");
        })
    }
}

/// Keeps alerts in memory for deterministic offline tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingAlerter {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingAlerter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .expect("alert log lock is not poisoned")
            .clone()
    }

    pub fn count(&self) -> usize {
        self.messages
            .lock()
            .expect("alert log lock is not poisoned")
            .len()
    }
}

impl Alerter for RecordingAlerter {
    fn notify<'a>(&'a self, message: &'a str) -> AlertFuture<'a> {
        Box::pin(async move {
            self.messages
                .lock()
                .expect("alert log lock is not poisoned")
                .push(message.to_owned());
        })
    }
}

/// Sends alerts to a Telegram chat through the Bot API `sendMessage` call.
#[derive(Clone)]
pub struct TelegramAlerter {
    http_client: Arc<dyn HttpClient>,
    bot_token: String,
    chat_id: String,
    api_base: String,
}

impl TelegramAlerter {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: String::from("https://api.telegram.org"),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn request(&self, message: &str) -> HttpRequest {
        HttpRequest::post(format!(
            "{}/bot{}/sendMessage",
            self.api_base, self.bot_token
        ))
        .form([
            ("chat_id", self.chat_id.as_str()),
            ("parse_mode", "html"),
            ("text", message),
        ])
        .timeout(Duration::from_secs(5))
    }
}

impl Alerter for TelegramAlerter {
    fn notify<'a>(&'a self, message: &'a str) -> AlertFuture<'a> {
        Box::pin(async move {
            match self.http_client.execute(self.request(message)).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!("telegram alert delivered");
                }
                Ok(response) => {
                    tracing::warn!(status = response.status, "telegram alert rejected");
                }
                Err(error) => {
                    tracing::warn!(error = %error, "telegram alert delivery failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::HttpMethod;

    #[tokio::test]
    async fn recording_alerter_keeps_messages_in_order() {
        let alerter = RecordingAlerter::new();
        alerter.notify("first").await;
        alerter.notify("second").await;
        assert_eq!(alerter.messages(), vec!["first", "second"]);
    }

    #[test]
    fn telegram_request_is_form_encoded() {
        let alerter = TelegramAlerter::new(
            Arc::new(crate::http_client::NoopHttpClient),
            "token-1",
            "-100",
        );
        let request = alerter.request("fetch failed & gave up");

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "https://api.telegram.org/bottoken-1/sendMessage");
        assert_eq!(request.form_value("chat_id"), Some("-100"));
        let body = request.form_body().expect("form body");
        assert!(body.contains("text=fetch%20failed%20%26%20gave%20up"));
    }
}
