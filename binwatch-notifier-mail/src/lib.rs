//! Notifier implementation that mails overflow alerts through an HTTP mail relay.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use binwatch_core::{
    model::{Bin, Recipient},
    ports::{DeliveryFailure, DispatchReport, Notifier},
};

const LOCATION_PLACEHOLDER: &str = "Location not available";
const SIGNATURE: &str = "Smart Waste Management System";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(thiserror::Error, Debug)]
/// Errors raised while handing a message to the relay.
pub enum MailError {
    /// Network layer failed or the relay rejected the request.
    #[error("Relay error: {0}")]
    Relay(#[from] reqwest::Error),
    /// Transport-specific failure.
    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single outbound message.
pub struct MailMessage {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
}

impl MailMessage {
    /// Compose the overflow alert for one recipient.
    #[must_use]
    pub fn threshold_alert(
        from: &str,
        to: &str,
        recipient_name: &str,
        bin: &Bin,
        fill: f64,
    ) -> Self {
        let location = bin.address().unwrap_or(LOCATION_PLACEHOLDER);
        let name = &bin.name;
        Self {
            from: from.to_owned(),
            to: to.to_owned(),
            subject: format!("Alert: {name} - {fill:.1}% Full"),
            text: format!(
                "Hi {recipient_name},\n\n\
                 Trash bin \"{name}\" is {fill:.1}% full and requires attention.\n\n\
                 Location: {location}\n\n\
                 Thanks,\n\
                 {SIGNATURE}"
            ),
        }
    }
}

#[async_trait]
/// Channel that delivers a composed message.
pub trait MailTransport: Send + Sync {
    /// Hand one message to the transport.
    ///
    /// # Errors
    ///
    /// Returns a [`MailError`] when the message could not be handed over.
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Transport posting messages as JSON to a mail relay endpoint.
pub struct HttpRelayTransport {
    client: Client,
    endpoint: String,
}

impl HttpRelayTransport {
    /// Create a transport bound to the given HTTP client and relay URL.
    #[must_use]
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl MailTransport for HttpRelayTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let req = self.client.post(&self.endpoint).json(message);
        post_checked(req).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How often a failed delivery is attempted before the recipient is dropped.
pub struct RetryPolicy {
    /// Total attempts per recipient, at least one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
/// `[mail]` section of the daemon configuration.
pub struct MailSettings {
    /// Relay endpoint receiving JSON messages.
    pub relay_url: String,
    /// Sender address.
    pub from: String,
    /// Total attempts per recipient.
    pub max_attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Upper bound on a single relay request, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            relay_url: String::from("http://localhost:8025/api/send"),
            from: String::from("alerts@binwatch.local"),
            max_attempts: policy.max_attempts,
            retry_backoff_ms: u64::try_from(policy.backoff.as_millis()).unwrap_or(u64::MAX),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl MailSettings {
    /// Retry policy described by these settings.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Timeout applied to every relay request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Notifier mailing each addressable recipient, retrying then dropping failures.
pub struct MailNotifier<T> {
    transport: T,
    from: String,
    policy: RetryPolicy,
}

impl<T: MailTransport> MailNotifier<T> {
    /// Create a notifier sending from `from` through `transport`.
    #[must_use]
    pub fn new(transport: T, from: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            from: from.into(),
            policy,
        }
    }

    async fn deliver(&self, message: &MailMessage) -> Result<(), MailError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.transport.send(message).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < attempts => {
                    warn!(recipient = %message.to, attempt, error = %err, "alert delivery failed, retrying");
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Build a notifier posting to the configured relay.
#[must_use]
pub fn relay_notifier(client: Client, settings: &MailSettings) -> MailNotifier<HttpRelayTransport> {
    MailNotifier::new(
        HttpRelayTransport::new(client, settings.relay_url.clone()),
        settings.from.clone(),
        settings.retry_policy(),
    )
}

#[async_trait]
impl<T: MailTransport> Notifier for MailNotifier<T> {
    async fn notify(&self, bin: &Bin, fill: f64, recipients: &[Recipient]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for recipient in recipients {
            let Some(address) = recipient.email.as_deref() else {
                report.skipped += 1;
                continue;
            };

            let message = MailMessage::threshold_alert(&self.from, address, &recipient.name, bin, fill);
            match self.deliver(&message).await {
                Ok(()) => {
                    debug!(recipient = %address, bin_id = %bin.id, "alert delivered");
                    report.delivered += 1;
                }
                Err(err) => report.failed.push(DeliveryFailure {
                    address: address.to_owned(),
                    reason: err.to_string(),
                }),
            }
        }

        report
    }
}

// Send and map non-success statuses to errors.
async fn post_checked(req: RequestBuilder) -> Result<(), MailError> {
    req.send()
        .await
        .map_err(MailError::from)?
        .error_for_status()
        .map_err(MailError::from)?;
    Ok(())
}
