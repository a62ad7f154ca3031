//! Email delivery over SMTP.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt::Display;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{DeliveryError, Notifier};
use crate::config::SmtpConfig;

/// Port that speaks TLS from the first byte instead of upgrading via STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// SMTP notifier sending to a single fixed recipient.
pub struct SmtpNotifier<T = AsyncSmtpTransport<Tokio1Executor>> {
    transport: T,
    from: Mailbox,
    to: Mailbox,
    retry_attempts: u32,
}

impl<T> std::fmt::Debug for SmtpNotifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from.to_string())
            .field("to", &self.to.to_string())
            .field("retry_attempts", &self.retry_attempts)
            .finish_non_exhaustive()
    }
}

impl SmtpNotifier {
    /// Create a notifier from a fully configured SMTP section.
    pub fn new(config: &SmtpConfig) -> Result<Self, DeliveryError> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| DeliveryError::Config("SMTP host is not set".into()))?;
        let username = config
            .username
            .clone()
            .ok_or_else(|| DeliveryError::Config("SMTP username is not set".into()))?;
        let password = config
            .password
            .clone()
            .ok_or_else(|| DeliveryError::Config("SMTP password is not set".into()))?;
        let to = parse_mailbox(
            config
                .to
                .as_deref()
                .ok_or_else(|| DeliveryError::Config("SMTP recipient is not set".into()))?,
        )?;
        let from = parse_mailbox(config.from.as_deref().unwrap_or(&username))?;

        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| DeliveryError::Config(format!("invalid SMTP relay {host}: {e}")))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(username, password))
            .build();

        info!(
            "SMTP notifier initialized: relay={}:{}, to={}",
            host, config.port, to
        );

        Ok(Self::with_transport(
            transport,
            from,
            to,
            config.retry_attempts,
        ))
    }
}

impl<T> SmtpNotifier<T> {
    /// Create a notifier sending through an already built transport.
    pub fn with_transport(transport: T, from: Mailbox, to: Mailbox, retry_attempts: u32) -> Self {
        Self {
            transport,
            from,
            to,
            retry_attempts: retry_attempts.max(1),
        }
    }

    fn build_message(&self, subject: &str, body: &str) -> Result<Message, DeliveryError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

impl<T> Notifier for SmtpNotifier<T>
where
    T: AsyncTransport + Sync,
    T::Error: Display,
{
    async fn notify(&self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let message = self.build_message(subject, body)?;
        let start = Instant::now();
        let mut last_error = None;

        for attempt in 0..self.retry_attempts {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * 2u64.pow(attempt));
                debug!("Retry attempt {} after {:?}", attempt + 1, delay);
                tokio::time::sleep(delay).await;
            }

            match self.transport.send(message.clone()).await {
                Ok(_) => {
                    debug!(
                        "Sent '{}' to {} in {}ms",
                        subject,
                        self.to,
                        start.elapsed().as_millis()
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!("Send attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(DeliveryError::Transport(
            last_error.unwrap_or_else(|| "no attempt was made".to_string()),
        ))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse()
        .map_err(|e| DeliveryError::Config(format!("invalid address '{address}': {e}")))
}
