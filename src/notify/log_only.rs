//! Notifier that only writes to the tracing log.

use tracing::info;

use super::{DeliveryError, Notifier};

/// Used when no mail relay is configured; every notification succeeds.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        info!(subject, "Notification (no SMTP configured): {}", body.replace('\n', " | "));
        Ok(())
    }
}
