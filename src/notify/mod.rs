//! Notification delivery.
//!
//! A [`Notifier`] takes a subject and a body and tries to hand them to a fixed
//! destination. Delivery failures are returned to the caller, which is
//! expected to log and carry on.

mod log_only;
mod smtp;

pub use log_only::LogNotifier;
pub use smtp::SmtpNotifier;

use chrono::{DateTime, Local};
use std::time::Duration;
use thiserror::Error;

/// Timestamp format used in notification bodies.
const BODY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Failure to deliver a notification.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The notifier is misconfigured (bad address, unknown relay).
    #[error("invalid notifier configuration: {0}")]
    Config(String),
    /// The message could not be built.
    #[error("failed to build message: {0}")]
    Build(String),
    /// The transport rejected or failed to deliver the message.
    #[error("delivery failed: {0}")]
    Transport(String),
}

/// Destination for idle alerts and lifecycle notices.
pub trait Notifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

/// A subject/body pair ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Alert sent when the console crosses the idle threshold.
    pub fn idle_alert(machine: &str, idle: Duration, since: DateTime<Local>) -> Self {
        Self {
            subject: "Idle Alert".to_string(),
            body: format!(
                "Machine: {}\nIdle Duration: {:.1} minutes\nIdle Since: {}",
                machine,
                minutes(idle),
                since.format(BODY_TIME_FORMAT)
            ),
        }
    }

    /// Notice sent once when the service stops or the host shuts down.
    pub fn service_stopped(machine: &str, at: DateTime<Local>) -> Self {
        Self {
            subject: "Service Stopped".to_string(),
            body: format!(
                "Machine: {}\nService stopped at {}.",
                machine,
                at.format(BODY_TIME_FORMAT)
            ),
        }
    }
}

/// Fractional minutes, as shown in alerts and the event log.
pub fn minutes(duration: Duration) -> f64 {
    duration.as_secs_f64() / 60.0
}

/// Name of this machine as reported by the OS.
pub fn machine_name() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_idle_alert_body() {
        let since = Local.with_ymd_and_hms(2024, 3, 1, 14, 5, 30).unwrap();
        let n = Notification::idle_alert("WS-042", Duration::from_secs(330), since);

        assert_eq!(n.subject, "Idle Alert");
        assert_eq!(
            n.body,
            "Machine: WS-042\nIdle Duration: 5.5 minutes\nIdle Since: 2024-03-01 14:05:30"
        );
    }

    #[test]
    fn test_service_stopped_body() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
        let n = Notification::service_stopped("WS-042", at);

        assert_eq!(n.subject, "Service Stopped");
        assert_eq!(n.body, "Machine: WS-042\nService stopped at 2024-03-01 18:00:00.");
    }

    #[test]
    fn test_minutes_rounding_input() {
        assert_eq!(format!("{:.1}", minutes(Duration::from_secs(300))), "5.0");
        assert_eq!(format!("{:.1}", minutes(Duration::from_millis(400_123))), "6.7");
    }

    #[test]
    fn test_machine_name_not_empty() {
        assert!(!machine_name().is_empty());
    }
}
