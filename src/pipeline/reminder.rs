//! Reminder dispatch: format and send a fire-once email notification.
//!
//! A reminder is transient — built, submitted over STARTTLS, and discarded
//! within one call. There is no queue, no recurrence, and no retry. Every
//! failure (bad recipient, relay connect, auth, send) surfaces as a
//! distinct error; dispatch problems are never silently treated as
//! success.

use crate::config::SmtpConfig;
use crate::error::RxScanError;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// Subject line used for every reminder.
pub const REMINDER_SUBJECT: &str = "Prescription Reminder";

/// Render the reminder body for a (drug, dosage, time-of-day) triple.
pub fn format_reminder(drug: &str, dosage: &str, time: &str) -> String {
    format!("Reminder: Take {dosage} of {drug} at {time}")
}

/// Send a reminder email through the configured relay.
///
/// One synchronous (awaited) submission attempt. `time` is an opaque
/// time-of-day string rendered into the body; scheduling recurrence is the
/// caller's concern, not this crate's.
pub async fn send_reminder(
    smtp: &SmtpConfig,
    recipient: &str,
    drug: &str,
    dosage: &str,
    time: &str,
) -> Result<(), RxScanError> {
    let to: Mailbox = recipient
        .parse()
        .map_err(|_| RxScanError::InvalidRecipient {
            address: recipient.to_string(),
        })?;
    let from: Mailbox = smtp.from.parse().map_err(|_| {
        RxScanError::InvalidConfig(format!("invalid SMTP sender address '{}'", smtp.from))
    })?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(REMINDER_SUBJECT)
        .body(format_reminder(drug, dosage, time))
        .map_err(|e| RxScanError::ReminderFailed {
            detail: format!("message build failed: {e}"),
        })?;

    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
        .map_err(|e| RxScanError::ReminderFailed {
            detail: format!("relay setup failed: {e}"),
        })?
        .port(smtp.port)
        .credentials(Credentials::new(
            smtp.username.clone(),
            smtp.password.clone(),
        ))
        .build();

    mailer
        .send(message)
        .await
        .map_err(|e| RxScanError::ReminderFailed {
            detail: e.to_string(),
        })?;

    info!("Reminder sent to {recipient} for {drug}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "reminders@example.com".into(),
            password: "app-token".into(),
            from: "reminders@example.com".into(),
        }
    }

    #[test]
    fn reminder_body_format() {
        assert_eq!(
            format_reminder("Ibuprofen", "400mg", "08:00"),
            "Reminder: Take 400mg of Ibuprofen at 08:00"
        );
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected_before_any_network() {
        let err = send_reminder(&smtp(), "not-an-address", "Ibuprofen", "400mg", "08:00")
            .await
            .unwrap_err();
        assert!(matches!(err, RxScanError::InvalidRecipient { .. }));
    }

    #[tokio::test]
    async fn invalid_sender_is_a_config_error() {
        let mut cfg = smtp();
        cfg.from = "broken sender".into();
        let err = send_reminder(&cfg, "patient@example.com", "Ibuprofen", "400mg", "08:00")
            .await
            .unwrap_err();
        assert!(matches!(err, RxScanError::InvalidConfig(_)));
    }
}
