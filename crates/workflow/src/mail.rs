//! Owner notifications.
//!
//! [`SmtpNotifier`] sends plain-text mail over an implicit-TLS SMTP relay.
//! [`LogNotifier`] only logs, for dry runs and deployments without mail.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as MailMessage, Tokio1Executor};
use rxpilot_config::MailConfig;
use rxpilot_core::error::NotifyError;
use rxpilot_core::notify::{Notification, Notifier};
use tracing::{debug, info};

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn from_config(config: &MailConfig) -> Result<Self, NotifyError> {
        let (Some(username), Some(password)) = (&config.username, &config.password) else {
            return Err(NotifyError::NotConfigured(
                "mail.username and mail.password are required".into(),
            ));
        };
        let sender = config.sender().unwrap_or(username);
        let from = parse_mailbox(sender)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| NotifyError::NotConfigured(format!("SMTP relay {}: {e}", config.smtp_host)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .build();

        debug!(host = %config.smtp_host, port = config.smtp_port, "SMTP notifier ready");
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let to = parse_mailbox(&notification.to)?;
        let message = MailMessage::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(|e| NotifyError::DeliveryFailed {
                recipient: notification.to.clone(),
                reason: e.to_string(),
            })?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::DeliveryFailed {
                recipient: notification.to.clone(),
                reason: e.to_string(),
            })?;

        info!(to = %notification.to, subject = %notification.subject, "Notification sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Logs each notification instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            to = %notification.to,
            subject = %notification.subject,
            body = %notification.body,
            "Notification (not delivered)"
        );
        Ok(())
    }
}
