use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tokio::sync::Mutex;

use crate::{
    config::MailConfig,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutgoingMail {
    pub fn registration_otp(to: &str, otp: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Verify Your Email - OTP for E-commerce".to_string(),
            html: format!(
                "<p>Your OTP for email verification is: <strong>{otp}</strong></p>\
                 <p>This OTP is valid for 15 minutes.</p>"
            ),
        }
    }

    pub fn password_reset_otp(to: &str, otp: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Password Reset OTP for E-commerce".to_string(),
            html: format!(
                "<p>Your OTP for password reset is: <strong>{otp}</strong></p>\
                 <p>This OTP is valid for 10 minutes.</p>"
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> AppResult<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let transport = if config.username.is_empty() {
            // Local catchers (Mailpit/Mailhog) take plain SMTP without auth.
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build()
        } else {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
                .credentials(creds)
                .port(config.port)
                .build()
        };
        let from: Mailbox = config.from.parse()?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> AppResult<()> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|_| AppError::bad_request("Invalid email address"))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .map_err(|e| AppError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        tracing::info!(to = %mail.to, subject = %mail.subject, "email sent");
        Ok(())
    }
}

/// Captures mail instead of delivering it.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }

    pub async fn last_to(&self, to: &str) -> Option<OutgoingMail> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> AppResult<()> {
        tracing::debug!(to = %mail.to, subject = %mail.subject, "email captured");
        self.sent.lock().await.push(mail);
        Ok(())
    }
}

/// Pull the six-digit code out of an OTP email body.
pub fn extract_otp(mail: &OutgoingMail) -> Option<String> {
    let start = mail.html.find("<strong>")? + "<strong>".len();
    let end = mail.html[start..].find("</strong>")? + start;
    Some(mail.html[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_mailer_captures_messages() {
        let mailer = MemoryMailer::new();
        mailer
            .send(OutgoingMail::registration_otp("jane@example.com", "123456"))
            .await
            .unwrap();

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jane@example.com");
        assert!(mailer.last_to("other@example.com").await.is_none());
    }

    #[test]
    fn otp_is_embedded_in_body() {
        let mail = OutgoingMail::password_reset_otp("jane@example.com", "004211");
        assert_eq!(extract_otp(&mail).as_deref(), Some("004211"));
        assert!(mail.html.contains("10 minutes"));
    }
}
