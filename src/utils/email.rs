use anyhow::{anyhow, Context};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

/// SMTP sender for account e-mails. Built once from config and shared through `AppState`.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, anyhow::Error> {
        let from = config
            .from
            .parse::<Mailbox>()
            .context("Invalid SMTP_FROM email address")?;

        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .context("Failed to create SMTP relay")?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self { transport, from })
    }

    pub async fn send_verification_email(
        &self,
        to_email: &str,
        verification_link: &str,
    ) -> Result<(), anyhow::Error> {
        let email = verification_message(self.from.clone(), to_email, verification_link)?;

        self.transport.send(email).await.map_err(|e| {
            tracing::error!(error = %e, to = to_email, "verification email sending failed");
            anyhow!("Failed to send email: {}", e)
        })?;
        Ok(())
    }
}

fn verification_message(
    from: Mailbox,
    to_email: &str,
    verification_link: &str,
) -> Result<Message, anyhow::Error> {
    let to_mailbox = to_email
        .trim()
        .parse::<Mailbox>()
        .context("Invalid recipient email address")?;

    Message::builder()
        .from(from)
        .to(to_mailbox)
        .subject("Notes: Verify your email address")
        .header(ContentType::TEXT_PLAIN)
        .body(format!(
            "Welcome to Notes!\n\nPlease verify your email by opening the link below:\n\n{}\n\nIf you did not sign up, please ignore this email.",
            verification_link
        ))
        .context("Failed to build email message")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_message_carries_link() {
        let from: Mailbox = "Notes <noreply@example.com>".parse().unwrap();
        let message = verification_message(
            from,
            " alice@example.com ",
            "http://localhost:3000/api/v1/users/verify-email/abc",
        )
        .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: alice@example.com"));
        assert!(raw.contains("verify-email/abc"));
    }

    #[test]
    fn bad_recipient_is_rejected() {
        let from: Mailbox = "noreply@example.com".parse().unwrap();
        assert!(verification_message(from, "not an address", "link").is_err());
    }
}
