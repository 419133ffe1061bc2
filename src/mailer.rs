use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::MailConfig;

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn verification(to: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Confirm your email".into(),
            body: format!(
                "Hi,\n\nplease confirm your email address by opening the link below:\n\n{link}\n\n\
                 If you did not create an account you can ignore this message.\n"
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

/// STARTTLS relay with username/password auth.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(server: &str, cfg: &MailConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
            .with_context(|| format!("smtp relay {}", server))?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();
        Ok(Self {
            transport,
            from: cfg.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.parse().context("parse MAIL_FROM")?)
            .to(mail.to.parse().context("parse recipient")?)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .context("build message")?;
        self.transport.send(message).await.context("smtp send")?;
        Ok(())
    }
}

/// Used when no SMTP server is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        info!(to = %mail.to, subject = %mail.subject, body = %mail.body, "mail not sent: no MAIL_SERVER configured");
        Ok(())
    }
}

pub fn from_config(cfg: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match cfg.server.as_deref() {
        Some(server) => Ok(Arc::new(SmtpMailer::new(server, cfg)?)),
        None => Ok(Arc::new(LogMailer)),
    }
}
