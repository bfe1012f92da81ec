use crate::config::toml_config::SmtpConfig;
use crate::core::quota::QuotaCounter;
use crate::domain::model::{CampaignResult, OutreachMessage};
use crate::domain::ports::Mailer;
use crate::utils::error::{OutreachError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

pub const CREDENTIALS_MISSING: &str = "Gmail credentials not found. Set GMAIL_EMAIL and \
GMAIL_APP_PASSWORD in .env (or smtp.username / smtp.password in the config file)";

/// STARTTLS SMTP delivery with login, one text/plain message per prospect.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    configured: bool,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);
        if config.has_credentials() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let from_address = config.from_address().trim();
        let from = if from_address.is_empty() {
            // 沒有帳號時不會寄出，給一個佔位位址
            Mailbox::new(None, Address::new("unconfigured", "localhost")?)
        } else {
            let name = Some(config.sender_name.trim().to_string()).filter(|n| !n.is_empty());
            Mailbox::new(name, from_address.parse::<Address>()?)
        };

        Ok(Self {
            transport: builder.build(),
            from,
            configured: config.has_credentials(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn deliver(&self, message: &OutreachMessage) -> Result<()> {
        let to = Mailbox::new(
            Some(message.prospect.name.clone()),
            message.prospect.email.parse::<Address>()?,
        );

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject_line.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.message_body.clone())?;

        self.transport.send(email).await?;
        Ok(())
    }
}

/// Logs instead of sending. Used by `--dry-run`.
#[derive(Debug, Default)]
pub struct DryRunMailer;

#[async_trait]
impl Mailer for DryRunMailer {
    async fn deliver(&self, message: &OutreachMessage) -> Result<()> {
        tracing::info!(
            "📝 [dry-run] Would send '{}' to {}",
            message.subject_line,
            message.prospect.email
        );
        tracing::debug!("[dry-run] Body:\n{}", message.message_body);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Sent(CampaignResult),
    Failed(CampaignResult),
    /// The daily ceiling was hit. The caller should stop taking prospects.
    QuotaExhausted(CampaignResult),
}

impl SendOutcome {
    pub fn into_result(self) -> CampaignResult {
        match self {
            Self::Sent(r) | Self::Failed(r) | Self::QuotaExhausted(r) => r,
        }
    }
}

/// Quota-guarded delivery. The counter only moves on confirmed success.
pub struct EmailSender {
    mailer: Arc<dyn Mailer>,
    quota: Arc<QuotaCounter>,
}

impl EmailSender {
    pub fn new(mailer: Arc<dyn Mailer>, quota: Arc<QuotaCounter>) -> Self {
        Self { mailer, quota }
    }

    pub fn quota(&self) -> &Arc<QuotaCounter> {
        &self.quota
    }

    pub async fn send(&self, message: &OutreachMessage) -> SendOutcome {
        let prospect = message.prospect.clone();

        if !self.quota.can_send().await {
            let err = OutreachError::QuotaExhausted {
                limit: self.quota.limit(),
            };
            tracing::warn!("⚠️ {}", err);
            return SendOutcome::QuotaExhausted(CampaignResult::failed(
                prospect,
                Some(message.clone()),
                err.to_string(),
            ));
        }

        if !self.mailer.is_configured() {
            tracing::error!("❌ {}", CREDENTIALS_MISSING);
            return SendOutcome::Failed(CampaignResult::failed(
                prospect,
                Some(message.clone()),
                CREDENTIALS_MISSING,
            ));
        }

        match self
            .quota
            .send_within_quota(|| self.mailer.deliver(message))
            .await
        {
            Ok(()) => {
                tracing::info!("📧 Email sent to {}", prospect.email);
                SendOutcome::Sent(CampaignResult {
                    prospect,
                    message: Some(message.clone()),
                    sent: true,
                    sent_at: Some(chrono::Local::now().to_rfc3339()),
                    error: None,
                })
            }
            Err(err @ OutreachError::QuotaExhausted { .. }) => {
                tracing::warn!("⚠️ {}", err);
                SendOutcome::QuotaExhausted(CampaignResult::failed(
                    prospect,
                    Some(message.clone()),
                    err.to_string(),
                ))
            }
            Err(err) => {
                tracing::error!("❌ Failed to send to {}: {}", prospect.email, err);
                SendOutcome::Failed(CampaignResult::failed(
                    prospect,
                    Some(message.clone()),
                    err.to_string(),
                ))
            }
        }
    }
}
