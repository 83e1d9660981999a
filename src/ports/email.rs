use std::path::Path;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport as LettreSmtpTransport, Transport};
use tracing::warn;

use crate::config::{ResendConfig, SmtpConfig};
use crate::error::{AppError, Result};

/// A rendered outbound email; `attachment` carries (filename, bytes).
pub struct OutboundEmail {
    pub to: Vec<String>,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<(String, Vec<u8>)>,
}

/// Email transport, abstracted: SMTP and Resend.com HTTP API are the two
/// providers this agent supports, selected in `notifications.provider`.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<()>;
}

#[derive(Clone)]
pub struct SmtpEmailTransport {
    config: SmtpConfig,
}

impl SmtpEmailTransport {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EmailTransport for SmtpEmailTransport {
    async fn send(&self, email: OutboundEmail) -> Result<()> {
        if self.config.host.is_empty() {
            return Err(AppError::Configuration("smtp.host is empty".to_string()));
        }

        let mut builder = Message::builder()
            .from(email.from.parse().map_err(|e| AppError::Configuration(format!("invalid from address: {e}")))?)
            .subject(email.subject);
        for to in &email.to {
            builder = builder.to(to
                .parse()
                .map_err(|e| AppError::Validation(format!("invalid recipient '{to}': {e}")))?);
        }

        let message = if let Some((name, bytes)) = email.attachment {
            let attachment = Attachment::new(name).body(bytes, ContentType::parse("application/pdf").unwrap());
            builder
                .multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(email.body))
                        .singlepart(attachment),
                )
                .map_err(|e| AppError::Internal(e.to_string()))?
        } else {
            builder.body(email.body).map_err(|e| AppError::Internal(e.to_string()))?
        };

        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let mut transport = LettreSmtpTransport::relay(&config.host)
                .map_err(|e| AppError::Configuration(format!("invalid smtp host: {e}")))?;
            if !config.user.is_empty() {
                transport = transport.credentials(Credentials::new(config.user.clone(), config.password.clone()));
            }
            if !config.use_tls {
                transport = transport.port(config.port);
            }
            transport
                .build()
                .send(&message)
                .map_err(|e| AppError::Internal(format!("failed to send email: {e}")))
        })
        .await
        .map_err(|e| AppError::Internal(format!("smtp task join error: {e}")))??;

        Ok(())
    }
}

#[derive(Clone)]
pub struct ResendEmailTransport {
    config: ResendConfig,
    client: reqwest::Client,
}

impl ResendEmailTransport {
    pub fn new(config: ResendConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl EmailTransport for ResendEmailTransport {
    async fn send(&self, email: OutboundEmail) -> Result<()> {
        if self.config.api_key.is_empty() {
            return Err(AppError::Configuration("resend.api_key is empty".to_string()));
        }

        let mut payload = serde_json::json!({
            "from": email.from,
            "to": email.to,
            "subject": email.subject,
            "text": email.body,
        });
        if let Some((name, bytes)) = &email.attachment {
            payload["attachments"] = serde_json::json!([{
                "content": Base64::encode_string(bytes),
                "filename": name,
            }]);
        }

        let resp = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "resend API returned non-success status");
        }
        Ok(())
    }
}

pub fn build_email_transport(provider: &str, smtp: &SmtpConfig, resend: &ResendConfig) -> Box<dyn EmailTransport> {
    match provider {
        "resend" => Box::new(ResendEmailTransport::new(resend.clone())),
        _ => Box::new(SmtpEmailTransport::new(smtp.clone())),
    }
}

pub fn attachment_exists(path: &str) -> bool {
    Path::new(path).exists()
}
