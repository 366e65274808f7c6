//! Outbound notification mail.
//!
//! Auth flows only build messages; delivery happens on a spawned task and
//! its failure is logged, never returned to the caller.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

use crate::models::auth::Admin;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Mail relay rejected message with status {0}")]
    Rejected(u16),
}

/// An HTML notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Logs recipients and subject. Bodies may hold credentials and are not logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        info!(
            recipients = ?message.recipients,
            subject = %message.subject,
            "mail delivery skipped (no relay configured)"
        );
        Ok(())
    }
}

/// POSTs each message as JSON to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct WebhookMailer {
    client: reqwest::Client,
    endpoint: Url,
}

impl WebhookMailer {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(message)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(MailError::Rejected(resp.status().as_u16()));
        }
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

/// Fire-and-forget delivery.
pub fn dispatch(mailer: Arc<dyn Mailer>, message: MailMessage) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&message).await {
            warn!(error = %e, subject = %message.subject, "mail delivery failed");
        }
    })
}

pub fn verification_message(email: &str, link: &str) -> MailMessage {
    MailMessage {
        recipients: vec![email.to_string()],
        subject: "Activation Link".to_string(),
        html_body: format!(
            "<h1>Welcome to Resultify</h1>\
             <p>Congratulations, you have successfully signed up.</p>\
             <p>Click <a href=\"{link}\">here</a> to verify your account.</p>"
        ),
    }
}

/// Credentials for a newly created administrator.
pub fn admin_credentials_message(admin: &Admin, password: &str) -> MailMessage {
    let title = if admin.role == crate::auth::rbac::ROLE_SUPER_ADMIN {
        "Resultify Super Admin Details"
    } else {
        "Resultify Admin Details"
    };
    MailMessage {
        recipients: vec![admin.email.clone()],
        subject: title.to_string(),
        html_body: format!(
            "<h1>Welcome to Resultify</h1>\
             <p>Here is your admin login info.</p>\
             <p>Name: {} {}</p>\
             <p>Email: {}</p>\
             <p>Password: {password}</p>",
            admin.first_name, admin.last_name, admin.email
        ),
    }
}
