// apps/storefront/src/services/mailer.rs

//! Outgoing email. Delivery is simulated: `LogMailer` only logs the message.

use crate::errors::Result as AppResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
  pub to: String,
  pub from: String,
  pub subject: String,
  pub body: String,
}

#[derive(Debug, Clone)]
pub struct SentEmailInfo {
  pub message_id: String,
  pub body_preview: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, message: EmailMessage) -> AppResult<SentEmailInfo>;
}

fn preview(body: &str) -> String {
  body.chars().take(50).collect::<String>() + "..."
}

#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
  #[instrument(name = "mailer::send", skip(self, message), fields(to = %message.to, subject = %message.subject))]
  async fn send(&self, message: EmailMessage) -> AppResult<SentEmailInfo> {
    let message_id = format!("log_email_{}", Uuid::new_v4());
    info!(from = %message.from, %message_id, body = %message.body, "Email dispatched to log.");
    Ok(SentEmailInfo {
      message_id,
      body_preview: preview(&message.body),
    })
  }
}

/// Keeps every message in memory; used by tests to read activation links.
#[derive(Debug, Default)]
pub struct RecordingMailer {
  outbox: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn sent(&self) -> Vec<EmailMessage> {
    self.outbox.lock().clone()
  }

  pub fn sent_to(&self, to: &str) -> Vec<EmailMessage> {
    self.outbox.lock().iter().filter(|m| m.to == to).cloned().collect()
  }
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, message: EmailMessage) -> AppResult<SentEmailInfo> {
    let info = SentEmailInfo {
      message_id: format!("recorded_email_{}", Uuid::new_v4()),
      body_preview: preview(&message.body),
    };
    self.outbox.lock().push(message);
    Ok(info)
  }
}
