//! Transactional mail through the SendGrid v3 API.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::Serialize;

use crate::config::EmailSettings;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
  #[error("Mail API key is not configured")]
  MissingApiKey,
  #[error("Mail provider returned HTTP {status}: {body}")]
  Upstream { status: u16, body: String },
  #[error("Mail request failed: {0}")]
  Transport(#[from] reqwest::Error),
}

/// A support request from a signed-in user
#[derive(Debug, Clone)]
pub struct SupportMessage {
  pub reply_to: String,
  pub subject: String,
  pub text: String,
}

#[derive(Serialize)]
struct Address<'a> {
  email: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
  to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
  #[serde(rename = "type")]
  kind: &'a str,
  value: &'a str,
}

#[derive(Serialize)]
struct SendRequest<'a> {
  personalizations: Vec<Personalization<'a>>,
  from: Address<'a>,
  #[serde(skip_serializing_if = "Option::is_none")]
  reply_to: Option<Address<'a>>,
  subject: &'a str,
  content: Vec<Content<'a>>,
}

#[derive(Clone)]
pub struct Mailer {
  client: reqwest::Client,
  api_key: Option<String>,
  base_url: String,
  support_address: String,
}

impl Mailer {
  pub fn new(settings: &EmailSettings) -> Self {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .unwrap_or_default();
    Self {
      client,
      api_key: settings.api_key.clone(),
      base_url: settings.base_url.trim_end_matches('/').to_string(),
      support_address: settings.support_address.clone(),
    }
  }

  /// Deliver a support message to the support inbox, sent from that same
  /// address with the user's e-mail as reply-to.
  pub async fn send_support(&self, message: &SupportMessage) -> Result<(), MailError> {
    let api_key = self.api_key.as_deref().ok_or(MailError::MissingApiKey)?;
    let body = support_request(&self.support_address, message);

    let res = self
      .client
      .post(format!("{}/mail/send", self.base_url))
      .header(AUTHORIZATION, format!("Bearer {}", api_key))
      .json(&body)
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      return Err(MailError::Upstream { status, body });
    }

    tracing::info!(subject = %message.subject, "Support email sent");
    Ok(())
  }
}

fn support_request<'a>(support_address: &'a str, message: &'a SupportMessage) -> SendRequest<'a> {
  let reply_to = message.reply_to.trim();
  SendRequest {
    personalizations: vec![Personalization {
      to: vec![Address { email: support_address }],
    }],
    from: Address { email: support_address },
    reply_to: (!reply_to.is_empty()).then_some(Address { email: reply_to }),
    subject: &message.subject,
    content: vec![Content {
      kind: "text/plain",
      value: &message.text,
    }],
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn message(reply_to: &str) -> SupportMessage {
    SupportMessage {
      reply_to: reply_to.into(),
      subject: "Broken hint".into(),
      text: "The hint for today is empty".into(),
    }
  }

  #[test]
  fn test_support_request_shape() {
    let msg = message("student@example.com");
    let value = serde_json::to_value(support_request("support@example.org", &msg)).unwrap();
    assert_eq!(
      value,
      json!({
        "personalizations": [{"to": [{"email": "support@example.org"}]}],
        "from": {"email": "support@example.org"},
        "reply_to": {"email": "student@example.com"},
        "subject": "Broken hint",
        "content": [{"type": "text/plain", "value": "The hint for today is empty"}]
      })
    );
  }

  #[test]
  fn test_blank_reply_to_omitted() {
    let msg = message("  ");
    let value = serde_json::to_value(support_request("support@example.org", &msg)).unwrap();
    assert!(value.get("reply_to").is_none());
  }

  #[tokio::test]
  async fn test_missing_api_key() {
    let mailer = Mailer::new(&EmailSettings {
      api_key: None,
      base_url: "http://127.0.0.1:9".into(),
      support_address: "support@example.org".into(),
    });
    let err = mailer.send_support(&message("a@b.c")).await.unwrap_err();
    assert!(matches!(err, MailError::MissingApiKey));
  }
}
