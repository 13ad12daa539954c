// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound SMS.
//!
//! Messages are addressed by template id plus positional parameters. The
//! Twilio sender renders templates locally since its Messages API takes a
//! plain body.

use crate::config::TwilioConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const LOGIN_CODE_TEMPLATE: &str = "login_code";

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("unknown SMS template: {0}")]
    UnknownTemplate(String),

    #[error("SMS gateway request failed: {0}")]
    Transport(String),

    #[error("SMS gateway rejected message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, template_id: &str, params: &[String], phone: &str)
        -> Result<(), SmsError>;
}

/// Substitute `{1}`, `{2}`, ... with the matching parameter.
pub fn render_template(template: &str, params: &[String]) -> String {
    params
        .iter()
        .enumerate()
        .fold(template.to_string(), |body, (i, value)| {
            body.replace(&format!("{{{}}}", i + 1), value)
        })
}

/// E.164 form of a phone number. Bare numbers are mainland China
/// mobiles (the only format sign-in accepts).
pub fn to_e164(phone: &str) -> String {
    if phone.starts_with('+') {
        phone.to_string()
    } else {
        format!("+86{phone}")
    }
}

fn default_templates() -> HashMap<String, String> {
    HashMap::from([(
        LOGIN_CODE_TEMPLATE.to_string(),
        "Your SwingTrack verification code is {1}. It expires in {2} minutes.".to_string(),
    )])
}

/// Twilio Messages API client.
#[derive(Clone)]
pub struct TwilioSmsSender {
    http: reqwest::Client,
    base_url: String,
    config: TwilioConfig,
    templates: HashMap<String, String>,
}

impl TwilioSmsSender {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.twilio.com/2010-04-01".to_string(),
            config,
            templates: default_templates(),
        }
    }

    fn render(&self, template_id: &str, params: &[String]) -> Result<String, SmsError> {
        self.templates
            .get(template_id)
            .map(|t| render_template(t, params))
            .ok_or_else(|| SmsError::UnknownTemplate(template_id.to_string()))
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    async fn send(
        &self,
        template_id: &str,
        params: &[String],
        phone: &str,
    ) -> Result<(), SmsError> {
        let body = self.render(template_id, params)?;
        let to = to_e164(phone);
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to.as_str()),
                ("From", self.config.from_number.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SmsError::Transport(e.to_string()))?;

        if response.status().is_success() {
            tracing::debug!(template_id, "SMS accepted by gateway");
            return Ok(());
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(SmsError::Rejected { status, body })
    }
}

/// A message captured by [`MemorySmsSender`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentSms {
    pub template_id: String,
    pub params: Vec<String>,
    pub phone: String,
}

/// Records messages instead of delivering them.
#[derive(Clone, Default)]
pub struct MemorySmsSender {
    sent: Arc<Mutex<Vec<SentSms>>>,
    fail: bool,
}

impl MemorySmsSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentSms> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Most recent code parameter sent to `phone`.
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.phone == phone)
            .and_then(|m| m.params.into_iter().next())
    }
}

#[async_trait]
impl SmsSender for MemorySmsSender {
    async fn send(
        &self,
        template_id: &str,
        params: &[String],
        phone: &str,
    ) -> Result<(), SmsError> {
        if self.fail {
            return Err(SmsError::Transport("delivery disabled".to_string()));
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentSms {
                template_id: template_id.to_string(),
                params: params.to_vec(),
                phone: phone.to_string(),
            });
        }
        tracing::info!(template_id, "SMS recorded (not delivered)");
        Ok(())
    }
}
