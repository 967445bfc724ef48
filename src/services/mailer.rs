use serde_json::{json, Value};

use crate::config::EmailConfig;

/// Lightweight client for the HTTP mail API (Resend-compatible shape).
/// Transport failures never cross this boundary: `send` reports a boolean
/// so workflows can log and move on without unwinding.
#[derive(Clone)]
pub struct Mailer {
    api_url: String,
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl Mailer {
    /// Returns `None` when no API key is configured; callers then treat
    /// every send as a logged no-op failure.
    pub fn new(config: &EmailConfig) -> Option<Self> {
        if config.api_key.is_empty() {
            return None;
        }
        Some(Self {
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            client: reqwest::Client::new(),
        })
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> bool {
        let url = format!("{}/emails", self.api_url);
        let payload = json!({
            "from": self.from,
            "to": [to],
            "subject": subject,
            "html": html,
        });

        let resp = match self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!("Mail request failed: {e}");
                return false;
            }
        };

        if !resp.status().is_success() {
            let status = resp.status();
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let msg = body["message"].as_str().unwrap_or("Unknown mail error");
            tracing::error!("Mail API error ({status}): {msg}");
            return false;
        }

        tracing::info!("Email sent to {to}");
        true
    }
}
