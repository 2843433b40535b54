//! Run notifications
//!
//! Pushes a title/content pair to a notification endpoint. The endpoint takes
//! a form-encoded POST (or the same fields as a GET query) and answers with
//! `{"error_code": 0, "error_message": "..."}`.

use crate::error::NotifyError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Endpoint reply
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyResponse {
    /// 0 on success
    pub error_code: i64,
    /// Human-readable reason, if any
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Client for the push endpoint
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    endpoint: String,
}

impl Notifier {
    /// Create a notifier for `endpoint`
    pub fn new<S: Into<String>>(endpoint: S, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Send a notification, falling back to GET if the POST gets no usable reply
    #[instrument(skip(self, content))]
    pub async fn notify(&self, title: &str, content: &str) -> Result<(), NotifyError> {
        let form = [("title", title), ("content", content)];

        let response = match self.post(&form).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Notification POST failed ({}), retrying as GET", e);
                self.get(&form).await?
            }
        };

        check(response)
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<NotifyResponse, NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        read_response(response).await
    }

    async fn get(&self, form: &[(&str, &str)]) -> Result<NotifyResponse, NotifyError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(form)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        read_response(response).await
    }
}

async fn read_response(response: reqwest::Response) -> Result<NotifyResponse, NotifyError> {
    let status = response.status();
    if !status.is_success() {
        return Err(NotifyError::Transport(format!("HTTP {}", status.as_u16())));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| NotifyError::Transport(e.to_string()))?;
    debug!("Notification endpoint replied with {} bytes", body.len());

    serde_json::from_slice(&body).map_err(|e| NotifyError::InvalidResponse(e.to_string()))
}

fn check(response: NotifyResponse) -> Result<(), NotifyError> {
    if response.error_code == 0 {
        info!("Notification delivered");
        Ok(())
    } else {
        Err(NotifyError::Rejected {
            code: response.error_code,
            message: response.error_message.unwrap_or_default(),
        })
    }
}
