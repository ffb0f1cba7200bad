//! Order confirmation dispatch.
//!
//! The pipeline only needs a narrow capability: send one transactional
//! email. [`EmailSender`] expresses that boundary so the webhook handler
//! can be tested with a fake; [`ResendClient`] is the production
//! implementation. Dispatch is best-effort - failures are logged by the
//! caller and never fail the ingestion.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Error type for notification dispatch.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The email API rejected the request.
    #[error("email API error: status {status}")]
    Api {
        /// HTTP status returned by the API.
        status: u16,
    },
}

/// Capability to send one transactional email.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send an email.
    ///
    /// # Errors
    ///
    /// Returns an error if dispatch fails; callers treat this as
    /// best-effort and log rather than propagate.
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError>;
}

/// Resend (`resend.com`) transactional email client.
#[derive(Debug, Clone)]
pub struct ResendClient {
    client: Client,
    api_key: String,
    from: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl ResendClient {
    /// Resend API base URL.
    const BASE_URL: &'static str = "https://api.resend.com";

    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            from: from.into(),
            base_url: Self::BASE_URL.to_string(),
        })
    }

    /// Point the client at a different base URL (test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&SendEmailRequest {
                from: &self.from,
                to: [to],
                subject,
                html,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Api {
                status: status.as_u16(),
            })
        }
    }
}
