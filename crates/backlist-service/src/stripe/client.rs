//! Minimal Stripe API client.
//!
//! The webhook payload for `checkout.session.completed` does not embed
//! line items, so classification may need one follow-up call per session.
//! Sessions have at most a handful of items; the lookup is a single page.

use std::time::Duration;

use reqwest::Client;

use super::types::{SessionLineItem, StripeErrorResponse, StripeList};

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {error_type}: {message}")]
    Api {
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
    },

    /// Payload (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Webhook signature did not verify.
    #[error("invalid webhook signature")]
    InvalidSignature,
}

/// Stripe API client for checkout line-item lookups.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl StripeClient {
    /// Stripe API base URL.
    const BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Create a new client with the given secret API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, StripeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: Self::BASE_URL.to_string(),
        })
    }

    /// Point the client at a different base URL (test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// List the line items of a checkout session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Stripe rejects it.
    pub async fn list_session_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionLineItem>, StripeError> {
        let response = self
            .client
            .get(format!(
                "{}/checkout/sessions/{session_id}/line_items",
                self.base_url
            ))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err = response.json::<StripeErrorResponse>().await.map_or_else(
                |_| StripeError::Api {
                    error_type: "api_error".into(),
                    message: format!("unexpected status {status}"),
                },
                |body| StripeError::Api {
                    error_type: body.error.error_type,
                    message: body.error.message.unwrap_or_default(),
                },
            );
            return Err(err);
        }

        let list: StripeList<SessionLineItem> = response.json().await?;
        Ok(list.data)
    }
}
