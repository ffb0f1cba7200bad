//! Application state.

use std::sync::Arc;

use backlist_store::OrderStore;

use crate::audit::AuditLog;
use crate::config::ServiceConfig;
use crate::notify::{EmailSender, ResendClient};
use crate::stripe::StripeClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The durable order store. `None` means the service runs in dry-run
    /// mode: webhooks are acknowledged and audited but nothing persists.
    pub store: Option<Arc<dyn OrderStore>>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Stripe client for line-item lookups (optional).
    pub stripe: Option<Arc<StripeClient>>,

    /// Transactional email dispatcher (optional).
    pub mailer: Option<Arc<dyn EmailSender>>,

    /// The append-only audit log.
    pub audit: AuditLog,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Optional integrations are constructed from configuration; a missing
    /// key disables the integration with a warning rather than failing
    /// startup.
    #[must_use]
    pub fn new(store: Option<Arc<dyn OrderStore>>, config: ServiceConfig) -> Self {
        if store.is_none() {
            tracing::warn!(
                "No durable store configured - running in dry-run mode, \
                 the audit log is the system of record"
            );
        }

        let stripe = config.stripe_api_key.as_ref().and_then(|key| {
            match StripeClient::new(key) {
                Ok(client) => {
                    tracing::info!("Stripe line-item lookups enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create Stripe client");
                    None
                }
            }
        });
        if stripe.is_none() {
            tracing::warn!(
                "Stripe API key not configured - classification will rely on \
                 embedded line items and fallbacks"
            );
        }

        let mailer: Option<Arc<dyn EmailSender>> =
            config.resend_api_key.as_ref().and_then(|key| {
                match ResendClient::new(key, &config.order_from_email) {
                    Ok(client) => {
                        tracing::info!("Resend confirmation emails enabled");
                        Some(Arc::new(client) as Arc<dyn EmailSender>)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to create Resend client");
                        None
                    }
                }
            });
        if mailer.is_none() {
            tracing::warn!("Resend not configured - confirmation emails disabled");
        }

        let audit = AuditLog::new(&config.audit_log_path);

        Self {
            store,
            config,
            stripe,
            mailer,
            audit,
        }
    }

    /// Replace the mailer (tests inject fakes through this).
    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn EmailSender>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Replace the Stripe client (tests point it at a local server).
    #[must_use]
    pub fn with_stripe(mut self, stripe: Arc<StripeClient>) -> Self {
        self.stripe = Some(stripe);
        self
    }
}
