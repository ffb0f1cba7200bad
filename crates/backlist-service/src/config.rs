//! Service configuration.

use std::collections::HashMap;

use backlist_core::{ClassifierConfig, ProductType};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection string. Absent means the service runs in
    /// dry-run mode: webhooks are still acknowledged and audited, nothing
    /// is durably stored.
    pub database_url: Option<String>,

    /// Path of the append-only audit log file.
    pub audit_log_path: String,

    /// Stripe webhook signing secret (`whsec_...`). Unset skips
    /// verification (development mode).
    pub stripe_webhook_secret: Option<String>,

    /// Stripe API key, for fetching checkout line items (optional).
    pub stripe_api_key: Option<String>,

    /// Shared secret for signing/verifying admin session tokens. Admin
    /// endpoints reject every request while this is unset.
    pub session_secret: Option<String>,

    /// Resend API key for order confirmation emails (optional).
    pub resend_api_key: Option<String>,

    /// Sender address for transactional email.
    pub order_from_email: String,

    /// Product classifier configuration (price map and amount buckets).
    pub classifier: ClassifierConfig,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let classifier = ClassifierConfig {
            price_map: parse_price_map(
                &std::env::var("PRODUCT_PRICE_MAP").unwrap_or_default(),
            ),
            audiobook_max_cents: env_i64(
                "AUDIOBOOK_MAX_CENTS",
                backlist_core::classify::DEFAULT_AUDIOBOOK_MAX_CENTS,
            ),
            signed_book_max_cents: env_i64(
                "SIGNED_BOOK_MAX_CENTS",
                backlist_core::classify::DEFAULT_SIGNED_BOOK_MAX_CENTS,
            ),
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: std::env::var("DATABASE_URL").ok(),
            audit_log_path: std::env::var("AUDIT_LOG_PATH")
                .unwrap_or_else(|_| "data/order-audit.log".into()),
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
            stripe_api_key: std::env::var("STRIPE_API_KEY").ok(),
            session_secret: std::env::var("SESSION_SECRET").ok(),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            order_from_email: std::env::var("ORDER_FROM_EMAIL")
                .unwrap_or_else(|_| "orders@backlist.example".into()),
            classifier,
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            audit_log_path: "data/order-audit.log".into(),
            stripe_webhook_secret: None,
            stripe_api_key: None,
            session_secret: None,
            resend_api_key: None,
            order_from_email: "orders@backlist.example".into(),
            classifier: ClassifierConfig::default(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Parse `PRODUCT_PRICE_MAP`, a comma-separated list of
/// `price_id:category` pairs, e.g.
/// `price_1AbC:audiobook,price_2DeF:signed-book,price_3GhI:bundle`.
///
/// Unparseable entries are skipped with a warning; the classifier falls
/// through to its keyword and amount passes for those products.
fn parse_price_map(raw: &str) -> HashMap<String, ProductType> {
    let mut map = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((id, category)) = pair.split_once(':') else {
            tracing::warn!(entry = %pair, "Ignoring malformed PRODUCT_PRICE_MAP entry");
            continue;
        };
        match category.trim().parse::<ProductType>() {
            Ok(product_type) => {
                map.insert(id.trim().to_string(), product_type);
            }
            Err(e) => {
                tracing::warn!(entry = %pair, error = %e, "Ignoring malformed PRODUCT_PRICE_MAP entry");
            }
        }
    }
    map
}
