//! Common test utilities for backlist integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use backlist_service::crypto::hmac_sha256_hex;
use backlist_service::notify::{EmailSender, NotifyError};
use backlist_service::{
    create_router, sign_session_token, AppState, ServiceConfig, SessionClaims,
};
use backlist_store::{MemoryStore, OrderStore};

/// Webhook signing secret used across the integration tests.
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Session signing secret used across the integration tests.
pub const SESSION_SECRET: &str = "session-test-secret";

/// CSRF nonce embedded in test admin tokens.
pub const CSRF_NONCE: &str = "csrf-nonce-42";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory holding the audit log (kept alive for the test).
    pub _temp_dir: TempDir,
    /// Path of the audit log file inside the temp directory.
    pub audit_path: std::path::PathBuf,
    /// The in-memory order store, for direct assertions.
    pub store: Arc<MemoryStore>,
    /// Emails captured by the fake mailer, `(to, subject)` pairs.
    pub sent_emails: Arc<Mutex<Vec<(String, String)>>>,
}

impl TestHarness {
    /// Create a harness with an in-memory store (normal operation).
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Create a harness with no store at all (dry-run deployment).
    pub fn dry_run() -> Self {
        Self::build(false)
    }

    fn build(with_store: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let audit_path = temp_dir.path().join("order-audit.log");

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            database_url: None,
            audit_log_path: audit_path.to_string_lossy().to_string(),
            stripe_webhook_secret: Some(WEBHOOK_SECRET.into()),
            stripe_api_key: None,
            session_secret: Some(SESSION_SECRET.into()),
            resend_api_key: None,
            order_from_email: "orders@test.example".into(),
            classifier: backlist_core::ClassifierConfig::default(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        };

        let store = Arc::new(MemoryStore::new());
        let state_store: Option<Arc<dyn OrderStore>> = if with_store {
            Some(store.clone())
        } else {
            None
        };

        let sent_emails = Arc::new(Mutex::new(Vec::new()));
        let mailer = Arc::new(RecordingMailer {
            sent: sent_emails.clone(),
        });

        let state = AppState::new(state_store, config).with_mailer(mailer);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
            audit_path,
            store,
            sent_emails,
        }
    }

    /// Mint an admin session token carrying the standard test CSRF nonce.
    pub fn admin_token(&self) -> String {
        sign_session_token(
            SESSION_SECRET,
            &SessionClaims {
                scope: "admin".into(),
                exp: Some(chrono::Utc::now().timestamp() + 3600),
                csrf: Some(CSRF_NONCE.into()),
                sub: Some("tester".into()),
            },
        )
    }

    /// Mint a token with custom claims (for rejection-path tests).
    pub fn token_with(&self, claims: &SessionClaims) -> String {
        sign_session_token(SESSION_SECRET, claims)
    }

    /// Bearer authorization header value for the standard admin token.
    pub fn admin_auth_header(&self) -> String {
        format!("Bearer {}", self.admin_token())
    }

    /// Read the audit log back as parsed JSON lines.
    pub fn audit_entries(&self) -> Vec<Value> {
        let Ok(contents) = std::fs::read_to_string(&self.audit_path) else {
            return Vec::new();
        };
        contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).expect("audit line is JSON"))
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a `Stripe-Signature` header value for `payload`.
pub fn stripe_signature(payload: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let signed = format!("{timestamp}.{payload}");
    let signature = hmac_sha256_hex(WEBHOOK_SECRET, signed.as_bytes());
    format!("t={timestamp},v1={signature}")
}

/// A `checkout.session.completed` event body.
///
/// `amount_cents` drives classification when no line items or metadata
/// hint at the product; `shipping` controls fulfillment status.
pub fn checkout_event(session_id: &str, amount_cents: i64, shipping: bool) -> Value {
    let mut object = json!({
        "id": session_id,
        "object": "checkout.session",
        "amount_total": amount_cents,
        "currency": "usd",
        "payment_status": "paid",
        "customer_details": {
            "email": "reader@test.example",
            "name": "Test Reader"
        },
        "metadata": {}
    });
    if shipping {
        object["shipping_details"] = json!({
            "address": { "line1": "1 Test St", "country": "US" }
        });
    }

    json!({
        "id": format!("evt_{session_id}"),
        "object": "event",
        "type": "checkout.session.completed",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": object }
    })
}

/// Fake mailer that records every send.
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("mailer mutex")
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}
