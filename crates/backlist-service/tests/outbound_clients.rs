//! Outbound HTTP client tests against a local mock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use backlist_service::notify::{EmailSender, NotifyError};
use backlist_service::stripe::{StripeClient, StripeError};
use backlist_service::ResendClient;

#[tokio::test]
async fn lists_checkout_session_line_items() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/checkout/sessions/cs_test_123/line_items"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {
                    "id": "li_1",
                    "description": "Signed hardcover",
                    "quantity": 1,
                    "amount_total": 3500,
                    "price": { "id": "price_abc", "product": "prod_xyz" }
                }
            ],
            "has_more": false
        })))
        .mount(&server)
        .await;

    let client = StripeClient::new("sk_test_key")
        .unwrap()
        .with_base_url(server.uri());

    let items = client.list_session_line_items("cs_test_123").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].description.as_deref(), Some("Signed hardcover"));
    assert_eq!(
        items[0].price.as_ref().map(|p| p.id.as_str()),
        Some("price_abc")
    );
}

#[tokio::test]
async fn surfaces_stripe_api_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/checkout/sessions/cs_missing/line_items"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "message": "No such checkout session"
            }
        })))
        .mount(&server)
        .await;

    let client = StripeClient::new("sk_test_key")
        .unwrap()
        .with_base_url(server.uri());

    let err = client
        .list_session_line_items("cs_missing")
        .await
        .unwrap_err();
    match err {
        StripeError::Api {
            error_type,
            message,
        } => {
            assert_eq!(error_type, "invalid_request_error");
            assert_eq!(message, "No such checkout session");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn sends_confirmation_email() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_partial_json(json!({
            "from": "orders@test.example",
            "to": ["reader@test.example"],
            "subject": "Your order is confirmed"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_1" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResendClient::new("re_test_key", "orders@test.example")
        .unwrap()
        .with_base_url(server.uri());

    client
        .send(
            "reader@test.example",
            "Your order is confirmed",
            "<p>Thanks!</p>",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn email_api_failure_is_an_error_not_a_panic() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;

    let client = ResendClient::new("re_bad_key", "orders@test.example")
        .unwrap()
        .with_base_url(server.uri());

    let err = client
        .send("reader@test.example", "subject", "<p></p>")
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::Api { status: 422 }));
}
