//! Chat endpoints: authenticated send plus relay delivery.

mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;

use optfin::domain::UserId;
use optfin::services::chat_relay::parse_user_id_tag;
use optfin::services::telegram::format_admin_message;
use support::*;

#[tokio::test]
async fn send_requires_a_session() {
    let app = setup_test_app().await;

    let response = send_request(
        &app,
        Method::POST,
        "/api/chat/send",
        None,
        Some(json!({ "message": "hello" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn send_accepts_non_empty_messages_only() {
    let app = setup_test_app().await;
    let user = register_user(&app, "alice", "a long password").await;
    let token = access_token(&user);

    for body in [json!({}), json!({ "message": "" }), json!({ "message": "   " })] {
        let response =
            send_request(&app, Method::POST, "/api/chat/send", Some(token), Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = send_request(
        &app,
        Method::POST,
        "/api/chat/send",
        Some(token),
        Some(json!({ "message": "hello support" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["message"], "Message sent");
}

#[tokio::test]
async fn relay_routes_tagged_replies_to_the_right_user() {
    let app = setup_test_app().await;
    let registered = register_user(&app, "alice", "a long password").await;
    let user_id = UserId::from_string(registered["user"]["id"].as_str().unwrap().to_string());

    let mut replies = app.state.relay.subscribe(&user_id);

    // An admin reply carries the tag line of the message it answers.
    let forwarded = format_admin_message(&user_id, "alice", "my order is stuck");
    let target = parse_user_id_tag(&forwarded).expect("tag parses back");
    assert_eq!(target, user_id);

    assert_eq!(app.state.relay.deliver(&target, "we are on it".into()), 1);
    assert_eq!(replies.recv().await.unwrap(), "we are on it");
}

#[tokio::test]
async fn websocket_route_requires_an_upgrade_handshake() {
    let app = setup_test_app().await;

    // A plain GET without upgrade headers is rejected before any auth logic.
    let response = send_request(&app, Method::GET, "/api/chat/ws", None, None).await;
    assert!(response.status().is_client_error());
}
