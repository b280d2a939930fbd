//! Read-only exchange and cryptocurrency listings.

mod support;

use axum::http::{Method, StatusCode};

use optfin::domain::{CoinId, ExchangeId};
use optfin::storage::repositories::{NewCryptoCoin, NewExchange};
use support::*;

#[tokio::test]
async fn exchanges_serve_decimals_as_strings() {
    let app = setup_test_app().await;
    let created = app
        .state
        .exchanges
        .create_exchange(NewExchange {
            id: ExchangeId::new(),
            name: "Binance".into(),
            trading_volume: "12345678901.123456789".into(),
            coins_listed: 350,
            rating: "9.9".into(),
        })
        .await
        .unwrap();

    let response = send_request(&app, Method::GET, "/api/exchanges", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json(response).await;
    assert_eq!(listed[0]["name"], "Binance");
    assert_eq!(listed[0]["trading_volume"], "12345678901.123456789");
    assert_eq!(listed[0]["rating"], "9.9");
    assert_eq!(listed[0]["coins_listed"], 350);

    let response = send_request(
        &app,
        Method::GET,
        &format!("/api/exchanges/{}", created.id),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["name"], "Binance");
}

#[tokio::test]
async fn cryptocurrencies_list_and_get() {
    let app = setup_test_app().await;
    let created = app
        .state
        .coins
        .create_coin(NewCryptoCoin {
            id: CoinId::new(),
            name: "Bitcoin".into(),
            pair: "BTC/USDT".into(),
        })
        .await
        .unwrap();

    let response = send_request(&app, Method::GET, "/api/cryptocurrencies", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json(response).await;
    assert_eq!(listed[0]["pair"], "BTC/USDT");

    let response = send_request(
        &app,
        Method::GET,
        &format!("/api/cryptocurrencies/{}", created.id),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["name"], "Bitcoin");
}

#[tokio::test]
async fn missing_listings_are_not_found() {
    let app = setup_test_app().await;

    let response =
        send_request(&app, Method::GET, "/api/exchanges/no-such-id", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response =
        send_request(&app, Method::GET, "/api/cryptocurrencies/no-such-id", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listings_reject_writes() {
    let app = setup_test_app().await;
    let user = register_user(&app, "alice", "a long password").await;

    let response = send_request(
        &app,
        Method::POST,
        "/api/exchanges",
        Some(access_token(&user)),
        Some(serde_json::json!({ "name": "Rogue" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
