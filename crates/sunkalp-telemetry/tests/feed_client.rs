//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Feed client tests against a local HTTP fixture."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use sunkalp_telemetry::{FeedSource, TelemetryError, ThingSpeakClient};
use tokio::net::TcpListener;
use url::Url;

async fn feeds(
    Path(channel): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("api_key").map(String::as_str) != Some("READKEY") {
        return (StatusCode::BAD_REQUEST, "-1").into_response();
    }
    match channel.as_str() {
        "123456" => {
            assert_eq!(params.get("results").map(String::as_str), Some("15"));
            Json(json!({
                "channel": { "id": 123456, "name": "Microgrid", "last_entry_id": 2 },
                "feeds": [
                    {
                        "created_at": "2023-10-27T10:00:00Z",
                        "entry_id": 1,
                        "field1": "230.5",
                        "field2": "99.9",
                        "field3": "45",
                        "field4": "100",
                        "field5": "25"
                    },
                    {
                        "created_at": "2023-10-27T10:00:15Z",
                        "entry_id": 2,
                        "field1": "231",
                        "field2": null,
                        "field3": "18",
                        "field5": "56"
                    }
                ]
            }))
            .into_response()
        }
        "no-feeds" => Json(json!({ "channel": { "id": 1 } })).into_response(),
        _ => (StatusCode::OK, "not json").into_response(),
    }
}

async fn spawn_fixture() -> SocketAddr {
    let router = Router::new().route("/channels/:channel/feeds.json", get(feeds));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> ThingSpeakClient {
    ThingSpeakClient::new(Url::parse(&format!("http://{addr}")).unwrap(), 15, None).unwrap()
}

#[tokio::test]
async fn fetches_and_normalizes_window() {
    let addr = spawn_fixture().await;
    let readings = client(addr).fetch_window("123456", "READKEY").await.unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].voltage, 230.5);
    assert_eq!(readings[0].current, 99.9);
    let latest = &readings[1];
    assert_eq!(latest.current, 0.0);
    assert_eq!(latest.load_power, 0.0);
    assert_eq!(latest.state_of_charge, 18.0);
    assert_eq!(latest.temperature, 56.0);
}

#[tokio::test]
async fn rejected_key_is_http_error() {
    let addr = spawn_fixture().await;
    let err = client(addr)
        .fetch_window("123456", "WRONG")
        .await
        .expect_err("bad key must fail");
    assert!(matches!(err, TelemetryError::Http(_)), "{err:?}");
}

#[tokio::test]
async fn absent_feed_list_is_reported() {
    let addr = spawn_fixture().await;
    let err = client(addr)
        .fetch_window("no-feeds", "READKEY")
        .await
        .expect_err("missing feeds must fail");
    assert!(matches!(err, TelemetryError::MissingFeeds));
}

#[tokio::test]
async fn malformed_body_is_reported() {
    let addr = spawn_fixture().await;
    let err = client(addr)
        .fetch_window("garbage", "READKEY")
        .await
        .expect_err("non-json body must fail");
    assert!(matches!(err, TelemetryError::Malformed(_)));
}

#[tokio::test]
async fn unreachable_host_is_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = client(addr)
        .fetch_window("123456", "READKEY")
        .await
        .expect_err("closed port must fail");
    assert!(matches!(err, TelemetryError::Http(_)));
}
