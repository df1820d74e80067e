use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// The payload most endpoints answer with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
}

/// What `/echo` saw: the method, the raw body text and every header
/// (lower-cased names, last value wins).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

pub fn app() -> Router {
    Router::new()
        .route("/item", get(item))
        .route("/echo", post(echo).put(echo).get(echo).delete(echo))
        .route("/status/{code}", any(status))
        .route("/slow/{millis}", get(slow))
        .route("/garbage", get(garbage))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn item() -> Json<Item> {
    Json(Item {
        name: "ok".to_string(),
    })
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.as_str().to_string(), value)
        })
        .collect();
    tracing::debug!(%method, len = body.len(), "echo");
    Json(Echo {
        method: method.to_string(),
        body: String::from_utf8_lossy(&body).into_owned(),
        headers,
    })
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<Item>), StatusCode> {
    let code = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    let item = Item {
        name: format!("status {}", code.as_u16()),
    };
    Ok((code, Json(item)))
}

async fn slow(Path(millis): Path<u64>) -> Json<Item> {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(Item {
        name: "slow".to_string(),
    })
}

async fn garbage() -> impl IntoResponse {
    (StatusCode::OK, "this is not json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_to_json() {
        let item = Item {
            name: "ok".to_string(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "ok" }));
    }

    #[test]
    fn echo_roundtrips_through_json() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let echo = Echo {
            method: "POST".to_string(),
            body: "{}".to_string(),
            headers,
        };
        let json = serde_json::to_string(&echo).unwrap();
        let back: Echo = serde_json::from_str(&json).unwrap();
        assert_eq!(back.method, "POST");
        assert_eq!(back.body, "{}");
        assert_eq!(back.headers["content-type"], "application/json");
    }

    #[test]
    fn item_rejects_missing_name() {
        let result: Result<Item, _> = serde_json::from_str("{}");
        assert!(result.is_err());
    }
}
