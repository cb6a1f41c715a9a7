use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use common::{
    Credentials, Error, ExchangeClient, OrderConfirmation, OrderRequest, OrderSide, Result,
};

const ORDERS_PATH: &str = "/orders";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for the Coinbase Exchange API. Used for ticker reads and
/// market order placement.
pub struct CoinbaseClient {
    base_url: String,
    credentials: Option<Credentials>,
    http: Client,
}

impl CoinbaseClient {
    /// Client able to sign and submit orders.
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        Self::build(base_url.into(), Some(credentials))
    }

    /// Ticker-only client. Order submission fails with a configuration error.
    pub fn public(base_url: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into(), None)
    }

    fn build(base_url: String, credentials: Option<Credentials>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .user_agent(concat!("victorybot/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            http,
        })
    }

    /// Seconds since epoch with millisecond precision, fresh per request.
    fn timestamp() -> String {
        let now = Utc::now();
        format!("{}.{:03}", now.timestamp(), now.timestamp_subsec_millis())
    }

    async fn signed_post(&self, path: &str, body: String) -> Result<String> {
        let creds = self.credentials.as_ref().ok_or_else(|| {
            Error::Config("exchange credentials are required to place orders".to_string())
        })?;

        let ts = Self::timestamp();
        let signature = sign(&creds.secret, &ts, "POST", path, &body);
        let url = format!("{}{path}", self.base_url);

        let resp = self
            .http
            .post(&url)
            .header("CB-ACCESS-KEY", &creds.api_key)
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", ts)
            .header("CB-ACCESS-PASSPHRASE", &creds.passphrase)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::OrderRejected {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

/// Request signature: HMAC-SHA256 over `timestamp + method + path + body`
/// keyed by the secret, then SHA-256 over the MAC bytes, hex-encoded.
pub fn sign(secret: &str, timestamp: &str, method: &str, path: &str, body: &str) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(path.as_bytes());
    mac.update(body.as_bytes());
    let digest = Sha256::digest(mac.finalize().into_bytes());
    hex::encode(digest)
}

#[async_trait]
impl ExchangeClient for CoinbaseClient {
    async fn current_price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/products/{symbol}/ticker", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }

        let ticker: Ticker = serde_json::from_str(&body)
            .map_err(|e| Error::Exchange(format!("malformed ticker payload: {e}")))?;
        let price = ticker.price.parse::<f64>().map_err(|e| {
            Error::Exchange(format!("malformed ticker price '{}': {e}", ticker.price))
        })?;

        if !(price.is_finite() && price > 0.0) {
            return Err(Error::Exchange(format!("invalid ticker price: {price}")));
        }
        Ok(price)
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation> {
        let body = serde_json::to_string(&OrderBody {
            order_type: "market",
            side: order.side,
            product_id: &order.symbol,
            size: order.size,
            client_oid: &order.client_oid,
        })?;

        debug!(
            symbol = %order.symbol,
            side = %order.side,
            size = order.size,
            "Submitting order to Coinbase"
        );
        let text = self.signed_post(ORDERS_PATH, body).await?;

        let resp: OrderResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Exchange(format!("malformed order confirmation: {e}")))?;

        Ok(OrderConfirmation {
            order_id: resp.id,
            symbol: order.symbol.clone(),
            side: order.side,
            size: order.size,
            status: resp.status.unwrap_or_else(|| "unknown".to_string()),
            fill_price: None,
            created_at: Utc::now(),
        })
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct OrderBody<'a> {
    #[serde(rename = "type")]
    order_type: &'static str,
    side: OrderSide,
    product_id: &'a str,
    size: f64,
    client_oid: &'a str,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct Ticker {
    price: String,
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured {
        order: Arc<Mutex<Option<(HeaderMap, String)>>>,
    }

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn creds() -> Credentials {
        Credentials::new("key-1", "shh", "pass-1").unwrap()
    }

    async fn accept_order(
        State(captured): State<Captured>,
        headers: HeaderMap,
        body: String,
    ) -> Json<Value> {
        *captured.order.lock().unwrap() = Some((headers, body));
        Json(json!({ "id": "ord-42", "status": "pending", "side": "sell" }))
    }

    #[test]
    fn signature_is_sha256_of_hmac_hex_encoded() {
        let sig = sign("shh", "1700000000.123", "POST", "/orders", "{}");

        let mut mac = Hmac::<Sha256>::new_from_slice(b"shh").unwrap();
        mac.update(b"1700000000.123POST/orders{}");
        let expected = hex::encode(Sha256::digest(mac.finalize().into_bytes()));

        assert_eq!(sig, expected);
        assert_eq!(sig.len(), 64);
        assert_ne!(sig, sign("shh", "1700000000.124", "POST", "/orders", "{}"));
        assert_ne!(sig, sign("other", "1700000000.123", "POST", "/orders", "{}"));
    }

    #[test]
    fn timestamp_is_fractional_epoch_seconds() {
        let ts = CoinbaseClient::timestamp();
        let secs: f64 = ts.parse().unwrap();
        assert!((secs - Utc::now().timestamp() as f64).abs() < 5.0);
        assert_eq!(ts.split('.').nth(1).map(str::len), Some(3));
    }

    #[tokio::test]
    async fn current_price_parses_ticker() {
        let app = Router::new().route(
            "/products/BTC-USD/ticker",
            get(|| async { Json(json!({ "price": "101.25", "size": "0.1" })) }),
        );
        let addr = serve(app).await;

        let client = CoinbaseClient::public(format!("http://{addr}/")).unwrap();
        let price = client.current_price("BTC-USD").await.unwrap();
        assert_eq!(price, 101.25);
    }

    #[tokio::test]
    async fn current_price_maps_http_failure_to_exchange_error() {
        let app = Router::new().route(
            "/products/BTC-USD/ticker",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
        let addr = serve(app).await;

        let client = CoinbaseClient::public(format!("http://{addr}")).unwrap();
        let err = client.current_price("BTC-USD").await.unwrap_err();
        assert!(matches!(err, Error::Exchange(ref msg) if msg.contains("503")), "{err}");
    }

    #[tokio::test]
    async fn current_price_rejects_malformed_payload() {
        let app = Router::new()
            .route(
                "/products/BTC-USD/ticker",
                get(|| async { Json(json!({ "bid": "1" })) }),
            )
            .route(
                "/products/ETH-USD/ticker",
                get(|| async { Json(json!({ "price": "abc" })) }),
            )
            .route(
                "/products/SOL-USD/ticker",
                get(|| async { Json(json!({ "price": "0" })) }),
            );
        let addr = serve(app).await;
        let client = CoinbaseClient::public(format!("http://{addr}")).unwrap();

        for symbol in ["BTC-USD", "ETH-USD", "SOL-USD"] {
            let err = client.current_price(symbol).await.unwrap_err();
            assert!(matches!(err, Error::Exchange(_)), "{symbol}: {err}");
        }
    }

    #[tokio::test]
    async fn current_price_unreachable_host_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = CoinbaseClient::public(format!("http://{addr}")).unwrap();
        let err = client.current_price("BTC-USD").await.unwrap_err();
        assert!(matches!(err, Error::Network(_)), "{err}");
    }

    #[tokio::test]
    async fn submit_order_sends_signed_market_order() {
        let captured = Captured::default();
        let app = Router::new()
            .route("/orders", post(accept_order))
            .with_state(captured.clone());
        let addr = serve(app).await;

        let client = CoinbaseClient::new(format!("http://{addr}"), creds()).unwrap();
        let order = OrderRequest::market("BTC-USD", OrderSide::Sell, 0.001);
        let confirmation = client.submit_order(&order).await.unwrap();

        assert_eq!(confirmation.order_id, "ord-42");
        assert_eq!(confirmation.status, "pending");
        assert_eq!(confirmation.side, OrderSide::Sell);
        assert!(confirmation.fill_price.is_none());

        let (headers, body) = captured.order.lock().unwrap().take().unwrap();
        let header = |name: &str| headers.get(name).unwrap().to_str().unwrap().to_string();

        assert_eq!(header("CB-ACCESS-KEY"), "key-1");
        assert_eq!(header("CB-ACCESS-PASSPHRASE"), "pass-1");
        assert_eq!(header("content-type"), "application/json");
        let ts = header("CB-ACCESS-TIMESTAMP");
        assert_eq!(header("CB-ACCESS-SIGN"), sign("shh", &ts, "POST", "/orders", &body));

        let sent: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(sent["type"], "market");
        assert_eq!(sent["side"], "sell");
        assert_eq!(sent["product_id"], "BTC-USD");
        assert_eq!(sent["size"], 0.001);
        assert_eq!(sent["client_oid"], order.client_oid.as_str());
    }

    #[tokio::test]
    async fn submit_order_non_success_is_rejection() {
        let app = Router::new().route(
            "/orders",
            post(|| async { (StatusCode::BAD_REQUEST, r#"{"message":"Insufficient funds"}"#) }),
        );
        let addr = serve(app).await;

        let client = CoinbaseClient::new(format!("http://{addr}"), creds()).unwrap();
        let order = OrderRequest::market("BTC-USD", OrderSide::Buy, 0.001);
        let err = client.submit_order(&order).await.unwrap_err();

        match err {
            Error::OrderRejected { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("Insufficient funds"));
            }
            other => panic!("expected OrderRejected, got {other}"),
        }
    }

    #[tokio::test]
    async fn public_client_refuses_to_place_orders() {
        let client = CoinbaseClient::public("http://127.0.0.1:9").unwrap();
        let order = OrderRequest::market("BTC-USD", OrderSide::Buy, 0.001);
        let err = client.submit_order(&order).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err}");
    }
}
