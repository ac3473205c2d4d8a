//! Relay between the noise meter and Grafana Loki.
//!
//! `/api/save-log` accepts a push request body and forwards it unmodified
//! to the Loki push endpoint. The upstream status code is passed back with
//! an empty body; upstream error bodies only go to the relay's log.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use log::{error, info};
use thiserror::Error;

/// Grafana Cloud push endpoint used when none is configured
pub const DEFAULT_LOKI_URL: &str = "https://logs-prod-us-central1.grafana.net/loki/api/v1/push";

pub const SAVE_LOG_PATH: &str = "/api/save-log";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub loki_url: String,
    /// `Authorization` value sent upstream; the caller's header is
    /// forwarded when this is `None`
    pub authorization: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            loki_url: DEFAULT_LOKI_URL.into(),
            authorization: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Only POST requests are allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            Self::MethodNotAllowed => {
                info!("Response 400: {}", self);
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            Self::Upstream(source) => {
                error!("Forwarding to Loki failed: {}", source);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}

#[derive(Clone)]
struct RelayState {
    config: RelayConfig,
    client: reqwest::Client,
}

pub fn router(config: RelayConfig) -> Router {
    let state = RelayState {
        config,
        client: reqwest::Client::new(),
    };
    Router::new()
        .route(SAVE_LOG_PATH, any(save_log))
        .with_state(state)
}

async fn save_log(
    State(state): State<RelayState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, RelayError> {
    info!("Processing {} {}", method, SAVE_LOG_PATH);
    if method != Method::POST {
        return Err(RelayError::MethodNotAllowed);
    }

    let authorization = state.config.authorization.clone().or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    });

    let mut request = state
        .client
        .post(&state.config.loki_url)
        .header(ACCEPT.as_str(), "application/json")
        .header(CONTENT_TYPE.as_str(), "application/json")
        .body(body);
    if let Some(authorization) = authorization {
        request = request.header(AUTHORIZATION.as_str(), authorization);
    }

    let response = request.send().await?;
    let status = response.status().as_u16();
    if status >= 300 {
        let text = response.text().await.unwrap_or_default();
        error!("Loki responded {}: {}", status, text);
    }

    Ok(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    type Recorded = (HeaderMap, String);

    /// Fake Loki answering every push with `status` and `reply`
    async fn spawn_loki(
        status: StatusCode,
        reply: &'static str,
    ) -> (String, mpsc::UnboundedReceiver<Recorded>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/loki/api/v1/push",
            post(move |headers: HeaderMap, body: String| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send((headers, body));
                    (status, reply)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/loki/api/v1/push", addr), rx)
    }

    fn push(body: &'static str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(SAVE_LOG_PATH)
            .header(AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_non_post_is_rejected() {
        let app = router(RelayConfig::default());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri(SAVE_LOG_PATH)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Only POST requests are allowed");
    }

    #[tokio::test]
    async fn test_push_is_forwarded_unmodified() {
        let (loki_url, mut pushes) = spawn_loki(StatusCode::NO_CONTENT, "").await;
        let app = router(RelayConfig {
            loki_url,
            authorization: None,
        });

        let body = r#"{"streams":[{"stream":{"job":"noise_level","device":"x"},"values":[]}]}"#;
        let response = app.oneshot(push(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(body_text(response).await, "");

        let (headers, forwarded) = pushes.recv().await.unwrap();
        assert_eq!(forwarded, body);
        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[AUTHORIZATION], "Basic dXNlcjpwYXNz");
    }

    #[tokio::test]
    async fn test_configured_authorization_wins() {
        let (loki_url, mut pushes) = spawn_loki(StatusCode::NO_CONTENT, "").await;
        let app = router(RelayConfig {
            loki_url,
            authorization: Some("Basic c2VydmVy".into()),
        });

        app.oneshot(push("{}")).await.unwrap();

        let (headers, _) = pushes.recv().await.unwrap();
        assert_eq!(headers[AUTHORIZATION], "Basic c2VydmVy");
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_passed_through_without_body() {
        let (loki_url, _pushes) = spawn_loki(StatusCode::UNAUTHORIZED, "invalid credentials").await;
        let app = router(RelayConfig {
            loki_url,
            authorization: None,
        });

        let response = app.oneshot(push("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_internal_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let app = router(RelayConfig {
            loki_url: format!("http://{}/loki/api/v1/push", addr),
            authorization: None,
        });

        let response = app.oneshot(push("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Internal error");
    }
}
