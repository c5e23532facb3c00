//! Client for the external identity service.
//!
//! The reconciler only needs one question answered: does this account still
//! exist? [`IdentityDirectory`] abstracts that so cycles can be tested without
//! a network; [`HttpIdentityClient`] is the production implementation.
//!
//! Contract: `POST {base}/fetchuserbyid` with `{"user_id": "<hex>"}` and a
//! freshly minted bearer token. 200 means the account exists, 404 means it
//! is gone, anything else is inconclusive.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use storyhub_core::types::ObjectId;

use crate::auth::jwt::{mint_lookup_token, JwtConfig};
use crate::config::IdentityConfig;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Definitive answer from the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountLookup {
    Exists,
    Missing,
}

/// A lookup that produced no definitive answer. The account must be treated
/// as existing for this cycle.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The service answered with a status other than 200 or 404.
    #[error("identity service returned HTTP {0}")]
    Inconclusive(u16),

    /// The request could not be completed (network, DNS, timeout, etc.).
    #[error("identity request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The lookup assertion could not be signed.
    #[error("could not mint lookup token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn lookup(&self, user_id: ObjectId) -> Result<AccountLookup, IdentityError>;
}

// ---------------------------------------------------------------------------
// HttpIdentityClient
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct LookupRequest {
    user_id: String,
}

/// Looks accounts up over HTTP.
pub struct HttpIdentityClient {
    client: reqwest::Client,
    endpoint: String,
    jwt: JwtConfig,
}

impl HttpIdentityClient {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: &IdentityConfig, jwt: JwtConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/fetchuserbyid", config.base_url.trim_end_matches('/')),
            jwt,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl IdentityDirectory for HttpIdentityClient {
    async fn lookup(&self, user_id: ObjectId) -> Result<AccountLookup, IdentityError> {
        let token = mint_lookup_token(user_id, &self.jwt)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&LookupRequest {
                user_id: user_id.to_hex(),
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(AccountLookup::Exists),
            StatusCode::NOT_FOUND => Ok(AccountLookup::Missing),
            other => Err(IdentityError::Inconclusive(other.as_u16())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use assert_matches::assert_matches;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;
    use crate::auth::jwt::validate_bearer;

    fn jwt() -> JwtConfig {
        JwtConfig {
            secret: "identity-test-secret".to_string(),
            lookup_token_expiry_mins: 5,
        }
    }

    /// Serve a fake identity service. `known` exists, `flaky` gets a 503,
    /// every other id is a 404. Returns the base URL and the captured
    /// `(principal, body user_id)` pairs.
    async fn fake_identity(
        known: ObjectId,
        flaky: ObjectId,
    ) -> (String, Arc<Mutex<Vec<(ObjectId, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_handler = Arc::clone(&seen);

        let app = Router::new().route(
            "/api/v1/fetchuserbyid",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let seen = Arc::clone(&seen_in_handler);
                async move {
                    let header = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    let Ok(principal) = validate_bearer(header, &jwt()) else {
                        return StatusCode::UNAUTHORIZED;
                    };
                    let user_id = body["user_id"].as_str().unwrap_or_default().to_string();
                    seen.lock().unwrap().push((principal, user_id.clone()));

                    if user_id == known.to_hex() {
                        StatusCode::OK
                    } else if user_id == flaky.to_hex() {
                        StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        StatusCode::NOT_FOUND
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/api/v1"), seen)
    }

    fn client(base_url: String) -> HttpIdentityClient {
        let config = IdentityConfig {
            base_url,
            request_timeout_secs: 2,
        };
        HttpIdentityClient::new(&config, jwt()).unwrap()
    }

    #[test]
    fn endpoint_appends_path_once() {
        let c = client("http://identity.local/api/v1/".to_string());
        assert_eq!(c.endpoint(), "http://identity.local/api/v1/fetchuserbyid");
    }

    #[tokio::test]
    async fn maps_statuses_and_sends_subject_token() {
        let (known, flaky, gone) = (ObjectId::new(), ObjectId::new(), ObjectId::new());
        let (base_url, seen) = fake_identity(known, flaky).await;
        let c = client(base_url);

        assert_eq!(c.lookup(known).await.unwrap(), AccountLookup::Exists);
        assert_eq!(c.lookup(gone).await.unwrap(), AccountLookup::Missing);
        assert_matches!(c.lookup(flaky).await, Err(IdentityError::Inconclusive(503)));

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        for (principal, body_id) in seen {
            assert_eq!(principal.to_hex(), body_id);
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let c = client(format!("http://{addr}"));
        assert_matches!(
            c.lookup(ObjectId::new()).await,
            Err(IdentityError::Transport(_))
        );
    }

    #[test]
    fn inconclusive_display() {
        assert_eq!(
            IdentityError::Inconclusive(502).to_string(),
            "identity service returned HTTP 502"
        );
    }
}
