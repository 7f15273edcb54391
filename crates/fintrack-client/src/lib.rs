//! HTTP client for the fintrack REST backend
//!
//! [`ApiClient`] wraps a `reqwest` client with the configured base URL and
//! the shared [`Session`]. Protected calls carry the session's bearer token;
//! a 401 on any of them expires the session before the error is returned.
//! The resource endpoints are exposed through
//! [`fintrack_core::ResourceBackend`], so an `ApiClient` (or an `Arc` of one)
//! can back any resource store.

mod backend;

use std::sync::Arc;
use std::time::Duration;

use fintrack_config::ApiConfig;
use fintrack_core::{AuthToken, ClientError, ClientResult, Session, User};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Client for the fintrack API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Arc<Session>) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a protected request; a rejected token ends the session
    async fn send_authorized(&self, request: RequestBuilder) -> ClientResult<Response> {
        let token = self.session.require_token()?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            self.session.expire();
            return Err(ClientError::from_response(StatusCode::UNAUTHORIZED.as_u16(), &body));
        }

        ensure_success(response).await
    }

    /// Exchange credentials for a bearer token and start the session.
    ///
    /// Wrong credentials come back as `Unauthorized` carrying the server's
    /// message; the session is left untouched.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<AuthToken> {
        log::debug!("POST {}", self.url("/auth/login"));
        let response = self
            .http
            .post(self.url("/auth/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(transport_error)?;

        let token: AuthToken = decode(ensure_success(response).await?).await?;
        self.session.sign_in(token.access_token.clone())?;
        log::info!("Logged in as {}", username);
        Ok(token)
    }

    /// Fetch the signed-in user and remember it on the session
    pub async fn current_user(&self) -> ClientResult<User> {
        let response = self.send_authorized(self.http.get(self.url("/auth/me"))).await?;
        let user: User = decode(response).await?;
        self.session.set_user(user.clone());
        Ok(user)
    }

    pub fn logout(&self) {
        self.session.sign_out();
    }
}

/// Turn a non-2xx response into the matching error
async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let err = ClientError::from_response(status.as_u16(), &body);
    log::debug!("{} -> {}", status, err);
    Err(err)
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|e| ClientError::Decode {
        message: e.to_string(),
    })
}

fn transport_error(err: reqwest::Error) -> ClientError {
    if err.is_decode() {
        ClientError::Decode {
            message: err.to_string(),
        }
    } else if err.is_timeout() {
        ClientError::Network {
            message: "request timed out".to_string(),
        }
    } else {
        ClientError::Network {
            message: err.to_string(),
        }
    }
}
