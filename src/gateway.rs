use crate::errors::AppError;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::RwLock;
use std::time::Duration;

/// Client for the CRM REST API.
///
/// Every outbound call carries the bearer token; a 401 tears the session
/// down so no further UI updates happen on its behalf.
pub struct Gateway {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl Gateway {
    /// Creates a new `Gateway`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the CRM API, no trailing slash.
    /// * `token` - The session token, if one is already held.
    /// * `timeout` - Per-request timeout for the underlying client.
    pub fn new(
        base_url: String,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::RequestFailed {
                status: 0,
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            token: RwLock::new(token),
        })
    }

    /// Whether a session token is currently held.
    pub fn has_session(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    /// Replaces the held session token (login).
    pub fn set_token(&self, token: String) {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token);
        }
    }

    /// Discards the held session token (logout or 401).
    pub fn clear_session(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
    }

    /// Issues a request and translates the response per the gateway contract.
    ///
    /// * 401 clears the session and yields `SessionExpired`.
    /// * Other non-2xx yields `RequestFailed` with the body's `error` or
    ///   `message` field, defaulting to the HTTP status text.
    /// * A success body that is not JSON is a protocol violation
    ///   (`RequestFailed`); an empty success body reads as `null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, AppError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);

        let token = self
            .token
            .read()
            .ok()
            .and_then(|t| t.clone())
            .unwrap_or_default();

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", format!("Bearer {}", token));
        if let Some(payload) = body {
            // .json sets Content-Type: application/json
            builder = builder.json(payload);
        }

        let response = builder.send().await.map_err(|e| AppError::RequestFailed {
            status: 0,
            message: format!("{} {} failed: {}", method, path, e),
        })?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Session rejected by API ({} {}), logging out", method, path);
            self.clear_session();
            return Err(AppError::SessionExpired);
        }

        if !status.is_success() {
            let fallback = status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| {
                    v.get("error")
                        .or_else(|| v.get("message"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or(fallback);
            tracing::error!("{} {} returned {}: {}", method, path, status, message);
            return Err(AppError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await.map_err(AppError::from)?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| AppError::RequestFailed {
            status: status.as_u16(),
            message: format!("API returned a non-JSON body: {}", e),
        })
    }

    pub async fn get(&self, path: &str) -> Result<Value, AppError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, AppError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, AppError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, AppError> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, AppError> {
        self.request(Method::DELETE, path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gateway_creation() {
        let gateway = Gateway::new(
            "https://example.com".to_string(),
            Some("token".to_string()),
            Duration::from_secs(30),
        );
        assert!(gateway.is_ok());
        assert!(gateway.unwrap().has_session());
    }

    #[tokio::test]
    async fn clear_session_drops_the_token() {
        let gateway = Gateway::new(
            "https://example.com".to_string(),
            Some("token".to_string()),
            Duration::from_secs(30),
        )
        .unwrap();
        gateway.clear_session();
        assert!(!gateway.has_session());
    }
}
