//! Raw HTTP layer for the hosted backend
//!
//! Owns the reqwest client, bearer-token handling, and the mapping
//! from non-2xx responses to [`ClientError`] variants. Endpoint
//! knowledge lives in [`crate::gateway`].

use crate::{ClientError, ClientResult};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Longest error-body prefix carried into a [`ClientError::Api`]
const ERROR_BODY_LIMIT: usize = 200;

/// Thin wrapper over reqwest with the gateway's conventions
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
        token: Option<&str>,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let mut req = self.client.request(Method::GET, join(base, path));
        if !query.is_empty() {
            req = req.query(query);
        }
        self.send(req, token, base, path).await
    }

    pub async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        base: &str,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> ClientResult<T> {
        let req = self.client.request(Method::POST, join(base, path)).json(body);
        self.send(req, token, base, path).await
    }

    pub async fn patch<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        base: &str,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> ClientResult<T> {
        let req = self.client.request(Method::PATCH, join(base, path)).json(body);
        self.send(req, token, base, path).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
        token: Option<&str>,
    ) -> ClientResult<T> {
        let req = self.client.request(Method::DELETE, join(base, path));
        self.send(req, token, base, path).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        mut req: reqwest::RequestBuilder,
        token: Option<&str>,
        base: &str,
        path: &str,
    ) -> ClientResult<T> {
        if let Some(token) = token {
            req = req.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        debug!(base = %base, path = %path, has_token = token.is_some(), "gateway request");
        let response = req.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(body)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(body)),
                StatusCode::BAD_REQUEST => Err(ClientError::Validation(body)),
                _ => Err(ClientError::Api {
                    status: status.as_u16(),
                    body,
                }),
            };
        }

        // Some endpoints answer 204 or an empty body; treat both as null.
        let text = response.text().await?;
        if text.trim().is_empty() {
            return serde_json::from_str("null")
                .map_err(|e| ClientError::InvalidResponse(e.to_string()));
        }
        serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_normalizes_slashes() {
        assert_eq!(join("https://x/api/", "/order"), "https://x/api/order");
        assert_eq!(join("https://x/api", "order"), "https://x/api/order");
    }
}
