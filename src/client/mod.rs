//! HTTP client for a running Redisflare server.
//!
//! Thin wrapper over `reqwest`: every call sends the bearer token, decodes the
//! response envelope and turns `success: false` into [`ClientError::Api`].

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::Rights;
use crate::server::protocol::{
    ENDPOINT_AUTH, ENDPOINT_CRUD, ENDPOINT_HEALTH, ENDPOINT_LIST, ListedRecord, PARAM_PAGE,
    PARAM_PREFIX, PARAM_RECORD_ID, PARAM_REPORT,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("host should use an http(s) scheme: {0}")]
    InvalidHost(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Envelope as seen by the client; every field past `success` is optional.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    error_text: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    rights: Option<Rights>,
    #[serde(default)]
    date: Option<u64>,
    #[serde(default)]
    entries: Vec<ListedRecord>,
    #[serde(default)]
    next_page: Option<String>,
    #[serde(default)]
    list_complete: bool,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub entries: Vec<ListedRecord>,
    pub next_page: Option<String>,
    pub list_complete: bool,
}

#[derive(Debug, Clone)]
pub struct RedisflareClient {
    host: String,
    token: String,
    rights: Option<Rights>,
    http: reqwest::Client,
}

impl RedisflareClient {
    pub fn new(host: &str, token: impl Into<String>) -> ClientResult<Self> {
        let trimmed = host.trim();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ClientError::InvalidHost(host.to_string()));
        }
        Ok(Self {
            host: trimmed.trim_end_matches('/').to_string(),
            token: token.into(),
            rights: None,
            http: reqwest::Client::new(),
        })
    }

    /// Rights granted by the last successful [`auth`](Self::auth) call.
    pub fn rights(&self) -> Option<Rights> {
        self.rights
    }

    /// Check the token and remember the granted privilege.
    pub async fn auth(&mut self) -> ClientResult<Rights> {
        let envelope = self
            .call(Method::GET, ENDPOINT_AUTH, &[(PARAM_REPORT, "json")], None)
            .await?;
        let rights = envelope
            .rights
            .ok_or_else(|| ClientError::UnexpectedResponse("missing rights".to_string()))?;
        self.rights = Some(rights);
        Ok(rights)
    }

    /// Server time reported by the health endpoint, in milliseconds.
    pub async fn health(&self) -> ClientResult<u64> {
        let envelope = self
            .call(Method::GET, ENDPOINT_HEALTH, &[(PARAM_REPORT, "json")], None)
            .await?;
        envelope
            .date
            .ok_or_else(|| ClientError::UnexpectedResponse("missing date".to_string()))
    }

    pub async fn get(&self, record_id: &str) -> ClientResult<Option<String>> {
        let envelope = self
            .call(Method::GET, ENDPOINT_CRUD, &[(PARAM_RECORD_ID, record_id)], None)
            .await?;
        Ok(envelope.data)
    }

    /// Upsert a record.
    pub async fn set(&self, record_id: &str, data: &str) -> ClientResult<()> {
        self.call(Method::POST, ENDPOINT_CRUD, &[(PARAM_RECORD_ID, record_id)], Some(data))
            .await
            .map(|_| ())
    }

    /// Create a record, failing if it already exists.
    pub async fn create(&self, record_id: &str, data: &str) -> ClientResult<()> {
        self.call(Method::PUT, ENDPOINT_CRUD, &[(PARAM_RECORD_ID, record_id)], Some(data))
            .await
            .map(|_| ())
    }

    /// Update a record, failing if it does not exist.
    pub async fn update(&self, record_id: &str, data: &str) -> ClientResult<()> {
        self.call(Method::PATCH, ENDPOINT_CRUD, &[(PARAM_RECORD_ID, record_id)], Some(data))
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, record_id: &str) -> ClientResult<()> {
        self.call(Method::DELETE, ENDPOINT_CRUD, &[(PARAM_RECORD_ID, record_id)], None)
            .await
            .map(|_| ())
    }

    pub async fn list(&self, prefix: Option<&str>, page: Option<&str>) -> ClientResult<ListPage> {
        let mut query = Vec::new();
        if let Some(prefix) = prefix {
            query.push((PARAM_PREFIX, prefix));
        }
        if let Some(page) = page {
            query.push((PARAM_PAGE, page));
        }
        let envelope = self.call(Method::GET, ENDPOINT_LIST, &query, None).await?;
        Ok(ListPage {
            entries: envelope.entries,
            next_page: envelope.next_page,
            list_complete: envelope.list_complete,
        })
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&str>,
    ) -> ClientResult<RawEnvelope> {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.host, path))
            .bearer_auth(&self.token)
            .query(query);
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "text/plain")
                .body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let envelope: RawEnvelope = response.json().await?;

        if !envelope.success {
            let message = envelope
                .error_text
                .unwrap_or_else(|| "unknown error".to_string());
            tracing::debug!("Request to {} failed: {} {}", path, status, message);
            return Err(ClientError::Api { status, message });
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_host() {
        assert!(matches!(
            RedisflareClient::new("ftp://example.com", "t"),
            Err(ClientError::InvalidHost(_))
        ));
        assert!(RedisflareClient::new("localhost:16770", "t").is_err());
    }

    #[test]
    fn test_normalizes_trailing_slash() {
        let client = RedisflareClient::new(" http://localhost:16770/ ", "t").unwrap();

        assert_eq!(client.host, "http://localhost:16770");
        assert!(client.rights().is_none());
    }

    #[test]
    fn test_raw_envelope_accepts_every_shape() {
        let failure: RawEnvelope =
            serde_json::from_str(r#"{"success":false,"error_text":"nope"}"#).unwrap();
        assert!(!failure.success);
        assert_eq!(failure.error_text.as_deref(), Some("nope"));

        let list: RawEnvelope = serde_json::from_str(
            r#"{"success":true,"context":"list","entries":[{"record_id":"a"}],"next_page":"YQ","list_complete":false}"#,
        )
        .unwrap();
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.next_page.as_deref(), Some("YQ"));
        assert!(!list.list_complete);
    }
}
