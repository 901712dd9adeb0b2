use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::ServerConfig;
use crate::email::{Email, EmailUpdate, Mailbox, OutgoingEmail};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend answered with an `error` field.
    #[error("{0}")]
    Rejected(String),

    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// The REST surface of the mail backend.
#[async_trait]
pub trait MailApi: Send + Sync {
    /// `GET /emails/{mailbox}`
    async fn list_mailbox(&self, mailbox: Mailbox) -> Result<Vec<Email>, ApiError>;

    /// `GET /emails/{id}`
    async fn get_email(&self, id: u64) -> Result<Email, ApiError>;

    /// `PUT /emails/{id}`
    async fn update_email(&self, id: u64, update: &EmailUpdate) -> Result<(), ApiError>;

    /// `POST /emails`
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    error: Option<String>,
    message: Option<String>,
}

/// `MailApi` over HTTP with reqwest.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let base_url = normalize_base(&config.base_url)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name: {}", name))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {}", name))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    /// Issue a request and return the raw body of a successful response.
    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError> {
        let url = self.url(path)?;
        tracing::debug!("request {} {}", method, url);

        let mut req = self.client.request(method, url.clone());
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        tracing::debug!("response {} {} ({} bytes)", status.as_u16(), url, bytes.len());

        check_status(status, url.as_str(), &bytes)?;
        Ok(bytes.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let bytes = self.request::<()>(Method::GET, path, None).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl MailApi for HttpBackend {
    async fn list_mailbox(&self, mailbox: Mailbox) -> Result<Vec<Email>, ApiError> {
        self.get_json(&format!("emails/{}", mailbox.as_str())).await
    }

    async fn get_email(&self, id: u64) -> Result<Email, ApiError> {
        self.get_json(&format!("emails/{}", id)).await
    }

    async fn update_email(&self, id: u64, update: &EmailUpdate) -> Result<(), ApiError> {
        self.request(Method::PUT, &format!("emails/{}", id), Some(update))
            .await?;
        Ok(())
    }

    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), ApiError> {
        let bytes = self.request(Method::POST, "emails", Some(email)).await?;
        interpret_send_response(&bytes)
    }
}

/// Make sure the base URL ends in `/` so relative joins append instead of
/// replacing the last path segment.
fn normalize_base(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("invalid server url: {}", raw))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Map a non-success status to an error, preferring the backend's own
/// `error` message when the body carries one.
fn check_status(status: StatusCode, url: &str, body: &[u8]) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }
    if let Ok(ErrorBody { error }) = serde_json::from_slice::<ErrorBody>(body) {
        return Err(ApiError::Rejected(error));
    }
    Err(ApiError::Status {
        status: status.as_u16(),
        url: url.to_string(),
    })
}

/// A send can succeed at the HTTP level and still carry an `error` field.
fn interpret_send_response(body: &[u8]) -> Result<(), ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    let resp: SendResponse = serde_json::from_slice(body)?;
    match resp.error {
        Some(error) => Err(ApiError::Rejected(error)),
        None => {
            if let Some(message) = resp.message {
                tracing::debug!("send accepted: {}", message);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = normalize_base("http://localhost:8000/mail").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/mail/");
        assert_eq!(
            url.join("emails/inbox").unwrap().as_str(),
            "http://localhost:8000/mail/emails/inbox"
        );
    }

    #[test]
    fn base_url_root() {
        let url = normalize_base("http://127.0.0.1:8000").unwrap();
        assert_eq!(url.join("emails").unwrap().as_str(), "http://127.0.0.1:8000/emails");
    }

    #[test]
    fn base_url_invalid() {
        assert!(normalize_base("not a url").is_err());
    }

    #[test]
    fn success_status_passes() {
        assert!(check_status(StatusCode::NO_CONTENT, "http://x/emails/1", b"").is_ok());
    }

    #[test]
    fn error_body_becomes_rejected() {
        let err = check_status(
            StatusCode::NOT_FOUND,
            "http://x/emails/9",
            br#"{"error": "Email not found."}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "Email not found."));
    }

    #[test]
    fn bare_status_error() {
        let err = check_status(StatusCode::BAD_GATEWAY, "http://x/emails", b"<html>").unwrap_err();
        match err {
            ApiError::Status { status, url } => {
                assert_eq!(status, 502);
                assert_eq!(url, "http://x/emails");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn send_response_with_message_is_ok() {
        assert!(interpret_send_response(br#"{"message": "Email sent successfully."}"#).is_ok());
        assert!(interpret_send_response(b"").is_ok());
    }

    #[test]
    fn send_response_with_error_is_rejected() {
        let err = interpret_send_response(br#"{"error": "User with email x does not exist."}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "User with email x does not exist.");
    }

    #[test]
    fn send_response_garbage_is_decode_error() {
        let err = interpret_send_response(b"not json").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
