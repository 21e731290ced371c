/// Remote client — the single point of entry for all outbound HTTP calls.
///
/// Generation, cover-letter upload, PDF pinning and the session lookup are
/// each exposed behind a trait so the controllers never touch `reqwest`
/// directly and can be driven by in-memory fakes in tests.
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::form::models::GenerationRequest;

#[cfg(test)]
pub mod fakes;
pub mod utf8;

use utf8::Utf8Decoder;

const GENERATION_PATH: &str = "/api/edit";
const UPLOAD_PATH: &str = "/api/edit/upload";
const PIN_PATH: &str = "/api/pinata";
const SESSION_PATH: &str = "/api/auth/session";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

/// Text fragments of the generation response body, in arrival order.
pub type TextStream = BoxStream<'static, Result<String, RemoteError>>;

/// Multipart body of a cover-letter save.
#[derive(Debug, Clone)]
pub struct CoverLetterUpload {
    pub text: String,
    pub pdf: Bytes,
    pub wallet_address: String,
    pub user_id: String,
    /// JSON-encoded source attributions.
    pub references: String,
    /// JSON-encoded `{role, experience}`.
    pub metadata: String,
}

#[derive(Debug, Deserialize)]
struct UploadReceipt {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PinFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinnedFile {
    pub url: String,
    pub cid: String,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    user: Option<SessionUser>,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    id: Option<String>,
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn open_stream(&self, request: &GenerationRequest) -> Result<TextStream, RemoteError>;
}

#[async_trait]
pub trait UploadBackend: Send + Sync {
    async fn upload_cover_letter(&self, upload: CoverLetterUpload) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait PinBackend: Send + Sync {
    async fn pin_file(&self, file: PinFile) -> Result<PinnedFile, RemoteError>;
}

#[async_trait]
pub trait SessionLookup: Send + Sync {
    /// The signed-in user's id, if there is a session.
    async fn current_user_id(&self) -> Result<Option<String>, RemoteError>;
}

/// HTTP implementation of every remote seam, rooted at one base URL.
#[derive(Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl RemoteClient {
    /// `timeout` bounds uploads, pinning and session lookups. The generation
    /// stream only has a connect timeout since it legitimately runs long.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        Ok(Self {
            client: Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl GenerationBackend for RemoteClient {
    async fn open_stream(&self, request: &GenerationRequest) -> Result<TextStream, RemoteError> {
        let response = self
            .client
            .post(self.url(GENERATION_PATH))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message,
            });
        }
        debug!("Generation stream opened ({status})");

        let body = response.bytes_stream().boxed();
        let stream = futures::stream::unfold(
            (body, Utf8Decoder::default(), false),
            |(mut body, mut decoder, finished)| async move {
                if finished {
                    return None;
                }
                loop {
                    match body.next().await {
                        Some(Ok(bytes)) => {
                            let text = decoder.push(&bytes);
                            if !text.is_empty() {
                                return Some((Ok(text), (body, decoder, false)));
                            }
                        }
                        Some(Err(e)) => {
                            return Some((Err(RemoteError::Http(e)), (body, decoder, true)));
                        }
                        None => {
                            let rest = decoder.finish();
                            if rest.is_empty() {
                                return None;
                            }
                            return Some((Ok(rest), (body, decoder, true)));
                        }
                    }
                }
            },
        );

        Ok(stream.boxed())
    }
}

#[async_trait]
impl UploadBackend for RemoteClient {
    async fn upload_cover_letter(&self, upload: CoverLetterUpload) -> Result<(), RemoteError> {
        let pdf = multipart::Part::bytes(upload.pdf.to_vec())
            .file_name("cover-letter.txt")
            .mime_str("text/plain")?;
        let form = multipart::Form::new()
            .text("text", upload.text)
            .part("pdf", pdf)
            .text("walletAddress", upload.wallet_address)
            .text("userId", upload.user_id)
            .text("references", upload.references)
            .text("metadata", upload.metadata);

        let response = self
            .client
            .post(self.url(UPLOAD_PATH))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Upload endpoint returned {status}: {body}");
            return Err(RemoteError::Rejected("Upload failed".to_string()));
        }

        let receipt: UploadReceipt = response.json().await?;
        if receipt.success {
            Ok(())
        } else {
            Err(RemoteError::Rejected(
                receipt.error.unwrap_or_else(|| "Upload failed".to_string()),
            ))
        }
    }
}

#[async_trait]
impl PinBackend for RemoteClient {
    async fn pin_file(&self, file: PinFile) -> Result<PinnedFile, RemoteError> {
        let mut part = multipart::Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }
        let form = multipart::Form::new()
            .part("file", part)
            .text("userId", file.user_id);

        let response = self
            .client
            .post(self.url(PIN_PATH))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SessionLookup for RemoteClient {
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn current_user_id(&self) -> Result<Option<String>, RemoteError> {
        let mut last_error: Option<RemoteError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Session lookup attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .get(self.url(SESSION_PATH))
                .timeout(self.timeout)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(RemoteError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let message = response.text().await.unwrap_or_default();
                last_error = Some(RemoteError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(RemoteError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            // An absent session is served as `null` or `{}`.
            let session: Option<SessionBody> = response.json().await?;
            return Ok(session.and_then(|s| s.user).and_then(|u| u.id));
        }

        Err(last_error.unwrap_or(RemoteError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = RemoteClient::new("http://localhost:3000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.url(UPLOAD_PATH), "http://localhost:3000/api/edit/upload");
    }

    #[test]
    fn test_session_body_shapes() {
        let signed_in: Option<SessionBody> =
            serde_json::from_str(r#"{"user":{"id":"u-1","name":"Kim"},"expires":"x"}"#).unwrap();
        assert_eq!(
            signed_in.and_then(|s| s.user).and_then(|u| u.id).as_deref(),
            Some("u-1")
        );

        let empty: Option<SessionBody> = serde_json::from_str("{}").unwrap();
        assert!(empty.and_then(|s| s.user).is_none());

        let null: Option<SessionBody> = serde_json::from_str("null").unwrap();
        assert!(null.is_none());
    }

    #[test]
    fn test_upload_receipt_defaults_to_failure() {
        let receipt: UploadReceipt = serde_json::from_str(r#"{"error":"disk full"}"#).unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.error.as_deref(), Some("disk full"));
    }
}
