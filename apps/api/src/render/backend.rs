//! Rendering backends — the seam between the orchestrator and external compilers.
//!
//! A backend only knows how to *submit* a document and how to *fetch* a follow-up
//! file. Interpreting what comes back is the job of [`crate::render::normalize`],
//! keyed by the backend's declared [`ResponseShape`].

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::document::Document;

/// Longest slice of an error body kept in a failure reason.
const BODY_EXCERPT_CHARS: usize = 200;

// ────────────────────────────────────────────────────────────────────────────
// Shapes and encodings
// ────────────────────────────────────────────────────────────────────────────

/// How a backend reports its result. One normalizer exists per variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// The response body is the artifact.
    RawBinary,
    /// JSON envelope with a status field and a base64-encoded artifact.
    /// Fields are addressed with JSON pointers, e.g. `/result/status`.
    JsonBase64 {
        status_pointer: String,
        success_value: String,
        payload_pointer: String,
    },
    /// JSON envelope with a status field and a reference to a file that must be
    /// fetched in a second round-trip.
    JsonFollowupUrl {
        status_pointer: String,
        success_value: String,
        reference_pointer: String,
    },
    /// Text body: first line is a status code (`0` is success), second line starts
    /// with the result URL.
    LineProtocol,
}

impl ResponseShape {
    pub fn label(&self) -> &'static str {
        match self {
            ResponseShape::RawBinary => "raw-binary",
            ResponseShape::JsonBase64 { .. } => "json-base64",
            ResponseShape::JsonFollowupUrl { .. } => "json-followup-url",
            ResponseShape::LineProtocol => "line-protocol",
        }
    }
}

/// How the document is put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFormat {
    /// `application/x-www-form-urlencoded`, document under `field`.
    Form {
        field: String,
        params: Vec<(String, String)>,
    },
    /// JSON object, document under `field`.
    Json {
        field: String,
        params: Vec<(String, String)>,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Failures
// ────────────────────────────────────────────────────────────────────────────

/// Why a single backend attempt produced no artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("backend reported failure: {0}")]
    Rejected(String),

    #[error("payload of {size} bytes is below the {minimum}-byte minimum")]
    Undersized { size: usize, minimum: usize },

    #[error("follow-up fetch of {url} failed: {reason}")]
    Followup { url: String, reason: String },

    #[error("compiler error: {0}")]
    Compiler(String),

    #[error("{0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for BackendFailure {
    fn from(e: reqwest::Error) -> Self {
        BackendFailure::Transport(e.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait
// ────────────────────────────────────────────────────────────────────────────

/// One external (or local) compiler able to turn a document into an artifact.
///
/// The orchestrator holds these as `Arc<dyn RenderBackend>` in a fixed order.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    fn name(&self) -> &str;

    fn response_shape(&self) -> &ResponseShape;

    /// Sends the document and returns the body of a successful response.
    /// Non-success transport statuses are failures here, before normalization.
    async fn submit(&self, document: &Document) -> Result<Bytes, BackendFailure>;

    /// Retrieves a file referenced by a follow-up style response.
    async fn fetch(&self, url: &Url) -> Result<Bytes, BackendFailure>;

    /// Base that relative follow-up references resolve against.
    fn followup_base(&self) -> Option<&Url> {
        None
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP backend
// ────────────────────────────────────────────────────────────────────────────

/// A remote compiler reachable over HTTP POST.
#[derive(Clone)]
pub struct HttpBackend {
    name: String,
    endpoint: Url,
    followup_base: Url,
    request: RequestFormat,
    shape: ResponseShape,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(
        name: impl Into<String>,
        endpoint: Url,
        request: RequestFormat,
        shape: ResponseShape,
        client: reqwest::Client,
    ) -> Self {
        let followup_base = directory_of(&endpoint);
        Self {
            name: name.into(),
            endpoint,
            followup_base,
            request,
            shape,
            client,
        }
    }

    fn build_request(&self, document: &Document) -> reqwest::RequestBuilder {
        let post = self.client.post(self.endpoint.clone());
        match &self.request {
            RequestFormat::Form { field, params } => {
                let mut form: Vec<(&str, &str)> = vec![(field.as_str(), document.as_str())];
                form.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                post.form(&form)
            }
            RequestFormat::Json { field, params } => {
                let mut body = Map::new();
                body.insert(field.clone(), Value::String(document.to_string()));
                for (k, v) in params {
                    body.insert(k.clone(), Value::String(v.clone()));
                }
                post.json(&Value::Object(body))
            }
        }
    }
}

#[async_trait]
impl RenderBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn response_shape(&self) -> &ResponseShape {
        &self.shape
    }

    async fn submit(&self, document: &Document) -> Result<Bytes, BackendFailure> {
        debug!(
            "Submitting {} bytes to backend '{}' at {}",
            document.len(),
            self.name,
            self.endpoint
        );
        let response = self.build_request(document).send().await?;
        read_success_body(response).await
    }

    async fn fetch(&self, url: &Url) -> Result<Bytes, BackendFailure> {
        debug!("Fetching follow-up artifact for '{}' from {url}", self.name);
        let response = self.client.get(url.clone()).send().await?;
        read_success_body(response).await
    }

    fn followup_base(&self) -> Option<&Url> {
        Some(&self.followup_base)
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<Bytes, BackendFailure> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendFailure::Status {
            status: status.as_u16(),
            body: excerpt(&body),
        });
    }
    Ok(response.bytes().await?)
}

/// The endpoint with a trailing slash, so `join("file.pdf")` resolves under the
/// endpoint path (`/api/v2` → `/api/v2/file.pdf`).
fn directory_of(endpoint: &Url) -> Url {
    let mut base = endpoint.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base
}

pub(crate) fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let mut cut: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
        cut.push('…');
        cut
    }
}
