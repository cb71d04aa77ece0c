//! Rendering orchestrator — first-success fallback across an ordered backend list.
//!
//! Backends are tried strictly in order, one at a time. The first backend whose
//! normalized payload clears the size threshold wins and nothing after it is called.
//! Every failure is kept, in order, so an exhausted run can explain itself.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::render::artifact::Artifact;
use crate::render::backend::{BackendFailure, RenderBackend};
use crate::render::normalize::{normalize, Normalized};

/// Payloads smaller than this are almost always an error page, not a document.
pub const DEFAULT_MIN_ARTIFACT_BYTES: usize = 1000;

/// One backend's reason for not producing an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendAttemptFailure {
    pub backend: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("all-backends-exhausted")]
    AllBackendsExhausted { failures: Vec<BackendAttemptFailure> },
}

impl RenderError {
    pub fn failures(&self) -> &[BackendAttemptFailure] {
        match self {
            RenderError::AllBackendsExhausted { failures } => failures,
        }
    }
}

/// Holds the configured backend order. Cheap to clone.
#[derive(Clone)]
pub struct RenderOrchestrator {
    backends: Vec<Arc<dyn RenderBackend>>,
    min_artifact_bytes: usize,
}

impl RenderOrchestrator {
    pub fn new(backends: Vec<Arc<dyn RenderBackend>>, min_artifact_bytes: usize) -> Self {
        Self {
            backends,
            min_artifact_bytes,
        }
    }

    pub fn backend_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    /// Renders `document` with the first backend that yields a usable artifact.
    pub async fn render(&self, document: &Document) -> Result<Artifact, RenderError> {
        let mut failures = Vec::with_capacity(self.backends.len());

        for (index, backend) in self.backends.iter().enumerate() {
            info!(
                "Rendering with backend '{}' ({}/{}, shape={})",
                backend.name(),
                index + 1,
                self.backends.len(),
                backend.response_shape().label()
            );

            match self.attempt(backend.as_ref(), document).await {
                Ok(bytes) => {
                    let artifact = Artifact::new(bytes, backend.name());
                    info!(
                        "Backend '{}' produced a {} artifact of {} bytes",
                        backend.name(),
                        artifact.format.as_str(),
                        artifact.len()
                    );
                    return Ok(artifact);
                }
                Err(failure) => {
                    warn!("Backend '{}' failed: {failure}", backend.name());
                    failures.push(BackendAttemptFailure {
                        backend: backend.name().to_string(),
                        reason: failure.to_string(),
                    });
                }
            }
        }

        warn!("All {} rendering backends failed", self.backends.len());
        Err(RenderError::AllBackendsExhausted { failures })
    }

    async fn attempt(
        &self,
        backend: &dyn RenderBackend,
        document: &Document,
    ) -> Result<Bytes, BackendFailure> {
        let body = backend.submit(document).await?;
        debug!("Backend '{}' returned {} bytes", backend.name(), body.len());

        let bytes = match normalize(backend.response_shape(), body, backend.followup_base())? {
            Normalized::Payload(bytes) => bytes,
            Normalized::FollowUp(url) => {
                backend
                    .fetch(&url)
                    .await
                    .map_err(|e| BackendFailure::Followup {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })?
            }
        };

        if bytes.len() < self.min_artifact_bytes {
            return Err(BackendFailure::Undersized {
                size: bytes.len(),
                minimum: self.min_artifact_bytes,
            });
        }
        Ok(bytes)
    }
}
