//! Resume tailoring — the single caller-facing operation.
//!
//! Flow: resolve task → check provider → load template → build instruction →
//!       generate (with retries) → structural check → render (with fallback) → return.
//!
//! Each request is handled start to finish on the calling task; nothing is shared
//! between requests beyond the immutable service itself.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::document::{self, Document, StructuralError, ValidationMode};
use crate::generation::{
    GenerationClient, GenerationError, InputError, KeywordsInput, Task, TransformInstruction,
};
use crate::render::{Artifact, RenderError, RenderOrchestrator};

/// Rendered by `status(probe = true)` to check that at least one backend answers.
const PROBE_DOCUMENT: &str = "\\documentclass{article}
\\begin{document}
Test document
\\end{document}";

#[derive(Debug, Error)]
pub enum TailorError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("generation provider is not configured; set GEMINI_API_KEY")]
    ProviderNotConfigured,

    #[error("resume template unavailable at '{path}': {reason}")]
    TemplateUnavailable { path: String, reason: String },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Everything the caller gets back from one successful run.
#[derive(Debug, Clone)]
pub struct TailorOutcome {
    pub request_id: Uuid,
    pub artifact: Artifact,
    pub document: Document,
}

/// Readiness report for `GET /api/v1/tailor`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub generation_configured: bool,
    pub template_exists: bool,
    pub backends: Vec<String>,
    pub validation_mode: ValidationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer_available: Option<bool>,
    pub ready: bool,
}

pub struct TailorService {
    /// `None` when no API key is configured.
    generator: Option<GenerationClient>,
    orchestrator: RenderOrchestrator,
    template_path: PathBuf,
    validation_mode: ValidationMode,
}

impl TailorService {
    pub fn new(
        generator: Option<GenerationClient>,
        orchestrator: RenderOrchestrator,
        template_path: PathBuf,
        validation_mode: ValidationMode,
    ) -> Self {
        Self {
            generator,
            orchestrator,
            template_path,
            validation_mode,
        }
    }

    /// Tailors the template toward exactly one of a job description or keywords.
    /// Input problems are reported before any network call.
    pub async fn tailor(
        &self,
        job_description: Option<&str>,
        keywords: Option<&KeywordsInput>,
    ) -> Result<TailorOutcome, TailorError> {
        let task = Task::from_parts(job_description, keywords)?;
        let request_id = Uuid::new_v4();
        let span = info_span!("tailor", %request_id, mode = task.mode());

        async move {
            let (artifact, document) = self.run(&task).await?;
            Ok::<_, TailorError>(TailorOutcome {
                request_id,
                artifact,
                document,
            })
        }
        .instrument(span)
        .await
    }

    async fn run(&self, task: &Task) -> Result<(Artifact, Document), TailorError> {
        let generator = self
            .generator
            .as_ref()
            .ok_or(TailorError::ProviderNotConfigured)?;

        let template = self.load_template().await?;
        info!("Resume template loaded, {} chars", template.len());

        let instruction = TransformInstruction::build(task, &template);
        let document = generator.transform(&instruction, &template).await?;

        self.check_structure(&document)?;

        let artifact = self.orchestrator.render(&document).await?;
        info!(
            "Tailoring complete: {} artifact, {} bytes, backend '{}'",
            artifact.format.as_str(),
            artifact.len(),
            artifact.backend
        );
        Ok((artifact, document))
    }

    async fn load_template(&self) -> Result<Document, TailorError> {
        let unavailable = |reason: String| TailorError::TemplateUnavailable {
            path: self.template_path.display().to_string(),
            reason,
        };

        let template = tokio::fs::read_to_string(&self.template_path)
            .await
            .map(Document::from)
            .map_err(|e| unavailable(e.to_string()))?;
        if template.is_empty() {
            return Err(unavailable("template is empty".to_string()));
        }
        Ok(template)
    }

    fn check_structure(&self, document: &Document) -> Result<(), TailorError> {
        for warning in document::lint(document) {
            warn!("Lint '{}': {:?}", warning.rule, warning.excerpt);
        }

        match (document::validate(document), self.validation_mode) {
            (Ok(()), _) => Ok(()),
            (Err(e), ValidationMode::Blocking) => {
                warn!("Generated document failed structural validation: {e}");
                Err(e.into())
            }
            (Err(e), ValidationMode::Advisory) => {
                warn!("Generated document failed structural validation ({e}); rendering anyway");
                Ok(())
            }
        }
    }

    /// Reports configuration readiness. With `probe`, also renders a tiny document.
    pub async fn status(&self, probe: bool) -> ServiceStatus {
        let generation_configured = self.generator.is_some();
        let template_exists = tokio::fs::metadata(&self.template_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);

        let renderer_available = if probe {
            let outcome = self.orchestrator.render(&Document::from(PROBE_DOCUMENT)).await;
            if let Err(e) = &outcome {
                warn!("Renderer probe failed: {:?}", e.failures());
            }
            Some(outcome.is_ok())
        } else {
            None
        };

        let ready = generation_configured
            && template_exists
            && renderer_available.unwrap_or(!self.orchestrator.backend_names().is_empty());

        ServiceStatus {
            generation_configured,
            template_exists,
            backends: self.orchestrator.backend_names(),
            validation_mode: self.validation_mode,
            renderer_available,
            ready,
        }
    }
}
