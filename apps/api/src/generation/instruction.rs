//! Task input and instruction building.
//!
//! A caller asks for exactly one of: a free-text job description, or a keyword list.
//! Both are checked here before anything touches the network.

use serde::Deserialize;
use thiserror::Error;

use crate::document::Document;
use crate::generation::prompts::{JOB_DESCRIPTION_TEMPLATE, KEYWORDS_TEMPLATE};
use crate::llm_client::prompts::{LATEX_OUTPUT_RULES, LATEX_PRESERVATION_RULES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("no-task-specified")]
    NoTaskSpecified,
    #[error("conflicting-task")]
    ConflictingTask,
}

/// Keywords as sent by clients: either a JSON array or one comma-separated string.
/// `null` array entries are accepted and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KeywordsInput {
    List(Vec<Option<String>>),
    Csv(String),
}

impl KeywordsInput {
    /// Trims each entry and drops empty ones. Order and duplicates are preserved.
    pub fn normalize(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            KeywordsInput::List(items) => items.iter().flatten().map(String::as_str).collect(),
            KeywordsInput::Csv(text) => text.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// What the document should be tailored toward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    JobDescription(String),
    Keywords(Vec<String>),
}

impl Task {
    /// Resolves the caller's XOR input. Blank values count as absent.
    pub fn from_parts(
        job_description: Option<&str>,
        keywords: Option<&KeywordsInput>,
    ) -> Result<Self, InputError> {
        let job_description = job_description
            .map(str::trim)
            .filter(|jd| !jd.is_empty());
        let keywords = keywords
            .map(KeywordsInput::normalize)
            .filter(|k| !k.is_empty());

        match (job_description, keywords) {
            (Some(_), Some(_)) => Err(InputError::ConflictingTask),
            (Some(jd), None) => Ok(Task::JobDescription(jd.to_string())),
            (None, Some(k)) => Ok(Task::Keywords(k)),
            (None, None) => Err(InputError::NoTaskSpecified),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Task::JobDescription(_) => "job-description",
            Task::Keywords(_) => "keywords",
        }
    }
}

/// The opaque directive sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformInstruction(String);

impl TransformInstruction {
    pub fn build(task: &Task, original: &Document) -> Self {
        let filled = match task {
            Task::JobDescription(jd) => JOB_DESCRIPTION_TEMPLATE.replace("{job_description}", jd),
            Task::Keywords(keywords) => {
                let list = keywords
                    .iter()
                    .map(|k| format!("- {k}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                KEYWORDS_TEMPLATE.replace("{keywords}", &list)
            }
        };
        // The resume goes in last so its text is never scanned for placeholders.
        let filled = filled
            .replace("{preservation_rules}", LATEX_PRESERVATION_RULES)
            .replace("{output_rules}", LATEX_OUTPUT_RULES)
            .replace("{resume}", original.as_str());
        Self(filled)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
