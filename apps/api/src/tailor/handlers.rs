use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::generation::KeywordsInput;
use crate::state::AppState;
use crate::tailor::TailorOutcome;

#[derive(Debug, Deserialize)]
pub struct TailorRequest {
    #[serde(default, alias = "jobDescription")]
    pub job_description: Option<String>,
    #[serde(default)]
    pub keywords: Option<KeywordsInput>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Binary,
    Json,
}

#[derive(Debug, Default, Deserialize)]
pub struct TailorQuery {
    #[serde(default)]
    pub response: ResponseMode,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub probe: bool,
}

#[derive(Debug, Serialize)]
pub struct TailorJsonResponse {
    pub format: &'static str,
    pub backend: String,
    pub document: String,
    pub artifact_base64: String,
    pub size_bytes: usize,
}

/// POST /api/v1/tailor
pub async fn handle_tailor(
    State(state): State<AppState>,
    Query(query): Query<TailorQuery>,
    Json(req): Json<TailorRequest>,
) -> Result<Response, AppError> {
    let outcome = state
        .tailor
        .tailor(req.job_description.as_deref(), req.keywords.as_ref())
        .await?;

    match query.response {
        ResponseMode::Json => Ok(Json(json_body(&outcome)).into_response()),
        ResponseMode::Binary => binary_response(outcome),
    }
}

/// GET /api/v1/tailor
pub async fn handle_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Json<Value> {
    let status = state.tailor.status(query.probe).await;
    Json(json!({
        "status": if status.ready { "ok" } else { "degraded" },
        "configuration": status
    }))
}

fn json_body(outcome: &TailorOutcome) -> TailorJsonResponse {
    TailorJsonResponse {
        format: outcome.artifact.format.as_str(),
        backend: outcome.artifact.backend.clone(),
        document: outcome.document.as_str().to_string(),
        artifact_base64: STANDARD.encode(&outcome.artifact.bytes),
        size_bytes: outcome.artifact.len(),
    }
}

fn binary_response(outcome: TailorOutcome) -> Result<Response, AppError> {
    let format = outcome.artifact.format;
    let filename = download_filename(format.extension());

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(format.mime_type()));
    headers.insert(
        header::CONTENT_DISPOSITION,
        header_value(&format!("attachment; filename=\"{filename}\""))?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(outcome.artifact.len()));
    headers.insert(
        "x-latex-content",
        header_value(&percent_encode(outcome.document.as_str()))?,
    );
    headers.insert("x-request-id", header_value(&outcome.request_id.to_string())?);

    Ok((StatusCode::OK, headers, outcome.artifact.bytes).into_response())
}

/// `Resume_<ddmmyyyy>.<ext>` using the server's local date.
fn download_filename(extension: &str) -> String {
    format!("Resume_{}.{extension}", chrono::Local::now().format("%d%m%Y"))
}

/// Percent-encodes text so it survives as a header value; spaces become `%20`.
fn percent_encode(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid header value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_encode_round_trips_latex() {
        let latex = "\\section{Skills} Go & gRPC, 100%\n";
        let encoded = percent_encode(latex);

        assert!(!encoded.contains(' '));
        assert!(!encoded.contains('+'));
        assert!(encoded.contains("%20"));
        let decoded: String = url::form_urlencoded::parse(format!("x={encoded}").as_bytes())
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(decoded, latex);
    }

    #[test]
    fn test_download_filename_shape() {
        let name = download_filename("pdf");
        assert!(name.starts_with("Resume_"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), "Resume_ddmmyyyy.pdf".len());
    }

    #[test]
    fn test_request_accepts_camel_case_and_keyword_forms() {
        let req: TailorRequest =
            serde_json::from_str(r#"{"jobDescription": "Senior Go Engineer"}"#).unwrap();
        assert_eq!(req.job_description.as_deref(), Some("Senior Go Engineer"));
        assert!(req.keywords.is_none());

        let req: TailorRequest = serde_json::from_str(r#"{"keywords": ["Go", "gRPC"]}"#).unwrap();
        assert_eq!(req.keywords.unwrap().normalize(), vec!["Go", "gRPC"]);
    }
}
