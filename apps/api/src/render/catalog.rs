//! Named backend presets. The active list and its order come from configuration;
//! nothing here decides which backend is preferred.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::render::backend::{HttpBackend, RenderBackend, RequestFormat, ResponseShape};
use crate::render::local::LocalLatexBackend;

pub const LATEXONLINE_URL: &str = "https://latexonline.cc/compile";
pub const TEXLIVE_URL: &str = "https://texlive.net/run";
pub const RTEX_URL: &str = "https://rtex.probablyaweb.site/api/v2";
pub const QUICKLATEX_URL: &str = "https://quicklatex.com/latex3.f";

/// Every name accepted in `RENDER_BACKENDS`.
pub const KNOWN_BACKENDS: &[&str] = &[
    "latexonline",
    "texlive",
    "rtex",
    "quicklatex",
    "base64json",
    "local",
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown render backend '{name}' (known: {known})")]
    UnknownBackend { name: String, known: String },

    #[error("render backend '{0}' requires an endpoint URL but none is configured")]
    MissingEndpoint(String),

    #[error("failed to build HTTP client for render backends: {0}")]
    Client(#[from] reqwest::Error),
}

/// Endpoints and knobs for every preset. Built from the environment by `Config`.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub latexonline_url: Url,
    pub texlive_url: Url,
    pub rtex_url: Url,
    pub quicklatex_url: Url,
    /// No public default; must be set to use `base64json`.
    pub base64json_url: Option<Url>,
    pub latex_command: String,
    pub scratch_dir: PathBuf,
    pub timeout: Duration,
}

/// Builds the backends named in `names`, in that order.
pub fn build_backends(
    names: &[String],
    settings: &RenderSettings,
) -> Result<Vec<Arc<dyn RenderBackend>>, CatalogError> {
    let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
    names
        .iter()
        .map(|name| build_backend(name, settings, &client))
        .collect()
}

fn build_backend(
    name: &str,
    settings: &RenderSettings,
    client: &reqwest::Client,
) -> Result<Arc<dyn RenderBackend>, CatalogError> {
    let backend: Arc<dyn RenderBackend> = match name {
        "latexonline" => Arc::new(HttpBackend::new(
            name,
            settings.latexonline_url.clone(),
            RequestFormat::Form {
                field: "text".to_string(),
                params: params(&[("command", "pdflatex")]),
            },
            ResponseShape::RawBinary,
            client.clone(),
        )),
        "texlive" => Arc::new(HttpBackend::new(
            name,
            settings.texlive_url.clone(),
            RequestFormat::Json {
                field: "code".to_string(),
                params: params(&[("format", "pdf")]),
            },
            ResponseShape::RawBinary,
            client.clone(),
        )),
        "rtex" => Arc::new(HttpBackend::new(
            name,
            settings.rtex_url.clone(),
            RequestFormat::Json {
                field: "code".to_string(),
                params: params(&[("format", "pdf")]),
            },
            ResponseShape::JsonFollowupUrl {
                status_pointer: "/status".to_string(),
                success_value: "success".to_string(),
                reference_pointer: "/filename".to_string(),
            },
            client.clone(),
        )),
        "quicklatex" => Arc::new(HttpBackend::new(
            name,
            settings.quicklatex_url.clone(),
            RequestFormat::Form {
                field: "formula".to_string(),
                params: params(&[("fsize", "12px"), ("fcolor", "000000"), ("mode", "0"), ("out", "1")]),
            },
            ResponseShape::LineProtocol,
            client.clone(),
        )),
        "base64json" => {
            let url = settings
                .base64json_url
                .clone()
                .ok_or_else(|| CatalogError::MissingEndpoint(name.to_string()))?;
            Arc::new(HttpBackend::new(
                name,
                url,
                RequestFormat::Json {
                    field: "source".to_string(),
                    params: params(&[("engine", "pdflatex")]),
                },
                ResponseShape::JsonBase64 {
                    status_pointer: "/result/status".to_string(),
                    success_value: "success".to_string(),
                    payload_pointer: "/result/pdf".to_string(),
                },
                client.clone(),
            ))
        }
        "local" => Arc::new(LocalLatexBackend::new(
            settings.latex_command.clone(),
            settings.scratch_dir.clone(),
            settings.timeout,
        )),
        other => {
            return Err(CatalogError::UnknownBackend {
                name: other.to_string(),
                known: KNOWN_BACKENDS.join(", "),
            })
        }
    };
    Ok(backend)
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
