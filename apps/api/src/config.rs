use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::document::ValidationMode;
use crate::generation::client::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use crate::llm_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::render::catalog::{
    RenderSettings, KNOWN_BACKENDS, LATEXONLINE_URL, QUICKLATEX_URL, RTEX_URL, TEXLIVE_URL,
};
use crate::render::orchestrator::DEFAULT_MIN_ARTIFACT_BYTES;

const DEFAULT_BACKENDS: &str = "latexonline,texlive";
const DEFAULT_TEMPLATE_PATH: &str = "resume-template/resume.tex";

/// Application configuration loaded from environment variables.
/// Fails at startup on malformed values; a missing API key is allowed and reported
/// per request as "provider not configured".
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub generation_max_attempts: u32,
    pub generation_base_delay: Duration,
    /// Backend names in the order they are tried.
    pub render_backends: Vec<String>,
    pub render: RenderSettings,
    pub min_artifact_bytes: usize,
    pub resume_template_path: PathBuf,
    pub validation_mode: ValidationMode,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let render_backends = parse_backend_list(
            &get("RENDER_BACKENDS").unwrap_or_else(|| DEFAULT_BACKENDS.to_string()),
        )?;

        let render = RenderSettings {
            latexonline_url: parse_url(&get, "LATEXONLINE_URL", LATEXONLINE_URL)?,
            texlive_url: parse_url(&get, "TEXLIVE_URL", TEXLIVE_URL)?,
            rtex_url: parse_url(&get, "RTEX_URL", RTEX_URL)?,
            quicklatex_url: parse_url(&get, "QUICKLATEX_URL", QUICKLATEX_URL)?,
            base64json_url: get("BASE64JSON_URL")
                .map(|v| Url::parse(&v).context("BASE64JSON_URL must be a valid URL"))
                .transpose()?,
            latex_command: get("LATEX_COMMAND").unwrap_or_else(|| "pdflatex".to_string()),
            scratch_dir: get("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("resume-tailor")),
            timeout: Duration::from_secs(parse_or(&get, "RENDER_TIMEOUT_SECS", 60u64)?),
        };

        Ok(Config {
            port: parse_or(&get, "PORT", 8080u16)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            generation_max_attempts: parse_or(&get, "GENERATION_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            generation_base_delay: Duration::from_millis(parse_or(
                &get,
                "GENERATION_BASE_DELAY_MS",
                DEFAULT_BASE_DELAY.as_millis() as u64,
            )?),
            render_backends,
            render,
            min_artifact_bytes: parse_or(&get, "MIN_ARTIFACT_BYTES", DEFAULT_MIN_ARTIFACT_BYTES)?,
            resume_template_path: get("RESUME_TEMPLATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_PATH)),
            validation_mode: get("VALIDATION_MODE")
                .map(|v| v.parse::<ValidationMode>())
                .transpose()
                .map_err(anyhow::Error::msg)
                .context("VALIDATION_MODE is invalid")?
                .unwrap_or_default(),
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_url(get: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<Url> {
    let raw = get(key).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).with_context(|| format!("{key} must be a valid URL, got '{raw}'"))
}

/// Splits `a, b ,c` into names, keeping order. Unknown names fail startup.
fn parse_backend_list(raw: &str) -> Result<Vec<String>> {
    let names: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    if names.is_empty() {
        bail!("RENDER_BACKENDS must name at least one backend");
    }
    if let Some(unknown) = names.iter().find(|n| !KNOWN_BACKENDS.contains(&n.as_str())) {
        bail!(
            "RENDER_BACKENDS contains unknown backend '{unknown}' (known: {})",
            KNOWN_BACKENDS.join(", ")
        );
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.gemini_api_key, None);
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.generation_max_attempts, 3);
        assert_eq!(config.generation_base_delay, Duration::from_millis(2000));
        assert_eq!(config.render_backends, vec!["latexonline", "texlive"]);
        assert_eq!(config.min_artifact_bytes, 1000);
        assert_eq!(config.validation_mode, ValidationMode::Blocking);
        assert_eq!(
            config.resume_template_path,
            PathBuf::from("resume-template/resume.tex")
        );
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("GEMINI_API_KEY", "k"),
            ("RENDER_BACKENDS", " Local , rtex"),
            ("VALIDATION_MODE", "advisory"),
            ("GENERATION_BASE_DELAY_MS", "10"),
            ("BASE64JSON_URL", "https://render.example/compile"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.gemini_api_key.as_deref(), Some("k"));
        assert_eq!(config.render_backends, vec!["local", "rtex"]);
        assert_eq!(config.validation_mode, ValidationMode::Advisory);
        assert_eq!(config.generation_base_delay, Duration::from_millis(10));
        assert!(config.render.base64json_url.is_some());
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let config = config_from(&[("GEMINI_API_KEY", "   ")]).unwrap();
        assert_eq!(config.gemini_api_key, None);
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("RENDER_BACKENDS", "latexonline,overleaf")]).is_err());
        assert!(config_from(&[("RENDER_BACKENDS", " , ")]).is_err());
        assert!(config_from(&[("VALIDATION_MODE", "strict")]).is_err());
        assert!(config_from(&[("RTEX_URL", "not a url")]).is_err());
    }
}
