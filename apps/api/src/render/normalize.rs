//! One normalizer per [`ResponseShape`] variant.
//!
//! Every normalizer turns a successful response body into either the artifact bytes
//! or a URL that still has to be fetched. Size checks happen afterwards, on the final
//! bytes, so every shape is judged by the same threshold.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde_json::Value;
use url::Url;

use crate::render::backend::{excerpt, BackendFailure, ResponseShape};

/// Line-protocol status meaning success.
const LINE_PROTOCOL_OK: &str = "0";

/// Result of interpreting a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Payload(Bytes),
    FollowUp(Url),
}

/// Dispatches on the declared shape. `base` resolves relative follow-up references.
pub fn normalize(
    shape: &ResponseShape,
    body: Bytes,
    base: Option<&Url>,
) -> Result<Normalized, BackendFailure> {
    match shape {
        ResponseShape::RawBinary => Ok(normalize_raw_binary(body)),
        ResponseShape::JsonBase64 {
            status_pointer,
            success_value,
            payload_pointer,
        } => normalize_json_base64(&body, status_pointer, success_value, payload_pointer),
        ResponseShape::JsonFollowupUrl {
            status_pointer,
            success_value,
            reference_pointer,
        } => normalize_json_followup(&body, status_pointer, success_value, reference_pointer, base),
        ResponseShape::LineProtocol => normalize_line_protocol(&body, base),
    }
}

fn normalize_raw_binary(body: Bytes) -> Normalized {
    Normalized::Payload(body)
}

fn normalize_json_base64(
    body: &[u8],
    status_pointer: &str,
    success_value: &str,
    payload_pointer: &str,
) -> Result<Normalized, BackendFailure> {
    let envelope = parse_envelope(body)?;
    check_status(&envelope, status_pointer, success_value)?;

    let encoded = string_at(&envelope, payload_pointer)?;
    // Some services wrap the payload at 76 columns.
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| BackendFailure::Malformed(format!("invalid base64 at {payload_pointer}: {e}")))?;

    Ok(Normalized::Payload(Bytes::from(decoded)))
}

fn normalize_json_followup(
    body: &[u8],
    status_pointer: &str,
    success_value: &str,
    reference_pointer: &str,
    base: Option<&Url>,
) -> Result<Normalized, BackendFailure> {
    let envelope = parse_envelope(body)?;
    check_status(&envelope, status_pointer, success_value)?;

    let reference = string_at(&envelope, reference_pointer)?;
    Ok(Normalized::FollowUp(resolve_reference(reference, base)?))
}

fn normalize_line_protocol(body: &[u8], base: Option<&Url>) -> Result<Normalized, BackendFailure> {
    let text = String::from_utf8_lossy(body);
    let mut lines = text.lines();

    let status = lines
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BackendFailure::Malformed("empty line-protocol response".to_string()))?;

    if status != LINE_PROTOCOL_OK {
        let detail: Vec<&str> = lines.skip(1).map(str::trim).filter(|l| !l.is_empty()).collect();
        return Err(BackendFailure::Rejected(format!(
            "status {status}: {}",
            excerpt(&detail.join(" "))
        )));
    }

    // Second line: `<url> <width> <height> <baseline>`
    let reference = lines
        .next()
        .and_then(|line| line.split_whitespace().next())
        .ok_or_else(|| BackendFailure::Malformed("line-protocol response has no result URL".to_string()))?;

    Ok(Normalized::FollowUp(resolve_reference(reference, base)?))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn parse_envelope(body: &[u8]) -> Result<Value, BackendFailure> {
    serde_json::from_slice(body).map_err(|e| {
        BackendFailure::Malformed(format!(
            "expected JSON envelope ({e}): {}",
            excerpt(&String::from_utf8_lossy(body))
        ))
    })
}

fn check_status(envelope: &Value, pointer: &str, success_value: &str) -> Result<(), BackendFailure> {
    let status = envelope
        .pointer(pointer)
        .ok_or_else(|| BackendFailure::Malformed(format!("missing status field {pointer}")))?;

    let status = match status {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if status == success_value {
        Ok(())
    } else {
        let detail = ["/log", "/error", "/message", "/description"]
            .iter()
            .find_map(|p| envelope.pointer(p).and_then(Value::as_str))
            .map(|d| format!(": {}", excerpt(d)))
            .unwrap_or_default();
        Err(BackendFailure::Rejected(format!("status '{status}'{detail}")))
    }
}

fn string_at<'a>(envelope: &'a Value, pointer: &str) -> Result<&'a str, BackendFailure> {
    envelope
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| BackendFailure::Malformed(format!("missing string field {pointer}")))
}

fn resolve_reference(reference: &str, base: Option<&Url>) -> Result<Url, BackendFailure> {
    match Url::parse(reference) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .ok_or_else(|| {
                BackendFailure::Malformed(format!("relative reference '{reference}' without a base URL"))
            })?
            .join(reference)
            .map_err(|e| BackendFailure::Malformed(format!("bad reference '{reference}': {e}"))),
        Err(e) => Err(BackendFailure::Malformed(format!("bad reference '{reference}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base64_shape() -> ResponseShape {
        ResponseShape::JsonBase64 {
            status_pointer: "/result/status".to_string(),
            success_value: "success".to_string(),
            payload_pointer: "/result/pdf".to_string(),
        }
    }

    fn followup_shape() -> ResponseShape {
        ResponseShape::JsonFollowupUrl {
            status_pointer: "/status".to_string(),
            success_value: "success".to_string(),
            reference_pointer: "/filename".to_string(),
        }
    }

    fn json_body(value: serde_json::Value) -> Bytes {
        Bytes::from(serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn test_raw_binary_passes_body_through() {
        let body = Bytes::from_static(b"%PDF-1.5 whatever");
        assert_eq!(
            normalize(&ResponseShape::RawBinary, body.clone(), None).unwrap(),
            Normalized::Payload(body)
        );
    }

    #[test]
    fn test_json_base64_decodes_nested_payload() {
        let encoded = STANDARD.encode(b"%PDF-1.7 resume");
        let body = json_body(json!({"result": {"status": "success", "pdf": encoded}}));

        let normalized = normalize(&base64_shape(), body, None).unwrap();

        assert_eq!(
            normalized,
            Normalized::Payload(Bytes::from_static(b"%PDF-1.7 resume"))
        );
    }

    #[test]
    fn test_json_base64_tolerates_wrapped_lines() {
        let encoded = STANDARD.encode(b"%PDF-1.7 a somewhat longer payload");
        let (a, b) = encoded.split_at(10);
        let body = json_body(json!({"result": {"status": "success", "pdf": format!("{a}\n{b}")}}));

        assert!(matches!(
            normalize(&base64_shape(), body, None).unwrap(),
            Normalized::Payload(_)
        ));
    }

    #[test]
    fn test_json_base64_rejects_error_status_with_log() {
        let body = json_body(json!({
            "result": {"status": "error"},
            "log": "! LaTeX Error: File `fontawesome5.sty' not found."
        }));

        let err = normalize(&base64_shape(), body, None).unwrap_err();

        match err {
            BackendFailure::Rejected(reason) => {
                assert!(reason.contains("status 'error'"));
                assert!(reason.contains("fontawesome5.sty"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_json_base64_rejects_invalid_base64() {
        let body = json_body(json!({"result": {"status": "success", "pdf": "@@not base64@@"}}));
        assert!(matches!(
            normalize(&base64_shape(), body, None),
            Err(BackendFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_json_envelope_must_be_json() {
        let body = Bytes::from_static(b"<html>502 Bad Gateway</html>");
        assert!(matches!(
            normalize(&followup_shape(), body, None),
            Err(BackendFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_json_missing_status_is_malformed() {
        let body = json_body(json!({"filename": "abc.pdf"}));
        assert_eq!(
            normalize(&followup_shape(), body, None).unwrap_err(),
            BackendFailure::Malformed("missing status field /status".to_string())
        );
    }

    #[test]
    fn test_json_followup_resolves_relative_reference() {
        let base = Url::parse("https://rtex.example/api/v2/").unwrap();
        let body = json_body(json!({"status": "success", "filename": "f00d.pdf"}));

        let normalized = normalize(&followup_shape(), body, Some(&base)).unwrap();

        assert_eq!(
            normalized,
            Normalized::FollowUp(Url::parse("https://rtex.example/api/v2/f00d.pdf").unwrap())
        );
    }

    #[test]
    fn test_json_followup_keeps_absolute_reference() {
        let body = json_body(json!({"status": "success", "filename": "https://cdn.example/x.pdf"}));
        assert_eq!(
            normalize(&followup_shape(), body, None).unwrap(),
            Normalized::FollowUp(Url::parse("https://cdn.example/x.pdf").unwrap())
        );
    }

    #[test]
    fn test_json_followup_relative_without_base_is_malformed() {
        let body = json_body(json!({"status": "success", "filename": "f00d.pdf"}));
        assert!(matches!(
            normalize(&followup_shape(), body, None),
            Err(BackendFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_numeric_status_compares_as_text() {
        let shape = ResponseShape::JsonFollowupUrl {
            status_pointer: "/code".to_string(),
            success_value: "0".to_string(),
            reference_pointer: "/url".to_string(),
        };
        let body = json_body(json!({"code": 0, "url": "https://cdn.example/x.pdf"}));
        assert!(normalize(&shape, body, None).is_ok());
    }

    #[test]
    fn test_line_protocol_success_returns_followup_url() {
        let body = Bytes::from_static(b"0\r\nhttps://quicklatex.example/cache3/ql_1.png 612 792 0\r\n");

        let normalized = normalize(&ResponseShape::LineProtocol, body, None).unwrap();

        assert_eq!(
            normalized,
            Normalized::FollowUp(Url::parse("https://quicklatex.example/cache3/ql_1.png").unwrap())
        );
    }

    #[test]
    fn test_line_protocol_error_status_is_rejected() {
        let body = Bytes::from_static(
            b"-1\r\nhttps://quicklatex.example/cache3/error.png 0 0 0\r\nUndefined control sequence\r\n",
        );

        let err = normalize(&ResponseShape::LineProtocol, body, None).unwrap_err();

        assert_eq!(
            err,
            BackendFailure::Rejected("status -1: Undefined control sequence".to_string())
        );
    }

    #[test]
    fn test_line_protocol_without_url_is_malformed() {
        let body = Bytes::from_static(b"0\r\n");
        assert!(matches!(
            normalize(&ResponseShape::LineProtocol, body, None),
            Err(BackendFailure::Malformed(_))
        ));
        assert!(matches!(
            normalize(&ResponseShape::LineProtocol, Bytes::new(), None),
            Err(BackendFailure::Malformed(_))
        ));
    }
}
