//! User-facing rendering of [`ArmisError`]

use armis_domain::ArmisError;
use reqwest::StatusCode;
use serde_json::Value;

/// Human-readable description of `error`.
///
/// API errors render as `API error: <status> <reason>` followed by the body,
/// pretty-printed when it is JSON and verbatim otherwise.
pub fn describe(error: &ArmisError) -> String {
    match error {
        ArmisError::Api { status, body } => {
            format!("API error: {}\n{}", status_line(*status), render_body(body))
        }
        other => other.to_string(),
    }
}

/// `403 Forbidden`, or just the number for non-standard codes.
pub fn status_line(status: u16) -> String {
    let reason = StatusCode::from_u16(status).ok().and_then(|code| code.canonical_reason());
    match reason {
        Some(reason) => format!("{status} {reason}"),
        None => status.to_string(),
    }
}

/// Pretty JSON when the body parses, lossy UTF-8 text otherwise.
pub fn render_body(body: &[u8]) -> String {
    if body.iter().all(u8::is_ascii_whitespace) {
        return "<empty body>".to_string();
    }
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}
