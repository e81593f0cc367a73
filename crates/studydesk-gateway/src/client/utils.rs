use crate::client::error::{GatewayError, Result};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))
}

// The backend reports failures as `{"error": "..."}`; fall back to the raw body,
// then to the status reason.
pub fn backend_error(status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    GatewayError::Backend {
        status: status.as_u16(),
        message,
    }
}

/// Appends percent-encoded path segments to `base` + `path`.
pub fn endpoint_with_segments(base: &str, path: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(&format!("{base}{path}"))
        .map_err(|e| GatewayError::Validation(format!("invalid base url '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| GatewayError::Validation(format!("base url '{base}' cannot take a path")))?
        .extend(segments);
    Ok(url)
}

/// Resolves a backend-relative asset path (e.g. `/api/audio/x.mp3`) against the
/// backend origin. Absolute URLs pass through.
pub fn resolve_against(base: &str, asset: &str) -> Result<String> {
    let base = Url::parse(base)
        .map_err(|e| GatewayError::Validation(format!("invalid base url '{base}': {e}")))?;
    base.join(asset.trim())
        .map(|url| url.to_string())
        .map_err(|e| GatewayError::Validation(format!("invalid asset url '{asset}': {e}")))
}
