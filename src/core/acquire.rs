use std::path::Path;

use image::DynamicImage;

use crate::core::error::MeterError;

/// Literal left in front of the URL when it is embedded as a path segment.
const URL_PREFIX_ARTIFACT: &str = "file_url=";

/// Extensions accepted by the upload controls.
pub const UPLOAD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Strip exactly one leading `file_url=` if present.
pub fn strip_url_prefix(raw: &str) -> &str {
    raw.strip_prefix(URL_PREFIX_ARTIFACT).unwrap_or(raw)
}

/// True when `name` has one of the [`UPLOAD_EXTENSIONS`] (case-insensitive).
pub fn is_supported_upload(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| UPLOAD_EXTENSIONS.iter().any(|ok| e.eq_ignore_ascii_case(ok)))
        .unwrap_or(false)
}

/// Decode an uploaded payload into a raster.
pub fn decode_upload(bytes: &[u8]) -> Result<DynamicImage, MeterError> {
    if bytes.is_empty() {
        return Err(MeterError::DecodeFailed("empty image payload".to_string()));
    }
    image::load_from_memory(bytes).map_err(|e| MeterError::DecodeFailed(e.to_string()))
}

/// Download `url` with a single GET and decode the body.
pub async fn fetch_image(http: &reqwest::Client, url: &str) -> Result<DynamicImage, MeterError> {
    let url = strip_url_prefix(url);
    tracing::debug!(%url, "downloading meter image");

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| MeterError::DownloadFailed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MeterError::DownloadFailed(format!("HTTP {}", status.as_u16())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MeterError::DownloadFailed(e.to_string()))?;

    decode_upload(&bytes)
}
