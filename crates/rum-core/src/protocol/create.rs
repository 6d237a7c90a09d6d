//! Session open: POST to the ingest endpoint, session URL from `Location`.

use super::{build_headers, check_status, parse_header, Auth, CONNECT_TIMEOUT, REQUEST_TIMEOUT};
use crate::retry::TransferError;

/// A freshly opened remote upload session.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    /// Absolute URL of the resumable session resource.
    pub session_url: String,
}

/// Open a new remote session for `upload_length` bytes.
///
/// `metadata` is the already-encoded `Upload-Metadata` value (see
/// `crate::metadata::encode_metadata`); pass an empty string to omit it.
pub fn create_session(
    endpoint: &str,
    auth: &Auth,
    upload_length: u64,
    metadata: &str,
) -> Result<CreatedSession, TransferError> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(endpoint)?;
    easy.post(true)?;
    easy.post_field_size(0)?;
    easy.follow_location(true)?;
    easy.connect_timeout(CONNECT_TIMEOUT)?;
    easy.timeout(REQUEST_TIMEOUT)?;

    let mut extra = vec![format!("Upload-Length: {upload_length}")];
    if !metadata.is_empty() {
        extra.push(format!("Upload-Metadata: {metadata}"));
    }
    easy.http_headers(build_headers(auth, &extra)?)?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = std::str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|data| Ok(data.len()))?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    check_status(code)?;

    let location =
        parse_header(&headers, "Location").ok_or(TransferError::MissingHeader("Location"))?;
    let session_url =
        resolve_location(endpoint, &location).ok_or(TransferError::MissingHeader("Location"))?;

    Ok(CreatedSession { session_url })
}

/// Absolute-ize a `Location` value against the endpoint it came from.
/// Returns None when neither parses.
fn resolve_location(endpoint: &str, location: &str) -> Option<String> {
    if let Ok(abs) = url::Url::parse(location) {
        return Some(abs.to_string());
    }
    let base = url::Url::parse(endpoint).ok()?;
    Some(base.join(location).ok()?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_absolute_location() {
        assert_eq!(
            resolve_location(
                "https://ingest.example.com/videos",
                "https://ingest.example.com/files/42"
            )
            .as_deref(),
            Some("https://ingest.example.com/files/42")
        );
    }

    #[test]
    fn resolve_relative_location() {
        assert_eq!(
            resolve_location("https://ingest.example.com/videos", "/files/42").as_deref(),
            Some("https://ingest.example.com/files/42")
        );
        assert_eq!(
            resolve_location("http://127.0.0.1:8080/", "files/7").as_deref(),
            Some("http://127.0.0.1:8080/files/7")
        );
    }

    #[test]
    fn resolve_garbage_is_none() {
        assert!(resolve_location("not a url", "also not a url").is_none());
    }
}
