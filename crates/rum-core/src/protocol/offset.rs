//! Offset probe: HEAD on the session URL, confirmed offset from `Upload-Offset`.

use super::{build_headers, check_status, parse_header, Auth, CONNECT_TIMEOUT, REQUEST_TIMEOUT};
use crate::retry::TransferError;

/// Ask the server how many bytes it has durably accepted for this session.
///
/// A 404/410 here means the session expired server-side; callers reconcile
/// by opening a fresh session (see `crate::safe_resume`).
pub fn probe_offset(session_url: &str, auth: &Auth) -> Result<u64, TransferError> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(session_url)?;
    easy.nobody(true)?; // HEAD request
    easy.connect_timeout(CONNECT_TIMEOUT)?;
    easy.timeout(REQUEST_TIMEOUT)?;
    easy.http_headers(build_headers(auth, &[])?)?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = std::str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    check_status(code)?;

    parse_header(&headers, "Upload-Offset")
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or(TransferError::MissingHeader("Upload-Offset"))
}
