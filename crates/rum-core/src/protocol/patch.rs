//! Chunk append: PATCH the session URL with the body at a declared offset.

use super::{build_headers, check_status, parse_header, Auth, CHUNK_TIMEOUT, CONNECT_TIMEOUT};
use crate::retry::TransferError;

/// Send one chunk starting at `offset`. Returns the server's new confirmed
/// offset, which must equal `offset + body.len()`; anything else is an
/// `OffsetMismatch` carrying the server's value so the loop can adopt it.
pub fn send_chunk(
    session_url: &str,
    auth: &Auth,
    offset: u64,
    body: &[u8],
) -> Result<u64, TransferError> {
    let mut headers: Vec<String> = Vec::new();
    let mut sent = 0usize;

    let mut easy = curl::easy::Easy::new();
    easy.url(session_url)?;
    easy.custom_request("PATCH")?;
    easy.upload(true)?;
    easy.in_filesize(body.len() as u64)?;
    easy.connect_timeout(CONNECT_TIMEOUT)?;
    easy.timeout(CHUNK_TIMEOUT)?;

    let extra = vec![
        format!("Upload-Offset: {offset}"),
        "Content-Type: application/offset+octet-stream".to_string(),
        "Expect:".to_string(), // avoid 100-continue stalls on chunk bodies
    ];
    easy.http_headers(build_headers(auth, &extra)?)?;

    {
        let mut transfer = easy.transfer();
        transfer.read_function(|buf| {
            let n = buf.len().min(body.len() - sent);
            buf[..n].copy_from_slice(&body[sent..sent + n]);
            sent += n;
            Ok(n)
        })?;
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

    let server_offset = parse_header(&headers, "Upload-Offset")
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or(TransferError::MissingHeader("Upload-Offset"))?;

    let expected = offset + body.len() as u64;
    if server_offset != expected {
        return Err(TransferError::OffsetMismatch {
            expected,
            server: server_offset,
        });
    }

    Ok(server_offset)
}
