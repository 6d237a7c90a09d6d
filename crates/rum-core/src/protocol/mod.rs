//! Wire client for the offset-based resumable upload protocol.
//!
//! The server contract: POST to the ingest endpoint opens a session and
//! returns its URL in `Location`; HEAD on the session URL reports the
//! confirmed byte offset in `Upload-Offset`; PATCH appends bytes at the
//! offset named in the request's `Upload-Offset` header and returns the new
//! offset; DELETE discards the session and its partial data. All requests
//! carry the same bearer token. Out-of-band metadata rides the
//! `Upload-Metadata` header (see `crate::metadata` for the encoding).
//!
//! Requests run on the calling thread; call from `spawn_blocking` in async code.

mod create;
mod offset;
mod patch;
mod terminate;

pub use create::{create_session, CreatedSession};
pub use offset::probe_offset;
pub use patch::send_chunk;
pub use terminate::terminate_session;

use crate::retry::TransferError;
use std::time::Duration;

pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// PATCH bodies can be a full chunk; allow more time than control requests.
pub(crate) const CHUNK_TIMEOUT: Duration = Duration::from_secs(300);

/// Bearer credentials applied to every protocol request.
#[derive(Debug, Clone, Default)]
pub struct Auth {
    token: Option<String>,
}

impl Auth {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }

    /// Read the token from the named environment variable; anonymous if unset.
    pub fn from_env(var: &str) -> Self {
        match std::env::var(var) {
            Ok(token) if !token.is_empty() => Self::bearer(token),
            _ => Self::anonymous(),
        }
    }

    pub(crate) fn header_lines(&self) -> Vec<String> {
        let mut lines = vec!["X-Upload-Client: rum/0.1".to_string()];
        if let Some(token) = &self.token {
            lines.push(format!("Authorization: Bearer {token}"));
        }
        lines
    }
}

/// Build the curl header list: auth headers plus request-specific ones.
pub(crate) fn build_headers(
    auth: &Auth,
    extra: &[String],
) -> Result<curl::easy::List, curl::Error> {
    let mut list = curl::easy::List::new();
    for line in auth.header_lines().iter().chain(extra.iter()) {
        list.append(line)?;
    }
    Ok(list)
}

/// Case-insensitive lookup of a response header value in captured lines.
pub(crate) fn parse_header(lines: &[String], name: &str) -> Option<String> {
    for line in lines {
        if let Some((n, v)) = line.split_once(':') {
            if n.trim().eq_ignore_ascii_case(name) {
                return Some(v.trim().to_string());
            }
        }
    }
    None
}

/// Map a non-2xx response code to a transfer error.
pub(crate) fn check_status(code: u32) -> Result<(), TransferError> {
    if (200..300).contains(&code) {
        Ok(())
    } else {
        Err(TransferError::Http(code))
    }
}
