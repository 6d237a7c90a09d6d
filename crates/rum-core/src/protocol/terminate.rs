//! Session terminate: DELETE so the server frees partial-upload resources.

use super::{build_headers, check_status, Auth, CONNECT_TIMEOUT, REQUEST_TIMEOUT};
use crate::retry::TransferError;

/// Ask the server to discard the session and any partial data. Callers treat
/// failure as non-fatal (local cancellation proceeds regardless).
pub fn terminate_session(session_url: &str, auth: &Auth) -> Result<(), TransferError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(session_url)?;
    easy.custom_request("DELETE")?;
    easy.connect_timeout(CONNECT_TIMEOUT)?;
    easy.timeout(REQUEST_TIMEOUT)?;
    easy.http_headers(build_headers(auth, &[])?)?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| Ok(data.len()))?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    check_status(code)
}
