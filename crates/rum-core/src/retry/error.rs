//! Transfer error type for retry classification.

/// Error from one protocol request (session open, offset probe, chunk PATCH).
/// Typed so the retry policy can classify before anything is folded into anyhow.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// The server acknowledged a different offset than the bytes we sent.
    /// The upload loop adopts the server offset and continues.
    #[error("offset mismatch: expected {expected}, server reports {server}")]
    OffsetMismatch { expected: u64, server: u64 },
    /// A required response header was absent (protocol violation).
    #[error("response missing {0} header")]
    MissingHeader(&'static str),
    /// Reading the source file failed (file moved or truncated mid-transfer).
    #[error("source read: {0}")]
    Source(#[from] std::io::Error),
    /// The transfer was aborted by pause/cancel.
    #[error("transfer aborted")]
    Aborted,
}
