//! The sequential chunk loop.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::chunker;
use crate::protocol::{self, Auth};
use crate::retry::{classify, is_terminal, run_with_retry, RetryPolicy, TransferError};
use crate::source::SourceFile;

use super::phase::{apply, Event, Phase};
use super::{UploadOutcome, UploadSummary};

/// Consecutive offset-mismatch adoptions without forward progress before the
/// transfer gives up (recoverably).
const MAX_STALLS: u32 = 3;

/// Transfer the source from `start_offset` to the end of the file.
///
/// Sends confirmed offsets on `progress_tx` after each acknowledged chunk so
/// the caller can persist durable progress. Runs on the calling thread; call
/// from `spawn_blocking` in async code.
#[allow(clippy::too_many_arguments)]
pub fn run_upload(
    session_url: &str,
    auth: &Auth,
    source: &mut SourceFile,
    chunk_size: u64,
    start_offset: u64,
    policy: &RetryPolicy,
    abort: &AtomicBool,
    progress_tx: Option<&tokio::sync::mpsc::Sender<u64>>,
    summary_out: &mut UploadSummary,
) -> UploadOutcome {
    *summary_out = UploadSummary::default();
    let total = source.size();
    let chunk_size = chunk_size.max(1);

    let mut phase = Phase::Transferring;
    let mut reason = String::new();
    let mut offset = start_offset;
    let mut stalls = 0u32;

    while let Some(chunk) = chunker::next_chunk(total, chunk_size, offset) {
        if abort.load(Ordering::Relaxed) {
            phase = apply(phase, Event::AbortRequested);
            reason = "paused by user".to_string();
            break;
        }

        let body = match source.read_chunk(chunk.start, chunk.len() as usize) {
            Ok(b) => b,
            Err(e) => {
                phase = apply(phase, Event::TerminalFailure);
                reason = format!("source file changed during upload: {e}");
                break;
            }
        };

        let attempts = Cell::new(0u32);
        let result = run_with_retry(policy, abort, || {
            attempts.set(attempts.get() + 1);
            protocol::send_chunk(session_url, auth, offset, &body)
        });
        summary_out.retries += attempts.get().saturating_sub(1);

        match result {
            Ok(new_offset) => {
                summary_out.chunks_sent += 1;
                summary_out.bytes_sent += body.len() as u64;
                offset = new_offset;
                stalls = 0;
                phase = apply(phase, Event::ChunkAcked);
                if let Some(tx) = progress_tx {
                    let _ = tx.try_send(offset);
                }
            }
            Err(TransferError::Aborted) => {
                phase = apply(phase, Event::AbortRequested);
                reason = "paused by user".to_string();
                break;
            }
            Err(TransferError::OffsetMismatch { expected, server }) => {
                // The server's word on the offset is authoritative; adopt it
                // and continue. Repeated adoption with no forward progress
                // means the session is wedged, which is still resumable.
                tracing::warn!(
                    expected,
                    server,
                    "server acknowledged a different offset; adopting"
                );
                if server <= offset {
                    stalls += 1;
                    if stalls >= MAX_STALLS {
                        phase = apply(phase, Event::RetriesExhausted);
                        reason = format!(
                            "no forward progress at offset {offset} (server reports {server})"
                        );
                        break;
                    }
                } else {
                    stalls = 0;
                }
                offset = server.min(total);
                if let Some(tx) = progress_tx {
                    let _ = tx.try_send(offset);
                }
            }
            Err(e) => {
                let kind = classify(&e);
                if is_terminal(kind) {
                    phase = apply(phase, Event::TerminalFailure);
                    reason = format!("chunk at offset {offset} rejected: {e}");
                } else {
                    phase = apply(phase, Event::RetriesExhausted);
                    reason = format!("retries exhausted at offset {offset}: {e}");
                }
                break;
            }
        }
    }

    if phase == Phase::Transferring && offset >= total {
        phase = apply(phase, Event::AllBytesAcked);
    }

    match phase {
        Phase::Completed => UploadOutcome::Completed,
        Phase::Paused => UploadOutcome::Paused { reason },
        Phase::Errored => UploadOutcome::Errored { reason },
        // Only reachable when total == 0, which validation rejects upstream.
        Phase::Opening | Phase::Transferring => UploadOutcome::Completed,
    }
}
