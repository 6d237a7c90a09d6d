//! Run one session: validate, ensure a remote session, transfer, finalize.

use anyhow::{Context, Result};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::UploadConfig;
use crate::control::UploadControl;
use crate::fingerprint;
use crate::media_type;
use crate::protocol::{self, Auth};
use crate::retry::{classify, is_terminal, run_with_retry, ErrorKind, RetryPolicy, TransferError};
use crate::safe_resume::{self, CandidateSource, Reconciled};
use crate::session_db::{SessionDb, SessionId, SessionRecord, SessionState};

use super::execute::execute_transfer_phase;
use super::SessionProgress;

/// How one orchestrated run ended. Infrastructure failures (store I/O, task
/// join) surface as `Err`; everything about the upload itself is an outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionRunOutcome {
    Completed { session_id: SessionId },
    Paused { session_id: SessionId, reason: String },
    Errored { session_id: SessionId, reason: String },
    /// Rejected before any network call (file missing, changed, or invalid).
    Rejected { session_id: SessionId, reason: String },
    /// Another transfer already owns this session id.
    AlreadyActive { session_id: SessionId },
}

/// Unregisters the session from the control registry on scope exit.
struct ActiveGuard<'a> {
    control: &'a UploadControl,
    id: SessionId,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.control.unregister(self.id);
    }
}

/// Runs a single session to its next resting state.
///
/// The session id in the returned outcome can differ from `session_id` when
/// an expired remote session forced a reconciliation fork.
pub async fn run_one_session(
    db: &SessionDb,
    session_id: SessionId,
    cfg: &UploadConfig,
    control: &UploadControl,
    progress_tx: Option<&tokio::sync::mpsc::Sender<SessionProgress>>,
) -> Result<SessionRunOutcome> {
    let mut record = db
        .get_session(session_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("session {} not found", session_id))?;

    if record.state == SessionState::Completed {
        return Ok(SessionRunOutcome::Completed { session_id });
    }

    let auth = Auth::from_env(&cfg.auth_token_env);
    let policy = cfg
        .retry
        .as_ref()
        .map(RetryPolicy::from)
        .unwrap_or_default();

    // Local validation first: nothing touches the network until the offered
    // file matches the recorded descriptor and fingerprint.
    let source_path = std::path::PathBuf::from(&record.file_path);
    let info = match media_type::validate_source(&source_path, cfg.max_file_bytes) {
        Ok(info) => info,
        Err(e) => return reject(db, &record, e.to_string()).await,
    };
    let mut candidate = CandidateSource {
        file_name: info.file_name.clone(),
        file_size: info.file_size,
        fingerprint: None,
    };
    if let Err(e) = safe_resume::validate_for_resume(&record, &candidate) {
        return reject(db, &record, e.to_string()).await;
    }
    let fp = fingerprint::fingerprint_path(&source_path)
        .with_context(|| format!("fingerprint {}", source_path.display()))?;
    candidate.fingerprint = Some(fp);
    if let Err(e) = safe_resume::validate_for_resume(&record, &candidate) {
        return reject(db, &record, e.to_string()).await;
    }

    // Exclusive ownership: a second run (or concurrent resume) for this id
    // is refused rather than racing the first.
    let abort = match control.register(record.id) {
        Ok(token) => token,
        Err(_) => {
            return Ok(SessionRunOutcome::AlreadyActive {
                session_id: record.id,
            })
        }
    };
    let mut guard = ActiveGuard {
        control,
        id: record.id,
    };

    // Ensure a remote session and learn the confirmed offset.
    let (session_url, start_offset) = match ensure_remote_session(
        db,
        &mut record,
        &info,
        &auth,
        &policy,
        &abort,
        control,
        &mut guard,
    )
    .await?
    {
        EnsureResult::Ready { url, offset } => (url, offset),
        EnsureResult::Stopped(outcome) => return Ok(outcome),
    };

    db.set_state(record.id, SessionState::Uploading).await?;
    db.set_started_at(record.id, now_unix()).await?;
    db.advance_offset(record.id, start_offset as i64).await?;

    let outcome = execute_transfer_phase(
        db,
        record.id,
        &source_path,
        info.file_size,
        &session_url,
        &auth,
        cfg.chunk_size_bytes,
        start_offset,
        policy,
        Arc::clone(&abort),
        progress_tx,
    )
    .await?;

    match outcome {
        crate::uploader::UploadOutcome::Completed => {
            db.mark_completed(record.id).await?;
            tracing::info!(session_id = record.id, "upload completed: {}", record.file_name);
            Ok(SessionRunOutcome::Completed {
                session_id: record.id,
            })
        }
        crate::uploader::UploadOutcome::Paused { reason } => {
            db.set_error_state(record.id, SessionState::Paused, &reason)
                .await?;
            tracing::info!(session_id = record.id, %reason, "upload paused");
            Ok(SessionRunOutcome::Paused {
                session_id: record.id,
                reason,
            })
        }
        crate::uploader::UploadOutcome::Errored { reason } => {
            db.set_error_state(record.id, SessionState::Error, &reason)
                .await?;
            tracing::warn!(session_id = record.id, %reason, "upload failed");
            Ok(SessionRunOutcome::Errored {
                session_id: record.id,
                reason,
            })
        }
    }
}

enum EnsureResult {
    Ready { url: String, offset: u64 },
    Stopped(SessionRunOutcome),
}

/// Probe the stored remote session, or open a fresh one. A 4xx probe result
/// means the session expired server-side: open a replacement and fork the
/// local record (reconciliation).
#[allow(clippy::too_many_arguments)]
async fn ensure_remote_session(
    db: &SessionDb,
    record: &mut SessionRecord,
    info: &media_type::SourceInfo,
    auth: &Auth,
    policy: &RetryPolicy,
    abort: &Arc<AtomicBool>,
    control: &UploadControl,
    guard: &mut ActiveGuard<'_>,
) -> Result<EnsureResult> {
    if let Some(url) = record.remote_url.clone() {
        let probe = {
            let url = url.clone();
            let auth = auth.clone();
            let policy = *policy;
            let abort = Arc::clone(abort);
            tokio::task::spawn_blocking(move || {
                run_with_retry(&policy, &abort, || protocol::probe_offset(&url, &auth))
            })
            .await
            .context("probe task join")?
        };

        match probe {
            Ok(server_offset) => return Ok(EnsureResult::Ready {
                url,
                offset: server_offset,
            }),
            Err(e) => match classify(&e) {
                ErrorKind::Rejected(code) => {
                    tracing::info!(
                        session_id = record.id,
                        code,
                        "stored remote session is gone; opening a replacement"
                    );
                    // Fall through to create a fresh session below.
                }
                _ => return stop_for(db, record, e).await.map(EnsureResult::Stopped),
            },
        }
    }

    let created = {
        let endpoint = record.endpoint.clone();
        let auth = auth.clone();
        let policy = *policy;
        let abort = Arc::clone(abort);
        let upload_length = info.file_size;
        let metadata = crate::metadata::encode_metadata(
            &record.metadata.wire_fields(&record.file_name, info.media_type),
        );
        tokio::task::spawn_blocking(move || {
            run_with_retry(&policy, &abort, || {
                protocol::create_session(&endpoint, &auth, upload_length, &metadata)
            })
        })
        .await
        .context("create task join")?
    };

    let created = match created {
        Ok(c) => c,
        Err(e) => return stop_for(db, record, e).await.map(EnsureResult::Stopped),
    };

    if record.remote_url.is_none() {
        db.set_remote_url(record.id, &created.session_url).await?;
        record.remote_url = Some(created.session_url.clone());
        return Ok(EnsureResult::Ready {
            url: created.session_url,
            offset: 0,
        });
    }

    // The stored session was retired server-side: fork the local record so
    // exactly one row tracks this upload, now bound to the new session.
    match safe_resume::reconcile_remote_session(db, record, &created.session_url, 0).await? {
        Reconciled::Unchanged(_) => {}
        Reconciled::Superseded { old_id, new_id } => {
            control
                .rebind(old_id, new_id)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            guard.id = new_id;
            *record = db
                .get_session(new_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("session {} vanished after fork", new_id))?;
        }
    }

    Ok(EnsureResult::Ready {
        url: created.session_url,
        offset: 0,
    })
}

/// Map a pre-transfer failure to a resting state and outcome.
async fn stop_for(
    db: &SessionDb,
    record: &SessionRecord,
    e: TransferError,
) -> Result<SessionRunOutcome> {
    if matches!(e, TransferError::Aborted) {
        let reason = "paused by user".to_string();
        db.set_error_state(record.id, SessionState::Paused, &reason)
            .await?;
        return Ok(SessionRunOutcome::Paused {
            session_id: record.id,
            reason,
        });
    }
    let kind = classify(&e);
    if is_terminal(kind) {
        let reason = format!("remote session rejected: {e}");
        db.set_error_state(record.id, SessionState::Error, &reason)
            .await?;
        Ok(SessionRunOutcome::Errored {
            session_id: record.id,
            reason,
        })
    } else {
        let reason = format!("could not reach the upload endpoint: {e}");
        db.set_error_state(record.id, SessionState::Paused, &reason)
            .await?;
        Ok(SessionRunOutcome::Paused {
            session_id: record.id,
            reason,
        })
    }
}

/// Validation rejection: leave the session resumable with the reason recorded,
/// without any network traffic.
async fn reject(
    db: &SessionDb,
    record: &SessionRecord,
    reason: String,
) -> Result<SessionRunOutcome> {
    db.set_error_state(record.id, SessionState::Paused, &reason)
        .await?;
    tracing::warn!(session_id = record.id, %reason, "upload rejected before transfer");
    Ok(SessionRunOutcome::Rejected {
        session_id: record.id,
        reason,
    })
}

/// Runs the next queued session (smallest id first, FIFO). Returns None when
/// nothing is queued.
pub async fn run_next_session(
    db: &SessionDb,
    cfg: &UploadConfig,
    control: &UploadControl,
    progress_tx: Option<&tokio::sync::mpsc::Sender<SessionProgress>>,
) -> Result<Option<SessionRunOutcome>> {
    let Some(session_id) = db.claim_next_queued().await? else {
        return Ok(None);
    };
    let outcome = run_one_session(db, session_id, cfg, control, progress_tx).await?;
    Ok(Some(outcome))
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
