//! `rum resume <id> [--file PATH]` – re-queue a paused session.
//!
//! The source file is re-validated against the recorded descriptor and
//! content fingerprint before the session is touched: a mismatched file is
//! rejected with no state change and no network traffic.

use anyhow::Result;
use rum_core::fingerprint;
use rum_core::safe_resume::{self, CandidateSource};
use rum_core::session_db::{SessionDb, SessionState};
use std::path::Path;

pub async fn run_resume(db: &SessionDb, id: i64, file: Option<&str>) -> Result<()> {
    let Some(record) = db.get_session(id).await? else {
        println!("No session {id}.");
        return Ok(());
    };
    match record.state {
        SessionState::Completed => {
            println!("Session {id} is already completed.");
            return Ok(());
        }
        SessionState::Uploading => {
            println!("Session {id} is transferring; pause it first.");
            return Ok(());
        }
        SessionState::Queued => {
            println!("Session {id} is already queued.");
            return Ok(());
        }
        SessionState::Paused | SessionState::Error => {}
    }

    let source_path = file.unwrap_or(&record.file_path).to_string();
    let path = Path::new(&source_path);

    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            println!("Cannot read {}: {e}", path.display());
            return Ok(());
        }
    };
    let mut candidate = CandidateSource {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_size: meta.len(),
        fingerprint: None,
    };
    // Size first: a wrong-sized file is rejected before anything is hashed.
    if let Err(e) = safe_resume::validate_for_resume(&record, &candidate) {
        println!("Not resuming session {id}: {e}");
        return Ok(());
    }
    candidate.fingerprint = Some(fingerprint::fingerprint_path(path)?);
    if let Err(e) = safe_resume::validate_for_resume(&record, &candidate) {
        println!("Not resuming session {id}: {e}");
        return Ok(());
    }

    if safe_resume::ensure_resumable(&record).is_err() {
        println!("Session {id} has no remote session; it will restart from the beginning.");
    }

    if let Some(file) = file {
        let canonical = std::fs::canonicalize(file)?.to_string_lossy().into_owned();
        db.set_file_path(id, &canonical).await?;
    }
    db.set_state(id, SessionState::Queued).await?;
    println!("Resumed session {id}; run `rum run` to continue the transfer.");
    Ok(())
}
