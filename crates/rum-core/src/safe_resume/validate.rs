//! Compares a (re)supplied source file with the stored session descriptor.

use crate::session_db::SessionRecord;
use std::fmt;

/// The file offered for a transfer, as measured right now.
///
/// `fingerprint` is optional so callers can reject on size alone without
/// hashing anything: a size mismatch must fail before any further work.
#[derive(Debug, Clone)]
pub struct CandidateSource {
    pub file_name: String,
    pub file_size: u64,
    pub fingerprint: Option<String>,
}

/// Resume rejected before any network call.
#[derive(Debug)]
pub struct ResumeValidationError {
    pub kind: ResumeValidationErrorKind,
}

#[derive(Debug)]
pub enum ResumeValidationErrorKind {
    /// No remote session is recorded; the upload must restart from zero.
    NotResumable,
    /// The offered file does not match the recorded descriptor/fingerprint.
    FileMismatch {
        size_changed: bool,
        fingerprint_changed: bool,
    },
}

impl fmt::Display for ResumeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ResumeValidationErrorKind::NotResumable => {
                write!(f, "no remote session to resume; restart the upload from scratch")
            }
            ResumeValidationErrorKind::FileMismatch {
                size_changed,
                fingerprint_changed,
            } => {
                write!(f, "file does not match the original upload")?;
                if *size_changed {
                    write!(f, " (size)")?;
                } else if *fingerprint_changed {
                    write!(f, " (content)")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ResumeValidationError {}

/// Returns Ok(()) if the session can continue from its confirmed offset.
/// A `paused`/`error` row with no remote URL has nothing to resume.
pub fn ensure_resumable(record: &SessionRecord) -> Result<(), ResumeValidationError> {
    if record.remote_url.is_none() {
        return Err(ResumeValidationError {
            kind: ResumeValidationErrorKind::NotResumable,
        });
    }
    Ok(())
}

/// Returns Ok(()) if the offered file matches the stored descriptor.
///
/// Size is compared first and fails alone; when sizes agree and the caller
/// computed a fingerprint, it must also match. A changed file name is not a
/// mismatch (users may rename or re-supply from another path); content
/// identity is what resume safety needs.
pub fn validate_for_resume(
    record: &SessionRecord,
    candidate: &CandidateSource,
) -> Result<(), ResumeValidationError> {
    let size_changed = candidate.file_size != record.file_size as u64;
    if size_changed {
        return Err(ResumeValidationError {
            kind: ResumeValidationErrorKind::FileMismatch {
                size_changed: true,
                fingerprint_changed: false,
            },
        });
    }

    if let Some(fp) = &candidate.fingerprint {
        if *fp != record.fingerprint {
            return Err(ResumeValidationError {
                kind: ResumeValidationErrorKind::FileMismatch {
                    size_changed: false,
                    fingerprint_changed: true,
                },
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EpisodeMetadata;
    use crate::session_db::{SessionRecord, SessionState};

    fn record(remote_url: Option<&str>) -> SessionRecord {
        SessionRecord {
            id: 1,
            endpoint: "https://ingest.example.com/videos".to_string(),
            file_path: "/media/s01e01.mp4".to_string(),
            file_name: "s01e01.mp4".to_string(),
            file_size: 1000,
            fingerprint: "1000-aaaa".to_string(),
            remote_url: remote_url.map(String::from),
            confirmed_offset: 400,
            state: SessionState::Paused,
            error_message: None,
            result_id: None,
            processing_error: None,
            metadata: EpisodeMetadata::default(),
            created_at: 0,
            updated_at: 0,
            started_at: None,
        }
    }

    fn candidate(size: u64, fingerprint: Option<&str>) -> CandidateSource {
        CandidateSource {
            file_name: "s01e01.mp4".to_string(),
            file_size: size,
            fingerprint: fingerprint.map(String::from),
        }
    }

    #[test]
    fn matching_file_ok() {
        let rec = record(Some("https://ingest.example.com/files/1"));
        assert!(validate_for_resume(&rec, &candidate(1000, Some("1000-aaaa"))).is_ok());
    }

    #[test]
    fn size_mismatch_rejected_without_fingerprint() {
        let rec = record(Some("https://ingest.example.com/files/1"));
        let err = validate_for_resume(&rec, &candidate(1001, None)).unwrap_err();
        assert!(matches!(
            err.kind,
            ResumeValidationErrorKind::FileMismatch {
                size_changed: true,
                ..
            }
        ));
    }

    #[test]
    fn fingerprint_mismatch_rejected() {
        let rec = record(Some("https://ingest.example.com/files/1"));
        let err = validate_for_resume(&rec, &candidate(1000, Some("1000-bbbb"))).unwrap_err();
        assert!(matches!(
            err.kind,
            ResumeValidationErrorKind::FileMismatch {
                fingerprint_changed: true,
                ..
            }
        ));
    }

    #[test]
    fn renamed_file_with_same_content_ok() {
        let rec = record(Some("https://ingest.example.com/files/1"));
        let c = CandidateSource {
            file_name: "renamed.mp4".to_string(),
            file_size: 1000,
            fingerprint: Some("1000-aaaa".to_string()),
        };
        assert!(validate_for_resume(&rec, &c).is_ok());
    }

    #[test]
    fn no_remote_session_is_not_resumable() {
        let rec = record(None);
        let err = ensure_resumable(&rec).unwrap_err();
        assert!(matches!(err.kind, ResumeValidationErrorKind::NotResumable));
        assert!(ensure_resumable(&record(Some("https://x/files/1"))).is_ok());
    }
}
