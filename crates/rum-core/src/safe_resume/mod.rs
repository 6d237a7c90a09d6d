//! Safe resume: file-identity validation before any network call, and
//! reconciliation when the server no longer honors the stored session.

mod reconcile;
mod validate;

pub use reconcile::{reconcile_remote_session, Reconciled};
pub use validate::{
    ensure_resumable, validate_for_resume, CandidateSource, ResumeValidationError,
    ResumeValidationErrorKind,
};
