//! Pure transition rules for the confirmation workflow.
//!
//! `PENDING_REVIEW → {ACCEPTED, EDITING, REJECTED}`;
//! `EDITING → PENDING_REVIEW` (after the merged fields are re-scored)
//! `| REJECTED`. Accepted and Rejected are terminal. The rules are
//! transport-agnostic: they consume only a three-way verdict.

use lexia_core::models::{ReviewStatus, Verdict};
use lexia_core::AppError;

/// Apply a verdict to a session status. Verdicts against terminal or
/// incompatible states are rejected with no state change.
pub fn next_status(current: ReviewStatus, verdict: Verdict) -> Result<ReviewStatus, AppError> {
    match (current, verdict) {
        (ReviewStatus::PendingReview, Verdict::Accept) => Ok(ReviewStatus::Accepted),
        (ReviewStatus::PendingReview, Verdict::Edit) => Ok(ReviewStatus::Editing),
        (ReviewStatus::PendingReview, Verdict::Reject) => Ok(ReviewStatus::Rejected),
        (ReviewStatus::Editing, Verdict::Reject) => Ok(ReviewStatus::Rejected),
        (current, verdict) => Err(AppError::InvalidReviewState(format!(
            "verdict '{}' is not valid in state '{}'",
            verdict, current
        ))),
    }
}

/// Where an editing session lands once the merged fields were re-scored.
pub fn status_after_edit() -> ReviewStatus {
    ReviewStatus::PendingReview
}
