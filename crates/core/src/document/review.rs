//! Validation state machine for document review.
//!
//! `pending` moves to `approved` or `rejected` by an admin decision.
//! Repeating the decision already recorded overwrites reviewer and time.
//! Nothing moves back to `pending`, and a decision is never flipped.

use chrono::Utc;

use super::error::DocumentError;
use super::types::{Review, ValidationStatus, non_blank};

/// Outcome of an accepted review decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewAction {
    /// Status after the decision.
    pub new_status: ValidationStatus,
    /// Reviewer and timestamp, always set together.
    pub review: Review,
    /// Stored reason; only ever set for rejections.
    pub rejection_reason: Option<String>,
}

/// Stateless transition rules for document review.
pub struct ReviewService;

impl ReviewService {
    /// Statuses from which `target` may be entered.
    #[must_use]
    pub const fn sources_for(target: ValidationStatus) -> &'static [ValidationStatus] {
        match target {
            ValidationStatus::Approved => &[ValidationStatus::Pending, ValidationStatus::Approved],
            ValidationStatus::Rejected => &[ValidationStatus::Pending, ValidationStatus::Rejected],
            ValidationStatus::Pending => &[],
        }
    }

    /// Check a transition without producing an action.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::InvalidTransition` if `to` cannot be entered from `from`.
    pub fn check(from: ValidationStatus, to: ValidationStatus) -> Result<(), DocumentError> {
        if Self::sources_for(to).contains(&from) {
            Ok(())
        } else {
            Err(DocumentError::InvalidTransition { from, to })
        }
    }

    /// Approve a document.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::InvalidTransition` if the document was rejected.
    pub fn approve(
        current: ValidationStatus,
        admin_id: i32,
    ) -> Result<ReviewAction, DocumentError> {
        Self::check(current, ValidationStatus::Approved)?;
        Ok(ReviewAction {
            new_status: ValidationStatus::Approved,
            review: Review {
                by: admin_id,
                at: Utc::now(),
            },
            rejection_reason: None,
        })
    }

    /// Reject a document. A blank reason is stored as absent.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::InvalidTransition` if the document was approved.
    pub fn reject(
        current: ValidationStatus,
        admin_id: i32,
        reason: &str,
    ) -> Result<ReviewAction, DocumentError> {
        Self::check(current, ValidationStatus::Rejected)?;
        Ok(ReviewAction {
            new_status: ValidationStatus::Rejected,
            review: Review {
                by: admin_id,
                at: Utc::now(),
            },
            rejection_reason: non_blank(Some(reason.trim().to_string())),
        })
    }
}
