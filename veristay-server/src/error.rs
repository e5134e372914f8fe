//! Error taxonomy surfaced by the verification pipeline.
//!
//! Validation and protocol errors are synchronous and change no state;
//! idempotency conflicts are handled internally as no-ops and never appear
//! here; contention is retried internally and surfaced only once the retry
//! budget is exhausted.

use crate::store::StoreError;
use uuid::Uuid;
use veristay_core::track::{TrackKind, UnknownTrackKind};

/// Standard result type of the verification pipeline's operations.
pub type VerifyResult<T> = std::result::Result<T, VerificationError>;

/// Everything a caller of the pipeline can be told went wrong.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The named track does not exist.
    #[error(transparent)]
    UnknownTrack(#[from] UnknownTrackKind),

    /// The track requires a supporting document and none was attached.
    #[error("track {0} requires a document")]
    MissingDocument(TrackKind),

    /// The track requires a claimed fact that was not supplied.
    #[error("track {track} submission is missing the {field} claim")]
    MissingClaim {
        /// Track being submitted
        track: TrackKind,
        /// Name of the absent field
        field: &'static str,
    },

    /// The submitted email does not match the account email.
    #[error("submitted email does not match the account email")]
    EmailMismatch,

    /// No phone confirmation code is pending for this user.
    #[error("no phone confirmation code is pending")]
    NoPendingCode,

    /// The pending code's validity window has passed. The track is left
    /// unchanged and can be resubmitted.
    #[error("the confirmation code has expired")]
    CodeExpired,

    /// The submitted code does not match the pending one.
    #[error("the confirmation code does not match")]
    InvalidCode,

    /// The email confirmation token is unknown, expired, or already used.
    #[error("invalid or expired confirmation token")]
    InvalidOrExpiredToken,

    /// Admin analysis was requested for a track that is not awaiting review.
    #[error("track {track} for user {user_id} is not awaiting review")]
    NothingToAnalyze {
        /// Owner of the record
        user_id: Uuid,
        /// Track that was targeted
        track: TrackKind,
    },

    /// Concurrent updates kept clobbering this record past the retry budget.
    #[error("verification record for user {0} is under contention")]
    RecordContention(Uuid),

    /// The background-check provider refused or failed the initiation call.
    #[error("could not initiate background check")]
    CheckInitiation(#[source] anyhow::Error),

    /// The code/link could not be delivered. The pending state is already
    /// stored; resubmitting regenerates and resends the secret.
    #[error("could not deliver confirmation code")]
    CodeDelivery(#[source] anyhow::Error),

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The request payload failed validation.
    #[error(transparent)]
    Validation(#[from] validator::ValidationErrors),
}
