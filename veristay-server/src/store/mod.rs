//! Persistence contract for verification records.
//!
//! The pipeline depends only on this interface, never on a concrete
//! backend. The record is stored as a structured, versioned document so
//! that every mutation can be a compare-and-swap scoped to one user.

use crate::models::VerificationRecord;
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;

pub use memory::MemoryVerificationStore;

/// Errors surfaced by a [VerificationStore].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record changed underneath this save. Reload and retry.
    #[error("verification record for user {user_id} was concurrently modified")]
    Conflict {
        /// Owner of the contended record
        user_id: Uuid,
    },
    /// The backing store failed.
    #[error("verification store backend error")]
    Backend(#[source] anyhow::Error),
}

/// Durable, per-user store of [VerificationRecord]s.
///
/// `save` is a compare-and-swap: it succeeds only when the stored version
/// still equals `record.version` (zero meaning "no record stored yet") and
/// bumps the version on success. Callers reload and retry on
/// [StoreError::Conflict]; two concurrent writers touching different
/// tracks of the same record thereby both survive.
#[async_trait]
pub trait VerificationStore: Clone + Send + Sync + 'static {
    /// Load the record for a user, if any track was ever submitted.
    async fn load(&self, user_id: Uuid) -> Result<Option<VerificationRecord>, StoreError>;

    /// Persist a record under compare-and-swap semantics, returning the
    /// stored copy with its bumped version.
    async fn save(&self, record: VerificationRecord) -> Result<VerificationRecord, StoreError>;

    /// Find the record whose background track carries this external ref.
    async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<VerificationRecord>, StoreError>;

    /// Find the record holding this outstanding email confirmation token.
    async fn find_by_email_token(
        &self,
        token: &str,
    ) -> Result<Option<VerificationRecord>, StoreError>;
}
