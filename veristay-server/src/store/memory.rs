//! In-memory verification store.
//!
//! Backs tests and local development; deployments bind their durable
//! database behind the same [VerificationStore] trait.

use super::{StoreError, VerificationStore};
use crate::models::VerificationRecord;
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use uuid::Uuid;
use veristay_core::track::{TrackKind, TrackState};

/// Verification store holding all records in process memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryVerificationStore {
    inner: Arc<DashMap<Uuid, VerificationRecord>>,
}

impl MemoryVerificationStore {
    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl VerificationStore for MemoryVerificationStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(self.inner.get(&user_id).map(|record| record.value().clone()))
    }

    async fn save(&self, mut record: VerificationRecord) -> Result<VerificationRecord, StoreError> {
        // The entry guard makes the version check and the write one atomic
        // step; concurrent savers of the same user serialize here.
        match self.inner.entry(record.user_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().version != record.version {
                    tracing::debug!(
                        user_id = %record.user_id,
                        stored = entry.get().version,
                        attempted = record.version,
                        "stale record save refused"
                    );
                    return Err(StoreError::Conflict {
                        user_id: record.user_id,
                    });
                }
                record.version += 1;
                entry.insert(record.clone());
            }
            Entry::Vacant(entry) => {
                if record.version != 0 {
                    return Err(StoreError::Conflict {
                        user_id: record.user_id,
                    });
                }
                record.version = 1;
                entry.insert(record.clone());
            }
        }
        Ok(record)
    }

    async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(self
            .inner
            .iter()
            .find(|entry| {
                entry
                    .track(TrackKind::Background)
                    .and_then(|status| status.external_ref.as_deref())
                    == Some(external_ref)
            })
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_email_token(
        &self,
        token: &str,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(self
            .inner
            .iter()
            .find(|entry| {
                entry.track(TrackKind::Email).is_some_and(|status| {
                    status.state == TrackState::PendingEmail
                        && status.secret.as_deref() == Some(token)
                })
            })
            .map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackStatus;
    use chrono::Utc;
    use testresult::TestResult;

    #[test_log::test(tokio::test)]
    async fn test_save_bumps_version_and_load_roundtrips() -> TestResult {
        let store = MemoryVerificationStore::default();
        let user_id = Uuid::new_v4();
        let record = VerificationRecord::new(user_id, Utc::now());

        let stored = store.save(record).await?;
        assert_eq!(stored.version, 1);

        let loaded = store.load(user_id).await?.expect("record stored");
        assert_eq!(loaded, stored);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_stale_save_is_refused() -> TestResult {
        let store = MemoryVerificationStore::default();
        let user_id = Uuid::new_v4();
        let fresh = store
            .save(VerificationRecord::new(user_id, Utc::now()))
            .await?;

        // First writer wins...
        store.save(fresh.clone()).await?;

        // ...second writer with the same base version is refused.
        let err = store.save(fresh).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { user_id: u } if u == user_id));
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_insert_with_nonzero_version_is_refused() -> TestResult {
        let store = MemoryVerificationStore::default();
        let mut record = VerificationRecord::new(Uuid::new_v4(), Utc::now());
        record.version = 3;

        assert!(store.save(record).await.is_err());
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_find_by_external_ref() -> TestResult {
        let store = MemoryVerificationStore::default();
        let now = Utc::now();
        let mut record = VerificationRecord::new(Uuid::new_v4(), now);
        let mut status = TrackStatus::new(TrackState::Pending, now);
        status.external_ref = Some("chk_42".to_string());
        record.put_track(TrackKind::Background, status, now);
        let stored = store.save(record).await?;

        let found = store.find_by_external_ref("chk_42").await?;
        assert_eq!(found.map(|r| r.user_id), Some(stored.user_id));
        assert_eq!(store.find_by_external_ref("chk_43").await?, None);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_find_by_email_token_requires_pending_state() -> TestResult {
        let store = MemoryVerificationStore::default();
        let now = Utc::now();
        let mut record = VerificationRecord::new(Uuid::new_v4(), now);
        let mut status = TrackStatus::new(TrackState::PendingEmail, now);
        status.secret = Some("tok".to_string());
        record.put_track(TrackKind::Email, status.clone(), now);
        let stored = store.save(record).await?;

        assert!(store.find_by_email_token("tok").await?.is_some());

        // Once decided, the token no longer resolves.
        let mut decided = store.load(stored.user_id).await?.expect("stored");
        let mut email = decided.track(TrackKind::Email).expect("present").clone();
        email.decide(
            TrackState::Approved,
            veristay_core::track::DecidedBy::System,
            now,
        );
        decided.put_track(TrackKind::Email, email, now);
        store.save(decided).await?;

        assert!(store.find_by_email_token("tok").await?.is_none());
        Ok(())
    }
}
