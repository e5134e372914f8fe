//! Per-user verification record: the single source of truth for all six
//! verification tracks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use veristay_core::{
    facts::{ClaimedFacts, DocumentRef, ExtractedFacts},
    track::{DecidedBy, TrackKind, TrackState},
};

/// Status of a single verification track within a [VerificationRecord].
///
/// Invariants:
/// - a terminal `state` implies `decided_at` and `decided_by` are set
/// - `pending_code` implies both `secret` and `expires_at` are set
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TrackStatus {
    /// Current state in this track's state machine
    pub state: TrackState,
    /// When this track was last submitted
    pub submitted_at: DateTime<Utc>,
    /// Validity window of the pending code or token
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// One-time code or token material; present only while a confirmation
    /// is outstanding
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub secret: Option<String>,
    /// Blob-store handle of the submitted document, kept for re-analysis
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub document: Option<DocumentRef>,
    /// Facts claimed at submission time, kept for re-analysis
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub claimed: Option<ClaimedFacts>,
    /// Structured output of document analysis
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub extracted: Option<ExtractedFacts>,
    /// Analysis confidence, 0–100
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence: Option<u8>,
    /// Risk factors recorded by analysis, cross-referencing, or fallbacks
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub risk_factors: Vec<String>,
    /// Opaque third-party check handle (background track only)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_ref: Option<String>,
    /// When a terminal state was reached
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub decided_at: Option<DateTime<Utc>>,
    /// How the terminal state was reached
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub decided_by: Option<DecidedBy>,
}

impl TrackStatus {
    /// A fresh status in the given state with nothing else recorded.
    pub fn new(state: TrackState, submitted_at: DateTime<Utc>) -> Self {
        Self {
            state,
            submitted_at,
            expires_at: None,
            secret: None,
            document: None,
            claimed: None,
            extracted: None,
            confidence: None,
            risk_factors: Vec::new(),
            external_ref: None,
            decided_at: None,
            decided_by: None,
        }
    }

    /// Whether this track has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move this track into a terminal state, recording when and by whom.
    ///
    /// Clears the confirmation secret and its window; a decided track has
    /// nothing left to confirm.
    pub fn decide(&mut self, state: TrackState, by: DecidedBy, at: DateTime<Utc>) {
        debug_assert!(state.is_terminal());
        self.state = state;
        self.decided_at = Some(at);
        self.decided_by = Some(by);
        self.secret = None;
        self.expires_at = None;
    }
}

/// Per-user verification record, mapping each submitted track to its
/// status.
///
/// A track key is present iff that track has been submitted at least once.
/// `version` implements the optimistic-concurrency contract: the store
/// bumps it on every successful save and refuses saves against a stale
/// version, so concurrent writers to different tracks of the same record
/// cannot clobber each other.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct VerificationRecord {
    /// Identity of the owning account
    pub user_id: Uuid,
    /// Version the record was loaded at; bumped by the store on save
    pub version: u64,
    /// When the record was created (first submission of any track)
    pub created_at: DateTime<Utc>,
    /// When the record was last mutated
    pub updated_at: DateTime<Utc>,
    /// Track statuses, keyed by kind
    pub tracks: BTreeMap<TrackKind, TrackStatus>,
}

impl VerificationRecord {
    /// A fresh, empty record for a user. `version` starts at zero, which
    /// the store treats as "expects no stored record".
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            version: 0,
            created_at: now,
            updated_at: now,
            tracks: BTreeMap::new(),
        }
    }

    /// The status of one track, if it was ever submitted.
    pub fn track(&self, kind: TrackKind) -> Option<&TrackStatus> {
        self.tracks.get(&kind)
    }

    /// Replace one track's status, touching the record's update time.
    pub fn put_track(&mut self, kind: TrackKind, status: TrackStatus, now: DateTime<Utc>) {
        self.tracks.insert(kind, status);
        self.updated_at = now;
    }

    /// Extracted facts of the given track, when it is approved and analysis
    /// stored any. Used as the reference side of the id fast path.
    pub fn approved_extracted(&self, kind: TrackKind) -> Option<&ExtractedFacts> {
        self.track(kind)
            .filter(|status| status.state == TrackState::Approved)
            .and_then(|status| status.extracted.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_records_when_and_by_whom() {
        let now = Utc::now();
        let mut status = TrackStatus::new(TrackState::PendingCode, now);
        status.secret = Some("123456".to_string());
        status.expires_at = Some(now + chrono::Duration::minutes(10));

        status.decide(TrackState::Approved, DecidedBy::System, now);

        assert!(status.is_terminal());
        assert_eq!(status.decided_at, Some(now));
        assert_eq!(status.decided_by, Some(DecidedBy::System));
        assert_eq!(status.secret, None);
        assert_eq!(status.expires_at, None);
    }

    #[test]
    fn test_put_track_touches_updated_at() {
        let created = Utc::now();
        let mut record = VerificationRecord::new(Uuid::new_v4(), created);
        let later = created + chrono::Duration::seconds(5);

        record.put_track(
            TrackKind::Phone,
            TrackStatus::new(TrackState::PendingCode, later),
            later,
        );

        assert_eq!(record.updated_at, later);
        assert_eq!(record.created_at, created);
        assert!(record.track(TrackKind::Phone).is_some());
        assert!(record.track(TrackKind::Email).is_none());
    }

    #[test]
    fn test_unset_track_fields_stay_off_the_wire() {
        let now = Utc::now();
        let status = TrackStatus::new(TrackState::Pending, now);
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["state"], "pending");
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("secret"));
        assert!(!object.contains_key("risk_factors"));
        assert!(!object.contains_key("decided_at"));
    }

    #[test]
    fn test_approved_extracted_requires_approval() {
        let now = Utc::now();
        let mut record = VerificationRecord::new(Uuid::new_v4(), now);

        let mut status = TrackStatus::new(TrackState::PendingReview, now);
        status.extracted = Some(ExtractedFacts {
            full_name: Some("John Doe".to_string()),
            ..ExtractedFacts::default()
        });
        record.put_track(TrackKind::Income, status.clone(), now);
        assert!(record.approved_extracted(TrackKind::Income).is_none());

        status.decide(TrackState::Approved, DecidedBy::Reviewer, now);
        record.put_track(TrackKind::Income, status, now);
        assert!(record.approved_extracted(TrackKind::Income).is_some());
    }
}
