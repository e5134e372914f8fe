//! Verification tracks and their states.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Error returned when a track name doesn't match any known track.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown verification track: {0}")]
pub struct UnknownTrackKind(pub String);

/// One independent verification track.
///
/// The set is fixed: verification tracks are not user-definable.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Email ownership, confirmed via a single-use link token
    Email,
    /// Phone ownership, confirmed via a short-lived numeric code
    Phone,
    /// Government-issued identity document
    #[serde(rename = "id")]
    GovernmentId,
    /// Proof of address
    Address,
    /// Proof of income
    Income,
    /// Third-party background check
    Background,
}

impl TrackKind {
    /// All tracks, in canonical order.
    pub const ALL: [TrackKind; 6] = [
        TrackKind::Email,
        TrackKind::Phone,
        TrackKind::GovernmentId,
        TrackKind::Address,
        TrackKind::Income,
        TrackKind::Background,
    ];

    /// The wire name of this track.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Email => "email",
            TrackKind::Phone => "phone",
            TrackKind::GovernmentId => "id",
            TrackKind::Address => "address",
            TrackKind::Income => "income",
            TrackKind::Background => "background",
        }
    }

    /// Whether submissions to this track go through document analysis.
    pub fn is_document_backed(&self) -> bool {
        matches!(
            self,
            TrackKind::GovernmentId | TrackKind::Address | TrackKind::Income
        )
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackKind {
    type Err = UnknownTrackKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownTrackKind(s.to_string()))
    }
}

/// State of a single track's verification protocol.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackState {
    /// Submitted; waiting on an out-of-process party (background check)
    Pending,
    /// Waiting for the user to enter the code we sent them
    PendingCode,
    /// Waiting for the user to click the confirmation link we mailed
    PendingEmail,
    /// Waiting for a human reviewer's decision
    PendingReview,
    /// Terminal: the track passed
    Approved,
    /// Terminal: the track failed
    Rejected,
}

impl TrackState {
    /// Terminal states admit no further automatic transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackState::Approved | TrackState::Rejected)
    }
}

impl std::fmt::Display for TrackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TrackState::Pending => "pending",
            TrackState::PendingCode => "pending_code",
            TrackState::PendingEmail => "pending_email",
            TrackState::PendingReview => "pending_review",
            TrackState::Approved => "approved",
            TrackState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Who moved a track into a terminal state.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecidedBy {
    /// The auto-decision policy or a protocol completion
    System,
    /// A human reviewer
    Reviewer,
}
