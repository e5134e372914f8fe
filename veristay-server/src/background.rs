//! Background-check orchestration.
//!
//! The handshake is split in two: `initiate` submits the check to the
//! provider and records `pending`; the provider's webhook, seconds or days
//! later, re-enters the pipeline to finalize the track.
//! Delivery is at-least-once, so application must be idempotent: a
//! duplicate for an already-decided check is a logged no-op, and an
//! unmatched reference is acknowledged rather than erroring, to keep
//! provider retries from storming.

use crate::models::TrackStatus;
use chrono::{DateTime, Utc};
use veristay_core::{
    analysis::CheckResult,
    facts::ClaimedFacts,
    track::{DecidedBy, TrackState},
};

/// What applying a background-check webhook did.
#[derive(Clone, Debug, PartialEq)]
pub enum WebhookOutcome {
    /// The referenced track reached its terminal state
    Applied(TrackStatus),
    /// The track was already decided; duplicate delivery ignored
    AlreadyDecided,
    /// No record carries this reference; delivery acknowledged and dropped
    Unmatched,
}

/// Status for a consented background-check submission.
///
/// No client-driven transition exists for this track; only [complete],
/// driven by the provider's webhook, finishes it. A check that never
/// completes leaves the track pending; surfacing that is a monitoring
/// concern, not a state transition.
pub fn submitted(external_ref: &str, claimed: &ClaimedFacts, now: DateTime<Utc>) -> TrackStatus {
    let mut status = TrackStatus::new(TrackState::Pending, now);
    status.external_ref = Some(external_ref.to_string());
    status.claimed = Some(claimed.clone());
    status
}

/// Apply a completed check to the track, unless it is already terminal.
pub fn complete(status: &TrackStatus, result: CheckResult, now: DateTime<Utc>) -> Option<TrackStatus> {
    if status.is_terminal() {
        return None;
    }
    let state = match result {
        CheckResult::Clear => TrackState::Approved,
        CheckResult::Consider => TrackState::Rejected,
    };
    let mut next = status.clone();
    next.decide(state, DecidedBy::System, now);
    Some(next)
}
