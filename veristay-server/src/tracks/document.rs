//! Document-backed tracks (address, income): analyze, then auto-decide.

use crate::{
    models::TrackStatus,
    policy::{Decision, PolicyOutcome},
    settings::Policy,
};
use chrono::{DateTime, Utc};
use veristay_core::{
    analysis::{AnalysisVerdict, RISK_ANALYSIS_FAILED},
    facts::{ClaimedFacts, DocumentRef},
    track::{DecidedBy, TrackKind, TrackState},
};

/// Build the status for a fresh address/income submission.
///
/// `analysis` is `None` when the gateway could not be reached; the
/// submission then falls toward human review rather than auto-approval.
pub fn submitted(
    track: TrackKind,
    document: Option<&DocumentRef>,
    claimed: &ClaimedFacts,
    analysis: Option<&AnalysisVerdict>,
    policy_settings: &Policy,
    now: DateTime<Utc>,
) -> TrackStatus {
    let mut status = TrackStatus::new(TrackState::PendingReview, now);
    status.document = document.cloned();
    status.claimed = Some(claimed.clone());

    let Some(verdict) = analysis else {
        status.risk_factors.push(RISK_ANALYSIS_FAILED.to_string());
        return status;
    };
    super::record_verdict(&mut status, verdict);

    let outcome = crate::policy::decide(
        track,
        verdict,
        Some(claimed),
        policy_settings,
        now.date_naive(),
    );
    apply_outcome(&mut status, &outcome, now);
    status
}

/// Refresh an already-submitted track from a re-analysis and apply the
/// given policy outcome. Used by the admin/reviewer tooling path.
pub fn reviewed(
    current: &TrackStatus,
    analysis: Option<&AnalysisVerdict>,
    outcome: &PolicyOutcome,
    now: DateTime<Utc>,
) -> TrackStatus {
    let mut status = current.clone();
    match analysis {
        Some(verdict) => super::record_verdict(&mut status, verdict),
        None => {
            super::merge_risk_factors(&mut status, [RISK_ANALYSIS_FAILED.to_string()]);
        }
    }
    apply_outcome(&mut status, outcome, now);
    status
}

fn apply_outcome(status: &mut TrackStatus, outcome: &PolicyOutcome, now: DateTime<Utc>) {
    super::merge_risk_factors(status, outcome.overrides.iter().cloned());
    match outcome.decision {
        Decision::Approve => status.decide(TrackState::Approved, DecidedBy::System, now),
        Decision::Reject => status.decide(TrackState::Rejected, DecidedBy::System, now),
        Decision::Review => status.state = TrackState::PendingReview,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veristay_core::facts::ExtractedFacts;

    fn submit(track: TrackKind, verdict: Option<&AnalysisVerdict>) -> TrackStatus {
        submitted(
            track,
            Some(&DocumentRef::new("doc-1")),
            &ClaimedFacts::default(),
            verdict,
            &Policy::default(),
            Utc::now(),
        )
    }

    #[test]
    fn test_high_confidence_auto_approves() {
        let status = submit(TrackKind::Address, Some(&AnalysisVerdict::valid(90)));
        assert_eq!(status.state, TrackState::Approved);
        assert_eq!(status.decided_by, Some(DecidedBy::System));
        assert_eq!(status.confidence, Some(90));
    }

    #[test]
    fn test_low_confidence_auto_rejects() {
        let status = submit(TrackKind::Address, Some(&AnalysisVerdict::valid(20)));
        assert_eq!(status.state, TrackState::Rejected);
        assert!(status.decided_at.is_some());
    }

    #[test]
    fn test_middling_confidence_waits_for_review() {
        let status = submit(TrackKind::Income, Some(&AnalysisVerdict::valid(55)));
        assert_eq!(status.state, TrackState::PendingReview);
        assert_eq!(status.decided_at, None);
    }

    #[test]
    fn test_gateway_failure_records_the_fallback() {
        let status = submit(TrackKind::Income, None);
        assert_eq!(status.state, TrackState::PendingReview);
        assert_eq!(status.risk_factors, vec![RISK_ANALYSIS_FAILED.to_string()]);
        assert_eq!(status.confidence, None);
    }

    #[test]
    fn test_reviewed_applies_a_fresh_verdict() {
        let now = Utc::now();
        let pending = submit(TrackKind::Income, Some(&AnalysisVerdict::valid(55)));

        let verdict = AnalysisVerdict::valid(91).with_extracted(ExtractedFacts {
            monthly_income: Some(8_000),
            ..ExtractedFacts::default()
        });
        let outcome = crate::policy::decide(
            TrackKind::Income,
            &verdict,
            pending.claimed.as_ref(),
            &Policy::default(),
            now.date_naive(),
        );
        let decided = reviewed(&pending, Some(&verdict), &outcome, now);

        assert_eq!(decided.state, TrackState::Approved);
        assert_eq!(decided.confidence, Some(91));
        assert_eq!(
            decided.extracted.as_ref().and_then(|f| f.monthly_income),
            Some(8_000)
        );
        // Submission inputs survive the refresh for any later re-analysis.
        assert_eq!(decided.document, pending.document);
    }
}
