//! Auto-decision policy for document-backed tracks.
//!
//! Hard overrides are evaluated strictly before the confidence bands; an
//! override always wins. The same policy is applied whether a document is
//! analyzed on submission, alone, or as part of an admin batch: batch
//! execution must not change any single document's outcome.

use crate::settings::Policy;
use chrono::NaiveDate;
use serde::Serialize;
use veristay_core::{
    analysis::{AnalysisVerdict, RISK_DOCUMENT_EXPIRED},
    facts::ClaimedFacts,
    track::TrackKind,
};

/// Risk factor recorded when the analyzer judged the document not genuine.
pub const RISK_DOCUMENT_INVALID: &str = "document_invalid";

/// Risk factor recorded when extracted income fails the rent-coverage rule.
pub const RISK_INCOME_BELOW_COVERAGE: &str = "income_below_rent_coverage";

/// What the policy says should happen to a submission.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Auto-approve without human input
    Approve,
    /// Auto-reject without human input
    Reject,
    /// Hand to the human reviewer queue
    Review,
}

/// A [Decision] together with the hard-override risk factors that forced
/// it, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyOutcome {
    /// The decision
    pub decision: Decision,
    /// Override factors to record on the track; empty when the confidence
    /// bands decided
    pub overrides: Vec<String>,
}

/// Track-specific hard overrides. A non-empty result forces rejection
/// regardless of confidence.
pub fn hard_overrides(
    track: TrackKind,
    verdict: &AnalysisVerdict,
    claimed: Option<&ClaimedFacts>,
    policy: &Policy,
    today: NaiveDate,
) -> Vec<String> {
    let mut overrides = Vec::new();

    if !verdict.is_valid {
        overrides.push(RISK_DOCUMENT_INVALID.to_string());
    }

    if track == TrackKind::GovernmentId && document_expired(verdict, today) {
        overrides.push(RISK_DOCUMENT_EXPIRED.to_string());
    }

    if track == TrackKind::Income {
        let rent = claimed.and_then(|claimed| claimed.monthly_rent);
        let income = verdict.extracted.monthly_income;
        if let (Some(rent), Some(income)) = (rent, income) {
            if (income as f32) < (rent as f32) * policy.income_rent_multiple {
                overrides.push(RISK_INCOME_BELOW_COVERAGE.to_string());
            }
        }
    }

    overrides
}

/// Apply the auto-decision policy to one analysis verdict.
pub fn decide(
    track: TrackKind,
    verdict: &AnalysisVerdict,
    claimed: Option<&ClaimedFacts>,
    policy: &Policy,
    today: NaiveDate,
) -> PolicyOutcome {
    let overrides = hard_overrides(track, verdict, claimed, policy, today);
    if !overrides.is_empty() {
        return PolicyOutcome {
            decision: Decision::Reject,
            overrides,
        };
    }

    let decision = if verdict.confidence >= policy.approve_confidence {
        Decision::Approve
    } else if verdict.confidence <= policy.reject_confidence {
        Decision::Reject
    } else {
        Decision::Review
    };

    PolicyOutcome {
        decision,
        overrides: Vec::new(),
    }
}

fn document_expired(verdict: &AnalysisVerdict, today: NaiveDate) -> bool {
    verdict
        .risk_factors
        .iter()
        .any(|factor| factor == RISK_DOCUMENT_EXPIRED)
        || verdict
            .extracted
            .expires_on
            .is_some_and(|expires_on| expires_on < today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veristay_core::facts::ExtractedFacts;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    fn decide_income(verdict: &AnalysisVerdict, claimed: Option<&ClaimedFacts>) -> PolicyOutcome {
        decide(
            TrackKind::Income,
            verdict,
            claimed,
            &Policy::default(),
            today(),
        )
    }

    #[test]
    fn test_confidence_band_boundaries() {
        let policy = Policy::default();
        let cases = [
            (84, Decision::Review),
            (85, Decision::Approve),
            (30, Decision::Reject),
            (31, Decision::Review),
            (100, Decision::Approve),
            (0, Decision::Reject),
        ];
        for (confidence, expected) in cases {
            let outcome = decide(
                TrackKind::Address,
                &AnalysisVerdict::valid(confidence),
                None,
                &policy,
                today(),
            );
            assert_eq!(outcome.decision, expected, "confidence {confidence}");
            assert!(outcome.overrides.is_empty());
        }
    }

    #[test]
    fn test_invalid_document_overrides_high_confidence() {
        let verdict = AnalysisVerdict {
            is_valid: false,
            ..AnalysisVerdict::valid(99)
        };
        let outcome = decide(
            TrackKind::Address,
            &verdict,
            None,
            &Policy::default(),
            today(),
        );
        assert_eq!(outcome.decision, Decision::Reject);
        assert_eq!(outcome.overrides, vec![RISK_DOCUMENT_INVALID.to_string()]);
    }

    #[test]
    fn test_expired_id_document_overrides_confidence() {
        let verdict = AnalysisVerdict::valid(95).with_extracted(ExtractedFacts {
            expires_on: NaiveDate::from_ymd_opt(2023, 12, 31),
            ..ExtractedFacts::default()
        });
        let outcome = decide(
            TrackKind::GovernmentId,
            &verdict,
            None,
            &Policy::default(),
            today(),
        );
        assert_eq!(outcome.decision, Decision::Reject);
        assert_eq!(outcome.overrides, vec![RISK_DOCUMENT_EXPIRED.to_string()]);
    }

    #[test]
    fn test_expiry_only_applies_to_the_id_track() {
        let verdict = AnalysisVerdict::valid(95).with_extracted(ExtractedFacts {
            expires_on: NaiveDate::from_ymd_opt(2023, 12, 31),
            ..ExtractedFacts::default()
        });
        let outcome = decide(
            TrackKind::Address,
            &verdict,
            None,
            &Policy::default(),
            today(),
        );
        assert_eq!(outcome.decision, Decision::Approve);
    }

    #[test]
    fn test_income_below_rent_coverage_is_rejected() {
        let claimed = ClaimedFacts {
            monthly_rent: Some(2_000),
            ..ClaimedFacts::default()
        };
        let verdict = AnalysisVerdict::valid(92).with_extracted(ExtractedFacts {
            monthly_income: Some(3_500),
            ..ExtractedFacts::default()
        });

        let outcome = decide_income(&verdict, Some(&claimed));
        assert_eq!(outcome.decision, Decision::Reject);
        assert_eq!(
            outcome.overrides,
            vec![RISK_INCOME_BELOW_COVERAGE.to_string()]
        );
    }

    #[test]
    fn test_income_meeting_coverage_exactly_passes() {
        let claimed = ClaimedFacts {
            monthly_rent: Some(2_000),
            ..ClaimedFacts::default()
        };
        let verdict = AnalysisVerdict::valid(92).with_extracted(ExtractedFacts {
            monthly_income: Some(4_000),
            ..ExtractedFacts::default()
        });

        let outcome = decide_income(&verdict, Some(&claimed));
        assert_eq!(outcome.decision, Decision::Approve);
    }

    #[test]
    fn test_income_coverage_needs_both_figures() {
        // No claimed rent: the coverage rule cannot fire; bands decide.
        let verdict = AnalysisVerdict::valid(92).with_extracted(ExtractedFacts {
            monthly_income: Some(100),
            ..ExtractedFacts::default()
        });
        let outcome = decide_income(&verdict, None);
        assert_eq!(outcome.decision, Decision::Approve);
    }
}
