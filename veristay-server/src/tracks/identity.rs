//! Government-id verification and its cross-reference fast path.
//!
//! An id submission normally lands in the human review queue. When another
//! track (income, then address) has already been approved with extracted
//! facts, the extracted id facts are cross-referenced against them instead:
//! a full match auto-approves, any mismatch auto-rejects with the
//! discrepancy recorded. The policy is strict, with no partial credit: an
//! identity mismatch is a stronger signal than a low document-quality
//! score.

use crate::{
    models::{TrackStatus, VerificationRecord},
    policy,
    settings::Policy,
};
use chrono::{DateTime, Utc};
use veristay_core::{
    analysis::{AnalysisVerdict, RISK_ANALYSIS_FAILED},
    facts::{ClaimedFacts, DocumentRef, ExtractedFacts},
    track::{DecidedBy, TrackKind, TrackState},
};

/// Risk factor recorded when the extracted name contradicts the reference.
pub const RISK_NAME_MISMATCH: &str = "identity_name_mismatch";

/// Risk factor recorded when the extracted address contradicts the
/// reference.
pub const RISK_ADDRESS_MISMATCH: &str = "identity_address_mismatch";

enum FastPath {
    Match,
    Mismatch(Vec<String>),
    Unavailable,
}

/// The reference facts the fast path compares against: the first of
/// income-then-address that is approved and exposes both a name and an
/// address.
pub fn reference_facts(record: &VerificationRecord) -> Option<&ExtractedFacts> {
    [TrackKind::Income, TrackKind::Address]
        .into_iter()
        .find_map(|kind| {
            record
                .approved_extracted(kind)
                .filter(|facts| facts.full_name.is_some() && facts.address.is_some())
        })
}

/// Build the status for an id submission.
pub fn submitted(
    document: Option<&DocumentRef>,
    claimed: &ClaimedFacts,
    analysis: Option<&AnalysisVerdict>,
    reference: Option<&ExtractedFacts>,
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

    let overrides = policy::hard_overrides(
        TrackKind::GovernmentId,
        verdict,
        Some(claimed),
        policy_settings,
        now.date_naive(),
    );
    if !overrides.is_empty() {
        super::merge_risk_factors(&mut status, overrides);
        status.decide(TrackState::Rejected, DecidedBy::System, now);
        return status;
    }

    match reference.map(|reference| cross_reference(&verdict.extracted, reference)) {
        Some(FastPath::Match) => {
            status.decide(TrackState::Approved, DecidedBy::System, now);
        }
        Some(FastPath::Mismatch(discrepancies)) => {
            tracing::info!(?discrepancies, "id fast path found discrepancies");
            super::merge_risk_factors(&mut status, discrepancies);
            status.decide(TrackState::Rejected, DecidedBy::System, now);
        }
        // No usable reference: stays in the review queue.
        Some(FastPath::Unavailable) | None => {}
    }
    status
}

fn cross_reference(extracted: &ExtractedFacts, reference: &ExtractedFacts) -> FastPath {
    let (Some(name), Some(address)) = (extracted.full_name.as_deref(), extracted.address.as_deref())
    else {
        return FastPath::Unavailable;
    };
    let (Some(reference_name), Some(reference_address)) = (
        reference.full_name.as_deref(),
        reference.address.as_deref(),
    ) else {
        return FastPath::Unavailable;
    };

    let mut discrepancies = Vec::new();
    if !name.trim().eq_ignore_ascii_case(reference_name.trim()) {
        discrepancies.push(RISK_NAME_MISMATCH.to_string());
    }
    if !address_matches(address, reference_address) {
        discrepancies.push(RISK_ADDRESS_MISMATCH.to_string());
    }

    if discrepancies.is_empty() {
        FastPath::Match
    } else {
        FastPath::Mismatch(discrepancies)
    }
}

fn address_matches(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    a.contains(&b) || b.contains(&a)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMATTED_ADDRESS: &str = "123 Main St, Toronto, ON M5V 2N8";

    fn reference() -> ExtractedFacts {
        ExtractedFacts {
            full_name: Some("John Doe".to_string()),
            address: Some(FORMATTED_ADDRESS.to_string()),
            ..ExtractedFacts::default()
        }
    }

    fn id_verdict(name: &str, address: &str) -> AnalysisVerdict {
        AnalysisVerdict::valid(70).with_extracted(ExtractedFacts {
            full_name: Some(name.to_string()),
            address: Some(address.to_string()),
            ..ExtractedFacts::default()
        })
    }

    fn submit(verdict: &AnalysisVerdict, reference: Option<&ExtractedFacts>) -> TrackStatus {
        submitted(
            None,
            &ClaimedFacts::default(),
            Some(verdict),
            reference,
            &Policy::default(),
            Utc::now(),
        )
    }

    #[test]
    fn test_matching_facts_auto_approve() {
        let status = submit(
            &id_verdict("John Doe", FORMATTED_ADDRESS),
            Some(&reference()),
        );
        assert_eq!(status.state, TrackState::Approved);
        assert_eq!(status.decided_by, Some(DecidedBy::System));
    }

    #[test]
    fn test_name_comparison_ignores_case() {
        let status = submit(
            &id_verdict("JOHN DOE", FORMATTED_ADDRESS),
            Some(&reference()),
        );
        assert_eq!(status.state, TrackState::Approved);
    }

    #[test]
    fn test_name_mismatch_auto_rejects_with_discrepancy() {
        let status = submit(
            &id_verdict("Jane Doe", FORMATTED_ADDRESS),
            Some(&reference()),
        );
        assert_eq!(status.state, TrackState::Rejected);
        assert!(status
            .risk_factors
            .contains(&RISK_NAME_MISMATCH.to_string()));
        assert!(status.decided_at.is_some());
    }

    #[test]
    fn test_address_substring_counts_as_match() {
        let status = submit(&id_verdict("John Doe", "123 Main St"), Some(&reference()));
        assert_eq!(status.state, TrackState::Approved);
    }

    #[test]
    fn test_address_mismatch_auto_rejects() {
        let status = submit(
            &id_verdict("John Doe", "9 Elsewhere Rd, Ottawa"),
            Some(&reference()),
        );
        assert_eq!(status.state, TrackState::Rejected);
        assert!(status
            .risk_factors
            .contains(&RISK_ADDRESS_MISMATCH.to_string()));
    }

    #[test]
    fn test_without_reference_goes_to_review() {
        let status = submit(&id_verdict("John Doe", FORMATTED_ADDRESS), None);
        assert_eq!(status.state, TrackState::PendingReview);
        assert_eq!(status.decided_at, None);
    }

    #[test]
    fn test_incomparable_facts_are_not_a_mismatch() {
        // Extracted id facts carry no address: the fast path disengages
        // rather than rejecting.
        let verdict = AnalysisVerdict::valid(70).with_extracted(ExtractedFacts {
            full_name: Some("John Doe".to_string()),
            ..ExtractedFacts::default()
        });
        let status = submit(&verdict, Some(&reference()));
        assert_eq!(status.state, TrackState::PendingReview);
    }

    #[test]
    fn test_expired_document_rejects_before_the_fast_path() {
        let mut verdict = id_verdict("John Doe", FORMATTED_ADDRESS);
        verdict.extracted.expires_on = chrono::NaiveDate::from_ymd_opt(2000, 1, 1);
        let status = submit(&verdict, Some(&reference()));
        assert_eq!(status.state, TrackState::Rejected);
        assert!(status
            .risk_factors
            .contains(&veristay_core::analysis::RISK_DOCUMENT_EXPIRED.to_string()));
    }

    #[test]
    fn test_analysis_failure_falls_back_to_review() {
        let status = submitted(
            None,
            &ClaimedFacts::default(),
            None,
            Some(&reference()),
            &Policy::default(),
            Utc::now(),
        );
        assert_eq!(status.state, TrackState::PendingReview);
        assert_eq!(status.risk_factors, vec![RISK_ANALYSIS_FAILED.to_string()]);
    }
}
