//! Aggregate trust and fraud/risk scoring.
//!
//! Both scorers are pure over already-collected state. The aggregate score
//! is recomputed on demand after transitions rather than stored; the risk
//! assessment is advisory and never flips a track's state by itself.

use crate::{models::VerificationRecord, settings::Policy};
use serde::Serialize;
use veristay_core::track::{TrackKind, TrackState};

/// Tracks that must all be approved for the account to count as verified.
/// Address, income and background contribute to the score but not to this
/// flag.
const REQUIRED_FOR_VERIFIED: [TrackKind; 3] =
    [TrackKind::Email, TrackKind::Phone, TrackKind::GovernmentId];

/// Derived trust summary over all six tracks.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AggregateTrust {
    /// Percentage of tracks approved, rounded
    pub score: u8,
    /// Whether the identity-defining tracks are all approved
    pub verified: bool,
    /// Number of approved tracks
    pub completed_count: usize,
    /// Number of tracks that exist
    pub total_count: usize,
}

/// Compute the trust summary for a record.
///
/// A track absent from the map counts exactly like one that never reached
/// approval; a missing record scores zero.
pub fn aggregate_trust(record: Option<&VerificationRecord>) -> AggregateTrust {
    let approved = |kind: TrackKind| {
        record
            .and_then(|record| record.track(kind))
            .is_some_and(|status| status.state == TrackState::Approved)
    };

    let completed_count = TrackKind::ALL.into_iter().filter(|kind| approved(*kind)).count();
    let total_count = TrackKind::ALL.len();
    let score = ((completed_count as f64 / total_count as f64) * 100.0).round() as u8;
    let verified = REQUIRED_FOR_VERIFIED.into_iter().all(approved);

    AggregateTrust {
        score,
        verified,
        completed_count,
        total_count,
    }
}

/// Account-activity signals collected by the caller.
#[derive(Clone, Debug)]
pub struct AccountSignals {
    /// How old the account is
    pub account_age: chrono::Duration,
    /// Listings the account has posted
    pub listings_count: u32,
    /// Applications the account has filed
    pub applications_count: u32,
    /// Opaque device markers gathered at sign-in (e.g. "vpn", "emulator")
    pub device_signals: Vec<String>,
}

/// Advisory fraud assessment surfaced to reviewers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskAssessment {
    /// Whether the score crossed the configured threshold
    pub is_fraudulent: bool,
    /// Combined risk, 0–100
    pub risk_score: u8,
    /// Which heuristics fired
    pub indicators: Vec<String>,
}

/// Device markers that contribute to the risk score when present.
const FLAGGED_DEVICE_SIGNALS: [&str; 4] = ["vpn", "proxy", "emulator", "rooted_device"];

/// Combine account signals and collected verification facts into a risk
/// score. Consumes what analysis already recorded; performs no analysis of
/// its own.
pub fn assess_risk(
    signals: &AccountSignals,
    record: Option<&VerificationRecord>,
    policy: &Policy,
) -> RiskAssessment {
    let mut score: u32 = 0;
    let mut indicators = Vec::new();
    let mut raise = |points: u32, indicator: String| {
        score += points;
        indicators.push(indicator);
    };

    let young = signals.account_age < chrono::Duration::days(7);
    if signals.account_age < chrono::Duration::days(1) {
        raise(35, "account_hours_old".to_string());
    } else if young {
        raise(20, "account_under_week_old".to_string());
    }
    if young && signals.applications_count > 10 {
        raise(20, "application_burst".to_string());
    }
    if young && signals.listings_count > 20 {
        raise(15, "listing_flood".to_string());
    }

    for signal in &signals.device_signals {
        if FLAGGED_DEVICE_SIGNALS.contains(&signal.as_str()) {
            raise(10, format!("device_{signal}"));
        }
    }

    if let Some(record) = record {
        // Risk factors analysis attached to any submitted document.
        let mut document_points = 0;
        for (kind, status) in &record.tracks {
            for factor in &status.risk_factors {
                if document_points < 30 {
                    document_points += 10;
                    indicators.push(format!("document_{factor}"));
                }
            }
            if status.state == TrackState::Rejected {
                indicators.push(format!("rejected_{kind}"));
                score += 15;
            }
        }
        score += document_points;
    }

    let risk_score = score.min(100) as u8;
    RiskAssessment {
        is_fraudulent: risk_score >= policy.fraud_threshold,
        risk_score,
        indicators,
    }
}
