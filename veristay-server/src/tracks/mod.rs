//! Per-track state machines.
//!
//! Transition logic lives here as pure functions over `(current status,
//! inputs, now)`, so protocol edges like expiry boundaries are testable
//! without a clock. The service facade owns loading and atomically saving
//! the surrounding record.

use crate::models::TrackStatus;
use veristay_core::analysis::AnalysisVerdict;

pub mod document;
pub mod email;
pub mod identity;
pub mod phone;

/// Copy a verdict's outputs onto the track status.
pub(crate) fn record_verdict(status: &mut TrackStatus, verdict: &AnalysisVerdict) {
    status.extracted = Some(verdict.extracted.clone());
    status.confidence = Some(verdict.confidence);
    merge_risk_factors(status, verdict.risk_factors.iter().cloned());
}

/// Append risk factors, keeping a single copy of each.
pub(crate) fn merge_risk_factors(
    status: &mut TrackStatus,
    factors: impl IntoIterator<Item = String>,
) {
    for factor in factors {
        if !status.risk_factors.contains(&factor) {
            status.risk_factors.push(factor);
        }
    }
}
