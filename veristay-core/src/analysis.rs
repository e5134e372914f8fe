//! Contract types for the external document-analysis capability and the
//! third-party background check.

use crate::facts::ExtractedFacts;
use serde::{Deserialize, Serialize};

/// Risk factor recorded when the analysis gateway could not be reached;
/// submissions carrying it fall back to human review.
pub const RISK_ANALYSIS_FAILED: &str = "analysis_failed";

/// Risk factor an analyzer reports for a document past its expiry date.
pub const RISK_DOCUMENT_EXPIRED: &str = "document_expired";

/// Verdict returned by the document-analysis capability.
///
/// The production implementation is an external AI service; tests use a
/// deterministic stub. Both satisfy the same contract.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AnalysisVerdict {
    /// Whether the analyzer considers the document genuine and applicable
    pub is_valid: bool,
    /// Certainty of the verdict, 0–100
    pub confidence: u8,
    /// Structured facts read off the document
    #[serde(default)]
    pub extracted: ExtractedFacts,
    /// Free-form risk markers the analyzer raised
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

impl AnalysisVerdict {
    /// A valid verdict at the given confidence with no extracted facts.
    pub fn valid(confidence: u8) -> Self {
        Self {
            is_valid: true,
            confidence,
            extracted: ExtractedFacts::default(),
            risk_factors: Vec::new(),
        }
    }

    /// Attach extracted facts to this verdict.
    pub fn with_extracted(mut self, extracted: ExtractedFacts) -> Self {
        self.extracted = extracted;
        self
    }

    /// Attach a risk factor to this verdict.
    pub fn with_risk_factor(mut self, factor: impl Into<String>) -> Self {
        self.risk_factors.push(factor.into());
        self
    }
}

/// Outcome a third-party background check reports via webhook.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckResult {
    /// Nothing found; the check passes
    Clear,
    /// Findings require attention; the check fails
    Consider,
}
