//! This abstracts the pipeline's side-effects into "setups".
//!
//! This module defines the traits, submodules define test, local-dev &
//! production collections of implementations.

use crate::store::VerificationStore;
use anyhow::Result;
use async_trait::async_trait;
use veristay_core::{
    analysis::AnalysisVerdict,
    common::Account,
    facts::{ClaimedFacts, DocumentRef},
    track::TrackKind,
};

pub mod local;
pub mod prod;
#[cfg(test)]
pub mod test;

/// This trait groups type parameters to the [crate::service::VerificationService]
/// struct.
///
/// It captures the setup of the pipeline, distinguishing between e.g.
/// unit testing & production setups.
pub trait ServiceSetup: Clone + Send + Sync + 'static {
    /// Which store holds the per-user verification records
    type Store: VerificationStore;
    /// Which document-analysis capability to use
    type DocumentAnalyzer: DocumentAnalyzer;
    /// Which background-check provider to submit checks to
    type BackgroundCheckProvider: BackgroundCheckProvider;
    /// Which implementation to use to send confirmation codes & links
    type CodeSender: CodeSender;
}

/// External content-analysis capability for document-backed tracks.
///
/// Given a document and the facts the user claims, returns a
/// validity/confidence verdict. The production implementation calls an
/// external AI service; tests substitute a deterministic stub.
#[async_trait]
pub trait DocumentAnalyzer: Clone + Send + Sync {
    /// Analyze a submitted document against the claimed facts.
    async fn analyze(
        &self,
        track: TrackKind,
        document: Option<&DocumentRef>,
        claimed: &ClaimedFacts,
    ) -> Result<AnalysisVerdict>;
}

/// Third-party background-check integration.
#[async_trait]
pub trait BackgroundCheckProvider: Clone + Send + Sync {
    /// Submit a check for the account and return the provider's opaque
    /// reference. The outcome arrives later as a webhook; this call never
    /// blocks on the check itself.
    async fn initiate(&self, account: &Account) -> Result<String>;
}

/// The service that delivers verification codes and confirmation links.
#[async_trait]
pub trait CodeSender: Clone + Send + Sync {
    /// Send the code associated with the destination
    async fn send_code(&self, to: &str, code: &str) -> Result<()>;
}
