//! Test setup code: deterministic collaborator doubles.

use crate::setups::{BackgroundCheckProvider, CodeSender, DocumentAnalyzer, ServiceSetup};
use crate::store::MemoryVerificationStore;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use uuid::Uuid;
use veristay_core::{
    analysis::AnalysisVerdict,
    common::Account,
    facts::{ClaimedFacts, DocumentRef},
    track::TrackKind,
};

#[derive(Clone, Debug, Default)]
pub struct TestSetup;

impl ServiceSetup for TestSetup {
    type Store = MemoryVerificationStore;
    type DocumentAnalyzer = StubDocumentAnalyzer;
    type BackgroundCheckProvider = StubBackgroundCheck;
    type CodeSender = RecordingCodeSender;
}

/// Analyzer returning pre-programmed verdicts keyed by document ref.
/// Unstubbed documents fail analysis, which exercises the review fallback.
#[derive(Clone, Debug, Default)]
pub struct StubDocumentAnalyzer {
    verdicts: Arc<Mutex<HashMap<String, AnalysisVerdict>>>,
}

impl StubDocumentAnalyzer {
    pub fn stub(&self, document: &str, verdict: AnalysisVerdict) {
        self.verdicts
            .lock()
            .unwrap()
            .insert(document.to_string(), verdict);
    }
}

#[async_trait]
impl DocumentAnalyzer for StubDocumentAnalyzer {
    async fn analyze(
        &self,
        _track: TrackKind,
        document: Option<&DocumentRef>,
        _claimed: &ClaimedFacts,
    ) -> Result<AnalysisVerdict> {
        let Some(document) = document else {
            bail!("no document to analyze");
        };
        match self.verdicts.lock().unwrap().get(document.as_str()) {
            Some(verdict) => Ok(verdict.clone()),
            None => bail!("no stubbed verdict for {document}"),
        }
    }
}

/// Background-check provider that records initiations and hands out
/// deterministic-looking references. Tests deliver the webhook themselves.
#[derive(Clone, Debug, Default)]
pub struct StubBackgroundCheck {
    initiated: Arc<Mutex<Vec<(Uuid, String)>>>,
}

impl StubBackgroundCheck {
    pub fn initiated(&self) -> Vec<(Uuid, String)> {
        self.initiated.lock().unwrap().clone()
    }

    pub fn last_ref(&self) -> Option<String> {
        self.initiated
            .lock()
            .unwrap()
            .last()
            .map(|(_, external_ref)| external_ref.clone())
    }
}

#[async_trait]
impl BackgroundCheckProvider for StubBackgroundCheck {
    async fn initiate(&self, account: &Account) -> Result<String> {
        let external_ref = format!("chk_{}", Uuid::new_v4().simple());
        self.initiated
            .lock()
            .unwrap()
            .push((account.id, external_ref.clone()));
        Ok(external_ref)
    }
}

/// Code sender that keeps everything it was asked to deliver.
#[derive(Clone, Debug, Default)]
pub struct RecordingCodeSender {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingCodeSender {
    pub fn get_messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    /// The code most recently sent to the given destination.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(dest, _)| dest == to)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl CodeSender for RecordingCodeSender {
    async fn send_code(&self, to: &str, code: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((to.to_string(), code.to_string()));
        Ok(())
    }
}
