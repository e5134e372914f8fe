//! Helpers for exercising the pipeline against the test setup.

use crate::{
    service::{VerificationService, VerificationServiceBuilder},
    settings::Policy,
    setups::test::{RecordingCodeSender, StubBackgroundCheck, StubDocumentAnalyzer, TestSetup},
    store::MemoryVerificationStore,
};
use uuid::Uuid;
use veristay_core::common::Account;

/// A verification service wired to in-memory collaborator doubles, with
/// handles onto each of them.
#[derive(Debug)]
pub(crate) struct TestContext {
    service: VerificationService<TestSetup>,
    store: MemoryVerificationStore,
    analyzer: StubDocumentAnalyzer,
    background: StubBackgroundCheck,
    code_sender: RecordingCodeSender,
}

impl TestContext {
    pub(crate) fn new() -> Self {
        Self::with_policy(Policy::default())
    }

    pub(crate) fn with_policy(policy: Policy) -> Self {
        let store = MemoryVerificationStore::default();
        let analyzer = StubDocumentAnalyzer::default();
        let background = StubBackgroundCheck::default();
        let code_sender = RecordingCodeSender::default();

        let service = VerificationServiceBuilder::<TestSetup>::default()
            .with_store(store.clone())
            .with_document_analyzer(analyzer.clone())
            .with_background_check_provider(background.clone())
            .with_code_sender(code_sender.clone())
            .with_policy(policy)
            .finalize()
            .expect("all collaborators are set");

        Self {
            service,
            store,
            analyzer,
            background,
            code_sender,
        }
    }

    pub(crate) fn service(&self) -> &VerificationService<TestSetup> {
        &self.service
    }

    pub(crate) fn store(&self) -> &MemoryVerificationStore {
        &self.store
    }

    pub(crate) fn analyzer(&self) -> &StubDocumentAnalyzer {
        &self.analyzer
    }

    pub(crate) fn background(&self) -> &StubBackgroundCheck {
        &self.background
    }

    pub(crate) fn code_sender(&self) -> &RecordingCodeSender {
        &self.code_sender
    }

    pub(crate) fn account(&self, email: &str) -> Account {
        Account::new(Uuid::new_v4(), email)
    }
}
