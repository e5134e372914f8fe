//! Pipeline setup for local development & easier integration testing.

use super::{prod::HttpDocumentAnalyzer, BackgroundCheckProvider, CodeSender, ServiceSetup};
use crate::store::MemoryVerificationStore;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;
use veristay_core::common::Account;

/// Implementation of `ServiceSetup` for local environments: records live in
/// memory, codes go to the log, and background checks wait for a manually
/// delivered webhook.
#[derive(Clone, Debug)]
pub struct LocalSetup;

impl ServiceSetup for LocalSetup {
    type Store = MemoryVerificationStore;
    type DocumentAnalyzer = HttpDocumentAnalyzer;
    type BackgroundCheckProvider = LoggingBackgroundCheck;
    type CodeSender = LoggingCodeSender;
}

/// A `CodeSender` that doesn't actually send anything, but logs the code
/// via tracing so a developer can pick it up from the console.
#[derive(Clone, Debug, Default)]
pub struct LoggingCodeSender;

#[async_trait]
impl CodeSender for LoggingCodeSender {
    async fn send_code(&self, to: &str, code: &str) -> Result<()> {
        tracing::info!(to, code, "verification code (log delivery only)");
        Ok(())
    }
}

/// A `BackgroundCheckProvider` that fabricates a reference and logs it.
/// Complete the check by posting the webhook payload yourself.
#[derive(Clone, Debug, Default)]
pub struct LoggingBackgroundCheck;

#[async_trait]
impl BackgroundCheckProvider for LoggingBackgroundCheck {
    async fn initiate(&self, account: &Account) -> Result<String> {
        let external_ref = format!("local_{}", Uuid::new_v4().simple());
        tracing::info!(
            user_id = %account.id,
            %external_ref,
            "background check initiated locally; deliver its webhook manually to complete it"
        );
        Ok(external_ref)
    }
}
