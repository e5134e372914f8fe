//! Production setup code.
//! Actually calls out to the HTTP services configured in `settings.toml`.

use crate::{
    settings,
    setups::{BackgroundCheckProvider, CodeSender, DocumentAnalyzer, ServiceSetup},
    store::VerificationStore,
};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use mailgun_rs::{EmailAddress, Mailgun, MailgunRegion, Message};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::RetryTransientMiddleware;
use retry_policies::policies::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, marker::PhantomData, time::Duration};
use url::Url;
use uuid::Uuid;
use veristay_core::{
    analysis::AnalysisVerdict,
    common::Account,
    facts::{ClaimedFacts, DocumentRef},
    track::TrackKind,
};

/// Production implementation of `ServiceSetup`.
///
/// Generic over the store: deployments bind their durable database behind
/// the [VerificationStore] trait.
pub struct ProdSetup<St>(PhantomData<St>);

impl<St> Clone for ProdSetup<St> {
    fn clone(&self) -> Self {
        Self(PhantomData)
    }
}

impl<St> std::fmt::Debug for ProdSetup<St> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProdSetup").finish()
    }
}

impl<St: VerificationStore> ServiceSetup for ProdSetup<St> {
    type Store = St;
    type DocumentAnalyzer = HttpDocumentAnalyzer;
    type BackgroundCheckProvider = HttpBackgroundCheckProvider;
    type CodeSender = EmailCodeSender;
}

/// Build a reqwest client with the retrying middleware the settings ask
/// for.
fn middleware_client(settings: &settings::HttpClient) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(settings.timeout())
        .pool_idle_timeout(settings.pool_idle_timeout())
        .build()
        .context("constructing http client")?;

    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(
            Duration::from_millis(settings.retry_options.bounds_low_ms),
            Duration::from_millis(settings.retry_options.bounds_high_ms),
        )
        .build_with_max_retries(settings.retry_options.count);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Document analyzer backed by the external analysis service.
#[derive(Clone, Debug)]
pub struct HttpDocumentAnalyzer {
    client: ClientWithMiddleware,
    endpoint: Url,
}

impl HttpDocumentAnalyzer {
    /// Connect to the analysis service configured in the settings.
    pub fn new(settings: &settings::Analysis) -> Result<Self> {
        Ok(Self {
            client: middleware_client(&settings.http_client)?,
            endpoint: settings.endpoint.clone(),
        })
    }
}

#[async_trait]
impl DocumentAnalyzer for HttpDocumentAnalyzer {
    async fn analyze(
        &self,
        track: TrackKind,
        document: Option<&DocumentRef>,
        claimed: &ClaimedFacts,
    ) -> Result<AnalysisVerdict> {
        #[derive(Serialize)]
        struct AnalyzeRequest<'a> {
            track: TrackKind,
            document: Option<&'a DocumentRef>,
            claimed: &'a ClaimedFacts,
        }

        tracing::debug!(%track, ?document, "requesting document analysis");

        let verdict = self
            .client
            .post(self.endpoint.clone())
            .json(&AnalyzeRequest {
                track,
                document,
                claimed,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<AnalysisVerdict>()
            .await
            .context("parsing analysis verdict")?;

        Ok(verdict)
    }
}

/// Background-check provider backed by the third party's HTTP API.
#[derive(Clone, Debug)]
pub struct HttpBackgroundCheckProvider {
    client: ClientWithMiddleware,
    endpoint: Url,
}

impl HttpBackgroundCheckProvider {
    /// Connect to the provider configured in the settings.
    pub fn new(settings: &settings::BackgroundCheck) -> Result<Self> {
        Ok(Self {
            client: middleware_client(&settings.http_client)?,
            endpoint: settings.endpoint.clone(),
        })
    }
}

#[async_trait]
impl BackgroundCheckProvider for HttpBackgroundCheckProvider {
    async fn initiate(&self, account: &Account) -> Result<String> {
        #[derive(Serialize)]
        struct InitiateRequest<'a> {
            user_id: Uuid,
            email: &'a str,
        }

        #[derive(Deserialize)]
        struct InitiateResponse {
            reference: String,
        }

        tracing::debug!(user_id = %account.id, "submitting background check");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&InitiateRequest {
                user_id: account.id,
                email: &account.email,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<InitiateResponse>()
            .await
            .context("parsing background-check initiation response")?;

        Ok(response.reference)
    }
}

/// Sends verification codes & confirmation links over email.
#[derive(Clone, Debug)]
pub struct EmailCodeSender {
    settings: settings::Mailgun,
}

impl EmailCodeSender {
    /// Create a new EmailCodeSender
    pub fn new(settings: settings::Mailgun) -> Self {
        Self { settings }
    }

    fn sender(&self) -> EmailAddress {
        EmailAddress::name_address(&self.settings.from_name, &self.settings.from_address)
    }

    fn message(&self, email: &str, code: &str) -> Message {
        let template_vars = HashMap::from_iter([("code".to_string(), code.to_string())]);

        Message {
            to: vec![EmailAddress::address(email)],
            subject: self.settings.subject.clone(),
            template: self.settings.template.clone(),
            template_vars,
            ..Default::default()
        }
    }
}

#[async_trait]
impl CodeSender for EmailCodeSender {
    /// Sends the code to the user
    async fn send_code(&self, to: &str, code: &str) -> Result<()> {
        let message = self.message(to, code);

        tracing::debug!(
            to,
            subject = %message.subject,
            template = %message.template,
            "sending verification email"
        );

        let client = Mailgun {
            message,
            api_key: self.settings.api_key.clone(),
            domain: self.settings.domain.clone(),
        };

        client.async_send(MailgunRegion::US, &self.sender()).await?;

        Ok(())
    }
}
