//! The verification pipeline's service facade.
//!
//! Every externally triggered operation (submission, code confirmation,
//! link redemption, webhook delivery, admin analysis) enters here. Each
//! mutation is a read-modify-write transaction scoped to one user's
//! record: load fresh, recompute only the target track, save under
//! compare-and-swap, retry on conflict. Calls that cross a process
//! boundary (document analysis, check initiation, code delivery) happen
//! strictly outside that window.

use crate::{
    background::{self, WebhookOutcome},
    error::{VerificationError, VerifyResult},
    models::{TrackStatus, VerificationRecord},
    policy::{self, Decision, PolicyOutcome},
    scoring::{self, AccountSignals, AggregateTrust, RiskAssessment},
    settings::Policy,
    setups::{BackgroundCheckProvider, CodeSender, DocumentAnalyzer, ServiceSetup},
    store::{StoreError, VerificationStore},
    tracks,
};
use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};
use uuid::Uuid;
use validator::Validate;
use veristay_core::{
    analysis::AnalysisVerdict,
    common::{Account, BackgroundWebhookPayload, SubmitVerificationRequest},
    facts::{ClaimedFacts, DocumentRef},
    track::{TrackKind, TrackState},
};

/// Full per-track status map plus the derived trust summary.
#[derive(Clone, Debug, Serialize)]
pub struct VerificationStatus {
    /// Owner of the record
    pub user_id: Uuid,
    /// Status of every submitted track; absent keys were never submitted
    pub tracks: BTreeMap<TrackKind, TrackStatus>,
    /// Derived trust summary over all six tracks
    pub trust: AggregateTrust,
}

/// Result of one admin-driven (re-)analysis.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    /// Owner of the analyzed submission
    pub user_id: Uuid,
    /// Track that was analyzed
    pub track: TrackKind,
    /// The gateway's verdict; `None` when analysis itself failed
    pub verdict: Option<AnalysisVerdict>,
    /// What the policy says should happen
    pub decision: Decision,
    /// Whether the decision was written back to the record
    pub applied: bool,
}

/// The verification pipeline, generic over its deployment setup.
#[derive(Clone)]
pub struct VerificationService<S: ServiceSetup> {
    store: S::Store,
    analyzer: S::DocumentAnalyzer,
    background: S::BackgroundCheckProvider,
    code_sender: S::CodeSender,
    policy: Arc<Policy>,
}

impl<S: ServiceSetup> VerificationService<S> {
    /// Submit (or resubmit) one verification track for an account.
    ///
    /// Resubmission resets that track's sub-record only; other tracks are
    /// untouched.
    pub async fn submit(
        &self,
        account: &Account,
        request: &SubmitVerificationRequest,
    ) -> VerifyResult<TrackStatus> {
        request.validate()?;
        tracing::debug!(user_id = %account.id, track = %request.track, "verification submission");

        match request.track {
            TrackKind::Email => self.submit_email(account, request).await,
            TrackKind::Phone => self.submit_phone(account, request).await,
            TrackKind::Background => self.submit_background(account, request).await,
            TrackKind::GovernmentId | TrackKind::Address | TrackKind::Income => {
                self.submit_document(account, request).await
            }
        }
    }

    /// Confirm a pending phone code for a user.
    pub async fn confirm_phone_code(&self, user_id: Uuid, code: &str) -> VerifyResult<TrackStatus> {
        self.update_track(user_id, TrackKind::Phone, |record| {
            let status = record
                .track(TrackKind::Phone)
                .ok_or(VerificationError::NoPendingCode)?;
            tracks::phone::confirm(status, code, Utc::now())
        })
        .await
    }

    /// Redeem an email confirmation token (the link click).
    ///
    /// The token alone identifies the submission; redemption is single-use.
    pub async fn redeem_email_token(&self, token: &str) -> VerifyResult<TrackStatus> {
        let Some(record) = self.store.find_by_email_token(token).await? else {
            tracing::debug!("email confirmation token matched no pending submission");
            return Err(VerificationError::InvalidOrExpiredToken);
        };

        self.update_track(record.user_id, TrackKind::Email, |record| {
            let status = record
                .track(TrackKind::Email)
                .ok_or(VerificationError::InvalidOrExpiredToken)?;
            tracks::email::redeem(status, token, Utc::now())
        })
        .await
    }

    /// Apply a background-check completion webhook.
    ///
    /// Always acknowledges: duplicates and unmatched references are logged
    /// no-ops rather than errors, so provider retries cannot storm. The
    /// optional user hint in the payload is the stronger, race-free lookup
    /// path; without it the record is found by scanning for the reference.
    pub async fn apply_webhook(
        &self,
        payload: &BackgroundWebhookPayload,
    ) -> VerifyResult<WebhookOutcome> {
        let mut attempt = 0;
        loop {
            let record = match payload.user {
                Some(user_id) => self.store.load(user_id).await?,
                None => self.store.find_by_external_ref(&payload.external_ref).await?,
            };
            let Some(mut record) = record else {
                tracing::warn!(
                    external_ref = %payload.external_ref,
                    "background-check webhook matched no record"
                );
                return Ok(WebhookOutcome::Unmatched);
            };

            let status = record
                .track(TrackKind::Background)
                .filter(|status| {
                    status.external_ref.as_deref() == Some(payload.external_ref.as_str())
                })
                .cloned();
            let Some(status) = status else {
                tracing::warn!(
                    user_id = %record.user_id,
                    external_ref = %payload.external_ref,
                    "webhook reference does not match the user's current background check"
                );
                return Ok(WebhookOutcome::Unmatched);
            };

            let now = Utc::now();
            let Some(next) = background::complete(&status, payload.result, now) else {
                tracing::info!(
                    user_id = %record.user_id,
                    external_ref = %payload.external_ref,
                    "duplicate background-check webhook ignored"
                );
                return Ok(WebhookOutcome::AlreadyDecided);
            };

            record.put_track(TrackKind::Background, next.clone(), now);
            match self.store.save(record).await {
                Ok(_) => {
                    tracing::info!(
                        external_ref = %payload.external_ref,
                        state = %next.state,
                        "background check completed"
                    );
                    return Ok(WebhookOutcome::Applied(next));
                }
                Err(StoreError::Conflict { user_id }) => {
                    attempt += 1;
                    if attempt >= self.policy.max_update_attempts {
                        return Err(VerificationError::RecordContention(user_id));
                    }
                    tracing::debug!(%user_id, attempt, "webhook application conflicted, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The full per-track status map plus the aggregate trust fields.
    pub async fn status(&self, user_id: Uuid) -> VerifyResult<VerificationStatus> {
        let record = self.store.load(user_id).await?;
        let trust = scoring::aggregate_trust(record.as_ref());
        Ok(VerificationStatus {
            user_id,
            tracks: record.map(|record| record.tracks).unwrap_or_default(),
            trust,
        })
    }

    /// Re-run analysis and the decision policy over one submission that is
    /// awaiting review. With `auto_apply`, the outcome is written back to
    /// the record; otherwise it is only reported.
    pub async fn admin_analyze(
        &self,
        user_id: Uuid,
        track: TrackKind,
        auto_apply: bool,
    ) -> VerifyResult<AnalysisReport> {
        let record = self.store.load(user_id).await?;
        let status = record
            .as_ref()
            .and_then(|record| record.track(track))
            .filter(|status| status.state == TrackState::PendingReview)
            .cloned();
        let Some(status) = status else {
            return Err(VerificationError::NothingToAnalyze { user_id, track });
        };

        let claimed = status.claimed.clone().unwrap_or_default();
        let analysis = self
            .run_analysis(user_id, track, status.document.as_ref(), &claimed)
            .await;
        let outcome = match analysis.as_ref() {
            Some(verdict) => policy::decide(
                track,
                verdict,
                Some(&claimed),
                &self.policy,
                Utc::now().date_naive(),
            ),
            None => PolicyOutcome {
                decision: Decision::Review,
                overrides: Vec::new(),
            },
        };

        let mut applied = false;
        if auto_apply {
            self.update_track(user_id, track, |record| {
                // The submission may have changed while analysis ran; only
                // a track still awaiting review is written back.
                let current = record
                    .track(track)
                    .filter(|current| current.state == TrackState::PendingReview)
                    .ok_or(VerificationError::NothingToAnalyze { user_id, track })?;
                Ok(tracks::document::reviewed(
                    current,
                    analysis.as_ref(),
                    &outcome,
                    Utc::now(),
                ))
            })
            .await?;
            applied = true;
        }

        Ok(AnalysisReport {
            user_id,
            track,
            verdict: analysis,
            decision: outcome.decision,
            applied,
        })
    }

    /// Run [Self::admin_analyze] over many submissions. Each item is
    /// analyzed independently, so batch execution yields the same outcome
    /// per document as analyzing it alone; items no longer awaiting review
    /// are skipped with a warning.
    pub async fn admin_batch_analyze(
        &self,
        items: &[(Uuid, TrackKind)],
        auto_apply: bool,
    ) -> VerifyResult<Vec<AnalysisReport>> {
        let mut reports = Vec::with_capacity(items.len());
        for (user_id, track) in items {
            match self.admin_analyze(*user_id, *track, auto_apply).await {
                Ok(report) => reports.push(report),
                Err(VerificationError::NothingToAnalyze { user_id, track }) => {
                    tracing::warn!(%user_id, %track, "skipping batch item: not awaiting review");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(reports)
    }

    /// Advisory fraud assessment over account signals and the collected
    /// verification record. Never changes any track's state.
    pub async fn fraud_check(
        &self,
        user_id: Uuid,
        signals: &AccountSignals,
    ) -> VerifyResult<RiskAssessment> {
        let record = self.store.load(user_id).await?;
        Ok(scoring::assess_risk(signals, record.as_ref(), &self.policy))
    }

    async fn submit_email(
        &self,
        account: &Account,
        request: &SubmitVerificationRequest,
    ) -> VerifyResult<TrackStatus> {
        let claimed_email =
            request
                .claimed
                .email
                .as_deref()
                .ok_or(VerificationError::MissingClaim {
                    track: TrackKind::Email,
                    field: "email",
                })?;
        if !claimed_email.eq_ignore_ascii_case(&account.email) {
            return Err(VerificationError::EmailMismatch);
        }

        let token = tracks::email::generate_token(account.id, claimed_email);
        let ttl = self.policy.email_token_ttl();
        let status = self
            .update_track(account.id, TrackKind::Email, |_record| {
                Ok(tracks::email::submitted(
                    &token,
                    &request.claimed,
                    Utc::now(),
                    ttl,
                ))
            })
            .await?;

        // Delivery happens once the pending state is durable.
        self.code_sender
            .send_code(claimed_email, &token)
            .await
            .map_err(VerificationError::CodeDelivery)?;

        Ok(status)
    }

    async fn submit_phone(
        &self,
        account: &Account,
        request: &SubmitVerificationRequest,
    ) -> VerifyResult<TrackStatus> {
        let phone_number =
            request
                .claimed
                .phone_number
                .as_deref()
                .ok_or(VerificationError::MissingClaim {
                    track: TrackKind::Phone,
                    field: "phone_number",
                })?;

        let code = tracks::phone::generate_code();
        let ttl = self.policy.phone_code_ttl();
        let status = self
            .update_track(account.id, TrackKind::Phone, |_record| {
                Ok(tracks::phone::submitted(
                    &code,
                    &request.claimed,
                    Utc::now(),
                    ttl,
                ))
            })
            .await?;

        self.code_sender
            .send_code(phone_number, &code)
            .await
            .map_err(VerificationError::CodeDelivery)?;

        Ok(status)
    }

    async fn submit_background(
        &self,
        account: &Account,
        request: &SubmitVerificationRequest,
    ) -> VerifyResult<TrackStatus> {
        // Initiation crosses a process boundary; no record lock is held
        // while it is in flight.
        let external_ref = self
            .background
            .initiate(account)
            .await
            .map_err(VerificationError::CheckInitiation)?;
        tracing::info!(user_id = %account.id, %external_ref, "background check initiated");

        self.update_track(account.id, TrackKind::Background, |_record| {
            Ok(background::submitted(
                &external_ref,
                &request.claimed,
                Utc::now(),
            ))
        })
        .await
    }

    async fn submit_document(
        &self,
        account: &Account,
        request: &SubmitVerificationRequest,
    ) -> VerifyResult<TrackStatus> {
        let track = request.track;
        if track == TrackKind::Income && request.document.is_none() {
            return Err(VerificationError::MissingDocument(track));
        }

        let analysis = self
            .run_analysis(account.id, track, request.document.as_ref(), &request.claimed)
            .await;

        self.update_track(account.id, track, |record| {
            let now = Utc::now();
            Ok(match track {
                TrackKind::GovernmentId => tracks::identity::submitted(
                    request.document.as_ref(),
                    &request.claimed,
                    analysis.as_ref(),
                    tracks::identity::reference_facts(record),
                    &self.policy,
                    now,
                ),
                _ => tracks::document::submitted(
                    track,
                    request.document.as_ref(),
                    &request.claimed,
                    analysis.as_ref(),
                    &self.policy,
                    now,
                ),
            })
        })
        .await
    }

    /// Call the analysis gateway, mapping failure to "no verdict". The
    /// track builders turn that into the review fallback rather than
    /// letting it surface as an error or an approval.
    async fn run_analysis(
        &self,
        user_id: Uuid,
        track: TrackKind,
        document: Option<&DocumentRef>,
        claimed: &ClaimedFacts,
    ) -> Option<AnalysisVerdict> {
        match self.analyzer.analyze(track, document, claimed).await {
            Ok(verdict) => Some(verdict),
            Err(err) => {
                tracing::warn!(
                    %user_id,
                    %track,
                    %err,
                    "document analysis failed; deferring to review"
                );
                None
            }
        }
    }

    /// Run one read-modify-write transaction against a user's record.
    ///
    /// The closure recomputes only the target track from the freshly
    /// loaded record; the compare-and-swap save merges it in. On conflict
    /// the whole load-compute-save cycle is retried, so concurrent writers
    /// to other tracks of the same record are never clobbered. A closure
    /// error aborts without writing.
    async fn update_track<F>(&self, user_id: Uuid, kind: TrackKind, op: F) -> VerifyResult<TrackStatus>
    where
        F: Fn(&VerificationRecord) -> VerifyResult<TrackStatus>,
    {
        let mut attempt = 0;
        loop {
            let now = Utc::now();
            let mut record = self
                .store
                .load(user_id)
                .await?
                .unwrap_or_else(|| VerificationRecord::new(user_id, now));
            let status = op(&record)?;
            record.put_track(kind, status.clone(), now);

            match self.store.save(record).await {
                Ok(_) => {
                    tracing::debug!(%user_id, track = %kind, state = %status.state, "track updated");
                    return Ok(status);
                }
                Err(StoreError::Conflict { .. }) => {
                    attempt += 1;
                    if attempt >= self.policy.max_update_attempts {
                        tracing::warn!(%user_id, track = %kind, "record update retries exhausted");
                        return Err(VerificationError::RecordContention(user_id));
                    }
                    tracing::debug!(%user_id, track = %kind, attempt, "record conflict, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Builder for [VerificationService].
pub struct VerificationServiceBuilder<S: ServiceSetup> {
    store: Option<S::Store>,
    analyzer: Option<S::DocumentAnalyzer>,
    background: Option<S::BackgroundCheckProvider>,
    code_sender: Option<S::CodeSender>,
    policy: Option<Policy>,
}

impl<S: ServiceSetup> Default for VerificationServiceBuilder<S> {
    fn default() -> Self {
        Self {
            store: None,
            analyzer: None,
            background: None,
            code_sender: None,
            policy: None,
        }
    }
}

impl<S: ServiceSetup> VerificationServiceBuilder<S> {
    /// Set the record store
    pub fn with_store(mut self, store: S::Store) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the document-analysis gateway
    pub fn with_document_analyzer(mut self, analyzer: S::DocumentAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Set the background-check provider
    pub fn with_background_check_provider(
        mut self,
        background: S::BackgroundCheckProvider,
    ) -> Self {
        self.background = Some(background);
        self
    }

    /// Set the service that delivers codes and links
    pub fn with_code_sender(mut self, code_sender: S::CodeSender) -> Self {
        self.code_sender = Some(code_sender);
        self
    }

    /// Override the default decision policy
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Finalize the builder and return the [VerificationService]
    pub fn finalize(self) -> Result<VerificationService<S>> {
        Ok(VerificationService {
            store: self.store.ok_or_else(|| anyhow!("store is required"))?,
            analyzer: self
                .analyzer
                .ok_or_else(|| anyhow!("document analyzer is required"))?,
            background: self
                .background
                .ok_or_else(|| anyhow!("background-check provider is required"))?,
            code_sender: self
                .code_sender
                .ok_or_else(|| anyhow!("code sender is required"))?,
            policy: Arc::new(self.policy.unwrap_or_default()),
        })
    }
}

impl<S> std::fmt::Debug for VerificationService<S>
where
    S: ServiceSetup,
    S::Store: std::fmt::Debug,
    S::DocumentAnalyzer: std::fmt::Debug,
    S::BackgroundCheckProvider: std::fmt::Debug,
    S::CodeSender: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationService")
            .field("store", &self.store)
            .field("analyzer", &self.analyzer)
            .field("background", &self.background)
            .field("code_sender", &self.code_sender)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<S> std::fmt::Debug for VerificationServiceBuilder<S>
where
    S: ServiceSetup,
    S::Store: std::fmt::Debug,
    S::DocumentAnalyzer: std::fmt::Debug,
    S::BackgroundCheckProvider: std::fmt::Debug,
    S::CodeSender: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationServiceBuilder")
            .field("store", &self.store)
            .field("analyzer", &self.analyzer)
            .field("background", &self.background)
            .field("code_sender", &self.code_sender)
            .field("policy", &self.policy)
            .finish()
    }
}
