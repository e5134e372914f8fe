//! Request and response data types exchanged between the verification core
//! and its callers (the routing layer and third-party webhook receivers).

use crate::{
    analysis::CheckResult,
    facts::{ClaimedFacts, DocumentRef},
    track::TrackKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Snapshot of the owning account entity, supplied by the caller.
///
/// The verification record is exclusively owned by this account; the core
/// never looks accounts up itself.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Account {
    /// Account identity
    pub id: Uuid,
    /// Email address registered on the account
    pub email: String,
}

impl Account {
    /// Create an account snapshot.
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// Request to start (or restart) one verification track.
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct SubmitVerificationRequest {
    /// Which track is being submitted
    pub track: TrackKind,
    /// Facts the user claims
    #[validate]
    #[serde(default)]
    pub claimed: ClaimedFacts,
    /// Supporting document, where the track takes one
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub document: Option<DocumentRef>,
}

impl SubmitVerificationRequest {
    /// A submission with claimed facts and no document.
    pub fn new(track: TrackKind, claimed: ClaimedFacts) -> Self {
        Self {
            track,
            claimed,
            document: None,
        }
    }

    /// Attach a supporting document.
    pub fn with_document(mut self, document: DocumentRef) -> Self {
        self.document = Some(document);
        self
    }
}

/// Request to confirm a pending phone code.
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct PhoneConfirmRequest {
    /// The 6-digit code the user received
    #[validate(length(min = 6, max = 6))]
    pub code: String,
}

/// Request to redeem an email confirmation token (the link click).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EmailRedeemRequest {
    /// The single-use token embedded in the confirmation link
    pub token: String,
}

/// Payload a background-check provider delivers when a check completes.
///
/// Providers retry delivery, so receivers treat this as at-least-once.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BackgroundWebhookPayload {
    /// The provider's opaque check reference, issued at initiation
    pub external_ref: String,
    /// Outcome of the check
    pub result: CheckResult,
    /// Direct user identity, when the provider echoes it back; a stronger,
    /// race-free lookup path than scanning by reference
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<Uuid>,
}

/// Response type indicating success.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SuccessResponse {
    /// Whether the response was successful
    pub success: bool,
}
