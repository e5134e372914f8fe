//! Email verification: a single-use confirmation link token.

use crate::{
    error::{VerificationError, VerifyResult},
    models::TrackStatus,
};
use chrono::{DateTime, Utc};
use hex::ToHex;
use rand::Rng;
use uuid::Uuid;
use veristay_core::{
    facts::ClaimedFacts,
    track::{DecidedBy, TrackState},
};

/// Derive a fresh confirmation token for an email submission.
///
/// A random nonce goes into the derivation, so resubmission always yields
/// a new token and the old link goes dead.
pub fn generate_token(user_id: Uuid, email: &str) -> String {
    let nonce: u64 = rand::thread_rng().gen();
    blake3::derive_key(
        "veristay 2024-06-18 email confirmation tokens",
        &[
            user_id.as_bytes().as_slice(),
            email.as_bytes(),
            &nonce.to_le_bytes(),
        ]
        .concat(),
    )
    .encode_hex()
}

/// Status for a fresh email submission: the link is out, the clock runs.
pub fn submitted(
    token: &str,
    claimed: &ClaimedFacts,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
) -> TrackStatus {
    let mut status = TrackStatus::new(TrackState::PendingEmail, now);
    status.secret = Some(token.to_string());
    status.expires_at = Some(now + ttl);
    status.claimed = Some(claimed.clone());
    status
}

/// Evaluate a link-click redemption attempt.
///
/// Redemption is single-use: once the track is decided the secret is gone,
/// and any further attempt (including replaying the original link) fails
/// without changing state. Used, unknown, and expired tokens are
/// indistinguishable to the caller.
pub fn redeem(status: &TrackStatus, token: &str, now: DateTime<Utc>) -> VerifyResult<TrackStatus> {
    if status.state != TrackState::PendingEmail {
        if status.is_terminal() {
            tracing::debug!("email confirmation token was already used");
        }
        return Err(VerificationError::InvalidOrExpiredToken);
    }
    let Some(secret) = status.secret.as_deref() else {
        return Err(VerificationError::InvalidOrExpiredToken);
    };
    if status.expires_at.is_some_and(|expires_at| now > expires_at) {
        return Err(VerificationError::InvalidOrExpiredToken);
    }
    if secret != token {
        return Err(VerificationError::InvalidOrExpiredToken);
    }

    let mut next = status.clone();
    next.decide(TrackState::Approved, DecidedBy::System, now);
    Ok(next)
}
