//! Phone verification: a short-lived 6-digit code, confirmed synchronously.

use crate::{
    error::{VerificationError, VerifyResult},
    models::TrackStatus,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use veristay_core::{
    facts::ClaimedFacts,
    track::{DecidedBy, TrackState},
};

/// Generate a code that can be sent to the user.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let code = rng.gen_range(0..=999_999);
    // 0-pad the 6-digit code:
    format!("{code:0>6}")
}

/// Status for a fresh phone submission: the code is out, the clock runs.
pub fn submitted(
    code: &str,
    claimed: &ClaimedFacts,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
) -> TrackStatus {
    let mut status = TrackStatus::new(TrackState::PendingCode, now);
    status.secret = Some(code.to_string());
    status.expires_at = Some(now + ttl);
    status.claimed = Some(claimed.clone());
    status
}

/// Evaluate a code confirmation attempt.
///
/// Expiry is evaluated here, at confirmation time; there is no background
/// sweep. A failed attempt leaves the track unchanged, so the user can try
/// again or resubmit for a fresh code.
pub fn confirm(status: &TrackStatus, code: &str, now: DateTime<Utc>) -> VerifyResult<TrackStatus> {
    if status.state != TrackState::PendingCode {
        return Err(VerificationError::NoPendingCode);
    }
    let (Some(secret), Some(expires_at)) = (status.secret.as_deref(), status.expires_at) else {
        return Err(VerificationError::NoPendingCode);
    };
    if now > expires_at {
        return Err(VerificationError::CodeExpired);
    }
    if secret != code {
        return Err(VerificationError::InvalidCode);
    }

    let mut next = status.clone();
    next.decide(TrackState::Approved, DecidedBy::System, now);
    Ok(next)
}
