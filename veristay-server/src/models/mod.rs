//! Data models owned by the verification pipeline.

pub mod record;

pub use record::{TrackStatus, VerificationRecord};
