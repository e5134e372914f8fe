#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, missing_docs, rust_2018_idioms)]
#![deny(unreachable_pub)]

//! veristay-server
//!
//! The identity & trust verification pipeline: per-track state machines,
//! the auto-decision policy for document-backed tracks, the asynchronous
//! background-check handshake, fraud/risk scoring, and aggregate trust
//! computation over a per-user verification record.

pub mod background;
pub mod error;
pub mod models;
pub mod policy;
pub mod scoring;
pub mod service;
pub mod settings;
pub mod setups;
pub mod store;
pub mod tracks;

#[cfg(test)]
mod test_utils;
