#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, missing_docs, rust_2018_idioms)]
#![deny(unreachable_pub)]

//! Shared vocabulary for the veristay trust & verification pipeline.
//!
//! This crate holds the types exchanged between the verification core and
//! its callers: track kinds and states, claimed/extracted facts, the
//! document-analysis contract, and the request/response payloads.

pub mod analysis;
pub mod common;
pub mod facts;
pub mod track;
