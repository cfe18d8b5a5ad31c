// Copyright 2026 Doublefetch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Doublefetch — pattern-driven extraction core for privacy-preserving
//! search-results telemetry.
//!
//! The subsystem refetches a results page the user just visited, under an
//! anonymous identity, and extracts structured messages from the document
//! using a declarative pattern language. Messages are returned to the
//! caller; transmission, scheduling, and identity management are external
//! collaborators behind the traits in [`patterns`], [`sanitizer`],
//! [`store`], [`fetch`], and [`job`].

pub mod config;
pub mod cooldown;
pub mod error;
pub mod extraction;
pub mod fetch;
pub mod job;
pub mod messages;
pub mod patterns;
pub mod sanitizer;
pub mod store;

pub use config::JobConfig;
pub use cooldown::CooldownGate;
pub use error::{Error, Result};
pub use extraction::{extract_messages, ExtractionContext};
pub use job::{DoublefetchJob, JobOutcome, QueryJobRequest, JOB_NAME};
pub use messages::Message;
pub use patterns::{PatternProvider, PatternSet, StaticPatterns};
