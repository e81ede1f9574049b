// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Conversion orchestration.
//!
//! # Architecture
//!
//! - [`Orchestrator`] - Runs jobs: detect, read, validate, transform, write, publish
//! - [`ConversionRequest`] - What to convert and where to deliver it
//! - [`ConvertOptions`] - Per-job options, built fluently or from [`ConverterConfig`]
//! - [`ConversionReport`] - Final state, state history, violations, and error
//! - [`ObjectStoreGateway`] - Remote store contract, with timeouts applied
//!
//! # Example
//!
//! ```no_run
//! use geocodec::convert::{ConversionRequest, Orchestrator};
//!
//! let report = Orchestrator::default().convert(&ConversionRequest::new("collars.csv", "collars.gcb"));
//! if let Some(err) = &report.error {
//!     eprintln!("conversion failed: {err}");
//! }
//! ```

pub mod config;
pub mod gateway;
pub mod job;
pub mod options;
pub mod orchestrator;

pub use config::ConverterConfig;
pub use gateway::{
    call_with_timeout, InMemoryGateway, LocalDirectoryGateway, ObjectStoreGateway, RemoteObjectId,
};
pub use job::{ConversionReport, JobState, StateChange};
pub use options::{ConversionRequest, ConversionSource, ConversionTarget, ConvertOptions};
pub use orchestrator::Orchestrator;
