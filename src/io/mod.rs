// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer for geoscience file formats.
//!
//! This module provides the adapter trait, format detection, the adapter
//! registry, and the helpers every adapter shares (source handles, atomic
//! output files, cancellation).

pub mod atomic;
pub mod cancel;
pub mod detection;
pub mod formats;
pub mod registry;
pub mod source;

// Re-exports
pub use atomic::{write_atomic, AtomicFile};
pub use cancel::CancellationToken;
pub use detection::{detect_format, Detection};
pub use source::SourceHandle;

// Adapter registry
pub use registry::{global_registry, init_global_registry, ConverterRegistry, RegistryBuilder};

// Traits for format adapters
pub mod traits;
pub use traits::{Confidence, FormatAdapter, WriteSummary};
