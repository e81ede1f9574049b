// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI subcommands.

mod batch;
mod convert;
mod detect;
mod formats;
mod inspect;
mod validate;

pub use batch::BatchCmd;
pub use convert::ConvertCmd;
pub use detect::DetectCmd;
pub use formats::FormatsCmd;
pub use inspect::InspectCmd;
pub use validate::ValidateCmd;
