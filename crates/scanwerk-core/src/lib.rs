// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — Core types, errors, and the scan session shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod session;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use error::ScanwerkError;
pub use session::ScanSession;
pub use storage::{CleanupReport, SessionStorage};
pub use types::*;
