// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Paper size of every page in exported PDFs.
    pub paper_size: crate::PaperSize,
    /// Name of the session directory created under the OS temp dir.
    pub session_dir_name: String,
    /// Upper bound on a single device acquisition.
    pub acquire_timeout_secs: u64,
    /// How many pages ahead the compositor may resolve images.
    pub prefetch_pages: usize,
    /// Title written into the PDF metadata.
    pub document_title: String,
}

impl AppConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Prefetch window, never less than one page.
    pub fn prefetch_window(&self) -> usize {
        self.prefetch_pages.max(1)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paper_size: crate::PaperSize::A4,
            session_dir_name: "Scanwerk".into(),
            acquire_timeout_secs: 300,
            prefetch_pages: 2,
            document_title: "Scanned Document".into(),
        }
    }
}
