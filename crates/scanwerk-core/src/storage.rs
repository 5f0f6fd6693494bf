// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session-scoped temporary storage for acquired scans and gateway scripts.
//
// Acquisition writes into the directory, cleanup deletes it wholesale. Names
// are derived from a millisecond timestamp plus a UUID so concurrent writers
// never collide.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;

/// Outcome of a best-effort cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files and directories that were deleted.
    pub removed: usize,
    /// Entries that could not be deleted (already logged).
    pub failed: usize,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Temporary directory owned by one scan session.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    root: PathBuf,
}

impl SessionStorage {
    /// Use `dir_name` under the OS temp directory, creating it if needed.
    pub fn in_temp_dir(dir_name: &str) -> Result<Self> {
        Self::at(std::env::temp_dir().join(dir_name))
    }

    /// Use an explicit directory, creating it if needed.
    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(path = %root.display(), "session storage ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh path for an acquired image, e.g. `scan-1718000000000-<uuid>.jpg`.
    pub fn scan_path(&self, extension: &str) -> Result<PathBuf> {
        self.unique_path("scan", extension)
    }

    /// Fresh path for a gateway helper script.
    pub fn script_path(&self, prefix: &str, extension: &str) -> Result<PathBuf> {
        self.unique_path(prefix, extension)
    }

    fn unique_path(&self, prefix: &str, extension: &str) -> Result<PathBuf> {
        // The directory may have been removed by an earlier cleanup.
        fs::create_dir_all(&self.root)?;
        let stamp = Utc::now().timestamp_millis();
        Ok(self
            .root
            .join(format!("{prefix}-{stamp}-{}.{extension}", Uuid::new_v4())))
    }

    /// Delete the session directory and everything in it.
    ///
    /// Never fails: every entry that cannot be removed is logged at `warn`
    /// and counted in the report.
    pub fn cleanup(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        if !self.root.exists() {
            return report;
        }

        remove_tree(&self.root, &mut report);

        info!(
            path = %self.root.display(),
            removed = report.removed,
            failed = report.failed,
            "session storage cleaned up"
        );
        report
    }
}

fn remove_tree(dir: &Path, report: &mut CleanupReport) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "cannot list session directory");
            report.failed += 1;
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "cannot read session directory entry");
                report.failed += 1;
                continue;
            }
        };
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            remove_tree(&path, report);
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => report.removed += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to delete temp file");
                report.failed += 1;
            }
        }
    }

    match fs::remove_dir(dir) {
        Ok(()) => report.removed += 1,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "failed to delete temp directory");
            report.failed += 1;
        }
    }
}
