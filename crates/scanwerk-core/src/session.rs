// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan session — the ordered collection of pages the user is working on.
//
// Page order is the export order. Mutation requires `&mut self`; callers that
// share a session across tasks wrap it in a single lock.

use tracing::{debug, info};

use crate::error::{Result, ScanwerkError};
use crate::storage::{CleanupReport, SessionStorage};
use crate::types::{Page, PageId};

/// Ordered set of scanned pages plus the temp storage backing them.
#[derive(Debug, Default)]
pub struct ScanSession {
    pages: Vec<Page>,
    storage: Option<SessionStorage>,
}

impl ScanSession {
    /// A session with no backing directory (pages live in memory only).
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose acquired files live in `storage`.
    pub fn with_storage(storage: SessionStorage) -> Self {
        Self {
            pages: Vec::new(),
            storage: Some(storage),
        }
    }

    pub fn storage(&self) -> Option<&SessionStorage> {
        self.storage.as_ref()
    }

    // -- Queries --------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn get(&self, id: &PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == *id)
    }

    /// Zero-based index of the page in export order.
    pub fn position(&self, id: &PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == *id)
    }

    /// Owned copy of the pages in their current order.
    pub fn snapshot(&self) -> Vec<Page> {
        self.pages.clone()
    }

    // -- Mutation -------------------------------------------------------------

    /// Add a page at the end of the session.
    pub fn append(&mut self, page: Page) -> Result<()> {
        if self.position(&page.id).is_some() {
            return Err(ScanwerkError::DuplicatePage(page.id));
        }
        debug!(page = %page.id, index = self.pages.len(), "page appended");
        self.pages.push(page);
        Ok(())
    }

    /// Remove a page. Unknown ids are ignored; returns the removed page.
    pub fn remove(&mut self, id: &PageId) -> Option<Page> {
        let index = self.position(id)?;
        debug!(page = %id, index, "page removed");
        Some(self.pages.remove(index))
    }

    /// Move `from` to the index currently held by `to`, shifting the pages in
    /// between. Returns false when nothing moved.
    pub fn reorder(&mut self, from: &PageId, to: &PageId) -> bool {
        if from == to {
            return false;
        }
        let (Some(old_index), Some(new_index)) = (self.position(from), self.position(to)) else {
            return false;
        };

        let page = self.pages.remove(old_index);
        self.pages.insert(new_index, page);
        debug!(page = %from, old_index, new_index, "page moved");
        true
    }

    /// Drop every page and release the session directory.
    pub fn clear(&mut self) -> CleanupReport {
        let dropped = self.pages.len();
        self.pages.clear();

        let report = match &self.storage {
            Some(storage) => storage.cleanup(),
            None => CleanupReport::default(),
        };
        info!(dropped, removed = report.removed, failed = report.failed, "session cleared");
        report
    }
}
