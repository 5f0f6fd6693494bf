// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

use crate::types::PageId;

/// Top-level error type for all Scanwerk operations.
#[derive(Debug, Error)]
pub enum ScanwerkError {
    // -- Device errors --
    #[error("device enumeration failed: {0}")]
    DeviceEnumeration(String),

    /// The gateway's own message, passed through untouched.
    #[error("{0}")]
    Acquisition(String),

    #[error("a scan is already in progress")]
    AcquisitionInProgress,

    #[error("no scanner selected")]
    NoDeviceSelected,

    // -- Session errors --
    #[error("page {0} is already in the session")]
    DuplicatePage(PageId),

    // -- Document errors --
    #[error("nothing to save: the session has no pages")]
    NothingToSave,

    #[error("PDF composition failed: {0}")]
    Compose(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanwerkError>;
