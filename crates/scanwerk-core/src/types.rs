// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Scanwerk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScanwerkError};

/// Unique identifier for a scanned page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the bytes of a scanned image can be found.
///
/// In-memory images are reference counted so that session snapshots stay
/// cheap to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Encoded image bytes held in memory.
    Memory(Arc<[u8]>),
    /// Encoded image stored on disk.
    File(PathBuf),
}

impl ImageRef {
    pub fn memory(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Memory(bytes.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// True when the reference cannot possibly yield any image bytes.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Memory(bytes) => bytes.is_empty(),
            Self::File(path) => path.as_os_str().is_empty(),
        }
    }
}

/// One scanned artifact in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: PageId,
    pub image: ImageRef,
    /// Original acquired file, if the gateway left one on disk.
    pub source_path: Option<PathBuf>,
}

impl Page {
    /// Create a page with a freshly generated id.
    pub fn new(image: ImageRef, source_path: Option<PathBuf>) -> Result<Self> {
        Self::with_id(PageId::new(), image, source_path)
    }

    /// Create a page with a caller-chosen id.
    pub fn with_id(id: PageId, image: ImageRef, source_path: Option<PathBuf>) -> Result<Self> {
        if image.is_empty() {
            return Err(ScanwerkError::ImageError(format!(
                "page {id} has an empty image reference"
            )));
        }
        Ok(Self {
            id,
            image,
            source_path,
        })
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }
}

/// A scanner reported by a device gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default = "Device::unknown_name")]
    pub name: String,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    fn unknown_name() -> String {
        "Unknown".into()
    }
}

/// Successful output of a single-page acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredImage {
    pub image: ImageRef,
    /// File the device output was persisted to, if any.
    pub path: Option<PathBuf>,
}

impl AcquiredImage {
    /// Turn the acquisition result into a new session page.
    pub fn into_page(self) -> Result<Page> {
        Page::new(self.image, self.path)
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in PDF points (1/72 inch).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (mm_to_pt(w as f32), mm_to_pt(h as f32))
    }
}

fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// Default file name offered when exporting, e.g. `scan-2026-03-14.pdf`.
///
/// The date is the UTC calendar date.
pub fn default_export_file_name(now: DateTime<Utc>) -> String {
    format!("scan-{}.pdf", now.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn page_ids_are_distinct() {
        assert_ne!(PageId::new(), PageId::new());
    }

    #[test]
    fn empty_image_is_rejected() {
        let err = Page::new(ImageRef::memory(Vec::new()), None).unwrap_err();
        assert!(matches!(err, ScanwerkError::ImageError(_)));

        let err = Page::new(ImageRef::file(""), None).unwrap_err();
        assert!(matches!(err, ScanwerkError::ImageError(_)));
    }

    #[test]
    fn device_without_name_is_unknown() {
        let device: Device = serde_json::from_str(r#"{"id":"A"}"#).expect("parse");
        assert_eq!(device.name, "Unknown");
    }

    #[test]
    fn a4_in_points() {
        let (w, h) = PaperSize::A4.dimensions_pt();
        assert!((w - 595.28).abs() < 0.01, "got {w}");
        assert!((h - 841.89).abs() < 0.01, "got {h}");
    }

    #[test]
    fn export_name_uses_date() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 23, 30, 0).unwrap();
        assert_eq!(default_export_file_name(now), "scan-2026-03-14.pdf");
    }

    #[test]
    fn export_name_uses_utc_calendar_day() {
        // 02:00 on the 15th at UTC+5 is still the 14th in UTC.
        let local = FixedOffset::east_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 15, 2, 0, 0)
            .unwrap();
        assert_eq!(
            default_export_file_name(local.with_timezone(&Utc)),
            "scan-2026-03-14.pdf"
        );
    }
}
