// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-document — PDF assembly for Scanwerk.
//
// Provides image probing (format, dimensions, colour layout), fit-and-centre
// page layout, a `lopdf`-based compositor that embeds JPEG scans without
// recompression, and the async pipeline that resolves session pages in order.

pub mod image;
pub mod pdf;
pub mod pipeline;

// Re-export the primary structs so callers can use `scanwerk_document::PdfCompositor` etc.
pub use image::probe::{ImageInfo, probe};
pub use pdf::compositor::{PdfCompositor, compose};
pub use pdf::layout::{Placement, fit_and_center};
pub use pipeline::{ComposeOptions, ComposeProgress, compose_pages, export_to_file};
