// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page layout and multi-page composition.

pub mod compositor;
pub mod layout;

pub use compositor::PdfCompositor;
pub use layout::{Placement, fit_and_center};
