// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fit-and-centre placement of an image on a page.

/// Where an image lands on a page, in PDF user-space units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Uniform scale from image pixels to page units.
    pub ratio: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale the image uniformly so it fits inside the page and centre it on both
/// axes.
///
/// The ratio is `min(page_w / img_w, page_h / img_h)`, so the image touches
/// the page edge in at least one dimension and never overflows in either.
pub fn fit_and_center(page_width: f32, page_height: f32, image_width: u32, image_height: u32) -> Placement {
    let (iw, ih) = (image_width as f32, image_height as f32);
    let ratio = (page_width / iw).min(page_height / ih);
    let width = iw * ratio;
    let height = ih * ratio;

    Placement {
        ratio,
        x: (page_width - width) / 2.0,
        y: (page_height - height) / 2.0,
        width,
        height,
    }
}
