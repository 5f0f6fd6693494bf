// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image probing — read format, pixel dimensions, and colour layout from the
// encoded header without decoding pixel data.

use std::io::Cursor;

use ::image::codecs::jpeg::JpegDecoder;
use ::image::{ExtendedColorType, ImageDecoder, ImageFormat, ImageReader};
use scanwerk_core::error::{Result, ScanwerkError};

/// Colour space of a JPEG that can be handed to a PDF reader as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColor {
    Gray,
    Rgb,
    Cmyk,
}

impl JpegColor {
    /// PDF colour space name for the image dictionary.
    pub fn pdf_color_space(&self) -> &'static str {
        match self {
            Self::Gray => "DeviceGray",
            Self::Rgb => "DeviceRGB",
            Self::Cmyk => "DeviceCMYK",
        }
    }
}

/// Header facts about an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Set when the image is a JPEG whose stream can be embedded untouched.
    pub jpeg_color: Option<JpegColor>,
}

impl ImageInfo {
    pub fn is_passthrough_jpeg(&self) -> bool {
        self.jpeg_color.is_some()
    }
}

/// Inspect an encoded image.
pub fn probe(bytes: &[u8]) -> Result<ImageInfo> {
    let format = ::image::guess_format(bytes)
        .map_err(|err| ScanwerkError::ImageError(format!("unrecognised image format: {err}")))?;

    let info = if format == ImageFormat::Jpeg {
        let decoder = JpegDecoder::new(Cursor::new(bytes)).map_err(|err| {
            ScanwerkError::ImageError(format!("failed to read JPEG header: {err}"))
        })?;
        let (width, height) = decoder.dimensions();
        let jpeg_color = match decoder.original_color_type() {
            ExtendedColorType::L8 => Some(JpegColor::Gray),
            ExtendedColorType::Rgb8 => Some(JpegColor::Rgb),
            ExtendedColorType::Cmyk8 => Some(JpegColor::Cmyk),
            _ => None,
        };
        ImageInfo {
            format,
            width,
            height,
            jpeg_color,
        }
    } else {
        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|err| {
                ScanwerkError::ImageError(format!("failed to read {format:?} header: {err}"))
            })?;
        ImageInfo {
            format,
            width,
            height,
            jpeg_color: None,
        }
    };

    if info.width == 0 || info.height == 0 {
        return Err(ScanwerkError::ImageError(format!(
            "image has zero size ({}x{})",
            info.width, info.height
        )));
    }
    Ok(info)
}
