// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF compositor — assemble scanned images into one multi-page PDF with `lopdf`.
//
// Each image gets its own page of the configured paper size, scaled with
// `fit_and_center`. JPEG scans are written as `DCTDecode` streams byte for
// byte; every other format is decoded and stored as Flate-compressed samples.

use chrono::Local;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use scanwerk_core::PaperSize;
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, info, instrument};

use crate::image::probe::{ImageInfo, probe};
use crate::pdf::layout::{Placement, fit_and_center};

/// Builds a PDF one page at a time from encoded images.
///
/// Pages are added in call order; nothing is serialised until
/// [`PdfCompositor::finish`].
pub struct PdfCompositor {
    document: Document,
    /// Reserved id of the `/Pages` tree root, filled in by `finish`.
    pages_id: ObjectId,
    kids: Vec<Object>,
    page_width: f32,
    page_height: f32,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: Option<String>,
}

impl PdfCompositor {
    /// Create a compositor whose pages all have the given paper size.
    pub fn new(paper_size: PaperSize) -> Self {
        let (width, height) = paper_size.dimensions_pt();
        Self::with_page_size(width, height)
    }

    /// Create a compositor with an explicit page size in points.
    pub fn with_page_size(page_width: f32, page_height: f32) -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
            page_width,
            page_height,
            title: None,
        }
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    // -- Pages ----------------------------------------------------------------

    /// Append a page showing `image_bytes`, fitted and centred.
    #[instrument(skip(self, image_bytes), fields(bytes_len = image_bytes.len(), page = self.kids.len() + 1))]
    pub fn add_image(&mut self, image_bytes: &[u8]) -> Result<Placement> {
        let info = probe(image_bytes)?;
        let placement = fit_and_center(self.page_width, self.page_height, info.width, info.height);

        let image_stream = image_xobject(image_bytes, &info)?;
        let image_id = self.document.add_object(image_stream);

        let image_name = format!("Im{}", self.kids.len() + 1);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(placement.width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(placement.height),
                        Object::Real(placement.x),
                        Object::Real(placement.y),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(image_name.clone().into_bytes())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|err| ScanwerkError::PdfError(format!("failed to encode page content: {err}")))?;
        let content_id = self
            .document
            .add_object(Stream::new(Dictionary::new(), content_bytes));

        let mut xobjects = Dictionary::new();
        xobjects.set(image_name, Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(self.page_width),
                Object::Real(self.page_height),
            ]),
        );
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(content_id));
        let page_id = self.document.add_object(page);
        self.kids.push(Object::Reference(page_id));

        debug!(
            format = ?info.format,
            width = info.width,
            height = info.height,
            passthrough = info.is_passthrough_jpeg(),
            x = placement.x,
            y = placement.y,
            ratio = placement.ratio,
            "Image placed on page"
        );
        Ok(placement)
    }

    // -- Output ---------------------------------------------------------------

    /// Close the page tree and serialise the document.
    ///
    /// A compositor with no pages yields `NothingToSave` rather than a
    /// zero-page PDF.
    #[instrument(skip(self), fields(pages = self.kids.len()))]
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.kids.is_empty() {
            return Err(ScanwerkError::NothingToSave);
        }
        let page_count = self.kids.len();

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(page_count as i64));
        pages.set("Kids", Object::Array(std::mem::take(&mut self.kids)));
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.document.add_object(catalog);

        let title = self.title.as_deref().unwrap_or("Scanwerk Document");
        let mut info = Dictionary::new();
        info.set("Title", Object::string_literal(title));
        info.set("Producer", Object::string_literal("Scanwerk"));
        info.set(
            "CreationDate",
            Object::string_literal(Local::now().format("D:%Y%m%d%H%M%S").to_string()),
        );
        let info_id = self.document.add_object(info);

        self.document.trailer.set("Root", Object::Reference(catalog_id));
        self.document.trailer.set("Info", Object::Reference(info_id));

        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|err| ScanwerkError::PdfError(format!("failed to serialise PDF: {err}")))?;

        info!(pages = page_count, bytes = output.len(), title, "PDF composed");
        Ok(output)
    }
}

/// Compose already-resolved images into a PDF, one page per image.
pub fn compose<B: AsRef<[u8]>>(images: &[B], paper_size: PaperSize) -> Result<Vec<u8>> {
    let mut compositor = PdfCompositor::new(paper_size);
    for (index, image) in images.iter().enumerate() {
        compositor
            .add_image(image.as_ref())
            .map_err(|err| ScanwerkError::Compose(format!("page {}: {err}", index + 1)))?;
    }
    compositor.finish()
}

// -- Image XObjects -----------------------------------------------------------

fn image_xobject(bytes: &[u8], info: &ImageInfo) -> Result<Stream> {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(info.width as i64));
    dict.set("Height", Object::Integer(info.height as i64));
    dict.set("BitsPerComponent", Object::Integer(8));

    if let Some(color) = info.jpeg_color {
        dict.set("ColorSpace", Object::Name(color.pdf_color_space().as_bytes().to_vec()));
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        return Ok(Stream::new(dict, bytes.to_vec()));
    }

    let decoded = ::image::load_from_memory_with_format(bytes, info.format).map_err(|err| {
        ScanwerkError::ImageError(format!("failed to decode {:?} image: {err}", info.format))
    })?;

    // Alpha is dropped; scans are opaque.
    let (color_space, samples) = if decoded.color().has_color() {
        ("DeviceRGB", decoded.to_rgb8().into_raw())
    } else {
        ("DeviceGray", decoded.to_luma8().into_raw())
    };
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));

    let mut stream = Stream::new(dict, samples);
    stream
        .compress()
        .map_err(|err| ScanwerkError::PdfError(format!("failed to compress image samples: {err}")))?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn jpeg(width: u32, height: u32, shade: u8) -> Vec<u8> {
        encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([shade, 40, 40]))),
            ImageFormat::Jpeg,
        )
    }

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), format)
            .expect("encode");
        buf
    }

    /// Reload the PDF and return, per page, the `cm` operands and the image
    /// stream's filter and raw bytes.
    fn inspect(pdf: &[u8]) -> Vec<([f32; 6], Vec<u8>, Vec<u8>)> {
        let doc = Document::load_mem(pdf).expect("reload");
        let mut out = Vec::new();
        for (_, page_id) in doc.get_pages() {
            let content = Content::decode(&doc.get_page_content(page_id).expect("content"))
                .expect("decode content");
            let cm = content
                .operations
                .iter()
                .find(|op| op.operator == "cm")
                .expect("cm operator");
            let mut matrix = [0f32; 6];
            for (slot, operand) in matrix.iter_mut().zip(&cm.operands) {
                *slot = operand.as_float().expect("number");
            }

            let page = doc.get_dictionary(page_id).expect("page dict");
            let resources = page.get(b"Resources").and_then(Object::as_dict).expect("resources");
            let xobjects = resources.get(b"XObject").and_then(Object::as_dict).expect("xobjects");
            let (_, image_ref) = xobjects.iter().next().expect("one image");
            let image_id = image_ref.as_reference().expect("reference");
            let stream = doc.get_object(image_id).and_then(Object::as_stream).expect("stream");
            let filter = stream
                .dict
                .get(b"Filter")
                .and_then(Object::as_name)
                .expect("filter")
                .to_vec();
            out.push((matrix, filter, stream.content.clone()));
        }
        out
    }

    #[test]
    fn empty_compositor_is_rejected() {
        let err = PdfCompositor::new(PaperSize::A4).finish().unwrap_err();
        assert!(matches!(err, ScanwerkError::NothingToSave));
    }

    #[test]
    fn one_page_per_image() {
        let images = vec![jpeg(30, 40, 10), jpeg(40, 30, 120), jpeg(50, 50, 250)];
        let pdf = compose(&images, PaperSize::A4).expect("compose");
        let doc = Document::load_mem(&pdf).expect("reload");
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn wide_scan_is_fitted_and_centred() {
        let mut compositor = PdfCompositor::with_page_size(600.0, 800.0);
        let placement = compositor.add_image(&jpeg(2000, 1000, 90)).expect("add");
        assert!((placement.ratio - 0.3).abs() < 1e-4);

        let pdf = compositor.finish().expect("finish");
        let pages = inspect(&pdf);
        let [w, _, _, h, x, y] = pages[0].0;
        assert!((w - 600.0).abs() < 1e-2, "w {w}");
        assert!((h - 300.0).abs() < 1e-2, "h {h}");
        assert!(x.abs() < 1e-2, "x {x}");
        assert!((y - 250.0).abs() < 1e-2, "y {y}");
    }

    #[test]
    fn jpeg_is_embedded_untouched_and_in_order() {
        let images = vec![jpeg(20, 20, 10), jpeg(20, 20, 200)];
        let pdf = compose(&images, PaperSize::Letter).expect("compose");

        let pages = inspect(&pdf);
        assert_eq!(pages.len(), 2);
        for (page, original) in pages.iter().zip(&images) {
            assert_eq!(page.1, b"DCTDecode");
            assert_eq!(&page.2, original);
        }
    }

    #[test]
    fn png_is_stored_losslessly() {
        let png = encode(
            DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 4, Luma([77]))),
            ImageFormat::Png,
        );
        let pdf = compose(&[png], PaperSize::A4).expect("compose");

        let doc = Document::load_mem(&pdf).expect("reload");
        let page_id = *doc.get_pages().get(&1).expect("page 1");
        let page = doc.get_dictionary(page_id).unwrap();
        let xobjects = page
            .get(b"Resources")
            .and_then(Object::as_dict)
            .and_then(|r| r.get(b"XObject"))
            .and_then(Object::as_dict)
            .unwrap();
        let image_id = xobjects.get(b"Im1").and_then(Object::as_reference).unwrap();
        let stream = doc.get_object(image_id).and_then(Object::as_stream).unwrap();

        assert_eq!(stream.dict.get(b"ColorSpace").and_then(Object::as_name).unwrap(), b"DeviceGray");
        assert_eq!(stream.dict.get(b"Filter").and_then(Object::as_name).unwrap(), b"FlateDecode");
        assert_eq!(stream.decompressed_content().expect("inflate"), vec![77u8; 32]);
    }

    #[test]
    fn undecodable_page_aborts_compose() {
        let images = vec![jpeg(10, 10, 1), b"not an image".to_vec()];
        let err = compose(&images, PaperSize::A4).unwrap_err();
        match err {
            ScanwerkError::Compose(msg) => assert!(msg.starts_with("page 2"), "{msg}"),
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    fn title_lands_in_info_dictionary() {
        let mut compositor = PdfCompositor::new(PaperSize::A5);
        compositor.set_title("Tax return 2026");
        compositor.add_image(&jpeg(10, 10, 1)).unwrap();
        let pdf = compositor.finish().unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let info_id = doc.trailer.get(b"Info").and_then(Object::as_reference).unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        let title = info.get(b"Title").and_then(Object::as_str).unwrap();
        assert_eq!(title, b"Tax return 2026");
    }
}
