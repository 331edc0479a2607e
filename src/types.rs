//! Core data types for the scanbind conversion pipeline.
//!
//! This module defines the values that flow between pipeline stages:
//! - Job inputs (`InputSource`, `EbookMetadata`)
//! - Loaded pages (`PageSource`, `LoadedSource`) and their `Provenance`
//! - Classification output (`ClassifiedItem`, `OcrTarget`, `IllustrationItem`, `Classification`)
//! - OCR results (`OcrResult`, `OcrOutcome`)
//! - Assembly input and output (`ContentItem`, `Chapter`)
//! - The job summary (`ConversionReport`)

use std::fmt;
use std::path::PathBuf;

use image::{DynamicImage, ImageFormat};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Comprehensive metadata for an ebook, used for generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EbookMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String, // e.g., "en", "ja"
    pub description: Option<String>,
    pub subjects: Vec<String>,
}

impl EbookMetadata {
    /// Creates a default `EbookMetadata` instance with a specified title and the default language.
    pub fn default_with_title(title: String) -> Self {
        Self {
            title,
            language: crate::settings::DEFAULT_LANGUAGE.to_string(),
            ..Default::default()
        }
    }
}

/// What a conversion job reads its pages from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// A single PDF document, rasterized page by page.
    Pdf(PathBuf),
    /// An ordered list of page images ("folder mode").
    Images(Vec<PathBuf>),
}

impl InputSource {
    pub fn is_folder_mode(&self) -> bool {
        matches!(self, InputSource::Images(_))
    }
}

impl Default for InputSource {
    fn default() -> Self {
        InputSource::Images(Vec::new())
    }
}

/// Where a page originally came from.
///
/// File provenances always hold a path produced by [`crate::path_utils::normalize_path`],
/// so two provenances compare equal exactly when they name the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// 1-based page of the input PDF.
    PdfPage(usize),
    /// Normalized path of an input or external image.
    File(PathBuf),
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::PdfPage(n) => write!(f, "pdf_page_{}", n),
            Provenance::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One loaded unit of input.
#[derive(Debug, Clone)]
pub struct PageSource {
    pub provenance: Provenance,
    pub image: DynamicImage,
    pub sequence_index: usize, // 0-based load order
}

impl PageSource {
    /// 1-based processing position of this page.
    pub fn position(&self) -> usize {
        self.sequence_index + 1
    }
}

/// Output of the loader stage.
#[derive(Debug, Clone, Default)]
pub struct LoadedSource {
    pub pages: Vec<PageSource>,
    /// Number of pages that were actually loaded; external illustrations are numbered after it.
    pub loaded_page_count: usize,
}

/// A page selected for text extraction.
#[derive(Debug, Clone)]
pub struct OcrTarget {
    pub id: usize, // 1-based processing position
    pub image: DynamicImage,
    pub provenance: Provenance,
}

/// A page (or external file) preserved as an image.
#[derive(Debug, Clone, PartialEq)]
pub struct IllustrationItem {
    pub id: String, // img_pdf_<n>, img_folder_designated_<n>, img_ext_<k>
    pub temp_path: PathBuf,
    pub page_num: usize,
    pub provenance: Provenance,
}

/// Classification decision for one loaded page.
#[derive(Debug, Clone)]
pub enum ClassifiedItem {
    Ocr(OcrTarget),
    Illustration(IllustrationItem),
}

impl ClassifiedItem {
    /// 1-based processing position of the classified page.
    pub fn position(&self) -> usize {
        match self {
            ClassifiedItem::Ocr(target) => target.id,
            ClassifiedItem::Illustration(item) => item.page_num,
        }
    }
}

/// The classifier's two disjoint outputs, each in page-position order.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub ocr_targets: Vec<OcrTarget>,
    pub illustrations: Vec<IllustrationItem>,
}

impl Classification {
    pub fn len(&self) -> usize {
        self.ocr_targets.len() + self.illustrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All processing positions, sorted.
    pub fn positions(&self) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .ocr_targets
            .iter()
            .map(|t| t.id)
            .chain(self.illustrations.iter().map(|i| i.page_num))
            .collect();
        positions.sort_unstable();
        positions
    }
}

/// Result of recognizing one page.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrOutcome {
    Text(String),
    Failed(String),
}

/// OCR result re-joined with the provenance of the page it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    pub id: usize,
    pub provenance: Provenance,
    pub outcome: OcrOutcome,
}

impl OcrResult {
    /// Text to render for this page; failures become an inline error string tagged with the page id.
    pub fn text(&self) -> String {
        match &self.outcome {
            OcrOutcome::Text(text) => text.clone(),
            OcrOutcome::Failed(reason) => format!("Error processing page {}: {}", self.id, reason),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, OcrOutcome::Failed(_))
    }
}

/// Payload of a content item.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBody {
    Text(String),
    Image(PathBuf),
}

/// Unified post-OCR representation ready for assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub page_num: usize,
    pub id: String,
    pub provenance: Provenance,
    pub body: ContentBody,
}

impl ContentItem {
    pub fn is_text(&self) -> bool {
        matches!(self.body, ContentBody::Text(_))
    }
}

impl From<OcrResult> for ContentItem {
    fn from(result: OcrResult) -> Self {
        let text = result.text();
        ContentItem {
            page_num: result.id,
            id: format!("page_{}", result.id),
            provenance: result.provenance,
            body: ContentBody::Text(text),
        }
    }
}

impl From<IllustrationItem> for ContentItem {
    fn from(item: IllustrationItem) -> Self {
        ContentItem {
            page_num: item.page_num,
            id: item.id,
            provenance: item.provenance,
            body: ContentBody::Image(item.temp_path),
        }
    }
}

/// A merged-text chapter spanning one or more consecutive OCR'd pages.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChapter {
    pub title: String,
    pub file_name: String,
    pub pages: Vec<usize>,
    pub content: String, // complete XHTML document
}

/// A chapter wrapping exactly one image.
#[derive(Debug)]
pub struct IllustrationChapter {
    pub title: String,
    pub file_name: String,
    pub page_num: usize,
    /// Path of the image resource inside the container (e.g. `images/img_pdf_2.jpg`).
    pub image_name: String,
    pub media_type: &'static str,
    pub data: Mmap,
    pub content: String, // complete XHTML document
}

/// A finalized spine entry.
#[derive(Debug)]
pub enum Chapter {
    Text(TextChapter),
    Illustration(IllustrationChapter),
}

impl Chapter {
    pub fn title(&self) -> &str {
        match self {
            Chapter::Text(c) => &c.title,
            Chapter::Illustration(c) => &c.title,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            Chapter::Text(c) => &c.file_name,
            Chapter::Illustration(c) => &c.file_name,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Chapter::Text(c) => &c.content,
            Chapter::Illustration(c) => &c.content,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Chapter::Text(_))
    }
}

/// Summary of a finished conversion job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub output_path: PathBuf,
    pub pages_loaded: usize,
    pub ocr_targets: usize,
    pub ocr_failures: usize,
    pub illustrations: usize,
    pub external_illustrations_added: usize,
    pub external_illustrations_skipped: usize,
    pub chapters_written: usize,
}

/// Utility function: maps a detected image format to its file extension and MIME type.
///
/// # Supported formats
///
/// - JPEG: image/jpeg
/// - PNG: image/png
/// - GIF: image/gif
/// - BMP: image/bmp
/// - TIFF: image/tiff
/// - WebP: image/webp
pub fn get_file_info(format: ImageFormat) -> Result<(&'static str, &'static str)> {
    match format {
        ImageFormat::Jpeg => Ok(("jpg", "image/jpeg")),
        ImageFormat::Png => Ok(("png", "image/png")),
        ImageFormat::Gif => Ok(("gif", "image/gif")),
        ImageFormat::Bmp => Ok(("bmp", "image/bmp")),
        ImageFormat::Tiff => Ok(("tiff", "image/tiff")),
        ImageFormat::WebP => Ok(("webp", "image/webp")),
        other => Err(Error::Unsupported(format!("Image format {:?}", other))),
    }
}
