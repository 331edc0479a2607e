//! Scanbind - Scanned Document to EPUB Conversion Library
//!
//! This crate turns a scanned PDF, or a folder of page images, into an EPUB ebook. Text pages
//! go through an OCR engine; pages designated as illustrations are kept as images. Runs of
//! consecutive text pages are merged into one chapter, and every illustration gets a chapter
//! of its own.
//!
//! # Getting Started
//!
//! Describe the job with `ScanbindConfig`'s builder, then run it with
//! [`ScanbindConfig::convert`].
//!
//! ```rust,no_run
//! use scanbind::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> scanbind::error::Result<()> {
//!     let settings = Settings::load_or_default(Path::new(CONFIG_FILE_NAME));
//!     let pages = collect_folder_images(Path::new("./scans")).await?;
//!
//!     let config = ScanbindConfigBuilder::from_settings(&settings)
//!         .metadata(EbookMetadata {
//!             title: "Field Notes".to_string(),
//!             authors: vec!["A. Writer".to_string()],
//!             language: "en".to_string(),
//!             ..Default::default()
//!         })
//!         .input(InputSource::Images(pages.clone()))
//!         .output_path(PathBuf::from("./Field Notes.epub"))
//!         .illustration_paths(vec![pages[0].clone()])
//!         .ocr_engine(Arc::new(CommandOcrEngine::tesseract("eng")))
//!         .build()?;
//!
//!     let report = config.convert().await?;
//!     println!(
//!         "Wrote {:?}: {} chapters, {} pages failed OCR",
//!         report.output_path, report.chapters_written, report.ocr_failures
//!     );
//!     Ok(())
//! }
//! ```
//!
//! The OCR engine and the PDF rasterizer are collaborators behind the [`ocr::OcrEngine`] and
//! [`rasterizer::PageRasterizer`] traits; the pdfium rasterizer is available with the
//! `pdfium` feature.

pub mod assembler;
pub mod classifier;
pub mod error;
pub mod generator;
pub mod loader;
pub mod merger;
pub mod ocr;
pub mod path_utils;
pub mod rasterizer;
pub mod scanbind;
pub mod settings;
pub mod types;
pub mod workspace;

// Publicly expose the main `ScanbindConfig` struct and its builder
pub use scanbind::ScanbindConfig;
pub use scanbind::ScanbindConfigBuilder;

// Re-export error and core types for direct access
pub use error::{Error, ErrorKind};
pub use types::{
    Chapter, ContentBody, ContentItem, ConversionReport, EbookMetadata, InputSource, Provenance,
};

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and traits, allowing you to
/// import everything you need with a single `use scanbind::prelude::*;` statement.
pub mod prelude {
    pub use super::{
        ConversionReport, EbookMetadata, ErrorKind, InputSource, Provenance, ScanbindConfig,
        ScanbindConfigBuilder, error, generator, types,
    };
    pub use crate::classifier::Designation;
    pub use crate::loader::collect_folder_images;
    pub use crate::ocr::{CommandOcrEngine, CredentialRef, OcrEngine, OcrFailure};
    pub use crate::rasterizer::PageRasterizer;
    pub use crate::settings::{CONFIG_FILE_NAME, Settings};
    pub use std::path::{Path, PathBuf};
    pub use std::sync::Arc;
}
