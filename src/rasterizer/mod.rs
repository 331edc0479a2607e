//! PDF rasterization boundary.
//!
//! Turning a PDF into page images is delegated to a [`PageRasterizer`]. The crate ships a
//! pdfium-backed implementation behind the `pdfium` feature; hosts can plug in any other.

use std::path::Path;

use image::DynamicImage;

use crate::error::Result;

#[cfg(feature = "pdfium")]
pub mod pdfium;

#[cfg(feature = "pdfium")]
pub use self::pdfium::PdfiumRasterizer;

/// Converts a PDF document into its pages, in document order.
///
/// Implementations are called from a blocking thread and may block freely.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>>;
}
