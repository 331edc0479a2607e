//! pdfium-render wrapper: PDF -> page images (in-memory only).

use std::path::{Path, PathBuf};

use image::DynamicImage;
use log::debug;
use pdfium_render::prelude::*;

use crate::error::{Error, Result};
use crate::rasterizer::PageRasterizer;

/// Default rendering resolution, a common choice for OCR input.
pub const DEFAULT_RENDER_DPI: u32 = 200;

/// Rasterizes PDFs with a dynamically loaded pdfium library.
///
/// The library is looked up in `library_dir` when set, otherwise in the directory named by
/// `PDFIUM_DYNAMIC_LIB_PATH`, otherwise through the system library search path.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    pub dpi: u32,
    pub library_dir: Option<PathBuf>,
}

impl Default for PdfiumRasterizer {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_RENDER_DPI,
            library_dir: None,
        }
    }
}

impl PdfiumRasterizer {
    fn bind(&self) -> Result<Pdfium> {
        let dir = self
            .library_dir
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_DYNAMIC_LIB_PATH").map(PathBuf::from));

        let bindings = match dir {
            Some(dir) => {
                let dir_str = dir.to_str().ok_or_else(|| {
                    Error::InvalidPath(dir.clone(), "pdfium library path is not UTF-8".into())
                })?;
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir_str))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| Error::Application(format!("cannot load pdfium: {}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| Error::file_op(pdf_path, e))?;

        let mut images = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            // PDF user unit: 1 point = 1/72 inch
            let width_px = (page.width().value * self.dpi as f32 / 72.0).round() as i32;
            let height_px = (page.height().value * self.dpi as f32 / 72.0).round() as i32;

            let config = PdfRenderConfig::new()
                .set_target_width(width_px)
                .set_target_height(height_px);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| Error::file_op(pdf_path, format!("page {}: {}", index + 1, e)))?;
            debug!("Rendered page {} of '{}'", index + 1, pdf_path.display());
            images.push(bitmap.as_image());
        }
        Ok(images)
    }
}
