//! Source loading: turns a PDF or a list of image files into ordered pages.
//!
//! Loading is all-or-nothing. A PDF that cannot be rasterized, or any single image that is
//! missing or undecodable, fails the whole batch with [`Error::FileOperation`].

use std::path::{Path, PathBuf};

use image::ImageReader;
use lazy_static::lazy_static;
use log::{debug, info};
use rayon::prelude::*;
use regex::Regex;
use tokio::fs::read_dir;

use crate::error::{Error, Result};
use crate::path_utils::{
    compare_paths_by_number_safe, is_hidden_file, is_supported_image, normalize_path,
};
use crate::rasterizer::PageRasterizer;
use crate::types::{LoadedSource, PageSource, Provenance};

lazy_static! {
    /// Matches the page number embedded in scan file names ("001", "scan_12").
    static ref PAGE_NUMBER_REGEX: Regex = Regex::new(r"\d+").unwrap();
}

/// Rasterizes every page of `pdf_path`, in document order.
///
/// Pages get the synthetic provenance `pdf_page_<n>` (1-based).
pub fn load_pdf(rasterizer: &dyn PageRasterizer, pdf_path: &Path) -> Result<LoadedSource> {
    if !pdf_path.is_file() {
        return Err(Error::file_op(pdf_path, "PDF file not found"));
    }
    info!("Rasterizing PDF '{}'", pdf_path.display());

    let images = rasterizer
        .rasterize(pdf_path)
        .map_err(|e| Error::file_op(pdf_path, format!("rasterization failed: {}", e)))?;

    let pages: Vec<PageSource> = images
        .into_iter()
        .enumerate()
        .map(|(index, image)| PageSource {
            provenance: Provenance::PdfPage(index + 1),
            image,
            sequence_index: index,
        })
        .collect();

    info!("Loaded {} pages from '{}'", pages.len(), pdf_path.display());
    Ok(LoadedSource {
        loaded_page_count: pages.len(),
        pages,
    })
}

/// Opens each image in list order.
///
/// Provenances hold the normalized path, so later designation lookups and dedup checks
/// compare like with like.
pub fn load_folder_images(paths: &[PathBuf]) -> Result<LoadedSource> {
    info!("Loading {} page images", paths.len());
    let mut pages = Vec::with_capacity(paths.len());

    for (index, path) in paths.iter().enumerate() {
        if !path.is_file() {
            return Err(Error::file_op(path, "input image not found"));
        }
        let normalized = normalize_path(path)?;

        let image = ImageReader::open(&normalized)
            .map_err(|e| Error::file_op(&normalized, e))?
            .with_guessed_format()
            .map_err(|e| Error::file_op(&normalized, e))?
            .decode()
            .map_err(|e| Error::file_op(&normalized, format!("cannot decode image: {}", e)))?;
        debug!("Loaded page image '{}'", normalized.display());

        pages.push(PageSource {
            provenance: Provenance::File(normalized),
            image,
            sequence_index: index,
        });
    }

    Ok(LoadedSource {
        loaded_page_count: pages.len(),
        pages,
    })
}

/// Lists the supported page images directly inside `directory`.
///
/// Hidden files and sub-directories are skipped. The result is ordered by the last number in
/// each file name, so `page_2.png` comes before `page_10.png`.
pub async fn collect_folder_images(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.exists() {
        return Err(Error::file_op(directory, "input folder not found"));
    }
    if !directory.is_dir() {
        return Err(Error::InvalidPath(
            directory.to_path_buf(),
            "Input path is not a directory.".to_string(),
        ));
    }

    let mut entries: Vec<PathBuf> = Vec::new();
    let mut paths = read_dir(directory).await?;

    while let Some(entry) = paths.next_entry().await? {
        let path = entry.path();
        if is_hidden_file(&path) || !path.is_file() || !is_supported_image(&path) {
            continue;
        }
        entries.push(path);
    }

    entries.par_sort_by(|a, b| compare_paths_by_number_safe(a, b, &PAGE_NUMBER_REGEX));
    info!(
        "Found {} page images in '{}'",
        entries.len(),
        directory.display()
    );
    Ok(entries)
}
