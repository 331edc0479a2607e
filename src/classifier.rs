//! Page classification: OCR target or illustration.
//!
//! Every loaded page is persisted to `page_<i>.jpg` in the job workspace and then routed by
//! exactly one designation rule, chosen by the input mode:
//! - PDF mode: the page's 1-based position is in the designated page-number set
//! - folder mode: the page's normalized path is in the designated path set

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use image::ImageFormat;
use log::info;

use crate::error::{Error, Result};
use crate::path_utils::normalize_path;
use crate::types::{
    Classification, ClassifiedItem, IllustrationItem, OcrTarget, PageSource, Provenance,
};

/// Which pages are to be preserved as illustrations.
#[derive(Debug, Clone, PartialEq)]
pub enum Designation {
    /// 1-based page positions (PDF mode).
    PageNumbers(BTreeSet<usize>),
    /// Normalized image paths (folder mode).
    Paths(HashSet<PathBuf>),
}

impl Designation {
    pub fn for_pdf(pages: impl IntoIterator<Item = usize>) -> Self {
        Designation::PageNumbers(pages.into_iter().collect())
    }

    /// Builds a folder-mode designation; paths are normalized the same way the loader does.
    pub fn for_folder<'p>(paths: impl IntoIterator<Item = &'p PathBuf>) -> Result<Self> {
        let normalized = paths
            .into_iter()
            .map(|p| normalize_path(p))
            .collect::<Result<HashSet<PathBuf>>>()?;
        Ok(Designation::Paths(normalized))
    }

    pub fn is_illustration(&self, page: &PageSource) -> bool {
        match (self, &page.provenance) {
            (Designation::PageNumbers(numbers), _) => numbers.contains(&page.position()),
            (Designation::Paths(paths), Provenance::File(path)) => paths.contains(path),
            (Designation::Paths(_), Provenance::PdfPage(_)) => false,
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            Designation::PageNumbers(_) => "img_pdf_",
            Designation::Paths(_) => "img_folder_designated_",
        }
    }
}

/// Persists each page and splits the batch into OCR targets and illustrations.
///
/// # Arguments
///
/// * `pages` - Loaded pages in load order
/// * `designation` - The illustration rule for the input mode
/// * `temp_dir` - Job workspace receiving `page_<i>.jpg`
///
/// # Returns
///
/// * `Ok(Classification)` - Both lists in page-position order, covering positions `1..=N`
/// * `Err(Error::FileOperation)` - A page could not be written to the workspace
pub fn classify(
    pages: Vec<PageSource>,
    designation: &Designation,
    temp_dir: &Path,
) -> Result<Classification> {
    let mut classification = Classification::default();

    for page in pages {
        match classify_page(page, designation, temp_dir)? {
            ClassifiedItem::Ocr(target) => classification.ocr_targets.push(target),
            ClassifiedItem::Illustration(item) => classification.illustrations.push(item),
        }
    }

    info!(
        "Classified {} pages: {} for OCR, {} illustrations",
        classification.len(),
        classification.ocr_targets.len(),
        classification.illustrations.len()
    );
    Ok(classification)
}

fn classify_page(
    page: PageSource,
    designation: &Designation,
    temp_dir: &Path,
) -> Result<ClassifiedItem> {
    let position = page.position();
    let temp_path = temp_dir.join(format!("page_{}.jpg", position));

    // JPEG has no alpha channel
    page.image
        .to_rgb8()
        .save_with_format(&temp_path, ImageFormat::Jpeg)
        .map_err(|e| Error::file_op(&temp_path, format!("cannot persist page: {}", e)))?;

    if designation.is_illustration(&page) {
        info!(
            "Page {} ('{}') kept as illustration: {}",
            position,
            page.provenance,
            temp_path.display()
        );
        Ok(ClassifiedItem::Illustration(IllustrationItem {
            id: format!("{}{}", designation.id_prefix(), position),
            temp_path,
            page_num: position,
            provenance: page.provenance,
        }))
    } else {
        info!("Page {} ('{}') queued for OCR", position, page.provenance);
        Ok(ClassifiedItem::Ocr(OcrTarget {
            id: position,
            image: page.image,
            provenance: page.provenance,
        }))
    }
}
