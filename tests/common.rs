//! Common test utilities for the scanbind crate.
//!
//! Provides per-test directories, page images whose gray level identifies them, scripted
//! OCR engines and rasterizers, and helpers for looking inside generated EPUB files.

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use rand::{Rng, distributions::Alphanumeric};
use regex::Regex;
use scanbind::error::{Error, Result};
use scanbind::ocr::{CredentialRef, OcrEngine, OcrFailure};
use scanbind::rasterizer::PageRasterizer;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::fs;

#[allow(dead_code)]
pub const TEST_TMP_DIR: &str = "tests/tmp";
#[allow(dead_code)]
pub const LONG_TEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Directories of one test: page images go to `source_dir`, EPUBs to `target_dir`, job
/// workspaces under `temp_base`.
#[allow(dead_code)]
pub struct TestDirs {
    pub base_dir: PathBuf,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub temp_base: PathBuf,
}

/// Creates a fresh, uniquely named set of test directories.
#[allow(dead_code)]
pub async fn setup_test_dirs(sub_path: &str) -> TestDirs {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let base_dir = PathBuf::from(TEST_TMP_DIR).join(format!("{}-{}", sub_path, rand_string));
    if base_dir.exists() {
        fs::remove_dir_all(&base_dir).await.unwrap();
    }
    let dirs = TestDirs {
        source_dir: base_dir.join("source"),
        target_dir: base_dir.join("target"),
        temp_base: base_dir.join("work"),
        base_dir,
    };
    fs::create_dir_all(&dirs.source_dir).await.unwrap();
    fs::create_dir_all(&dirs.target_dir).await.unwrap();
    fs::create_dir_all(&dirs.temp_base).await.unwrap();
    dirs
}

/// A flat gray page; `level` is what [`ScriptedOcr`] reads back.
#[allow(dead_code)]
pub fn gray_page(level: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([level, level, level])))
}

/// Writes a flat gray page image; the format follows the file extension.
#[allow(dead_code)]
pub async fn create_page_image(path: &Path, level: u8) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let path_clone = path.to_path_buf();
    tokio::task::spawn_blocking(move || gray_page(level).to_rgb8().save(path_clone)).await??;
    Ok(())
}

/// Writes one PNG page per level, named `<index>.png` (1-based), and returns their paths.
#[allow(dead_code)]
pub async fn create_pages(dir: &Path, levels: &[u8]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(levels.len());
    for (index, level) in levels.iter().enumerate() {
        let path = dir.join(format!("{}.png", index + 1));
        create_page_image(&path, *level).await?;
        paths.push(path);
    }
    Ok(paths)
}

/// An OCR engine that answers by the gray level of the page it receives.
///
/// Each scripted level maps to a text or a failure; a page is matched to the closest
/// scripted level. It also records how many requests ran and how many overlapped.
#[allow(dead_code)]
pub struct ScriptedOcr {
    script: Vec<(u8, std::result::Result<String, OcrFailure>)>,
    panic_level: Option<u8>,
    delay: Duration,
    calls: AtomicUsize,
    finished: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedOcr {
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            panic_level: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn text(mut self, level: u8, text: &str) -> Self {
        self.script.push((level, Ok(text.to_string())));
        self
    }

    pub fn fail(mut self, level: u8, failure: OcrFailure) -> Self {
        self.script.push((level, Err(failure)));
        self
    }

    /// Panics immediately on a page of exactly this level.
    pub fn panic_on(mut self, level: u8) -> Self {
        self.panic_level = Some(level);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests that ran to the end.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn recognize(&self, png: Vec<u8>) -> std::result::Result<String, OcrFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let level = image::load_from_memory(&png)
            .map_err(|e| OcrFailure::Page(format!("not an image: {}", e)))?
            .to_luma8()
            .get_pixel(0, 0)[0];
        if self.panic_level == Some(level) {
            panic!("scripted engine crashed on level {}", level);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);

        match self.script.iter().min_by_key(|(l, _)| l.abs_diff(level)) {
            Some((_, answer)) => answer.clone(),
            None => Ok(format!("level {}", level)),
        }
    }
}

/// An engine that cannot run without a credential bundle.
#[allow(dead_code)]
pub struct CredentialedOcr {
    pub credentials: Option<CredentialRef>,
}

#[async_trait]
impl OcrEngine for CredentialedOcr {
    async fn recognize(&self, _png: Vec<u8>) -> std::result::Result<String, OcrFailure> {
        Ok("authenticated text".to_string())
    }

    fn requires_credentials(&self) -> bool {
        true
    }

    fn credentials(&self) -> Option<&CredentialRef> {
        self.credentials.as_ref()
    }
}

/// A "PDF" whose pages are already in memory; the file only has to exist.
#[allow(dead_code)]
pub struct MemoryRasterizer {
    pub pages: Vec<DynamicImage>,
}

#[allow(dead_code)]
impl MemoryRasterizer {
    pub fn with_levels(levels: &[u8]) -> Self {
        Self {
            pages: levels.iter().map(|l| gray_page(*l)).collect(),
        }
    }
}

impl PageRasterizer for MemoryRasterizer {
    fn rasterize(&self, _pdf_path: &Path) -> Result<Vec<DynamicImage>> {
        Ok(self.pages.clone())
    }
}

/// A rasterizer that rejects every document.
#[allow(dead_code)]
pub struct BrokenRasterizer;

impl PageRasterizer for BrokenRasterizer {
    fn rasterize(&self, pdf_path: &Path) -> Result<Vec<DynamicImage>> {
        Err(Error::Application(format!(
            "'{}' is not a PDF document",
            pdf_path.display()
        )))
    }
}

/// Creates a placeholder PDF file for the in-memory rasterizers.
#[allow(dead_code)]
pub async fn create_dummy_pdf(path: &Path) -> Result<()> {
    fs::write(path, b"%PDF-1.4\n%%EOF\n").await?;
    Ok(())
}

/// Lists the entry names of a ZIP file (EPUB).
#[allow(dead_code)]
pub fn zip_entry_names(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// Reads the first entry whose name ends with `suffix` as UTF-8.
#[allow(dead_code)]
pub fn read_zip_entry(path: &Path, suffix: &str) -> String {
    let name = zip_entry_names(path)
        .into_iter()
        .find(|n| n.ends_with(suffix))
        .unwrap_or_else(|| panic!("no entry ending with '{}' in {:?}", suffix, path));
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(&name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

/// The chapter documents of an EPUB in spine order, by file name.
#[allow(dead_code)]
pub fn spine_documents(path: &Path) -> Vec<String> {
    let opf = read_zip_entry(path, ".opf");
    let item_re = Regex::new(r"<item\s[^>]*>").unwrap();
    let id_re = Regex::new(r#"\bid="([^"]+)""#).unwrap();
    let href_re = Regex::new(r#"\bhref="([^"]+)""#).unwrap();
    let itemref_re = Regex::new(r#"<itemref\s[^>]*idref="([^"]+)""#).unwrap();

    let manifest: Vec<(String, String)> = item_re
        .find_iter(&opf)
        .filter_map(|tag| {
            let tag = tag.as_str();
            let id = id_re.captures(tag)?.get(1)?.as_str().to_string();
            let href = href_re.captures(tag)?.get(1)?.as_str().to_string();
            Some((id, href))
        })
        .collect();

    itemref_re
        .captures_iter(&opf)
        .filter_map(|cap| {
            let idref = cap.get(1)?.as_str();
            manifest
                .iter()
                .find(|(id, _)| id == idref)
                .map(|(_, href)| href.rsplit('/').next().unwrap_or(href).to_string())
        })
        .filter(|name| name.starts_with("page_") || name.starts_with("img_page_"))
        .collect()
}

/// Asserts that `path` is a non-empty ZIP file.
#[allow(dead_code)]
pub fn assert_valid_epub(path: &Path) {
    assert!(path.is_file(), "EPUB file does not exist: {:?}", path);
    let names = zip_entry_names(path);
    assert!(
        names.iter().any(|n| n == "mimetype"),
        "EPUB has no mimetype entry: {:?}",
        names
    );
}

/// Whether `dir` has no entries left.
#[allow(dead_code)]
pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
