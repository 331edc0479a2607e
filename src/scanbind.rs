use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::task::spawn_blocking;

use crate::assembler::assemble;
use crate::classifier::{Designation, classify};
use crate::error::{Error, Result};
use crate::generator::epub::EPub;
use crate::generator::write_book;
use crate::loader::{load_folder_images, load_pdf};
use crate::merger::merge_external;
use crate::ocr::{OcrDispatcher, OcrEngine};
use crate::path_utils::{normalize_path, sanitize_filename, validate_path};
use crate::rasterizer::PageRasterizer;
use crate::settings::{DEFAULT_AUTHOR, DEFAULT_LANGUAGE, DEFAULT_OCR_WORKERS, DEFAULT_TITLE, Settings};
use crate::types::{Classification, ContentItem, ConversionReport, EbookMetadata, InputSource};
use crate::workspace::JobWorkspace;

fn default_metadata() -> EbookMetadata {
    EbookMetadata {
        title: DEFAULT_TITLE.to_string(),
        authors: vec![DEFAULT_AUTHOR.to_string()],
        language: DEFAULT_LANGUAGE.to_string(),
        ..Default::default()
    }
}

fn default_rasterizer() -> Option<Arc<dyn PageRasterizer>> {
    #[cfg(feature = "pdfium")]
    {
        Some(Arc::new(crate::rasterizer::PdfiumRasterizer::default()))
    }
    #[cfg(not(feature = "pdfium"))]
    {
        None
    }
}

/// One scan-to-EPUB conversion job, built declaratively using the builder pattern.
///
/// The configuration is an immutable value: nothing in the pipeline reads global state,
/// and every collaborator (OCR engine, PDF rasterizer) is handed in here.
///
/// ## Builder Pattern
///
/// ```rust,no_run
/// # use scanbind::prelude::*;
/// # #[tokio::main]
/// # async fn main() -> scanbind::error::Result<()> {
/// let config = ScanbindConfig::builder()
///     .metadata(EbookMetadata::default_with_title("Scanned Novel".to_string()))
///     .input(InputSource::Pdf(PathBuf::from("./scan.pdf")))
///     .output_path(PathBuf::from("./scan.epub"))
///     .illustration_pages([1, 12])
///     .ocr_engine(Arc::new(CommandOcrEngine::tesseract("jpn")))
///     .build()?;
///
/// let report = config.convert().await?;
/// println!("{} chapters written", report.chapters_written);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, derive_builder::Builder)]
#[builder(setter(into, strip_option), build_fn(validate = "Self::validate"))]
pub struct ScanbindConfig {
    /// Title, authors, language and optional descriptive fields of the book.
    #[builder(default = "default_metadata()")]
    pub metadata: EbookMetadata,

    /// The PDF or the ordered list of page images to convert.
    pub input: InputSource,

    /// Output file. An existing directory receives `<sanitized title>.epub`.
    pub output_path: PathBuf,

    /// 1-based pages kept as illustrations (PDF input only).
    #[builder(default, setter(custom))]
    pub illustration_pages: BTreeSet<usize>,

    /// Image files kept as illustrations (folder input only).
    #[builder(default)]
    pub illustration_paths: Vec<PathBuf>,

    /// Extra images appended after all loaded pages, in this order.
    #[builder(default)]
    pub external_illustrations: Vec<PathBuf>,

    /// Maximum number of concurrent OCR requests.
    #[builder(default = "DEFAULT_OCR_WORKERS")]
    pub ocr_workers: usize,

    /// Base directory for the job workspace; the system temp dir when unset.
    #[builder(default)]
    pub temp_dir_base: Option<PathBuf>,

    /// How many times workspace removal is attempted.
    #[builder(default = "3")]
    pub cleanup_attempts: u32,

    /// Pause between workspace removal attempts.
    #[builder(default = "Duration::from_millis(500)")]
    pub cleanup_delay: Duration,

    /// Text extraction collaborator.
    #[builder(setter(custom))]
    pub ocr_engine: Arc<dyn OcrEngine>,

    /// PDF collaborator. Defaults to pdfium when the `pdfium` feature is enabled.
    #[builder(default = "default_rasterizer()", setter(custom))]
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,
}

impl std::fmt::Debug for ScanbindConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanbindConfig")
            .field("metadata", &self.metadata)
            .field("input", &self.input)
            .field("output_path", &self.output_path)
            .field("illustration_pages", &self.illustration_pages)
            .field("illustration_paths", &self.illustration_paths)
            .field("external_illustrations", &self.external_illustrations)
            .field("ocr_workers", &self.ocr_workers)
            .field("temp_dir_base", &self.temp_dir_base)
            .field("cleanup_attempts", &self.cleanup_attempts)
            .field("cleanup_delay", &self.cleanup_delay)
            .field("ocr_engine", &"Arc<dyn OcrEngine>")
            .field(
                "rasterizer",
                if self.rasterizer.is_some() {
                    &"Some(Arc<dyn PageRasterizer>)"
                } else {
                    &"None"
                },
            )
            .finish()
    }
}

impl ScanbindConfig {
    /// Creates a new builder for configuring `ScanbindConfig`.
    pub fn builder() -> ScanbindConfigBuilder {
        ScanbindConfigBuilder::default()
    }

    /// Checks the job's preconditions without loading or writing anything.
    ///
    /// [`convert`](ScanbindConfig::convert) calls this first, so manual invocation is only
    /// useful for early error reporting.
    ///
    /// # Returns
    ///
    /// * `Ok(&self)` - The job can start
    /// * `Err(Error::FileOperation)` - The input PDF or a required credential file is missing
    /// * `Err(Error::Unsupported)` - PDF input without a rasterizer
    /// * `Err(Error::Application)` - Empty title, output path or image list
    pub fn preflight_check(&self) -> Result<&Self> {
        if self.metadata.title.trim().is_empty() {
            return Err(Error::Application("Ebook title is required".to_string()));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(Error::Application("Output path is required".to_string()));
        }
        validate_path(&self.output_path)?;

        match &self.input {
            InputSource::Pdf(path) => {
                validate_path(path)?;
                if !path.is_file() {
                    return Err(Error::file_op(path, "input PDF not found"));
                }
                if self.rasterizer.is_none() {
                    return Err(Error::Unsupported(
                        "PDF input needs a page rasterizer (enable the `pdfium` feature or set one)"
                            .to_string(),
                    ));
                }
            }
            InputSource::Images(paths) => {
                if paths.is_empty() {
                    return Err(Error::Application("No input images given".to_string()));
                }
            }
        }

        if self.needs_ocr()? {
            match self.ocr_engine.credentials() {
                Some(credentials) => credentials.ensure_exists()?,
                None if self.ocr_engine.requires_credentials() => {
                    return Err(Error::FileOperation(
                        "OCR engine requires a credential file, none configured".to_string(),
                    ));
                }
                None => {}
            }
        }

        Ok(self)
    }

    /// The illustration rule for this job's input mode.
    pub fn designation(&self) -> Result<Designation> {
        match self.input {
            InputSource::Pdf(_) => Ok(Designation::for_pdf(self.illustration_pages.iter().copied())),
            InputSource::Images(_) => Designation::for_folder(&self.illustration_paths),
        }
    }

    /// Whether any loaded page will be sent to the OCR engine.
    ///
    /// Always true for PDF input, where the page count is unknown before rasterizing.
    pub fn needs_ocr(&self) -> Result<bool> {
        match &self.input {
            InputSource::Pdf(_) => Ok(true),
            InputSource::Images(paths) => {
                let designation = self.designation()?;
                for path in paths {
                    let normalized = normalize_path(path)?;
                    if !matches!(&designation, Designation::Paths(set) if set.contains(&normalized)) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Where the EPUB will be written.
    pub fn resolved_output_path(&self) -> PathBuf {
        if self.output_path.is_dir() {
            self.output_path
                .join(format!("{}.epub", sanitize_filename(&self.metadata.title)))
        } else {
            self.output_path.clone()
        }
    }

    /// Runs the whole conversion: load, classify, OCR, merge externals, assemble, write.
    ///
    /// The job's workspace is removed afterwards whether the job succeeded or not. Per-page
    /// problems (a failed OCR page, a missing external illustration, an unreadable image) are
    /// logged and absorbed; structural problems abort the job and no EPUB is written.
    ///
    /// # Returns
    ///
    /// * `Ok(ConversionReport)` - The EPUB was written
    /// * `Err(Error)` - The job was aborted; see [`Error::kind`]
    pub async fn convert(&self) -> Result<ConversionReport> {
        self.preflight_check()?;
        let output_path = self.resolved_output_path();
        let workspace = JobWorkspace::create(self.temp_dir_base.as_deref())?;

        let result = self.run(&workspace, &output_path).await;

        if !workspace
            .cleanup(self.cleanup_attempts, self.cleanup_delay)
            .await
        {
            warn!("Job workspace could not be removed completely");
        }

        match &result {
            Ok(report) => info!(
                "Conversion finished: '{}' ({} chapters, {} OCR failures)",
                report.output_path.display(),
                report.chapters_written,
                report.ocr_failures
            ),
            Err(e) => error!("Conversion aborted ({:?}): {}", e.kind(), e),
        }
        result
    }

    async fn run(&self, workspace: &JobWorkspace, output_path: &Path) -> Result<ConversionReport> {
        let designation = self.designation()?;
        let input = self.input.clone();
        let rasterizer = self.rasterizer.clone();
        let temp_dir = workspace.path().to_path_buf();

        // Loading and classification decode and encode every page
        let (classification, loaded_page_count) = spawn_blocking(move || -> Result<_> {
            let loaded = match &input {
                InputSource::Pdf(path) => {
                    let rasterizer = rasterizer.ok_or_else(|| {
                        Error::Unsupported("PDF input needs a page rasterizer".to_string())
                    })?;
                    load_pdf(&*rasterizer, path)?
                }
                InputSource::Images(paths) => load_folder_images(paths)?,
            };
            let loaded_page_count = loaded.loaded_page_count;
            let classification = classify(loaded.pages, &designation, &temp_dir)?;
            Ok((classification, loaded_page_count))
        })
        .await??;

        let mut report = ConversionReport {
            output_path: output_path.to_path_buf(),
            pages_loaded: loaded_page_count,
            ocr_targets: classification.ocr_targets.len(),
            illustrations: classification.illustrations.len(),
            ..Default::default()
        };

        let Classification {
            ocr_targets,
            illustrations,
        } = classification;
        let dispatcher = OcrDispatcher::new(Arc::clone(&self.ocr_engine), self.ocr_workers);
        let results = dispatcher.dispatch(ocr_targets).await?;
        report.ocr_failures = results.iter().filter(|r| r.is_failure()).count();

        let mut items: Vec<ContentItem> = results
            .into_iter()
            .map(ContentItem::from)
            .chain(illustrations.into_iter().map(ContentItem::from))
            .collect();

        let merged = merge_external(
            &mut items,
            &self.external_illustrations,
            self.input.is_folder_mode(),
            loaded_page_count,
            workspace.path(),
        );
        report.external_illustrations_added = merged.added;
        report.external_illustrations_skipped = merged.skipped;

        let spine = spawn_blocking(move || assemble(items)).await?;
        if spine.is_empty() {
            return Err(Error::EpubProcessing(
                "No chapters were assembled, nothing to write".to_string(),
            ));
        }
        report.chapters_written = spine.len();

        write_book::<EPub>(output_path, &self.metadata, &spine).await?;
        Ok(report)
    }
}

impl ScanbindConfigBuilder {
    /// Seeds a builder with the defaults from persisted settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut builder = Self::default();
        builder
            .metadata(EbookMetadata {
                title: settings.default_epub_title.clone(),
                authors: vec![settings.default_epub_author.clone()],
                language: settings.default_epub_language.clone(),
                ..Default::default()
            })
            .ocr_workers(settings.effective_ocr_workers());
        if let Some(base) = &settings.temp_dir_base {
            builder.temp_dir_base(base.clone());
        }
        builder
    }

    pub fn illustration_pages(&mut self, pages: impl IntoIterator<Item = usize>) -> &mut Self {
        self.illustration_pages = Some(pages.into_iter().collect());
        self
    }

    pub fn ocr_engine(&mut self, engine: Arc<dyn OcrEngine>) -> &mut Self {
        self.ocr_engine = Some(engine);
        self
    }

    pub fn rasterizer(&mut self, rasterizer: Arc<dyn PageRasterizer>) -> &mut Self {
        self.rasterizer = Some(Some(rasterizer));
        self
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(metadata) = &self.metadata {
            if metadata.title.trim().is_empty() {
                return Err("Ebook title must not be empty".to_string());
            }
        }
        if self.ocr_workers == Some(0) {
            return Err("ocr_workers must be at least 1".to_string());
        }
        if self.cleanup_attempts == Some(0) {
            return Err("cleanup_attempts must be at least 1".to_string());
        }
        if let Some(pages) = &self.illustration_pages {
            if pages.contains(&0) {
                return Err("Illustration page numbers are 1-based".to_string());
            }
        }

        // Exactly one designation rule per input mode
        match &self.input {
            Some(InputSource::Pdf(_)) => {
                if self.illustration_paths.as_ref().is_some_and(|p| !p.is_empty()) {
                    return Err("Illustration paths only apply to image folder input".to_string());
                }
            }
            Some(InputSource::Images(_)) => {
                if self.illustration_pages.as_ref().is_some_and(|p| !p.is_empty()) {
                    return Err("Illustration page numbers only apply to PDF input".to_string());
                }
            }
            None => {}
        }

        Ok(())
    }
}
