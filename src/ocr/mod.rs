//! OCR boundary and concurrent dispatch.
//!
//! Text extraction is delegated to an [`OcrEngine`]. The [`OcrDispatcher`] fans OCR targets
//! out to the engine on a bounded number of concurrent workers and re-joins every result
//! with the provenance of the page it came from.
//!
//! Engines report two kinds of failure:
//! - [`OcrFailure::Page`]: this page could not be read; the batch continues and the page
//!   renders an inline error message
//! - [`OcrFailure::Fatal`]: the engine itself is unusable (authentication, quota,
//!   transport); the whole batch fails with [`Error::Ocr`]

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use image::{DynamicImage, ImageFormat};
use log::{debug, error, info};
use tokio::spawn;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, spawn_blocking};

use crate::error::{Error, Result};
use crate::types::{OcrOutcome, OcrResult, OcrTarget, Provenance};

pub mod command;

pub use command::CommandOcrEngine;

/// Why an engine could not return text for a page.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum OcrFailure {
    /// Only this page is affected.
    #[error("{0}")]
    Page(String),
    /// The engine cannot serve any request.
    #[error("{0}")]
    Fatal(String),
}

/// Reference to a credential bundle on disk, handed to the engine that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRef(PathBuf);

impl CredentialRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Fails with [`Error::FileOperation`] unless the bundle exists.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.0.is_file() {
            Ok(())
        } else {
            Err(Error::file_op(&self.0, "credential file not found"))
        }
    }
}

/// A text-extraction service.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognizes the text of one page, given as an encoded PNG.
    async fn recognize(&self, png: Vec<u8>) -> std::result::Result<String, OcrFailure>;

    /// Whether the engine cannot work without a credential bundle.
    fn requires_credentials(&self) -> bool {
        false
    }

    /// The credential bundle this engine was constructed with, if any.
    fn credentials(&self) -> Option<&CredentialRef> {
        None
    }
}

/// Runs OCR targets through an engine with bounded concurrency.
#[derive(Clone)]
pub struct OcrDispatcher {
    engine: Arc<dyn OcrEngine>,
    workers: usize,
}

impl OcrDispatcher {
    pub fn new(engine: Arc<dyn OcrEngine>, workers: usize) -> Self {
        Self {
            engine,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Recognizes every target, in no particular order.
    ///
    /// All workers run to completion before the batch is judged: a single fatal failure
    /// discards every result and returns [`Error::Ocr`].
    pub async fn dispatch(&self, targets: Vec<OcrTarget>) -> Result<Vec<OcrResult>> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        info!(
            "Starting OCR for {} pages with {} workers",
            targets.len(),
            self.workers
        );

        let provenance_by_id: HashMap<usize, Provenance> = targets
            .iter()
            .map(|target| (target.id, target.provenance.clone()))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles: Vec<JoinHandle<Result<(usize, std::result::Result<String, OcrFailure>)>>> =
            Vec::with_capacity(targets.len());

        for OcrTarget { id, image, .. } in targets {
            let semaphore = Arc::clone(&semaphore);
            let engine = Arc::clone(&self.engine);

            handles.push(spawn(async move {
                let _permit = semaphore.acquire().await?;
                // Image encoding is CPU-bound, keep it off the async workers
                let outcome = match spawn_blocking(move || encode_for_ocr(&image)).await? {
                    Ok(png) => engine.recognize(png).await,
                    Err(e) => Err(OcrFailure::Page(format!("cannot encode page image: {}", e))),
                };
                Ok((id, outcome))
            }));
        }

        // Every task has finished before any error is returned
        let joined = join_all(handles).await;

        let mut results = Vec::with_capacity(joined.len());
        let mut fatal: Option<String> = None;
        for res in joined {
            let (id, outcome) = res??;
            let outcome = match outcome {
                Ok(text) => {
                    debug!("OCR finished for page {}", id);
                    OcrOutcome::Text(text)
                }
                Err(OcrFailure::Page(reason)) => {
                    error!("OCR failed for page {}: {}", id, reason);
                    OcrOutcome::Failed(reason)
                }
                Err(OcrFailure::Fatal(reason)) => {
                    error!("OCR engine failed on page {}: {}", id, reason);
                    fatal.get_or_insert(reason);
                    continue;
                }
            };
            let provenance = provenance_by_id.get(&id).cloned().ok_or_else(|| {
                Error::EpubProcessing(format!("OCR result for unknown page id {}", id))
            })?;
            results.push(OcrResult {
                id,
                provenance,
                outcome,
            });
        }

        if let Some(reason) = fatal {
            return Err(Error::Ocr(reason));
        }
        info!("OCR batch finished ({} pages)", results.len());
        Ok(results)
    }
}

/// Grayscale PNG encoding of a page, the form handed to engines.
pub fn encode_for_ocr(image: &DynamicImage) -> Result<Vec<u8>> {
    let gray = image.grayscale();
    let mut buffer = Cursor::new(Vec::new());
    gray.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
