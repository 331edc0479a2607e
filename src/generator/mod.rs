//! Generator module provides the trait and implementation for writing the assembled book.
//!
//! A generator receives the metadata and the spine produced by [`crate::assembler::assemble`]
//! and turns them into a container file on disk.

use std::path::Path;

use async_trait::async_trait;
use log::info;

use crate::error::Result;
use crate::types::{Chapter, EbookMetadata};

pub mod epub;

/// Common interface for book container generators.
#[async_trait]
pub trait Generator {
    /// Creates a new generator writing to `output_path`.
    ///
    /// # Parameters
    /// * `output_path` - Full path of the file to produce; missing parent directories are created
    fn new(output_path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Sets the book-level metadata.
    async fn set_metadata(&mut self, metadata: &EbookMetadata) -> Result<&mut Self>
    where
        Self: Sized;

    /// Appends one chapter; chapters appear in the reading order they were added in.
    async fn add_chapter(&mut self, chapter: &Chapter) -> Result<&mut Self>
    where
        Self: Sized;

    /// Finalizes the document and writes it to the output location.
    async fn save(self) -> Result<()>;
}

/// Writes `spine` with generator `G`, in spine order.
pub async fn write_book<G>(output_path: &Path, metadata: &EbookMetadata, spine: &[Chapter]) -> Result<()>
where
    G: Generator + Send,
{
    let mut generator = G::new(output_path)?;
    generator.set_metadata(metadata).await?;
    for chapter in spine {
        generator.add_chapter(chapter).await?;
    }
    generator.save().await?;
    info!(
        "Wrote '{}' with {} chapters",
        output_path.display(),
        spine.len()
    );
    Ok(())
}
