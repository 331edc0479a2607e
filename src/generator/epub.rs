use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::path_utils::path_to_string_lossy;
use crate::types::{Chapter, EbookMetadata};
use async_trait::async_trait;
use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ZipLibrary};
use log::debug;

/// A generator for creating EPUB 3 files from an assembled spine.
///
/// This struct wraps the `EpubBuilder` functionality and implements the `Generator` trait.
/// The book opens with an inline table of contents, followed by the chapters in the order
/// they were added.
pub struct EPub {
    epub: EpubBuilder<ZipLibrary>,
    output_path: PathBuf,
}

#[async_trait]
impl Generator for EPub {
    fn new(output_path: &Path) -> Result<Self> {
        let mut epub = EpubBuilder::new(ZipLibrary::new()?)?;

        epub.epub_version(EpubVersion::V30);
        epub.stylesheet(include_bytes!("../../templates/Epub.css").as_slice())?;
        epub.inline_toc();

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::file_op(parent, e))?;
            }
        }

        Ok(EPub {
            epub,
            output_path: output_path.to_path_buf(),
        })
    }

    async fn set_metadata(&mut self, metadata: &EbookMetadata) -> Result<&mut Self> {
        self.epub.metadata("title", &metadata.title)?;

        for author in &metadata.authors {
            self.epub.metadata("author", author)?;
        }
        self.epub.set_lang(&metadata.language);

        if let Some(description) = &metadata.description {
            self.epub.metadata("description", description)?;
        }
        for subject in &metadata.subjects {
            self.epub.metadata("subject", subject)?;
        }

        Ok(self)
    }

    async fn add_chapter(&mut self, chapter: &Chapter) -> Result<&mut Self> {
        match chapter {
            Chapter::Text(text) => {
                self.epub.add_content(
                    EpubContent::new(text.file_name.as_str(), text.content.as_bytes())
                        .title(&text.title),
                )?;
            }
            Chapter::Illustration(illustration) => {
                // Resource straight from the memory-mapped file
                self.epub.add_resource(
                    &illustration.image_name,
                    Cursor::new(&illustration.data[..]),
                    illustration.media_type,
                )?;
                self.epub.add_content(
                    EpubContent::new(
                        illustration.file_name.as_str(),
                        illustration.content.as_bytes(),
                    )
                    .title(&illustration.title),
                )?;
            }
        }
        debug!("Added chapter '{}' ({})", chapter.title(), chapter.file_name());
        Ok(self)
    }

    async fn save(mut self) -> Result<()> {
        let file = File::create(&self.output_path).map_err(|e| {
            Error::FileOperation(format!(
                "Failed to create EPUB file '{}': {}",
                path_to_string_lossy(&self.output_path),
                e
            ))
        })?;

        self.epub.generate(file)?;
        Ok(())
    }
}
