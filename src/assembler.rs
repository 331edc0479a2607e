//! Content assembly: from unordered content items to the reading-order spine.
//!
//! Items are sorted by page number. Consecutive text pages are merged into one chapter,
//! titled and named after the first page of the run; each image is a chapter of its own and
//! ends the running text group. The order in which chapters are produced is the spine order.

use std::fs::File;
use std::path::Path;

use log::{debug, error, info};
use memmap2::MmapOptions;
use quick_xml::escape::escape;

use crate::error::Result;
use crate::types::{
    Chapter, ContentBody, ContentItem, IllustrationChapter, TextChapter, get_file_info,
};

const TEXT_TEMPLATE: &str = include_str!("../templates/Text.xhtml");
const ILLUSTRATION_TEMPLATE: &str = include_str!("../templates/Illustration.xhtml");

/// A run of consecutive text pages waiting to be emitted as one chapter.
struct TextGroup {
    anchor_page: usize,
    anchor_id: String,
    pages: Vec<usize>,
    fragments: String,
}

impl TextGroup {
    fn anchored_at(page_num: usize, id: &str) -> Self {
        Self {
            anchor_page: page_num,
            anchor_id: id.to_string(),
            pages: Vec::new(),
            fragments: String::new(),
        }
    }

    fn push(&mut self, page_num: usize, text: &str) {
        self.pages.push(page_num);
        self.fragments.push_str(&render_text_fragment(page_num, text));
    }

    fn finish(self) -> TextChapter {
        let title = format!("Page {}", self.anchor_page);
        let content = TEXT_TEMPLATE
            .replace("%title%", &escape(title.as_str()))
            .replace("%body%", &self.fragments);
        debug!(
            "Merged text chapter '{}' covering pages {:?}",
            title, self.pages
        );
        TextChapter {
            file_name: format!("{}.xhtml", self.anchor_id),
            title,
            pages: self.pages,
            content,
        }
    }
}

/// Escapes text for XHTML, dropping control characters XML 1.0 does not allow.
fn xml_text(text: &str) -> String {
    let allowed: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();
    escape(allowed.as_str()).into_owned()
}

/// One page's block inside a merged chapter.
fn render_text_fragment(page_num: usize, text: &str) -> String {
    format!(
        "  <section class=\"page\">\n    <h2>Page {}</h2>\n    <pre>{}</pre>\n  </section>\n",
        page_num,
        xml_text(text)
    )
}

/// Reads an illustration file and wraps it in its own reading page.
fn illustration_chapter(page_num: usize, id: &str, image_path: &Path) -> Result<IllustrationChapter> {
    let file = File::open(image_path)?;
    // The workspace owns the file and nothing rewrites it while the job runs
    let data = unsafe { MmapOptions::new().map(&file)? };
    let format = image::guess_format(&data)?;
    let (extension, media_type) = get_file_info(format)?;

    let title = format!("Illustration (Page {})", page_num);
    let image_name = format!("images/{}.{}", id, extension);
    let content = ILLUSTRATION_TEMPLATE
        .replace("%title%", &escape(title.as_str()))
        .replace("%src%", &image_name)
        .replace("%alt%", &escape(title.as_str()));

    Ok(IllustrationChapter {
        file_name: format!("img_page_{}.xhtml", id),
        title,
        page_num,
        image_name,
        media_type,
        data,
        content,
    })
}

/// Builds the spine from content items.
///
/// The result depends only on the items' page numbers and contents, never on the order
/// they arrive in. An illustration whose file cannot be read is logged and left out.
pub fn assemble(mut items: Vec<ContentItem>) -> Vec<Chapter> {
    // Stable: equal page numbers keep their insertion order
    items.sort_by_key(|item| item.page_num);

    let mut spine = Vec::new();
    let mut pending: Option<TextGroup> = None;

    for ContentItem {
        page_num,
        id,
        provenance,
        body,
    } in items
    {
        match body {
            ContentBody::Text(text) => pending
                .get_or_insert_with(|| TextGroup::anchored_at(page_num, &id))
                .push(page_num, &text),
            ContentBody::Image(path) => {
                if let Some(group) = pending.take() {
                    spine.push(Chapter::Text(group.finish()));
                }
                match illustration_chapter(page_num, &id, &path) {
                    Ok(chapter) => {
                        debug!("Illustration chapter '{}' ({})", chapter.title, chapter.file_name);
                        spine.push(Chapter::Illustration(chapter));
                    }
                    Err(e) => error!(
                        "Skipping illustration for page {} ('{}', file '{}'): {}",
                        page_num,
                        provenance,
                        path.display(),
                        e
                    ),
                }
            }
        }
    }

    if let Some(group) = pending.take() {
        spine.push(Chapter::Text(group.finish()));
    }

    info!("Assembled {} chapters", spine.len());
    spine
}
