//! Appends separately supplied illustration files after the loaded pages.

use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::path_utils::{dotted_extension, normalize_path};
use crate::types::{ContentBody, ContentItem, Provenance};

/// How many external illustrations were appended or left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    pub skipped: usize,
}

/// Copies each external illustration into the workspace and appends it to `existing`.
///
/// The illustration at list index `k` is numbered `loaded_page_count + k + 1`, so all of
/// them sort after the loaded pages in list order. Missing files, files that cannot be
/// copied and (in folder mode) files already present as image items are skipped without
/// failing the job.
///
/// # Arguments
///
/// * `existing` - Content gathered so far; appended to in place
/// * `external_paths` - External illustration files, in the order they should appear
/// * `is_folder_mode` - Enables deduplication against folder-designated illustrations
/// * `loaded_page_count` - Number of pages produced by the loader
/// * `temp_dir` - Job workspace receiving `ext_illust_<k><ext>`
pub fn merge_external(
    existing: &mut Vec<ContentItem>,
    external_paths: &[PathBuf],
    is_folder_mode: bool,
    loaded_page_count: usize,
    temp_dir: &Path,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (index, path) in external_paths.iter().enumerate() {
        if !path.is_file() {
            warn!("External illustration not found: '{}'", path.display());
            outcome.skipped += 1;
            continue;
        }

        let normalized = match normalize_path(path) {
            Ok(normalized) => normalized,
            Err(e) => {
                error!("Cannot resolve external illustration '{}': {}", path.display(), e);
                outcome.skipped += 1;
                continue;
            }
        };
        let provenance = Provenance::File(normalized);

        if is_folder_mode
            && existing
                .iter()
                .any(|item| !item.is_text() && item.provenance == provenance)
        {
            info!(
                "External illustration '{}' is already part of the book, skipping",
                provenance
            );
            outcome.skipped += 1;
            continue;
        }

        let destination = temp_dir.join(format!("ext_illust_{}{}", index, dotted_extension(path)));
        if let Err(e) = std::fs::copy(path, &destination) {
            error!(
                "Failed to copy external illustration '{}' to '{}': {}",
                path.display(),
                destination.display(),
                e
            );
            outcome.skipped += 1;
            continue;
        }

        info!(
            "Added external illustration '{}' -> '{}'",
            provenance,
            destination.display()
        );
        existing.push(ContentItem {
            page_num: loaded_page_count + index + 1,
            id: format!("img_ext_{}", index),
            provenance,
            body: ContentBody::Image(destination),
        });
        outcome.added += 1;
    }

    outcome
}
