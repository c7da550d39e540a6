// Document export: layout → PDF bytes plus the download filename.

pub mod filename;
pub mod pdf;

use tracing::info;

use crate::layout::{layout_story, PageConfig};
use crate::story::{ImageMap, Story};

pub use filename::story_filename;
pub use pdf::{render_pdf, ExportError, ImageEmbedError};

#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Lays out and renders the whole book. CPU-bound: call from `spawn_blocking` in async code.
pub fn export_story(
    story: &Story,
    images: &ImageMap,
    config: &PageConfig,
) -> Result<ExportedDocument, ExportError> {
    let layout = layout_story(story, images, config);
    let bytes = render_pdf(&layout, images, config, &story.title)?;
    let filename = story_filename(&story.title);
    info!(
        %filename,
        pages = layout.page_count(),
        illustrations = images.len(),
        "Story exported"
    );
    Ok(ExportedDocument { filename, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::tiny_png;
    use crate::layout::default_page_config;
    use crate::story::fixtures::sample_story;
    use crate::story::PageSlot;
    use std::io::Write;

    #[test]
    fn test_export_names_file_after_title() {
        let doc = export_story(&sample_story(), &ImageMap::new(), &default_page_config()).unwrap();
        assert_eq!(doc.filename, "a_flower_for_k_7.pdf");
        assert!(doc.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_exported_file_reloads_from_disk() {
        let mut images = ImageMap::new();
        for slot in PageSlot::all() {
            images.insert(slot, tiny_png());
        }
        let exported = export_story(&sample_story(), &images, &default_page_config()).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&exported.bytes).unwrap();
        file.flush().unwrap();

        let doc = lopdf::Document::load(file.path()).unwrap();
        assert!(doc.get_pages().len() >= 9);
    }
}
