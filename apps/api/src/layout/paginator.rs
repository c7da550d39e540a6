//! Document paginator — lays a `Story` and its `ImageMap` out into pages of draw operations.
//!
//! # Architecture
//! - A single vertical cursor `y` runs down the page from the top margin.
//! - `draw_text` wraps each paragraph, breaking to a new page before any line that would
//!   cross the bottom margin. `draw_image` breaks before an image that would not fit.
//! - Sections always start on a fresh page; overflow pages inherit the section of the page
//!   they continue.
//!
//! The paginator is pure and deterministic: same story, same images, same config → same layout.
//! Image ops only name their slot; the renderer resolves the payload.

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::{get_metrics, FontStyle, PageConfig};
use crate::story::{ImageMap, PageSlot, Story};

pub const COVER_SUBTITLE: &str = "Created with DreamWeaver Storybook";
pub const WORLD_HEADING: &str = "The World";
pub const CHARACTERS_HEADING: &str = "Characters";
pub const ENDING_HEADING: &str = "Epilogue";

/// Space after the cover title block before the subtitle.
const COVER_SUBTITLE_OFFSET_MM: f32 = 20.0;
/// Space after each character profile, and in place of a missing chapter image.
const SECTION_SPACER_MM: f32 = 5.0;

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);
    pub const SUBTITLE_GREY: Rgb = Rgb(0x66, 0x66, 0x66);
    pub const CAPTION_GREY: Rgb = Rgb(0x55, 0x55, 0x55);
    pub const VIOLET: Rgb = Rgb(0x8b, 0x5c, 0xf6);

    /// Components scaled to 0.0..=1.0.
    pub fn unit(self) -> (f32, f32, f32) {
        (
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
        )
    }
}

/// One positioned drawing operation. Coordinates are millimetres from the top-left corner;
/// for text, `y_mm` is the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Text {
        text: String,
        x_mm: f32,
        y_mm: f32,
        font_size_pt: f32,
        style: FontStyle,
        color: Rgb,
    },
    Image {
        slot: PageSlot,
        x_mm: f32,
        y_mm: f32,
        width_mm: f32,
        height_mm: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaidOutPage {
    /// Section this page belongs to.
    pub section: PageSlot,
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLayout {
    pub pages: Vec<LaidOutPage>,
}

impl DocumentLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages_in(&self, section: PageSlot) -> impl Iterator<Item = &LaidOutPage> + '_ {
        self.pages.iter().filter(move |p| p.section == section)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Text styles
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    size_pt: f32,
    face: FontStyle,
    color: Rgb,
}

const COVER_TITLE: TextStyle = TextStyle { size_pt: 28.0, face: FontStyle::Bold, color: Rgb::BLACK };
const COVER_SUBTITLE_STYLE: TextStyle =
    TextStyle { size_pt: 14.0, face: FontStyle::Italic, color: Rgb::SUBTITLE_GREY };
const SECTION_HEADING: TextStyle = TextStyle { size_pt: 18.0, face: FontStyle::Bold, color: Rgb::VIOLET };
const CHAPTER_TITLE: TextStyle = TextStyle { size_pt: 18.0, face: FontStyle::Bold, color: Rgb::BLACK };
const FIELD_LABEL: TextStyle = TextStyle { size_pt: 12.0, face: FontStyle::Bold, color: Rgb::BLACK };
const CHARACTER_NAME: TextStyle = TextStyle { size_pt: 14.0, face: FontStyle::Bold, color: Rgb::BLACK };
const CHARACTER_DESCRIPTION: TextStyle =
    TextStyle { size_pt: 10.0, face: FontStyle::Italic, color: Rgb::CAPTION_GREY };
const BODY: TextStyle = TextStyle { size_pt: 12.0, face: FontStyle::Normal, color: Rgb::BLACK };
const CLOSING: TextStyle = TextStyle { size_pt: 12.0, face: FontStyle::Italic, color: Rgb::BLACK };

// ────────────────────────────────────────────────────────────────────────────
// Paginator
// ────────────────────────────────────────────────────────────────────────────

pub struct DocumentPaginator<'a> {
    config: &'a PageConfig,
    images: &'a ImageMap,
    pages: Vec<LaidOutPage>,
    y: f32,
}

impl<'a> DocumentPaginator<'a> {
    pub fn new(config: &'a PageConfig, images: &'a ImageMap) -> Self {
        Self {
            config,
            images,
            pages: Vec::new(),
            y: config.margin_mm,
        }
    }

    /// Starts `section` on a fresh page.
    fn start_section(&mut self, section: PageSlot) {
        self.pages.push(LaidOutPage {
            section,
            ops: Vec::new(),
        });
        self.y = self.config.margin_mm;
    }

    /// Continues the current section on a new page.
    fn break_page(&mut self) {
        let section = self
            .pages
            .last()
            .map(|p| p.section)
            .unwrap_or(PageSlot::Cover);
        self.start_section(section);
    }

    fn push(&mut self, op: DrawOp) {
        if self.pages.is_empty() {
            self.start_section(PageSlot::Cover);
        }
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn advance(&mut self, mm: f32) {
        self.y += mm;
    }

    fn draw_text(&mut self, text: &str, style: TextStyle) {
        let metrics = get_metrics(style.face);
        let line_height = self.config.line_height_mm(style.size_pt);
        let width = self.config.content_width_mm();

        for paragraph in text.split('\n') {
            let lines = metrics.wrap(paragraph, style.size_pt, width);
            if lines.is_empty() {
                self.advance(line_height);
                continue;
            }
            for line in lines {
                if self.y + line_height > self.config.bottom_mm() {
                    self.break_page();
                }
                let y_mm = self.y;
                self.push(DrawOp::Text {
                    text: line,
                    x_mm: self.config.margin_mm,
                    y_mm,
                    font_size_pt: style.size_pt,
                    style: style.face,
                    color: style.color,
                });
                self.advance(line_height);
            }
        }
        self.advance(self.config.block_gap_mm);
    }

    /// Draws the slot's illustration. Returns `false` (and draws nothing) when the slot is empty.
    fn draw_image(&mut self, slot: PageSlot) -> bool {
        if !self.images.contains(slot) {
            return false;
        }
        if self.y + self.config.image_height_mm > self.config.bottom_mm() {
            self.break_page();
        }
        let y_mm = self.y;
        self.push(DrawOp::Image {
            slot,
            x_mm: (self.config.page_width_mm - self.config.image_width_mm) / 2.0,
            y_mm,
            width_mm: self.config.image_width_mm,
            height_mm: self.config.image_height_mm,
        });
        self.advance(self.config.image_height_mm + self.config.image_gap_mm);
        true
    }

    /// Title lines centred horizontally, starting at the cover baseline.
    fn draw_centered(&mut self, text: &str, style: TextStyle) {
        let metrics = get_metrics(style.face);
        let line_height = self.config.line_height_mm(style.size_pt);
        let lines = metrics.wrap(text, style.size_pt, self.config.content_width_mm());
        let count = lines.len();

        for (i, line) in lines.into_iter().enumerate() {
            if self.y + line_height > self.config.bottom_mm() {
                self.break_page();
            }
            let width = metrics.measure_mm(&line, style.size_pt);
            let x_mm = ((self.config.page_width_mm - width) / 2.0).max(self.config.margin_mm);
            let y_mm = self.y;
            self.push(DrawOp::Text {
                text: line,
                x_mm,
                y_mm,
                font_size_pt: style.size_pt,
                style: style.face,
                color: style.color,
            });
            if i + 1 < count {
                self.advance(line_height);
            }
        }
    }

    fn finish(self) -> DocumentLayout {
        DocumentLayout { pages: self.pages }
    }

    // ── Sections ─────────────────────────────────────────────────────────────

    fn cover(&mut self, story: &Story) {
        self.start_section(PageSlot::Cover);
        self.y = self.config.cover_title_y_mm;
        self.draw_centered(&story.title, COVER_TITLE);
        self.advance(COVER_SUBTITLE_OFFSET_MM);
        self.draw_centered(COVER_SUBTITLE, COVER_SUBTITLE_STYLE);
        self.advance(self.config.line_height_mm(COVER_SUBTITLE_STYLE.size_pt) + self.config.block_gap_mm);
        self.draw_image(PageSlot::Cover);
    }

    fn world(&mut self, story: &Story) {
        self.start_section(PageSlot::World);
        self.draw_text(WORLD_HEADING, SECTION_HEADING);
        self.draw_image(PageSlot::World);
        for (label, value) in [
            ("Geography:", &story.world.geography),
            ("Atmosphere:", &story.world.atmosphere),
            ("Culture:", &story.world.culture),
        ] {
            self.draw_text(label, FIELD_LABEL);
            self.draw_text(value, BODY);
        }
    }

    fn characters(&mut self, story: &Story) {
        self.start_section(PageSlot::Characters);
        self.draw_text(CHARACTERS_HEADING, SECTION_HEADING);
        self.draw_image(PageSlot::Characters);
        for character in &story.characters {
            self.draw_text(&character.name, CHARACTER_NAME);
            self.draw_text(&character.description, CHARACTER_DESCRIPTION);
            self.draw_text(&character.traits, BODY);
            self.draw_text(&character.backstory, BODY);
            self.advance(SECTION_SPACER_MM);
        }
    }

    fn chapters(&mut self, story: &Story) {
        for (index, chapter) in story.chapters.iter().enumerate() {
            let slot = PageSlot::Chapter(index);
            self.start_section(slot);
            self.draw_text(&chapter.title, CHAPTER_TITLE);
            if !self.draw_image(slot) {
                self.advance(SECTION_SPACER_MM);
            }
            self.draw_text(&chapter.content, BODY);
        }
    }

    fn ending(&mut self, story: &Story) {
        self.start_section(PageSlot::Ending);
        self.draw_text(ENDING_HEADING, SECTION_HEADING);
        self.draw_image(PageSlot::Ending);
        self.draw_text(&story.ending, CLOSING);
    }
}

/// Lays out the whole book: cover, world, characters, one section per chapter, epilogue.
pub fn layout_story(story: &Story, images: &ImageMap, config: &PageConfig) -> DocumentLayout {
    let mut paginator = DocumentPaginator::new(config, images);
    paginator.cover(story);
    paginator.world(story);
    paginator.characters(story);
    paginator.chapters(story);
    paginator.ending(story);
    paginator.finish()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::tiny_png;
    use crate::layout::font_metrics::default_page_config;
    use crate::story::fixtures::sample_story;

    fn full_image_map() -> ImageMap {
        let mut images = ImageMap::new();
        for slot in PageSlot::all() {
            images.insert(slot, tiny_png());
        }
        images
    }

    fn texts(page: &LaidOutPage) -> Vec<&str> {
        page.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                DrawOp::Image { .. } => None,
            })
            .collect()
    }

    fn body_lines(layout: &DocumentLayout, section: PageSlot) -> Vec<String> {
        layout
            .pages_in(section)
            .flat_map(|p| p.ops.iter())
            .filter_map(|op| match op {
                DrawOp::Text {
                    text,
                    style: FontStyle::Normal,
                    font_size_pt,
                    ..
                } if *font_size_pt == BODY.size_pt => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_every_section_gets_a_page_without_images() {
        let config = default_page_config();
        let layout = layout_story(&sample_story(), &ImageMap::new(), &config);

        assert!(layout.page_count() >= 9);
        for section in PageSlot::all() {
            assert!(
                layout.pages_in(section).count() >= 1,
                "no page for {section}"
            );
        }
        assert!(layout
            .pages
            .iter()
            .flat_map(|p| p.ops.iter())
            .all(|op| matches!(op, DrawOp::Text { .. })));
    }

    #[test]
    fn test_sections_appear_in_document_order() {
        let config = default_page_config();
        let layout = layout_story(&sample_story(), &full_image_map(), &config);
        let sections: Vec<PageSlot> = layout.pages.iter().map(|p| p.section).collect();
        let mut sorted = sections.clone();
        sorted.sort();
        assert_eq!(sections, sorted);
    }

    #[test]
    fn test_cover_layout() {
        let config = default_page_config();
        let layout = layout_story(&sample_story(), &ImageMap::new(), &config);
        let cover = &layout.pages[0];

        assert_eq!(cover.section, PageSlot::Cover);
        assert_eq!(texts(cover), vec!["A Flower for K-7", COVER_SUBTITLE]);
        match &cover.ops[0] {
            DrawOp::Text { y_mm, font_size_pt, style, x_mm, .. } => {
                assert_eq!(*y_mm, 80.0);
                assert_eq!(*font_size_pt, 28.0);
                assert_eq!(*style, FontStyle::Bold);
                assert!(*x_mm > config.margin_mm);
            }
            other => panic!("expected title text, got {other:?}"),
        }
    }

    #[test]
    fn test_world_page_has_heading_and_labelled_fields() {
        let config = default_page_config();
        let layout = layout_story(&sample_story(), &ImageMap::new(), &config);
        let world = layout.pages_in(PageSlot::World).next().unwrap();
        let lines = texts(world);

        assert_eq!(lines[0], WORLD_HEADING);
        for label in ["Geography:", "Atmosphere:", "Culture:"] {
            assert!(lines.contains(&label), "missing {label}");
        }
        match &world.ops[0] {
            DrawOp::Text { color, .. } => assert_eq!(*color, Rgb::VIOLET),
            other => panic!("expected heading, got {other:?}"),
        }
    }

    #[test]
    fn test_no_page_mixes_two_chapters() {
        let config = default_page_config();
        let story = sample_story();
        let layout = layout_story(&story, &full_image_map(), &config);

        for (i, chapter) in story.chapters.iter().enumerate() {
            let pages: Vec<_> = layout.pages_in(PageSlot::Chapter(i)).collect();
            assert_eq!(texts(pages[0])[0], chapter.title);
            for page in &pages {
                for other in story.chapters.iter().filter(|c| c.title != chapter.title) {
                    assert!(!texts(page).contains(&other.title.as_str()));
                }
            }
        }
    }

    #[test]
    fn test_layout_is_idempotent() {
        let config = default_page_config();
        let story = sample_story();
        let images = full_image_map();
        assert_eq!(
            layout_story(&story, &images, &config),
            layout_story(&story, &images, &config)
        );
    }

    #[test]
    fn test_long_chapter_uses_minimum_page_breaks() {
        let config = default_page_config();
        let mut story = sample_story();
        story.chapters[0].title = "Long chapter".to_string();
        story.chapters[0].content = (1..=100)
            .map(|i| format!("line{i}"))
            .collect::<Vec<_>>()
            .join("\n");

        let layout = layout_story(&story, &ImageMap::new(), &config);
        let body = body_lines(&layout, PageSlot::Chapter(0));

        // First page: title (7.3 mm) + gap 3 + spacer 5 leaves room for 40 body lines,
        // every following page holds 42.
        assert_eq!(layout.pages_in(PageSlot::Chapter(0)).count(), 3);
        assert_eq!(body.len(), 100);
        assert_eq!(body.first().map(String::as_str), Some("line1"));
        assert_eq!(body.last().map(String::as_str), Some("line100"));
    }

    #[test]
    fn test_no_line_or_image_crosses_bottom_margin() {
        let config = default_page_config();
        let mut story = sample_story();
        story.chapters[2].content = CHAPTER_FILLER.repeat(40);
        let layout = layout_story(&story, &full_image_map(), &config);

        for page in &layout.pages {
            let mut last_y = f32::MIN;
            for op in &page.ops {
                let (y, bottom) = match op {
                    DrawOp::Text { y_mm, font_size_pt, .. } => {
                        (*y_mm, *y_mm + config.line_height_mm(*font_size_pt))
                    }
                    DrawOp::Image { y_mm, height_mm, .. } => (*y_mm, *y_mm + height_mm),
                };
                assert!(bottom <= config.bottom_mm() + 1e-3, "op overflows: {op:?}");
                assert!(y >= last_y, "cursor moved upwards: {op:?}");
                last_y = y;
            }
        }
    }

    const CHAPTER_FILLER: &str = "K-7 carried water from the condenser one drop at a time. ";

    #[test]
    fn test_missing_image_matches_absent_key() {
        let config = default_page_config();
        let story = sample_story();
        let mut with_gap = ImageMap::new();
        for slot in PageSlot::all().filter(|s| *s != PageSlot::Chapter(2)) {
            with_gap.insert(slot, tiny_png());
        }

        let gapped = layout_story(&story, &with_gap, &config);
        let bare = layout_story(&story, &ImageMap::new(), &config);
        let gapped_pages: Vec<_> = gapped.pages_in(PageSlot::Chapter(2)).collect();
        let bare_pages: Vec<_> = bare.pages_in(PageSlot::Chapter(2)).collect();
        assert_eq!(gapped_pages, bare_pages);

        // Missing image leaves the title, a 5 mm spacer, then the body.
        match &gapped_pages[0].ops[1] {
            DrawOp::Text { y_mm, .. } => {
                let expected = config.margin_mm
                    + config.line_height_mm(CHAPTER_TITLE.size_pt)
                    + config.block_gap_mm
                    + SECTION_SPACER_MM;
                assert!((y_mm - expected).abs() < 1e-3);
            }
            other => panic!("expected body text, got {other:?}"),
        }
    }

    #[test]
    fn test_image_is_centered_with_fixed_size() {
        let config = default_page_config();
        let layout = layout_story(&sample_story(), &full_image_map(), &config);
        let image = layout
            .pages_in(PageSlot::Chapter(0))
            .flat_map(|p| p.ops.iter())
            .find(|op| matches!(op, DrawOp::Image { .. }))
            .unwrap();
        match image {
            DrawOp::Image { slot, x_mm, width_mm, height_mm, .. } => {
                assert_eq!(*slot, PageSlot::Chapter(0));
                assert_eq!(*x_mm, 45.0);
                assert_eq!((*width_mm, *height_mm), (120.0, 90.0));
            }
            DrawOp::Text { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_image_that_does_not_fit_moves_to_next_page() {
        let config = default_page_config();
        let mut story = sample_story();
        // 25 title lines end near y = 205 mm, leaving no room for a 90 mm image.
        story.chapters[1].title = "Dust ".repeat(250);
        let layout = layout_story(&story, &full_image_map(), &config);
        let pages: Vec<_> = layout.pages_in(PageSlot::Chapter(1)).collect();

        assert_eq!(pages.len(), 2);
        assert!(!pages[0].ops.iter().any(|op| matches!(op, DrawOp::Image { .. })));
        match &pages[1].ops[0] {
            DrawOp::Image { y_mm, .. } => assert_eq!(*y_mm, config.margin_mm),
            other => panic!("expected image at top of page, got {other:?}"),
        }
    }

    #[test]
    fn test_overlong_cover_title_continues_on_next_page() {
        let config = default_page_config();
        let mut story = sample_story();
        story.title = "Wanderer ".repeat(200);
        let layout = layout_story(&story, &ImageMap::new(), &config);
        let pages: Vec<_> = layout.pages_in(PageSlot::Cover).collect();

        assert!(pages.len() >= 2);
        for page in &pages {
            for op in &page.ops {
                if let DrawOp::Text { y_mm, font_size_pt, .. } = op {
                    assert!(y_mm + config.line_height_mm(*font_size_pt) <= config.bottom_mm());
                }
            }
        }
        let last = pages.last().map(|p| texts(p)).unwrap_or_default();
        assert_eq!(last.last().copied(), Some(COVER_SUBTITLE));
    }

    #[test]
    fn test_end_to_end_chapter_text_survives_wrapping() {
        let config = default_page_config();
        let story = sample_story();
        let layout = layout_story(&story, &ImageMap::new(), &config);

        assert!(layout.page_count() >= 8);
        for (i, chapter) in story.chapters.iter().enumerate() {
            let rendered = body_lines(&layout, PageSlot::Chapter(i)).join(" ");
            let expected = chapter.content.split_whitespace().collect::<Vec<_>>().join(" ");
            assert_eq!(rendered, expected);
        }
    }

    #[test]
    fn test_blank_lines_advance_without_ops() {
        let config = default_page_config();
        let mut story = sample_story();
        story.ending = "First.\n\nSecond.".to_string();
        let layout = layout_story(&story, &ImageMap::new(), &config);
        let ending = layout.pages_in(PageSlot::Ending).next().unwrap();

        let ys: Vec<f32> = ending
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, y_mm, .. } if text != ENDING_HEADING => Some(*y_mm),
                _ => None,
            })
            .collect();
        assert_eq!(ys.len(), 2);
        assert!((ys[1] - ys[0] - 2.0 * config.base_line_height_mm).abs() < 1e-3);
    }

    #[test]
    fn test_layout_serializes_for_preview() {
        let config = default_page_config();
        let layout = layout_story(&sample_story(), &full_image_map(), &config);
        let value = serde_json::to_value(&layout).unwrap();
        assert_eq!(value["pages"][0]["section"]["kind"], "cover");
        assert_eq!(value["pages"][0]["ops"][0]["op"], "text");
    }
}
