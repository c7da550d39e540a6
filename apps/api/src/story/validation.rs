//! Structural validation for generated stories.
//!
//! A story is accepted only if it satisfies every invariant of the five-act structure:
//! - exactly 5 plot points, typed in the fixed order of `PlotType::ORDER`
//! - each plot point references a distinct chapter index in 0..5
//! - exactly 5 chapters; a chapter's `plotType`, when present, matches its plot point
//! - at least one character; title, world fields, chapter prose and ending are non-blank
//!
//! All violations are collected rather than stopping at the first one, so the log line
//! for a rejected response tells the whole story.

use std::collections::HashSet;

use thiserror::Error;

use crate::story::models::{PlotType, Story};

/// Number of acts, plot points and chapters in every story.
pub const ACT_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("story failed validation: {}", .violations.join("; "))]
pub struct StoryValidationError {
    pub violations: Vec<String>,
}

/// Checks every story invariant. Returns all violations found.
pub fn validate_story(story: &Story) -> Result<(), StoryValidationError> {
    let mut violations = Vec::new();

    require_text(&mut violations, "title", &story.title);
    require_text(&mut violations, "world.geography", &story.world.geography);
    require_text(&mut violations, "world.atmosphere", &story.world.atmosphere);
    require_text(&mut violations, "world.culture", &story.world.culture);
    require_text(&mut violations, "ending", &story.ending);

    if story.characters.is_empty() {
        violations.push("characters must contain at least one character".to_string());
    }
    for (i, character) in story.characters.iter().enumerate() {
        require_text(&mut violations, &format!("characters[{i}].name"), &character.name);
    }

    check_plot_outline(story, &mut violations);
    check_chapters(story, &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(StoryValidationError { violations })
    }
}

fn check_plot_outline(story: &Story, violations: &mut Vec<String>) {
    if story.plot_outline.len() != ACT_COUNT {
        violations.push(format!(
            "plotOutline must have exactly {ACT_COUNT} entries, got {}",
            story.plot_outline.len()
        ));
    }

    let mut seen_indices = HashSet::new();
    for (i, point) in story.plot_outline.iter().enumerate() {
        if let Some(expected) = PlotType::ORDER.get(i) {
            if point.plot_type != *expected {
                violations.push(format!(
                    "plotOutline[{i}] must be '{expected}', got '{}'",
                    point.plot_type
                ));
            }
        }

        if point.chapter_index as usize >= ACT_COUNT {
            violations.push(format!(
                "plotOutline[{i}].chapterIndex {} is outside 0..{ACT_COUNT}",
                point.chapter_index
            ));
        } else if !seen_indices.insert(point.chapter_index) {
            violations.push(format!(
                "plotOutline[{i}].chapterIndex {} is assigned to more than one plot point",
                point.chapter_index
            ));
        }
    }
}

fn check_chapters(story: &Story, violations: &mut Vec<String>) {
    if story.chapters.len() != ACT_COUNT {
        violations.push(format!(
            "chapters must have exactly {ACT_COUNT} entries, got {}",
            story.chapters.len()
        ));
    }

    for (i, chapter) in story.chapters.iter().enumerate() {
        require_text(violations, &format!("chapters[{i}].title"), &chapter.title);
        require_text(violations, &format!("chapters[{i}].content"), &chapter.content);

        // Chapters are index-aligned with the outline.
        if let (Some(declared), Some(point)) = (chapter.plot_type, story.plot_outline.get(i)) {
            if declared != point.plot_type {
                violations.push(format!(
                    "chapters[{i}].plotType '{declared}' does not match plotOutline[{i}] '{}'",
                    point.plot_type
                ));
            }
        }
    }
}

fn require_text(violations: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        violations.push(format!("{field} must not be empty"));
    }
}
