// Story model: schema, structured-output contract, and validation.
// A `Story` only exists once the full upstream response has parsed and validated.

pub mod images;
pub mod models;
pub mod schema;
pub mod validation;

#[cfg(test)]
pub mod fixtures;

use thiserror::Error;

use crate::llm_client::strip_json_fences;

pub use images::{ImageMap, ImagePayload, PageSlot};
pub use models::{Chapter, CharacterProfile, PlotPoint, PlotType, Story, WorldBuilding};
pub use validation::{validate_story, StoryValidationError};

#[derive(Debug, Error)]
pub enum StoryParseError {
    #[error("story JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] StoryValidationError),
}

/// Parses raw model output into a validated `Story`.
///
/// Code fences are stripped first. Missing fields, wrong types, and any
/// validation violation reject the whole response; there is no partial recovery.
pub fn parse_story(raw: &str) -> Result<Story, StoryParseError> {
    let story: Story = serde_json::from_str(strip_json_fences(raw))?;
    validate_story(&story)?;
    Ok(story)
}
