//! Story Generation — the two upstream contracts behind one trait.
//!
//! - `generate_story_text`: inline source file + grounding instruction + prompt template,
//!   structured output constrained to the `Story` schema. Parsed and validated atomically.
//! - `generate_illustration`: decorated prompt + 4:3 aspect hint; returns the first
//!   inline image of the response.
//!
//! Neither call retries. `AppState` holds an `Arc<dyn StoryGenerator>`, so tests swap in
//! a scripted generator without touching handlers or the controller.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

use crate::generation::prompts::{
    build_story_prompt, decorate_illustration_prompt, ILLUSTRATION_ASPECT_RATIO,
    SOURCE_GROUNDING_INSTRUCTION,
};
use crate::generation::source_file::SourceFile;
use crate::llm_client::{
    Content, GenAiClient, GenAiError, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, ImageConfig, Part, IMAGE_MODEL, TEXT_MODEL,
};
use crate::story::schema::story_response_schema;
use crate::story::{parse_story, ImagePayload, Story, StoryParseError};

/// Shown to the user for any story-generation failure. The underlying error is logged only.
pub const STORY_FAILURE_MESSAGE: &str =
    "Failed to weave the story. Please ensure your file is valid.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("upstream call failed: {0}")]
    Upstream(#[from] GenAiError),

    #[error("upstream returned no content (finish reason: {0})")]
    NoContent(String),

    #[error(transparent)]
    Story(#[from] StoryParseError),

    #[error("no inline image found in response")]
    NoImage,

    #[error("image payload is not valid base64: {0}")]
    Payload(#[from] base64::DecodeError),

    #[error("illustration prompt is empty")]
    EmptyPrompt,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait StoryGenerator: Send + Sync {
    /// Generates a complete, validated story grounded in `file`.
    async fn generate_story_text(
        &self,
        topic: &str,
        file: &SourceFile,
    ) -> Result<Story, GenerationError>;

    /// Generates a single illustration for `prompt`.
    async fn generate_illustration(&self, prompt: &str) -> Result<ImagePayload, GenerationError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct GeminiStoryGenerator {
    client: GenAiClient,
}

impl GeminiStoryGenerator {
    pub fn new(client: GenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StoryGenerator for GeminiStoryGenerator {
    async fn generate_story_text(
        &self,
        topic: &str,
        file: &SourceFile,
    ) -> Result<Story, GenerationError> {
        info!(
            mime_type = %file.mime_type,
            bytes = file.bytes.len(),
            "Requesting story text"
        );
        let request = build_story_request(topic, file);
        let response = self.client.generate_content(TEXT_MODEL, &request).await?;
        let story = story_from_response(&response)?;
        info!(title = %story.title, "Story text generated");
        Ok(story)
    }

    async fn generate_illustration(&self, prompt: &str) -> Result<ImagePayload, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        let request = build_illustration_request(prompt);
        let response = self.client.generate_content(IMAGE_MODEL, &request).await?;
        let payload = image_from_response(&response)?;
        debug!(
            mime_type = %payload.mime_type,
            bytes = payload.bytes.len(),
            "Illustration generated"
        );
        Ok(payload)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request builders
// ────────────────────────────────────────────────────────────────────────────

/// Parts order: inline source file, grounding instruction, prompt template.
pub(crate) fn build_story_request(topic: &str, file: &SourceFile) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(vec![
            Part::inline(file.to_inline_data()),
            Part::text(SOURCE_GROUNDING_INSTRUCTION),
            Part::text(build_story_prompt(topic)),
        ])],
        generation_config: Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(story_response_schema()),
            ..Default::default()
        }),
    }
}

pub(crate) fn build_illustration_request(prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(vec![Part::text(
            decorate_illustration_prompt(prompt),
        )])],
        generation_config: Some(GenerationConfig {
            response_modalities: Some(vec!["IMAGE".to_string()]),
            image_config: Some(ImageConfig {
                aspect_ratio: ILLUSTRATION_ASPECT_RATIO.to_string(),
            }),
            ..Default::default()
        }),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Response decoding
// ────────────────────────────────────────────────────────────────────────────

pub(crate) fn story_from_response(
    response: &GenerateContentResponse,
) -> Result<Story, GenerationError> {
    let text = response.text().ok_or_else(|| {
        GenerationError::NoContent(response.finish_reason().unwrap_or("UNKNOWN").to_string())
    })?;
    Ok(parse_story(&text)?)
}

pub(crate) fn image_from_response(
    response: &GenerateContentResponse,
) -> Result<ImagePayload, GenerationError> {
    let inline = response
        .first_inline_data()
        .ok_or(GenerationError::NoImage)?;
    let bytes = STANDARD.decode(inline.data.as_bytes())?;
    Ok(ImagePayload {
        mime_type: inline.mime_type.clone(),
        bytes: Bytes::from(bytes),
    })
}
