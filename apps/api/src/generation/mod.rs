// Story generation engine.
// Implements: source-file grounding, story text generation, illustration phase.
// All upstream calls go through llm_client; retries live in `illustrations`, never in the client.

pub mod generator;
pub mod illustrations;
pub mod prompts;
pub mod source_file;

#[cfg(test)]
pub mod testing;

pub use generator::{GeminiStoryGenerator, GenerationError, StoryGenerator, STORY_FAILURE_MESSAGE};
pub use illustrations::{illustration_stream, slot_prompt, IllustrationPolicy, IllustrationReport};
pub use source_file::{SourceFile, SourceFileError};
