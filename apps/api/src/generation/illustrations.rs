//! Illustration phase — one image per page slot, after the story text is final.
//!
//! Each slot's prompt is derived from the story. Calls run with bounded parallelism and a
//! caller-side retry policy (the generator itself never retries). Results are yielded as
//! they complete so the image map can be filled incrementally; every result is keyed by a
//! distinct slot, so concurrent completions never touch the same entry.

use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tracing::warn;

use crate::generation::generator::{GenerationError, StoryGenerator};
use crate::generation::prompts::{
    CHARACTERS_PROMPT_TEMPLATE, COVER_PROMPT_TEMPLATE, ENDING_PROMPT_TEMPLATE,
    WORLD_PROMPT_TEMPLATE,
};
use crate::story::{ImagePayload, PageSlot, Story};

/// Upper bound on a single retry delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct IllustrationPolicy {
    /// Maximum illustration calls in flight.
    pub concurrency: usize,
    /// Extra attempts per slot after the first failure.
    pub retries: u32,
    /// First backoff delay; doubles on every further attempt.
    pub base_backoff: Duration,
}

impl Default for IllustrationPolicy {
    fn default() -> Self {
        Self {
            concurrency: 2,
            retries: 1,
            base_backoff: Duration::from_secs(1),
        }
    }
}

/// Summary of an illustration run, returned to the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IllustrationReport {
    pub generated: Vec<PageSlot>,
    pub failed: Vec<PageSlot>,
    pub skipped: Vec<PageSlot>,
    /// Slots another run is already generating; not requested again.
    pub in_progress: Vec<PageSlot>,
}

/// Builds the illustration prompt for a slot. `None` when the story has nothing to draw there.
pub fn slot_prompt(story: &Story, slot: PageSlot) -> Option<String> {
    let prompt = match slot {
        PageSlot::Cover => COVER_PROMPT_TEMPLATE
            .replace("{title}", story.title.trim())
            .replace("{atmosphere}", story.world.atmosphere.trim()),
        PageSlot::World => WORLD_PROMPT_TEMPLATE
            .replace("{geography}", story.world.geography.trim())
            .replace("{atmosphere}", story.world.atmosphere.trim()),
        PageSlot::Characters => {
            if story.characters.is_empty() {
                return None;
            }
            let characters = story
                .characters
                .iter()
                .map(|c| format!("{} ({})", c.name.trim(), c.description.trim()))
                .collect::<Vec<_>>()
                .join("; ");
            CHARACTERS_PROMPT_TEMPLATE.replace("{characters}", &characters)
        }
        PageSlot::Chapter(i) => story.chapters.get(i)?.image_prompt.trim().to_string(),
        PageSlot::Ending => ENDING_PROMPT_TEMPLATE.replace("{ending}", story.ending.trim()),
    };

    if prompt.trim().is_empty() {
        None
    } else {
        Some(prompt)
    }
}

/// Runs illustration calls for `jobs` with bounded parallelism, yielding results by completion.
pub fn illustration_stream<'a>(
    generator: &'a dyn StoryGenerator,
    jobs: Vec<(PageSlot, String)>,
    policy: &'a IllustrationPolicy,
) -> impl Stream<Item = (PageSlot, Result<ImagePayload, GenerationError>)> + 'a {
    stream::iter(jobs)
        .map(move |(slot, prompt)| async move {
            let result = illustrate_with_retry(generator, slot, &prompt, policy).await;
            (slot, result)
        })
        .buffer_unordered(policy.concurrency.max(1))
}

async fn illustrate_with_retry(
    generator: &dyn StoryGenerator,
    slot: PageSlot,
    prompt: &str,
    policy: &IllustrationPolicy,
) -> Result<ImagePayload, GenerationError> {
    let mut attempt = 0u32;
    loop {
        match generator.generate_illustration(prompt).await {
            Ok(payload) => return Ok(payload),
            Err(e) if attempt < policy.retries => {
                let delay = backoff_delay(policy.base_backoff, attempt);
                warn!(
                    %slot,
                    attempt = attempt + 1,
                    error = %e,
                    "Illustration failed, retrying after {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `base * 2^attempt`, saturating and capped at [`MAX_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(MAX_BACKOFF)
}
