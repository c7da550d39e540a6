//! Scripted `StoryGenerator` for tests. Never talks to the network.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::generation::generator::{GenerationError, StoryGenerator};
use crate::generation::source_file::SourceFile;
use crate::story::fixtures::sample_story;
use crate::story::{ImagePayload, Story};

/// A 4×3 PNG, small enough to embed everywhere.
pub fn tiny_png() -> ImagePayload {
    let img = image::RgbImage::from_pixel(4, 3, image::Rgb([240, 200, 40]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode test png");
    ImagePayload {
        mime_type: "image/png".to_string(),
        bytes: Bytes::from(buf.into_inner()),
    }
}

pub struct ScriptedGenerator {
    story: Option<Story>,
    story_delay: Duration,
    illustration_delay: Duration,
    fail_first_illustrations: usize,
    fail_prompts_containing: Option<String>,
    story_calls: AtomicUsize,
    illustration_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    last_topic: Mutex<Option<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            story: Some(sample_story()),
            story_delay: Duration::ZERO,
            illustration_delay: Duration::ZERO,
            fail_first_illustrations: 0,
            fail_prompts_containing: None,
            story_calls: AtomicUsize::new(0),
            illustration_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            last_topic: Mutex::new(None),
        }
    }

    pub fn failing_story(mut self) -> Self {
        self.story = None;
        self
    }

    pub fn with_story_delay(mut self, delay: Duration) -> Self {
        self.story_delay = delay;
        self
    }

    pub fn with_illustration_delay(mut self, delay: Duration) -> Self {
        self.illustration_delay = delay;
        self
    }

    pub fn failing_first_illustrations(mut self, count: usize) -> Self {
        self.fail_first_illustrations = count;
        self
    }

    pub fn failing_prompts_containing(mut self, needle: &str) -> Self {
        self.fail_prompts_containing = Some(needle.to_string());
        self
    }

    pub fn story_calls(&self) -> usize {
        self.story_calls.load(Ordering::SeqCst)
    }

    pub fn illustration_calls(&self) -> usize {
        self.illustration_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_topic(&self) -> Option<String> {
        self.last_topic.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoryGenerator for ScriptedGenerator {
    async fn generate_story_text(
        &self,
        topic: &str,
        _file: &SourceFile,
    ) -> Result<Story, GenerationError> {
        self.story_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_topic.lock().unwrap() = Some(topic.to_string());
        if !self.story_delay.is_zero() {
            tokio::time::sleep(self.story_delay).await;
        }
        self.story
            .clone()
            .ok_or_else(|| GenerationError::NoContent("SAFETY".to_string()))
    }

    async fn generate_illustration(&self, prompt: &str) -> Result<ImagePayload, GenerationError> {
        let call = self.illustration_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.illustration_delay.is_zero() {
            tokio::time::sleep(self.illustration_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted_failure = call < self.fail_first_illustrations
            || self
                .fail_prompts_containing
                .as_deref()
                .is_some_and(|needle| prompt.contains(needle));
        if scripted_failure {
            return Err(GenerationError::NoImage);
        }
        Ok(tiny_png())
    }
}
