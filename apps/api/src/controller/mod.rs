//! App controller — the single source of truth for the story session.
//!
//! # State machine
//! ```text
//! idle ──submit──▶ generating ──success──▶ reading ──reset──▶ idle
//!   │                  └──────failure────▶ error ───reset──▶ idle
//!   └──submit without file──────────────▶ error
//! ```
//! Any other transition is rejected and leaves the state untouched. Every accepted
//! transition publishes a fresh `StoryState` on a watch channel.
//!
//! Each submit carries a new generation id. Completions and illustrations tagged with
//! an older id are dropped, so a reset can never be overwritten by late results.

pub mod handlers;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::generation::{
    illustration_stream, slot_prompt, GenerationError, IllustrationPolicy, IllustrationReport,
    SourceFile, StoryGenerator, STORY_FAILURE_MESSAGE,
};
use crate::story::{ImageMap, ImagePayload, PageSlot, Story};

pub const MISSING_FILE_MESSAGE: &str =
    "A source file is required. Please upload an image or text file to guide the story.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    Idle,
    Generating,
    Reading,
    Error,
}

impl std::fmt::Display for AppStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AppStatus::Idle => "idle",
            AppStatus::Generating => "generating",
            AppStatus::Reading => "reading",
            AppStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Snapshot of the session, published on every transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryState {
    pub status: AppStatus,
    pub topic: Option<String>,
    pub story: Option<Story>,
    /// User-facing message; set only in `error`.
    pub error: Option<String>,
    pub generation_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl StoryState {
    fn idle() -> Self {
        Self {
            status: AppStatus::Idle,
            topic: None,
            story: None,
            error: None,
            generation_id: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error("cannot {action} while {from}")]
    InvalidTransition { from: AppStatus, action: &'static str },

    #[error("a source file is required")]
    MissingInput,

    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("generation {0} is no longer current")]
    StaleGeneration(Uuid),
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

pub struct AppController {
    state: watch::Sender<StoryState>,
    images: RwLock<ImageMap>,
    /// Slots with an illustration call running, keyed by generation.
    in_flight: Mutex<HashSet<(Uuid, PageSlot)>>,
}

/// Releases claimed illustration slots when dropped, including on cancellation.
struct InFlightClaim<'a> {
    set: &'a Mutex<HashSet<(Uuid, PageSlot)>>,
    keys: Vec<(Uuid, PageSlot)>,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for key in &self.keys {
            set.remove(key);
        }
    }
}

impl Default for AppController {
    fn default() -> Self {
        Self::new()
    }
}

impl AppController {
    pub fn new() -> Self {
        let (state, _) = watch::channel(StoryState::idle());
        Self {
            state,
            images: RwLock::new(ImageMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn snapshot(&self) -> StoryState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StoryState> {
        self.state.subscribe()
    }

    /// Applies `f` atomically and publishes the new state only if `f` succeeds.
    fn transition<T>(
        &self,
        f: impl FnOnce(&mut StoryState) -> Result<T, ControllerError>,
    ) -> Result<T, ControllerError> {
        let mut outcome = None;
        self.state.send_if_modified(|state| {
            let mut next = state.clone();
            let result = f(&mut next);
            let accepted = result.is_ok();
            if accepted {
                next.updated_at = Utc::now();
                info!(from = %state.status, to = %next.status, "Story state transition");
                *state = next;
            }
            outcome = Some(result);
            accepted
        });
        outcome.unwrap_or_else(|| {
            Err(ControllerError::InvalidTransition {
                from: self.snapshot().status,
                action: "transition",
            })
        })
    }

    /// `idle → generating`, or `idle → error` when no source file was supplied.
    pub fn submit(&self, topic: &str, file: Option<&SourceFile>) -> Result<Uuid, ControllerError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ControllerError::EmptyTopic);
        }

        let missing_file = file.is_none();
        let id = self.transition(|state| {
            if state.status != AppStatus::Idle {
                return Err(ControllerError::InvalidTransition {
                    from: state.status,
                    action: "submit",
                });
            }
            state.topic = Some(topic.to_string());
            state.story = None;
            if missing_file {
                state.status = AppStatus::Error;
                state.error = Some(MISSING_FILE_MESSAGE.to_string());
                state.generation_id = None;
                Ok(None)
            } else {
                let id = Uuid::new_v4();
                state.status = AppStatus::Generating;
                state.error = None;
                state.generation_id = Some(id);
                Ok(Some(id))
            }
        })?;

        id.ok_or(ControllerError::MissingInput)
    }

    /// `generating → reading` on success, `generating → error` on failure.
    pub fn complete(
        &self,
        generation_id: Uuid,
        result: Result<Story, GenerationError>,
    ) -> Result<(), ControllerError> {
        let current = self.snapshot();
        if current.status != AppStatus::Generating || current.generation_id != Some(generation_id)
        {
            warn!(%generation_id, status = %current.status, "Dropping stale generation result");
            return Err(ControllerError::StaleGeneration(generation_id));
        }

        if let Err(e) = &result {
            error!(%generation_id, error = %e, "Story generation failed");
        }

        self.transition(move |state| {
            if state.status != AppStatus::Generating || state.generation_id != Some(generation_id)
            {
                return Err(ControllerError::StaleGeneration(generation_id));
            }
            match result {
                Ok(story) => {
                    state.status = AppStatus::Reading;
                    state.story = Some(story);
                    state.error = None;
                }
                Err(_) => {
                    state.status = AppStatus::Error;
                    state.story = None;
                    state.error = Some(STORY_FAILURE_MESSAGE.to_string());
                }
            }
            Ok(())
        })
    }

    /// `reading | error → idle`. Clears the story and every illustration.
    pub async fn reset(&self) -> Result<(), ControllerError> {
        let mut images = self.images.write().await;
        self.transition(|state| match state.status {
            AppStatus::Reading | AppStatus::Error => {
                *state = StoryState::idle();
                Ok(())
            }
            from => Err(ControllerError::InvalidTransition {
                from,
                action: "reset",
            }),
        })?;
        images.clear();
        Ok(())
    }

    /// The story being read and its generation id, or `InvalidTransition` outside `reading`.
    pub fn reading_story(&self, action: &'static str) -> Result<(Uuid, Story), ControllerError> {
        let state = self.state.borrow();
        match (&state.status, &state.story, state.generation_id) {
            (AppStatus::Reading, Some(story), Some(id)) => Ok((id, story.clone())),
            _ => Err(ControllerError::InvalidTransition {
                from: state.status,
                action,
            }),
        }
    }

    // ── Illustrations ────────────────────────────────────────────────────────

    pub async fn image(&self, slot: PageSlot) -> Option<ImagePayload> {
        self.images.read().await.get(slot).cloned()
    }

    pub async fn images_snapshot(&self) -> ImageMap {
        self.images.read().await.clone()
    }

    pub async fn illustrated_slots(&self) -> Vec<PageSlot> {
        self.images.read().await.slots().collect()
    }

    /// Stores an illustration if `generation_id` is still the story being read.
    pub async fn store_illustration(
        &self,
        generation_id: Uuid,
        slot: PageSlot,
        payload: ImagePayload,
    ) -> bool {
        let mut images = self.images.write().await;
        let current = self.state.borrow().generation_id;
        if current != Some(generation_id) {
            warn!(%generation_id, %slot, "Dropping illustration for a story that is gone");
            return false;
        }
        images.insert(slot, payload);
        true
    }

    /// Generates illustrations for `slots` (or every slot still missing when `None`).
    ///
    /// Slots without a usable prompt are reported as skipped. Failures are logged and
    /// reported per slot; they never abort the rest of the run.
    pub async fn illustrate(
        &self,
        generator: &dyn StoryGenerator,
        slots: Option<Vec<PageSlot>>,
        policy: &IllustrationPolicy,
    ) -> Result<IllustrationReport, ControllerError> {
        let (generation_id, story) = self.reading_story("illustrate")?;

        let targets = match slots {
            Some(slots) => slots,
            None => {
                let images = self.images.read().await;
                PageSlot::all().filter(|s| !images.contains(*s)).collect()
            }
        };

        let mut report = IllustrationReport::default();
        let mut candidates = Vec::new();
        for slot in targets {
            match slot_prompt(&story, slot) {
                Some(prompt) => candidates.push((slot, prompt)),
                None => report.skipped.push(slot),
            }
        }

        let mut claim = InFlightClaim {
            set: &self.in_flight,
            keys: Vec::new(),
        };
        let mut jobs = Vec::new();
        {
            let mut set = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            for (slot, prompt) in candidates {
                if set.insert((generation_id, slot)) {
                    claim.keys.push((generation_id, slot));
                    jobs.push((slot, prompt));
                } else {
                    report.in_progress.push(slot);
                }
            }
        }

        info!(
            %generation_id,
            jobs = jobs.len(),
            concurrency = policy.concurrency,
            "Generating illustrations"
        );

        let mut results = std::pin::pin!(illustration_stream(generator, jobs, policy));
        while let Some((slot, result)) = results.next().await {
            match result {
                Ok(payload) => {
                    if self.store_illustration(generation_id, slot, payload).await {
                        report.generated.push(slot);
                    } else {
                        report.failed.push(slot);
                    }
                }
                Err(e) => {
                    warn!(%slot, error = %e, "Illustration failed");
                    report.failed.push(slot);
                }
            }
        }

        drop(claim);

        report.generated.sort();
        report.failed.sort();
        info!(
            generated = report.generated.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            in_progress = report.in_progress.len(),
            "Illustrations settled"
        );
        Ok(report)
    }
}

/// Runs story text generation in the background and feeds the result back into the controller.
pub fn run_generation(
    controller: Arc<AppController>,
    generator: Arc<dyn StoryGenerator>,
    generation_id: Uuid,
    topic: String,
    file: SourceFile,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = generator.generate_story_text(&topic, &file).await;
        if let Err(e) = controller.complete(generation_id, result) {
            warn!(%generation_id, error = %e, "Generation result discarded");
        }
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
