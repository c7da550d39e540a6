use std::sync::Arc;

use crate::config::Config;
use crate::controller::AppController;
use crate::generation::{IllustrationPolicy, StoryGenerator};
use crate::layout::{default_page_config, PageConfig};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Process-local story session. There is exactly one per server.
    pub controller: Arc<AppController>,
    /// Pluggable generator. Default: GeminiStoryGenerator; tests use a scripted one.
    pub generator: Arc<dyn StoryGenerator>,
    pub config: Config,
    pub illustration_policy: IllustrationPolicy,
    /// Fixed A4 page format used by layout and export.
    pub page_config: PageConfig,
}

impl AppState {
    pub fn new(config: Config, generator: Arc<dyn StoryGenerator>) -> Self {
        Self {
            controller: Arc::new(AppController::new()),
            generator,
            illustration_policy: config.illustration_policy(),
            page_config: default_page_config(),
            config,
        }
    }
}
