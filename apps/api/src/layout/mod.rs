// Document layout: Helvetica metrics, the fixed A4 page format, and the paginator.
// Layout is CPU-bound; async callers run it inside tokio::task::spawn_blocking.

pub mod font_metrics;
pub mod paginator;

// Re-export the public API consumed by other modules (export, handlers).
pub use font_metrics::{default_page_config, FontStyle, PageConfig};
pub use paginator::{layout_story, DocumentLayout, DrawOp, LaidOutPage, Rgb};
