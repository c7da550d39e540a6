//! Structured-output schema sent with every story request.
//!
//! Mirrors `models::Story` field for field. Every property is listed in `required`
//! so the upstream service never returns a partially-shaped object.

use serde_json::{json, Value};

use crate::story::models::PlotType;

/// Response schema for the text-generation call (Gemini `responseSchema` dialect).
pub fn story_response_schema() -> Value {
    let plot_labels: Vec<&str> = PlotType::ORDER.iter().map(|t| t.label()).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "world": {
                "type": "OBJECT",
                "properties": {
                    "geography": { "type": "STRING" },
                    "atmosphere": { "type": "STRING" },
                    "culture": { "type": "STRING" }
                },
                "required": ["geography", "atmosphere", "culture"]
            },
            "characters": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "traits": { "type": "STRING" },
                        "backstory": { "type": "STRING" }
                    },
                    "required": ["name", "description", "traits", "backstory"]
                }
            },
            "plotOutline": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "chapterIndex": { "type": "INTEGER" },
                        "type": { "type": "STRING", "enum": plot_labels },
                        "description": { "type": "STRING" }
                    },
                    "required": ["chapterIndex", "type", "description"]
                }
            },
            "chapters": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "content": { "type": "STRING" },
                        "imagePrompt": { "type": "STRING" },
                        "plotType": { "type": "STRING", "enum": plot_labels }
                    },
                    "required": ["title", "content", "imagePrompt", "plotType"]
                }
            },
            "ending": { "type": "STRING" }
        },
        "required": ["title", "world", "characters", "plotOutline", "chapters", "ending"]
    })
}
