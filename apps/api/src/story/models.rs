//! Story data model — the story bible (world, characters, plot outline) plus prose.
//!
//! Wire format is camelCase JSON, matching the structured-output schema in `schema.rs`.
//! All types are plain data; invariants are enforced by `validation::validate_story`.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

// ────────────────────────────────────────────────────────────────────────────
// Story bible
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldBuilding {
    pub geography: String,
    pub atmosphere: String,
    pub culture: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub name: String,
    /// Physical description, rendered in italics under the name.
    pub description: String,
    pub traits: String,
    pub backstory: String,
}

/// One beat of the five-act structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotType {
    IncitingIncident,
    RisingAction,
    Climax,
    FallingAction,
    Resolution,
}

impl PlotType {
    /// The fixed order every plot outline must follow.
    pub const ORDER: [PlotType; 5] = [
        PlotType::IncitingIncident,
        PlotType::RisingAction,
        PlotType::Climax,
        PlotType::FallingAction,
        PlotType::Resolution,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PlotType::IncitingIncident => "Inciting Incident",
            PlotType::RisingAction => "Rising Action",
            PlotType::Climax => "Climax",
            PlotType::FallingAction => "Falling Action",
            PlotType::Resolution => "Resolution",
        }
    }

    /// Parses a plot label leniently: case, separators and a leading "The " are ignored.
    ///
    /// `"Inciting Incident"`, `"inciting_incident"` and `"The Climax"` all parse;
    /// anything that does not name one of the five beats returns `None`.
    pub fn parse_label(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        let without_article = lowered.strip_prefix("the ").unwrap_or(&lowered);
        let key: String = without_article
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match key.as_str() {
            "incitingincident" => Some(PlotType::IncitingIncident),
            "risingaction" => Some(PlotType::RisingAction),
            "climax" => Some(PlotType::Climax),
            "fallingaction" => Some(PlotType::FallingAction),
            "resolution" => Some(PlotType::Resolution),
            _ => None,
        }
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for PlotType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for PlotType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PlotType::parse_label(&raw)
            .ok_or_else(|| de::Error::custom(format!("unknown plot type '{raw}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotPoint {
    #[serde(deserialize_with = "deserialize_chapter_index")]
    pub chapter_index: u32,
    #[serde(rename = "type")]
    pub plot_type: PlotType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: String,
    pub content: String,
    pub image_prompt: String,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_plot_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub plot_type: Option<PlotType>,
}

/// A complete generated story. Never constructed partially: either the whole
/// upstream response parses and validates, or no `Story` exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub title: String,
    pub world: WorldBuilding,
    pub characters: Vec<CharacterProfile>,
    pub plot_outline: Vec<PlotPoint>,
    pub chapters: Vec<Chapter>,
    pub ending: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient field decoders
// ────────────────────────────────────────────────────────────────────────────

/// Structured output declares `chapterIndex` as a number, which may arrive as `2.0`.
/// Integral non-negative values are accepted; anything else is a parse error.
fn deserialize_chapter_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;

    if let Some(n) = number.as_u64() {
        return u32::try_from(n).map_err(|_| de::Error::custom("chapterIndex out of range"));
    }

    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        _ => Err(de::Error::custom(format!(
            "chapterIndex must be a non-negative integer, got {number}"
        ))),
    }
}

/// `plotType` is optional; an explicit `null` or empty string means "not given".
fn deserialize_optional_plot_type<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<PlotType>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => PlotType::parse_label(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("unknown plot type '{s}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_accepts_variants() {
        assert_eq!(
            PlotType::parse_label("Inciting Incident"),
            Some(PlotType::IncitingIncident)
        );
        assert_eq!(
            PlotType::parse_label("rising_action"),
            Some(PlotType::RisingAction)
        );
        assert_eq!(PlotType::parse_label("The Climax"), Some(PlotType::Climax));
        assert_eq!(
            PlotType::parse_label("  FALLING-ACTION "),
            Some(PlotType::FallingAction)
        );
        assert_eq!(PlotType::parse_label("Denouement"), None);
    }

    #[test]
    fn test_plot_type_serializes_as_label() {
        let json = serde_json::to_string(&PlotType::FallingAction).unwrap();
        assert_eq!(json, "\"Falling Action\"");
    }

    #[test]
    fn test_plot_point_accepts_integral_float_index() {
        let raw = r#"{"chapterIndex": 2.0, "type": "Climax", "description": "Boom"}"#;
        let point: PlotPoint = serde_json::from_str(raw).unwrap();
        assert_eq!(point.chapter_index, 2);
        assert_eq!(point.plot_type, PlotType::Climax);
    }

    #[test]
    fn test_plot_point_rejects_fractional_index() {
        let raw = r#"{"chapterIndex": 1.5, "type": "Climax", "description": "Boom"}"#;
        assert!(serde_json::from_str::<PlotPoint>(raw).is_err());
    }

    #[test]
    fn test_plot_point_rejects_negative_index() {
        let raw = r#"{"chapterIndex": -1, "type": "Climax", "description": "Boom"}"#;
        assert!(serde_json::from_str::<PlotPoint>(raw).is_err());
    }

    #[test]
    fn test_chapter_plot_type_empty_string_is_none() {
        let raw = r#"{"title": "T", "content": "C", "imagePrompt": "P", "plotType": ""}"#;
        let chapter: Chapter = serde_json::from_str(raw).unwrap();
        assert_eq!(chapter.plot_type, None);
    }

    #[test]
    fn test_chapter_plot_type_missing_is_none() {
        let raw = r#"{"title": "T", "content": "C", "imagePrompt": "P"}"#;
        let chapter: Chapter = serde_json::from_str(raw).unwrap();
        assert_eq!(chapter.plot_type, None);
    }

    #[test]
    fn test_chapter_requires_image_prompt_field() {
        let raw = r#"{"title": "T", "content": "C"}"#;
        assert!(serde_json::from_str::<Chapter>(raw).is_err());
    }
}
