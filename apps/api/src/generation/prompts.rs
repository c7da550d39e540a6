//! Prompt constants for story and illustration generation.
//!
//! The story prompt is paired with the structured-output schema in `story::schema`;
//! the JSON sketch below only guides tone and length, the schema enforces shape.

/// Sent right after the inline source file.
pub const SOURCE_GROUNDING_INSTRUCTION: &str =
    "Primary Source Material: Analyze this attached file to derive the setting, characters, and tone.";

pub const STORY_PROMPT_TEMPLATE: &str = "\
You are a master novelist and world-builder.\n\
Create a comprehensive story bible and a short story based on the user's topic: \"{topic}\".\n\
\n\
Requirements:\n\
1. World Building: Expand on the world details. Describe the primary setting's geography and \
atmosphere. Detail relevant cultural aspects, societal norms, and unique elements that influence the plot.\n\
2. Characters: Create 2-3 main characters. Include name, detailed physical description, key \
personality traits, and a brief backstory for each.\n\
3. Plot Outline: Break down the story arc into exactly 5 key plot points in this order: \
Inciting Incident, Rising Action, Climax, Falling Action, Resolution. Assign each to a chapter \
(chapterIndex 0 to 4).\n\
4. Story: Write 5 chapters. Each chapter must correspond strictly to its assigned plot point \
from the outline.\n\
5. Ending: Close with one emotional summary paragraph.\n\
\n\
Output MUST be a valid JSON object matching this structure:\n\
{\n\
  \"title\": \"Story Title\",\n\
  \"world\": {\n\
    \"geography\": \"Detailed description of the physical setting\",\n\
    \"atmosphere\": \"Mood and sensory details\",\n\
    \"culture\": \"Societal norms, customs, and unique elements\"\n\
  },\n\
  \"characters\": [\n\
    { \"name\": \"Name\", \"description\": \"Visuals\", \"traits\": \"Personality\", \"backstory\": \"History\" }\n\
  ],\n\
  \"plotOutline\": [\n\
    { \"chapterIndex\": 0, \"type\": \"Inciting Incident\", \"description\": \"Summary of this plot point\" }\n\
  ],\n\
  \"chapters\": [\n\
    {\n\
      \"title\": \"Chapter Title\",\n\
      \"content\": \"Story text (approx 150 words)\",\n\
      \"imagePrompt\": \"Pixar-style 3D illustration prompt\",\n\
      \"plotType\": \"Inciting Incident\"\n\
    }\n\
  ],\n\
  \"ending\": \"Emotional summary paragraph\"\n\
}";

/// Appended to every illustration prompt.
pub const ILLUSTRATION_STYLE_SUFFIX: &str =
    " High quality, 3d render, pixar style, bright colors, volumetric lighting, detailed textures.";

/// Matches the fixed 120 × 90 mm image box in the document layout.
pub const ILLUSTRATION_ASPECT_RATIO: &str = "4:3";

pub const COVER_PROMPT_TEMPLATE: &str =
    "Storybook cover illustration for \"{title}\". Setting mood: {atmosphere}";
pub const WORLD_PROMPT_TEMPLATE: &str = "Wide establishing shot of a story world. {geography} {atmosphere}";
pub const CHARACTERS_PROMPT_TEMPLATE: &str = "Group portrait of the main characters: {characters}";
pub const ENDING_PROMPT_TEMPLATE: &str = "Closing scene of a storybook: {ending}";

pub fn build_story_prompt(topic: &str) -> String {
    STORY_PROMPT_TEMPLATE.replace("{topic}", topic.trim())
}

pub fn decorate_illustration_prompt(prompt: &str) -> String {
    format!("{}{}", prompt.trim(), ILLUSTRATION_STYLE_SUFFIX)
}
