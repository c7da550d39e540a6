/// Download filename for a story: every non-ASCII-alphanumeric character becomes `_`,
/// the result is lowercased, and `story` stands in when nothing but underscores remain.
pub fn story_filename(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if stem.chars().all(|c| c == '_') {
        "story.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}
