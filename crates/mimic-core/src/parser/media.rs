//! Media placeholder recognition.

const PLACEHOLDERS: &[&str] = &[
    "<media omitted>",
    "<medien ausgeschlossen>",
    "<multimedia omitido>",
    "<médias omis>",
    "image omitted",
    "video omitted",
    "audio omitted",
    "sticker omitted",
    "gif omitted",
    "document omitted",
    "contact card omitted",
    "bild weggelassen",
    "imagen omitida",
];

/// Whether `content` is an export's stand-in for an attachment.
pub fn is_placeholder(content: &str) -> bool {
    let normalized = content
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '\u{200e}' | '\u{200f}'))
        .to_lowercase();
    if normalized.starts_with("<attached:") && normalized.ends_with('>') {
        return true;
    }
    PLACEHOLDERS.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_placeholders() {
        assert!(is_placeholder("<Media omitted>"));
        assert!(is_placeholder("\u{200e}image omitted"));
        assert!(is_placeholder("<attached: 00000012-PHOTO-2023-01-01-09-00-00.jpg>"));
        assert!(is_placeholder("<Medien ausgeschlossen>"));
    }

    #[test]
    fn test_regular_text_is_not_media() {
        assert!(!is_placeholder("I omitted the image on purpose"));
        assert!(!is_placeholder("media"));
    }
}
