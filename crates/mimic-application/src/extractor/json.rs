//! Recovering a JSON object from free-form model output.

use serde_json::Value;

/// Removes a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json", "JSON", ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Returns the outermost `{ ... }` span, honouring strings and escapes.
pub fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    // Unbalanced: fall back to the last closing brace.
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parses the first JSON object found in `text`. `None` when nothing parses.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let body = strip_code_fences(text);
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(body) {
        return Some(value);
    }
    let candidate = outermost_object(body)?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json() {
        let text = "```json\n{\"name\": \"Sam\"}\n```";
        assert_eq!(strip_code_fences(text), "{\"name\": \"Sam\"}");
        assert_eq!(extract_json_object(text).unwrap()["name"], "Sam");
    }

    #[test]
    fn test_prose_around_object() {
        let text = "Sure! Here is the analysis:\n{\"a\": {\"b\": \"} tricky {\"}, \"c\": 1}\nHope it helps.";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["a"]["b"], "} tricky {");
        assert_eq!(value["c"], 1);
    }

    #[test]
    fn test_escaped_quotes() {
        let text = r#"{"quote": "she said \"hi {\" loudly"} trailing"#;
        assert_eq!(
            outermost_object(text),
            Some(r#"{"quote": "she said \"hi {\" loudly"}"#)
        );
    }

    #[test]
    fn test_garbage_yields_none() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("[1, 2, 3]").is_none());
        assert!(extract_json_object("{ not: valid }").is_none());
        assert!(extract_json_object("").is_none());
    }
}
