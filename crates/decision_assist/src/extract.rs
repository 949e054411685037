//! JSON extraction from free-form model output
//!
//! The service wraps its verdict in prose, markdown fences, or both. We take
//! the first balanced `{...}` object in the reply and parse only that.

/// Returns the first balanced JSON object in `text`, if any
///
/// Brace counting respects string literals and escapes, so braces inside a
/// quoted reason do not unbalance the scan. An object that opens but never
/// closes yields `None`.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_object() {
        assert_eq!(
            first_json_object(r#"{"status": "approved"}"#),
            Some(r#"{"status": "approved"}"#)
        );
    }

    #[test]
    fn extracts_from_surrounding_prose() {
        let reply = "Here is my assessment:\n```json\n{\"status\": \"pending\", \"reason\": \"needs records\"}\n```\nLet me know.";
        assert_eq!(
            first_json_object(reply),
            Some(r#"{"status": "pending", "reason": "needs records"}"#)
        );
    }

    #[test]
    fn handles_nested_objects_and_braced_strings() {
        let reply = r#"{"status": "rejected", "detail": {"note": "risk {high}"}} trailing"#;
        assert_eq!(
            first_json_object(reply),
            Some(r#"{"status": "rejected", "detail": {"note": "risk {high}"}}"#)
        );
    }

    #[test]
    fn unclosed_object_yields_none() {
        assert_eq!(first_json_object(r#"{"status": "approved""#), None);
        assert_eq!(first_json_object("no json here"), None);
    }
}
