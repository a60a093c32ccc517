//! JSON extraction from free-form model output.
//!
//! Generative models wrap their JSON in prose, markdown fences, or trailing
//! commentary. [`extract_json_object`] pulls out the first balanced top-level
//! object so parsing is decoupled from prompt construction and from the
//! fallback-template logic.

/// Return the first balanced `{...}` substring, tracking string literals and
/// escapes so braces inside strings don't unbalance the scan. `None` when no
/// complete object exists.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
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
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extract and parse a JSON object from model text in one step.
pub fn parse_json_object<T: serde::de::DeserializeOwned>(text: &str) -> Option<T> {
    let block = extract_json_object(text)?;
    serde_json::from_str(block).ok()
}
