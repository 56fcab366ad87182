//! Lenient parsing of model output that is supposed to be JSON
//!
//! Models wrap JSON in markdown fences, prepend chatter, use single quotes,
//! Python literals and trailing commas, or simply stop mid-object when they
//! hit a token limit. [`parse_lenient`] tolerates all of those.

use serde_json::Value;

/// Parse `raw` as JSON, repairing common syntax damage first if needed.
///
/// Returns `None` when nothing JSON-shaped can be recovered.
pub fn parse_lenient(raw: &str) -> Option<Value> {
    let candidate = extract_json_block(raw);
    if candidate.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Some(value);
    }
    serde_json::from_str::<Value>(&repair_json(candidate)).ok()
}

/// Locate the JSON payload inside a model response.
fn extract_json_block(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = start + 3;
        // Skip the language identifier if present (e.g., "json\n")
        let content_start = trimmed[after_fence..]
            .find('\n')
            .map(|i| after_fence + i + 1)
            .unwrap_or(after_fence);
        let body = &trimmed[content_start..];
        return match body.find("```") {
            Some(end) => body[..end].trim(),
            None => body.trim(),
        };
    }

    let object = trimmed.find('{');
    let array = trimmed.find('[');
    let (start, closer) = match (object, array) {
        (Some(o), Some(a)) if a < o => (a, ']'),
        (Some(o), _) => (o, '}'),
        (None, Some(a)) => (a, ']'),
        (None, None) => return trimmed,
    };

    match trimmed.rfind(closer) {
        Some(end) if end > start => &trimmed[start..=end],
        // Truncated output: keep everything from the opener and let repair close it
        _ => &trimmed[start..],
    }
}

/// Rewrite almost-JSON into JSON.
///
/// Handles single-quoted strings, raw control characters inside strings,
/// `True`/`False`/`None`, trailing commas, mismatched closers and
/// unterminated strings or containers.
pub fn repair_json(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = quote {
            if escaped {
                if c == '\'' {
                    // JSON has no \' escape
                    out.pop();
                }
                out.push(c);
                escaped = false;
            } else if c == '\\' {
                out.push(c);
                escaped = true;
            } else if c == q {
                out.push('"');
                quote = None;
            } else {
                match c {
                    '"' => out.push_str("\\\""),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    _ => out.push(c),
                }
            }
            i += 1;
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push('"');
            }
            '{' => {
                closers.push('}');
                out.push(c);
            }
            '[' => {
                closers.push(']');
                out.push(c);
            }
            '}' | ']' => {
                if closers.contains(&c) {
                    while let Some(expected) = closers.pop() {
                        trim_dangling(&mut out);
                        out.push(expected);
                        if expected == c {
                            break;
                        }
                    }
                }
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    other => other,
                });
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }

    if quote.is_some() {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    while let Some(expected) = closers.pop() {
        trim_dangling(&mut out);
        out.push(expected);
    }

    out
}

/// Drop a trailing comma and complete a dangling `key:` before a closer.
fn trim_dangling(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    if out.ends_with(',') {
        out.pop();
    } else if out.ends_with(':') {
        out.push_str("null");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_json_passes_through() {
        let value = parse_lenient(r#"{"relevance": 8, "excerpts": ["a"]}"#).unwrap();
        assert_eq!(value, json!({"relevance": 8, "excerpts": ["a"]}));
    }

    #[test]
    fn test_code_fence_and_chatter() {
        let raw = "Sure! Here is the analysis:\n```json\n{\"relevance\": 6}\n```\nHope it helps.";
        assert_eq!(parse_lenient(raw).unwrap(), json!({"relevance": 6}));
    }

    #[test]
    fn test_leading_prose_without_fence() {
        let raw = "The answer is {\"search_keywords\": [\"rust\"]} as requested";
        assert_eq!(
            parse_lenient(raw).unwrap(),
            json!({"search_keywords": ["rust"]})
        );
    }

    #[test]
    fn test_trailing_commas() {
        let raw = r#"{"links": ["https://a.example", "https://b.example",], "score": 3,}"#;
        assert_eq!(
            parse_lenient(raw).unwrap(),
            json!({"links": ["https://a.example", "https://b.example"], "score": 3})
        );
    }

    #[test]
    fn test_single_quotes_and_python_literals() {
        let raw = "{'relevant': True, 'note': None, 'quote': 'he said \"hi\"', 'skip': False}";
        assert_eq!(
            parse_lenient(raw).unwrap(),
            json!({"relevant": true, "note": null, "quote": "he said \"hi\"", "skip": false})
        );
    }

    #[test]
    fn test_truncated_object_is_closed() {
        let raw = r#"{"excerpts": ["first passage", "second pass"#;
        assert_eq!(
            parse_lenient(raw).unwrap(),
            json!({"excerpts": ["first passage", "second pass"]})
        );
    }

    #[test]
    fn test_dangling_key() {
        let raw = r#"{"relevance": 7, "follow_up_links":"#;
        assert_eq!(
            parse_lenient(raw).unwrap(),
            json!({"relevance": 7, "follow_up_links": null})
        );
    }

    #[test]
    fn test_raw_newline_in_string() {
        let raw = "{\"excerpts\": [\"line one\nline two\"]}";
        assert_eq!(
            parse_lenient(raw).unwrap(),
            json!({"excerpts": ["line one\nline two"]})
        );
    }

    #[test]
    fn test_prose_only_is_none() {
        assert!(parse_lenient("I could not find anything relevant.").is_none());
        assert!(parse_lenient("   ").is_none());
    }

    #[test]
    fn test_top_level_array() {
        assert_eq!(parse_lenient("result: [1, 2, 3]").unwrap(), json!([1, 2, 3]));
    }
}
