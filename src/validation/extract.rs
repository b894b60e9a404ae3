//! Locating the JSON payload inside free-form LLM output.
//!
//! Models wrap JSON in prose or code fences. The extractor finds the first
//! opener of the expected shape and walks to its balanced closer, skipping
//! brackets inside string literals.

use serde_json::Value;

use crate::validation::types::Span;

/// Top-level JSON shape a task expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Array,
    Object,
}

impl Shape {
    pub fn of(value: &Value) -> Option<Shape> {
        match value {
            Value::Array(_) => Some(Shape::Array),
            Value::Object(_) => Some(Shape::Object),
            _ => None,
        }
    }

    fn opener(self) -> char {
        match self {
            Shape::Array => '[',
            Shape::Object => '{',
        }
    }

    fn other(self) -> Shape {
        match self {
            Shape::Array => Shape::Object,
            Shape::Object => Shape::Array,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Shape::Array => "array",
            Shape::Object => "object",
        }
    }
}

/// A candidate JSON substring and where it sits in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extracted<'a> {
    pub json: &'a str,
    pub span: Span,
}

/// Find the first balanced JSON value, preferring `preferred`'s opener.
pub fn extract_json(text: &str, preferred: Shape) -> Option<Extracted<'_>> {
    extract_shape(text, preferred).or_else(|| extract_shape(text, preferred.other()))
}

fn extract_shape(text: &str, shape: Shape) -> Option<Extracted<'_>> {
    let start = text.find(shape.opener())?;
    let end = start + balanced_len(&text[start..])?;

    Some(Extracted {
        json: &text[start..end],
        span: Span { start, end },
    })
}

/// Byte length of the bracketed value at the start of `text`.
fn balanced_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
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
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
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
    fn test_strips_commentary() {
        let text = "Sure! Here are the gaps:\n```json\n[{\"a\": 1}]\n```\nLet me know.";
        let found = extract_json(text, Shape::Array).unwrap();

        assert_eq!(found.json, "[{\"a\": 1}]");
        assert_eq!(&text[found.span.start..found.span.end], found.json);
    }

    #[test]
    fn test_brackets_inside_strings() {
        let text = r#"{"title": "On [brackets] and {braces}", "note": "quote \" ]"} trailing"#;
        let found = extract_json(text, Shape::Object).unwrap();
        assert_eq!(found.json, r#"{"title": "On [brackets] and {braces}", "note": "quote \" ]"}"#);
    }

    #[test]
    fn test_falls_back_to_other_shape() {
        let found = extract_json("result: {\"gaps\": 3}", Shape::Array).unwrap();
        assert_eq!(found.json, "{\"gaps\": 3}");
    }

    #[test]
    fn test_unbalanced_or_missing() {
        assert!(extract_json("no json here", Shape::Array).is_none());
        assert!(extract_json("[{\"a\": 1}", Shape::Array).is_none());
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Résumé → [\"Lücke\"] ✓";
        let found = extract_json(text, Shape::Array).unwrap();
        assert_eq!(found.json, "[\"Lücke\"]");
    }
}
