use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::{PlannerError, Result};

/// A string literal, or a comma right before a closing bracket.
///
/// String literals are matched first so commas inside them are never touched.
fn trailing_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""(?:[^"\\]|\\.)*"|,\s*([\]}])"#).expect("trailing comma pattern")
    })
}

fn drop_trailing_commas(text: &str) -> std::borrow::Cow<'_, str> {
    trailing_comma().replace_all(text, |caps: &Captures| match caps.get(1) {
        Some(bracket) => bracket.as_str().to_string(),
        None => caps[0].to_string(),
    })
}

/// Extract a JSON object from raw model text.
///
/// Tolerates markdown code fences (with or without a language tag), prose
/// around the object and trailing commas before closing brackets.
pub fn parse_structured(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let unfenced = strip_code_fence(trimmed);
    let candidate = extract_object(unfenced).ok_or_else(|| {
        PlannerError::Format(format!(
            "no JSON object found in response: {}",
            preview(trimmed)
        ))
    })?;

    let repaired = drop_trailing_commas(candidate);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(PlannerError::Format(
            "response JSON is not an object".to_string(),
        )),
        Err(err) => Err(PlannerError::Format(format!(
            "response JSON could not be repaired: {err}"
        ))),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_open = &text[open + 3..];
    // A language tag runs to the end of the fence line.
    let body_start = match after_open.find('\n') {
        Some(newline) if !after_open[..newline].trim_start().starts_with('{') => newline + 1,
        _ => 0,
    };
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(80).collect();
    if text.chars().count() > 80 {
        preview.push_str("...");
    }
    preview
}
