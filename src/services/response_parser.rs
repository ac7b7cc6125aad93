//! Pulls a JSON object out of free-form model output.
//!
//! Models tend to wrap their answer in prose or markdown fences, so the text
//! is scanned for a balanced `{ ... }` span instead of being decoded whole.

use serde_json::{Map, Value};
use thiserror::Error;

pub type RawObject = Map<String, Value>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no JSON object found in model response")]
    NoJsonObject,

    #[error("invalid JSON in model response: {0}")]
    InvalidJson(String),
}

/// Return the first balanced `{...}` span in `text` that decodes as a JSON object.
pub fn extract_json(text: &str) -> Result<RawObject, ParseError> {
    let mut first_error: Option<String> = None;
    let mut saw_brace = false;

    for (start, _) in text.match_indices('{') {
        saw_brace = true;

        let Some(end) = balanced_end(&text[start..]) else {
            first_error.get_or_insert_with(|| "unterminated object".to_string());
            continue;
        };

        let candidate = &text[start..start + end];
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(object)) => return Ok(object),
            Ok(_) => unreachable!("a span starting with '{{' can only decode to an object"),
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    if !saw_brace {
        return Err(ParseError::NoJsonObject);
    }
    Err(ParseError::InvalidJson(
        first_error.unwrap_or_else(|| "unterminated object".to_string()),
    ))
}

/// Byte length of the object starting at `text[0] == '{'`, or `None` if it never closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}
