use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolCallerError;

/// A tool invocation recovered from model output, not yet validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCall {
    /// Name of the tool to call
    pub name: String,
    /// Raw arguments exactly as the model wrote them
    #[serde(rename = "parameters", default)]
    pub arguments: Map<String, Value>,
}

impl ParsedCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Extract a tool call embedded in free-form model output.
///
/// Looks for a JSON object of the form
/// ```json
/// {"name": "get_current_weather", "parameters": {"location": "Paris"}}
/// ```
/// anywhere in `text`; prose before or after it is ignored. Returns `None`
/// when the model did not call a tool, including when the embedded object is
/// malformed.
pub fn extract_call(text: &str) -> Option<ParsedCall> {
    extract_call_strict(text).ok().flatten()
}

/// Like [`extract_call`], but reports a call-shaped object that cannot be
/// used as [`ToolCallerError::MalformedCall`].
///
/// `Ok(None)` still means no call was attempted.
pub fn extract_call_strict(text: &str) -> Result<Option<ParsedCall>, ToolCallerError> {
    match scan(text) {
        Scan::Object(object) => parse_call(object).map(Some),
        Scan::Malformed(reason) => Err(ToolCallerError::MalformedCall(reason)),
        Scan::Nothing => Ok(None),
    }
}

enum Scan {
    Object(Map<String, Value>),
    Malformed(String),
    Nothing,
}

const NAME_KEY: &str = "\"name\"";

/// Find the leftmost balanced `{...}` span that parses as a JSON object.
///
/// Balanced spans that are not valid JSON (prose such as "use {braces}") are
/// skipped. They only count as malformed when they mention a `"name"` key.
fn scan(text: &str) -> Scan {
    let spans = brace_spans(text);
    let names: Vec<usize> = text.match_indices(NAME_KEY).map(|(i, _)| i).collect();
    let mentions_name = |from: usize, to: usize| {
        let first = names.partition_point(|&i| i < from);
        names.get(first).is_some_and(|&i| i < to)
    };

    let mut malformed = None;
    for &(open, close) in &spans.pairs {
        match serde_json::from_str::<Value>(&text[open..close]) {
            Ok(Value::Object(object)) => return Scan::Object(object),
            Ok(_) => {}
            Err(e) => {
                if malformed.is_none() && mentions_name(open, close) {
                    malformed = Some(format!("invalid JSON in call object: {}", e));
                }
            }
        }
    }

    if malformed.is_none() {
        if let Some(open) = spans.unterminated {
            if mentions_name(open, text.len()) {
                malformed = Some("unterminated call object".to_string());
            }
        }
    }

    malformed.map_or(Scan::Nothing, Scan::Malformed)
}

/// Brace structure of a text, found in a single pass
struct BraceSpans {
    /// Matched `{...}` spans as byte ranges, ordered by opening offset
    pairs: Vec<(usize, usize)>,
    /// Offset of the outermost `{` left open at the end of the text
    unterminated: Option<usize>,
}

/// Pair braces with a stack. Inside an open brace, JSON string literals and
/// their escapes are skipped so quoted braces do not count.
fn brace_spans(text: &str) -> BraceSpans {
    let mut stack = Vec::new();
    let mut pairs = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    // Delimiters are ASCII, so scanning bytes never splits a char boundary
    for (i, b) in text.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' if !stack.is_empty() => in_string = true,
            b'{' => stack.push(i),
            b'}' => {
                if let Some(open) = stack.pop() {
                    pairs.push((open, i + 1));
                }
            }
            _ => {}
        }
    }

    pairs.sort_unstable_by_key(|&(open, _)| open);
    BraceSpans {
        pairs,
        unterminated: stack.first().copied(),
    }
}

fn parse_call(mut object: Map<String, Value>) -> Result<ParsedCall, ToolCallerError> {
    let name = match object.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        Some(_) => {
            return Err(ToolCallerError::MalformedCall(
                "'name' must be a non-empty string".to_string(),
            ));
        }
        None => {
            return Err(ToolCallerError::MalformedCall(
                "missing 'name' field".to_string(),
            ));
        }
    };

    let arguments = match object.remove("parameters") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(arguments)) => arguments,
        Some(_) => {
            return Err(ToolCallerError::MalformedCall(format!(
                "'parameters' for '{}' must be an object",
                name
            )));
        }
    };

    Ok(ParsedCall { name, arguments })
}
