// crates/recipe-core/src/output_interpreter.rs
//! Best-effort extraction of JSON from free-form subprocess output.
//!
//! Agents are asked to answer with JSON but routinely wrap it in prose or in a
//! fenced code block. [`interpret`] tries, in order:
//!
//! 1. the whole trimmed text,
//! 2. fenced code blocks (`json`-tagged blocks first),
//! 3. a single embedded object or array found by balanced-bracket scanning.
//!
//! Anything else yields `None`, including ambiguous input.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

static FENCED_BLOCK: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?s)```([^\n`]*)\r?\n(.*?)```"));

/// Which strategy produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    WholeText,
    FencedBlock,
    EmbeddedValue,
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStrategy::WholeText => write!(f, "whole text"),
            ExtractionStrategy::FencedBlock => write!(f, "fenced code block"),
            ExtractionStrategy::EmbeddedValue => write!(f, "embedded value"),
        }
    }
}

/// Returns the structured value contained in `raw`, or `None`.
pub fn interpret(raw: &str) -> Option<Value> {
    interpret_with_strategy(raw).map(|(value, _)| value)
}

pub fn interpret_with_strategy(raw: &str) -> Option<(Value, ExtractionStrategy)> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some((value, ExtractionStrategy::WholeText));
    }

    if let Some(value) = from_fenced_blocks(text) {
        return Some((value, ExtractionStrategy::FencedBlock));
    }

    from_embedded_value(text).map(|value| (value, ExtractionStrategy::EmbeddedValue))
}

fn from_fenced_blocks(text: &str) -> Option<Value> {
    let pattern = match FENCED_BLOCK.as_ref() {
        Ok(pattern) => pattern,
        Err(e) => {
            debug!("Failed to create regex for fenced block parsing: {}", e);
            return None;
        }
    };

    let (tagged, other): (Vec<_>, Vec<_>) = pattern
        .captures_iter(text)
        .filter_map(|cap| {
            let info = cap.get(1)?.as_str().trim().to_ascii_lowercase();
            let body = cap.get(2)?.as_str();
            Some((info, body))
        })
        .partition(|(info, _)| info.starts_with("json"));

    tagged
        .into_iter()
        .chain(other)
        .find_map(|(_, body)| serde_json::from_str::<Value>(body.trim()).ok())
}

fn from_embedded_value(text: &str) -> Option<Value> {
    let candidates = embedded_candidates(text);
    match candidates.len() {
        0 => None,
        1 => candidates.into_iter().next(),
        count => {
            let mut objects = candidates.into_iter().filter(Value::is_object);
            match (objects.next(), objects.next()) {
                (Some(object), None) => Some(object),
                _ => {
                    debug!("Found {} embedded JSON values, refusing to pick one", count);
                    None
                }
            }
        }
    }
}

/// Top-level objects/arrays in `text` that parse as JSON, left to right.
fn embedded_candidates(text: &str) -> Vec<Value> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut index = 0;

    while index < bytes.len() {
        if matches!(bytes[index], b'{' | b'[') {
            if let Some(end) = balanced_end(bytes, index) {
                if let Ok(value) = serde_json::from_str::<Value>(&text[index..=end]) {
                    found.push(value);
                    index = end + 1;
                    continue;
                }
            }
        }
        index += 1;
    }

    found
}

/// Index of the bracket closing the one at `start`, honouring JSON string
/// literals. `None` when brackets are mismatched or never close.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut expected: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => expected.push(b'}'),
            b'[' => expected.push(b']'),
            b'}' | b']' => {
                if expected.pop() != Some(byte) {
                    return None;
                }
                if expected.is_empty() {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }

    None
}
