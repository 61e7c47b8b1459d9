//! Tolerant parsing of classifier output
//!
//! Model replies are parsed through a cascade: strict JSON, then the first
//! bracketed block, then the same after cleaning up common mistakes (code
//! fences, trailing commas, unquoted keys). Whatever survives is matched back
//! to the requested words; any word left without a usable entry gets the
//! rule-based fallback. Nothing here can fail.

use super::rubric::fallback_judgment;
use crate::models::{ClassifierJudgment, WordContext, MIDPOINT_DIFFICULTY};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

const LEVEL_KEYS: [&str; 4] = ["difficulty_level", "difficultyLevel", "difficulty", "level"];
const LIST_KEYS: [&str; 5] = ["words", "results", "judgments", "data", "items"];
const DEFAULT_CONFIDENCE: f32 = 0.5;

fn block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]|\{.*\}").expect("valid regex"))
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[A-Za-z]*").expect("valid regex"))
}

fn trailing_comma_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid regex"))
}

fn bare_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("valid regex"))
}

/// First `{...}` or `[...]` span, greedy to the last matching closer
fn extract_block(text: &str) -> Option<&str> {
    block_regex().find(text).map(|m| m.as_str())
}

fn cleanup(text: &str) -> String {
    let without_fences = fence_regex().replace_all(text, "");
    let without_commas = trailing_comma_regex().replace_all(&without_fences, "$1");
    bare_key_regex().replace_all(&without_commas, "$1\"$2\":").into_owned()
}

/// Parse model output into JSON, or `None` when every stage fails
pub fn parse_json_tolerant(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(block) = extract_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(block) {
            return Some(value);
        }
    }

    let cleaned = cleanup(trimmed);
    let candidate = extract_block(&cleaned).unwrap_or(&cleaned);
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "Classifier output unparsable after cleanup");
            None
        }
    }
}

/// Judgments for `words`, in the same order, from a batch reply
pub fn parse_batch(raw: &str, words: &[WordContext]) -> Vec<ClassifierJudgment> {
    let Some(value) = parse_json_tolerant(raw) else {
        return words.iter().map(|w| fallback_judgment(&w.word)).collect();
    };

    let entries = entries(&value);
    let mut assigned: Vec<Option<&Value>> = vec![None; words.len()];

    // Entries naming their word are matched by identity
    for (name, body) in &entries {
        let Some(name) = name else { continue };
        if let Some(i) = words.iter().position(|w| w.word == *name) {
            if assigned[i].is_none() {
                assigned[i] = Some(*body);
            }
        }
    }

    // Anonymous entries only count when their position is unambiguous
    let has_anonymous = entries.iter().any(|(name, _)| name.is_none());
    if has_anonymous && (entries.len() == words.len() || words.len() == 1) {
        for (i, (name, body)) in entries.iter().enumerate() {
            if name.is_none() && i < words.len() && assigned[i].is_none() {
                assigned[i] = Some(*body);
            }
        }
    }

    words
        .iter()
        .zip(assigned)
        .map(|(context, body)| match body {
            Some(body) => judgment_from(&context.word, body),
            None => fallback_judgment(&context.word),
        })
        .collect()
}

/// Judgment for a single word from a single-word reply
pub fn parse_single(raw: &str, word: &str) -> ClassifierJudgment {
    parse_batch(raw, &[WordContext::new(word)])
        .into_iter()
        .next()
        .unwrap_or_else(|| fallback_judgment(word))
}

/// Flatten any accepted reply shape into (word?, body) pairs
fn entries(value: &Value) -> Vec<(Option<String>, &Value)> {
    match value {
        Value::Array(items) => items.iter().map(|item| (word_of(item), item)).collect(),
        Value::Object(map) => {
            if let Some(items) =
                LIST_KEYS.iter().find_map(|k| map.get(*k).and_then(Value::as_array))
            {
                return items.iter().map(|item| (word_of(item), item)).collect();
            }
            if map.contains_key("word") || LEVEL_KEYS.iter().any(|k| map.contains_key(*k)) {
                return vec![(word_of(value), value)];
            }
            // {"cat": {...}, "dog": 3}
            map.iter().map(|(k, v)| (Some(k.trim().to_lowercase()), v)).collect()
        }
        Value::Number(_) | Value::String(_) => vec![(None, value)],
        _ => Vec::new(),
    }
}

fn word_of(value: &Value) -> Option<String> {
    value
        .get("word")
        .and_then(Value::as_str)
        .map(|w| w.trim().to_lowercase())
}

fn judgment_from(word: &str, body: &Value) -> ClassifierJudgment {
    let Some(map) = body.as_object() else {
        return ClassifierJudgment::from_model(word, level_from(Some(body)), DEFAULT_CONFIDENCE, "");
    };

    let level = level_from(LEVEL_KEYS.iter().find_map(|k| map.get(*k)));
    let confidence = map
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c as f32)
        .unwrap_or(DEFAULT_CONFIDENCE);
    let reasoning = text_field(map, &["reasoning", "reason"]).unwrap_or_default();

    let mut judgment = ClassifierJudgment::from_model(word, level, confidence, reasoning);
    judgment.translation = text_field(map, &["translation"]);
    judgment.phonetic = text_field(map, &["phonetic"]);
    judgment.part_of_speech = text_field(map, &["part_of_speech", "partOfSpeech", "pos"]);
    judgment
}

/// Numeric level, or the midpoint when missing or non-numeric; clamping is left to the caller
fn level_from(value: Option<&Value>) -> i64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        _ => None,
    };
    parsed.unwrap_or(MIDPOINT_DIFFICULTY as i64)
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
