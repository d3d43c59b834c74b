//! Answer extraction and synthesis.
//!
//! Upstream results are inconsistent: the answer may be a plain string, a
//! JSON-encoded string, an object with any of several well-known keys, or
//! missing entirely with everything of value buried in the reasoning tree.
//! This module always produces a displayable answer string plus the
//! assembled reasoning tasks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::tree::{self, ReasoningTask};

const ANSWER_KEYS: &[&str] = &[
    "final_answer",
    "answer",
    "response",
    "result",
    "content",
    "conclusion",
    "summary",
    "output",
];

const SYNTHESIS_TITLE_MARKERS: &[&str] = &["final", "summary", "synthesis", "conclusion", "report"];

static TRUNCATED_ANSWER: Lazy<Regex> = Lazy::new(|| {
    // Salvages the leading answer text out of a truncated JSON object.
    Regex::new(r#""(?:final_answer|answer|response|conclusion)"\s*:\s*"((?:[^"\\]|\\.)*)"#)
        .unwrap()
});

/// Extract the answer string and reasoning tasks from a run result.
pub fn extract_answer(
    answer: Option<&Value>,
    reasoning: Option<&Value>,
) -> (String, Vec<ReasoningTask>) {
    let tasks = tree::assemble(reasoning);

    let text = match answer {
        Some(Value::String(s)) => answer_from_string(s, &tasks),
        Some(value @ (Value::Object(_) | Value::Array(_))) => answer_from_value(value, &tasks),
        Some(other) => Some(other.to_string()),
        None => None,
    };

    let text = text
        .or_else(|| synthesize_from_reasoning(&tasks))
        .unwrap_or_else(|| {
            if tasks.is_empty() {
                "The research run completed but returned no readable answer.".to_string()
            } else {
                "The research run completed without a final summary. \
                 See the reasoning steps for the findings."
                    .to_string()
            }
        });

    (text, tasks)
}

fn answer_from_string(s: &str, tasks: &[ReasoningTask]) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    // A JSON-encoded answer often hides the real text one level down.
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return answer_from_value(&value, tasks);
        }
        // Truncated JSON blobs still frequently contain the full answer text.
        if let Some(caps) = TRUNCATED_ANSWER.captures(trimmed) {
            let salvaged = unescape_json_fragment(&caps[1]);
            if salvaged.trim().len() > 50 {
                return Some(salvaged);
            }
        }
        return None;
    }
    Some(trimmed.to_string())
}

fn answer_from_value(value: &Value, tasks: &[ReasoningTask]) -> Option<String> {
    match value {
        Value::String(s) => answer_from_string(s, tasks),
        Value::Object(obj) => {
            for key in ANSWER_KEYS {
                if let Some(text) = obj.get(*key).and_then(Value::as_str) {
                    let trimmed = text.trim();
                    if trimmed.len() > 50 {
                        return Some(trimmed.to_string());
                    }
                }
            }
            // Nothing readable in the object. A large raw blob next to a rich
            // reasoning tree means the model wrote its answer in the tree.
            let blob = value.to_string();
            if blob.len() > 1000 && !tasks.is_empty() {
                if let Some(text) = synthesize_from_reasoning(tasks) {
                    if text.len() > 100 {
                        return Some(text);
                    }
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| answer_from_value(item, tasks)),
        _ => None,
    }
}

/// Build an answer out of reasoning conclusions when the result had none.
fn synthesize_from_reasoning(tasks: &[ReasoningTask]) -> Option<String> {
    let flat = tree::flatten(tasks);
    if flat.is_empty() {
        return None;
    }

    let mut best: Option<(f64, &str)> = None;
    let mut conclusions: Vec<&str> = Vec::new();
    for (depth, task) in &flat {
        let Some(conclusion) = task.conclusion.as_deref() else {
            continue;
        };
        conclusions.push(conclusion);
        let mut score = conclusion.len() as f64;
        if let Some(title) = task.title.as_deref() {
            let lowered = title.to_lowercase();
            if SYNTHESIS_TITLE_MARKERS.iter().any(|m| lowered.contains(m)) {
                score *= 3.0;
            }
        }
        if *depth == 0 {
            score *= 1.5;
        }
        if best.is_none_or(|(s, _)| score > s) {
            best = Some((score, conclusion));
        }
    }

    if let Some((score, text)) = best {
        if score > 200.0 {
            return Some(text.to_string());
        }
    }
    if let Some(longest) = conclusions.iter().max_by_key(|c| c.len()) {
        if longest.len() > 100 {
            return Some(longest.to_string());
        }
    }
    if !conclusions.is_empty() {
        let joined = conclusions
            .iter()
            .take(5)
            .copied()
            .collect::<Vec<_>>()
            .join("\n\n");
        if !joined.trim().is_empty() {
            return Some(joined);
        }
    }
    None
}

fn unescape_json_fragment(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut chars = fragment.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_string_answer_passes_through() {
        let answer = json!("Rust async runtimes differ primarily in scheduling.");
        let (text, tasks) = extract_answer(Some(&answer), None);
        assert_eq!(text, "Rust async runtimes differ primarily in scheduling.");
        assert!(tasks.is_empty());
    }

    #[test]
    fn object_answer_is_unwrapped_by_known_key() {
        let long = "a".repeat(80);
        let answer = json!({"final_answer": long});
        let (text, _) = extract_answer(Some(&answer), None);
        assert_eq!(text, "a".repeat(80));
    }

    #[test]
    fn json_encoded_string_answer_is_parsed() {
        let inner = format!(r#"{{"answer": "{}"}}"#, "b".repeat(60));
        let answer = Value::String(inner);
        let (text, _) = extract_answer(Some(&answer), None);
        assert_eq!(text, "b".repeat(60));
    }

    #[test]
    fn truncated_json_answer_is_salvaged() {
        let body = "The survey finds three broad families of approach. ".repeat(3);
        let truncated = format!(r#"{{"final_answer": "{body}"#);
        let answer = Value::String(truncated);
        let (text, _) = extract_answer(Some(&answer), None);
        assert!(text.starts_with("The survey finds three broad families"));
    }

    #[test]
    fn missing_answer_synthesizes_from_conclusions() {
        let conclusion = "Overall, the evidence strongly favors the second approach. ".repeat(5);
        let reasoning = json!([
            {"title": "Final synthesis", "conclusion": conclusion},
            {"title": "Side note", "conclusion": "minor point"}
        ]);
        let (text, tasks) = extract_answer(None, Some(&reasoning));
        assert!(text.starts_with("Overall, the evidence"));
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn short_conclusions_are_joined() {
        let reasoning = json!([
            {"conclusion": "first point"},
            {"conclusion": "second point"}
        ]);
        let (text, _) = extract_answer(None, Some(&reasoning));
        assert_eq!(text, "first point\n\nsecond point");
    }

    #[test]
    fn no_answer_and_no_reasoning_yields_a_notice() {
        let (text, tasks) = extract_answer(None, None);
        assert!(text.contains("no readable answer"));
        assert!(tasks.is_empty());
    }
}
