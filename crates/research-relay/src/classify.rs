//! Delta content classification.
//!
//! Raw deltas arrive either as plain text or as small JSON objects describing
//! tool calls, thoughts, task titles, and conclusions. This module turns each
//! of them into a readable line plus a [`ContentKind`] tag, or into a bare
//! progress tick when there is nothing worth showing.

use serde_json::Value;

use crate::event::ContentKind;

/// Minimum length for a delta to be surfaced as content. Shorter fragments
/// become content-less progress ticks.
const MIN_CONTENT_LEN: usize = 5;

/// Classify one raw delta payload.
///
/// Returns the display text (if any) and the kind tag. `None` content with
/// [`ContentKind::Progress`] means "count it, show nothing".
pub fn classify_delta(raw: Option<&str>) -> (Option<String>, ContentKind) {
    let Some(raw) = raw else {
        return (None, ContentKind::Progress);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (None, ContentKind::Progress);
    }

    let (text, kind) = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(obj)) => classify_object(&obj),
        Ok(Value::String(s)) => (Some(s), ContentKind::Delta),
        Ok(_) => (Some(trimmed.to_string()), ContentKind::Delta),
        Err(_) => (Some(trimmed.to_string()), ContentKind::Delta),
    };

    match text {
        Some(text) if text.trim().len() > MIN_CONTENT_LEN => (Some(text), kind),
        _ => (None, ContentKind::Progress),
    }
}

fn classify_object(obj: &serde_json::Map<String, Value>) -> (Option<String>, ContentKind) {
    if let Some(tool) = first_str(obj, &["tool", "tool_name"]) {
        let line = match first_str(obj, &["query", "input"]) {
            Some(query) => format!("Using {tool}: {query}"),
            None => format!("Using tool: {tool}"),
        };
        return (Some(line), ContentKind::Tool);
    }
    if let Some(calls) = obj.get("tooluse").and_then(Value::as_array) {
        if let Some(name) = calls
            .iter()
            .find_map(|c| c.get("tool_name").and_then(Value::as_str))
        {
            return (Some(format!("Using tool: {name}")), ContentKind::Tool);
        }
    }
    // Title takes precedence so a task node absorbs its own thought line.
    if let Some(title) = obj.get("title").and_then(Value::as_str) {
        let line = match obj.get("thought").and_then(Value::as_str) {
            Some(thought) => format!("Task: {title}\n{thought}"),
            None => format!("Task: {title}"),
        };
        return (Some(line), ContentKind::Info);
    }
    if let Some(thought) = obj.get("thought").and_then(Value::as_str) {
        return (Some(format!("Thinking: {thought}")), ContentKind::Info);
    }
    if let Some(conclusion) = obj.get("conclusion").and_then(Value::as_str) {
        return (Some(format!("Conclusion: {conclusion}")), ContentKind::Info);
    }
    if let Some(message) = obj.get("message").and_then(Value::as_str) {
        return (Some(message.to_string()), ContentKind::Info);
    }
    (None, ContentKind::Progress)
}

fn first_str<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_delta() {
        let (content, kind) = classify_delta(Some("examining recent literature"));
        assert_eq!(content.as_deref(), Some("examining recent literature"));
        assert_eq!(kind, ContentKind::Delta);
    }

    #[test]
    fn tool_object_with_query_is_summarized() {
        let raw = r#"{"tool": "web_search", "query": "rust async runtimes"}"#;
        let (content, kind) = classify_delta(Some(raw));
        assert_eq!(
            content.as_deref(),
            Some("Using web_search: rust async runtimes")
        );
        assert_eq!(kind, ContentKind::Tool);
    }

    #[test]
    fn tooluse_array_names_the_tool() {
        let raw = r#"{"tooluse": [{"tool_name": "exa_search", "parameters": {}}]}"#;
        let (content, kind) = classify_delta(Some(raw));
        assert_eq!(content.as_deref(), Some("Using tool: exa_search"));
        assert_eq!(kind, ContentKind::Tool);
    }

    #[test]
    fn bare_thought_becomes_info() {
        let raw = r#"{"thought": "the survey papers disagree on terminology"}"#;
        let (content, kind) = classify_delta(Some(raw));
        assert_eq!(
            content.as_deref(),
            Some("Thinking: the survey papers disagree on terminology")
        );
        assert_eq!(kind, ContentKind::Info);
    }

    #[test]
    fn title_with_thought_combines_both() {
        let raw = r#"{"title": "Survey methods", "thought": "compare benchmarks"}"#;
        let (content, kind) = classify_delta(Some(raw));
        assert_eq!(
            content.as_deref(),
            Some("Task: Survey methods\ncompare benchmarks")
        );
        assert_eq!(kind, ContentKind::Info);
    }

    #[test]
    fn short_or_empty_payloads_are_progress_ticks() {
        assert_eq!(classify_delta(None), (None, ContentKind::Progress));
        assert_eq!(classify_delta(Some("   ")), (None, ContentKind::Progress));
        assert_eq!(classify_delta(Some("ok")), (None, ContentKind::Progress));
        assert_eq!(
            classify_delta(Some(r#"{"unrelated": 42}"#)),
            (None, ContentKind::Progress)
        );
    }
}
