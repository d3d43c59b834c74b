//! Reasoning tree assembly.
//!
//! The upstream result carries a free-form `reasoning` value: usually a list
//! of task objects with nested subtasks, sometimes a single object, sometimes
//! garbage. Assembly is tolerant, never fails, and truncates past a depth
//! guard so a malicious or cyclic-looking payload cannot blow the stack.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum nesting depth retained when assembling the tree.
pub const MAX_DEPTH: usize = 50;

/// One tool invocation recorded inside a reasoning task.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<Value>,
}

/// One node of the reasoning tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooluse: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<ReasoningTask>,
}

impl ReasoningTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.thought.is_none()
            && self.content.is_none()
            && self.conclusion.is_none()
            && self.tooluse.is_none()
            && self.subtasks.is_empty()
    }
}

/// Build the task list from an upstream `reasoning` value.
pub fn assemble(reasoning: Option<&Value>) -> Vec<ReasoningTask> {
    match reasoning {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| assemble_task(item, 0))
            .collect(),
        Some(value @ Value::Object(_)) => assemble_task(value, 0).into_iter().collect(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![ReasoningTask {
                    content: Some(trimmed.to_string()),
                    ..Default::default()
                }]
            }
        }
        _ => Vec::new(),
    }
}

fn assemble_task(value: &Value, depth: usize) -> Option<ReasoningTask> {
    if depth >= MAX_DEPTH {
        return None;
    }
    let obj = match value {
        Value::Object(obj) => obj,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            return Some(ReasoningTask {
                content: Some(trimmed.to_string()),
                ..Default::default()
            });
        }
        _ => return None,
    };

    let task = ReasoningTask {
        title: str_field(obj, "title"),
        thought: str_field(obj, "thought"),
        content: str_field(obj, "content"),
        conclusion: str_field(obj, "conclusion"),
        tooluse: obj.get("tooluse").and_then(Value::as_array).map(|calls| {
            calls
                .iter()
                .map(|call| ToolCall {
                    tool_name: call
                        .get("tool_name")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    parameters: call.get("parameters").cloned(),
                    tool_result: call.get("tool_result").cloned(),
                })
                .collect()
        }),
        subtasks: obj
            .get("subtasks")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| assemble_task(item, depth + 1))
                    .collect()
            })
            .unwrap_or_default(),
    };

    if task.is_empty() { None } else { Some(task) }
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Pre-order traversal of the tree with the depth of each node.
pub fn flatten(tasks: &[ReasoningTask]) -> Vec<(usize, &ReasoningTask)> {
    let mut out = Vec::new();
    for task in tasks {
        flatten_into(task, 0, &mut out);
    }
    out
}

fn flatten_into<'a>(task: &'a ReasoningTask, depth: usize, out: &mut Vec<(usize, &'a ReasoningTask)>) {
    out.push((depth, task));
    for sub in &task.subtasks {
        flatten_into(sub, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assembles_nested_task_list() {
        let reasoning = json!([
            {
                "title": "Gather sources",
                "thought": "start broad",
                "subtasks": [
                    {"title": "Search arxiv", "tooluse": [{"tool_name": "arxiv_search"}]}
                ]
            },
            {"conclusion": "done"}
        ]);
        let tasks = assemble(Some(&reasoning));
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].subtasks.len(), 1);
        let calls = tasks[0].subtasks[0].tooluse.as_ref().expect("tooluse");
        assert_eq!(calls[0].tool_name.as_deref(), Some("arxiv_search"));
        assert_eq!(tasks[1].conclusion.as_deref(), Some("done"));
    }

    #[test]
    fn single_object_and_string_inputs_are_tolerated() {
        let obj = json!({"title": "Only task"});
        assert_eq!(assemble(Some(&obj)).len(), 1);

        let text = json!("raw reasoning text");
        let tasks = assemble(Some(&text));
        assert_eq!(tasks[0].content.as_deref(), Some("raw reasoning text"));

        assert!(assemble(None).is_empty());
        assert!(assemble(Some(&json!(42))).is_empty());
    }

    #[test]
    fn depth_guard_truncates_runaway_nesting() {
        let mut value = json!({"title": "leaf"});
        for i in 0..(MAX_DEPTH + 10) {
            value = json!({"title": format!("level {i}"), "subtasks": [value]});
        }
        let tasks = assemble(Some(&json!([value])));
        let flat = flatten(&tasks);
        assert!(flat.len() <= MAX_DEPTH);
        let max_depth = flat.iter().map(|(d, _)| *d).max().unwrap();
        assert!(max_depth < MAX_DEPTH);
    }

    #[test]
    fn empty_nodes_are_dropped() {
        let reasoning = json!([{}, {"title": ""}, {"title": "kept"}]);
        let tasks = assemble(Some(&reasoning));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title.as_deref(), Some("kept"));
    }

    #[test]
    fn flatten_walks_preorder() {
        let reasoning = json!([
            {"title": "a", "subtasks": [{"title": "a1"}, {"title": "a2"}]},
            {"title": "b"}
        ]);
        let tasks = assemble(Some(&reasoning));
        let titles: Vec<_> = flatten(&tasks)
            .iter()
            .map(|(d, t)| (*d, t.title.clone().unwrap()))
            .collect();
        assert_eq!(
            titles,
            vec![
                (0, "a".to_string()),
                (1, "a1".to_string()),
                (1, "a2".to_string()),
                (0, "b".to_string())
            ]
        );
    }
}
