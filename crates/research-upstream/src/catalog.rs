//! Engine and tool catalogs.
//!
//! Identifiers are data, not behavior: validation is "is this a known id",
//! nothing more. The arXiv search tool is the exception: a function tool
//! pointing at the paper-search microservice rather than a platform builtin.

use serde::Serialize;

/// A selectable research engine tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// A selectable platform tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const ENGINES: [EngineInfo; 3] = [
    EngineInfo {
        id: "tim-small-preview",
        name: "TIM Small Preview",
        description: "Fast, lightweight engine",
    },
    EngineInfo {
        id: "tim-gpt",
        name: "TIM GPT",
        description: "GPT-powered engine",
    },
    EngineInfo {
        id: "tim-large",
        name: "TIM Large",
        description: "Most capable engine",
    },
];

const TOOLS: [ToolInfo; 3] = [
    ToolInfo {
        id: "web_search",
        name: "Web Search",
        description: "Search the web for information",
    },
    ToolInfo {
        id: "webpage_understanding",
        name: "Webpage Understanding",
        description: "Read and understand web pages",
    },
    ToolInfo {
        id: "exa_search",
        name: "Exa Search",
        description: "Semantic search engine",
    },
];

/// All known engines, in capability order.
pub fn available_engines() -> &'static [EngineInfo] {
    &ENGINES
}

/// All known platform tools.
pub fn available_tools() -> &'static [ToolInfo] {
    &TOOLS
}

/// Whether `id` names a known engine.
pub fn is_known_engine(id: &str) -> bool {
    ENGINES.iter().any(|engine| engine.id == id)
}

/// Splits requested tool ids into known and unknown ones. `None` selects
/// every platform tool.
pub fn sanitize_tool_ids(requested: Option<&[String]>) -> (Vec<String>, Vec<String>) {
    match requested {
        None => (TOOLS.iter().map(|t| t.id.to_string()).collect(), Vec::new()),
        Some(ids) => {
            let (known, unknown) = ids
                .iter()
                .cloned()
                .partition(|id| TOOLS.iter().any(|t| t.id == *id));
            (known, unknown)
        }
    }
}

/// Builds the tool descriptor list for a run submission.
///
/// Platform tools are referenced by id; when `arxiv_url` is set, the
/// paper-search microservice is attached as a function tool the agent can
/// call over HTTP.
pub fn tool_descriptors(tool_ids: &[String], arxiv_url: Option<&str>) -> Vec<serde_json::Value> {
    let mut tools: Vec<serde_json::Value> = tool_ids
        .iter()
        .map(|id| serde_json::json!({ "type": "platform", "id": id }))
        .collect();
    if let Some(base) = arxiv_url.map(str::trim).filter(|u| !u.is_empty()) {
        tools.push(arxiv_tool_descriptor(base));
    }
    tools
}

fn arxiv_tool_descriptor(base_url: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "name": "arxiv_search",
        "description": "Search ArXiv for academic papers and research articles. \
            Use this for finding peer-reviewed scientific publications, preprints, \
            and academic research.",
        "url": format!("{}/search", base_url.trim_end_matches('/')),
        "method": "POST",
        "timeout": 30,
        "parameters": {
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search query for academic papers"},
                "max_results": {"type": "integer", "default": 10}
            },
            "required": ["query"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_catalog_has_three_tiers() {
        assert_eq!(available_engines().len(), 3);
        assert!(is_known_engine("tim-gpt"));
        assert!(!is_known_engine("tim-xl"));
    }

    #[test]
    fn sanitize_defaults_to_all_platform_tools() {
        let (known, unknown) = sanitize_tool_ids(None);
        assert_eq!(known.len(), 3);
        assert!(unknown.is_empty());
    }

    #[test]
    fn sanitize_partitions_unknown_ids() {
        let requested = vec!["web_search".to_string(), "crystal_ball".to_string()];
        let (known, unknown) = sanitize_tool_ids(Some(&requested));
        assert_eq!(known, vec!["web_search".to_string()]);
        assert_eq!(unknown, vec!["crystal_ball".to_string()]);
    }

    #[test]
    fn descriptors_include_arxiv_function_tool_when_configured() {
        let ids = vec!["web_search".to_string()];
        let tools = tool_descriptors(&ids, Some("http://arxiv.internal:8001/"));
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["type"], "platform");
        assert_eq!(tools[1]["type"], "function");
        assert_eq!(tools[1]["name"], "arxiv_search");
        assert_eq!(tools[1]["url"], "http://arxiv.internal:8001/search");
    }

    #[test]
    fn descriptors_skip_arxiv_without_url() {
        let ids = vec!["web_search".to_string()];
        let tools = tool_descriptors(&ids, None);
        assert_eq!(tools.len(), 1);
        let tools = tool_descriptors(&ids, Some("  "));
        assert_eq!(tools.len(), 1);
    }
}
