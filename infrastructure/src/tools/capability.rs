//! Model-facing capability tools: search_capabilities, describe_capability,
//! call_capability
//!
//! Provider tools stay out of the model's tool list. The model searches the
//! catalog, reads one tool's details, and then invokes it through
//! `call_capability`.

use super::registry::{HandlerResult, ToolRegistry};
use super::{optional_u64, required_str};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use toolhost_application::ports::capability_source::CapabilitySource;
use toolhost_application::use_cases::capability_discovery::CapabilityDiscovery;
use toolhost_domain::discovery::{format_tool_details, generate_example_call};
use toolhost_domain::providers::ProviderName;
use toolhost_domain::tool::{
    entities::{ToolDefinition, ToolOptions},
    schema::{Field, Schema},
    value_objects::{ToolError, ToolResult},
};
use toolhost_domain::util::ellipsize;

pub const SEARCH_CAPABILITIES: &str = "search_capabilities";
pub const DESCRIBE_CAPABILITY: &str = "describe_capability";
pub const CALL_CAPABILITY: &str = "call_capability";

const DEFAULT_SEARCH_LIMIT: u64 = 10;
const HIT_DESCRIPTION_LEN: usize = 100;

fn provider_field(description: &str) -> Field {
    Field::string("provider", description).one_of(ProviderName::ALL.iter().map(|p| p.as_str()))
}

pub fn search_capabilities_definition() -> ToolDefinition {
    ToolDefinition::new(
        SEARCH_CAPABILITIES,
        "Search external capabilities (web search, page reading, repository docs, image analysis) by keyword",
        Schema::new()
            .field(Field::string("query", "Keywords describing what you need").required())
            .field(Field::integer("limit", "Maximum number of results (default: 10)"))
            .field(Field::boolean(
                "refresh",
                "Rebuild the catalog from the providers before searching",
            )),
    )
}

pub fn describe_capability_definition() -> ToolDefinition {
    ToolDefinition::new(
        DESCRIBE_CAPABILITY,
        "Show the parameters of one external capability and an example call",
        Schema::new()
            .field(provider_field("Provider that owns the tool").required())
            .field(Field::string("tool", "Tool name as returned by search_capabilities").required()),
    )
}

pub fn call_capability_definition() -> ToolDefinition {
    ToolDefinition::new(
        CALL_CAPABILITY,
        "Invoke an external capability. Use describe_capability first to learn its arguments",
        Schema::new()
            .field(provider_field(
                "Provider that owns the tool (looked up from the tool name when omitted)",
            ))
            .field(Field::string("tool", "Tool name").required())
            .field(Field::object("arguments", "Arguments for the tool")),
    )
}

/// `call_timeout` bounds a whole `call_capability` run, including provider
/// initialization and a session retry.
pub fn register(
    registry: &ToolRegistry,
    discovery: Arc<CapabilityDiscovery>,
    source: Arc<dyn CapabilitySource>,
    call_timeout: Duration,
) {
    let search = discovery.clone();
    registry.define(search_capabilities_definition(), move |input: Value| {
        search_capabilities(input, search.clone())
    });

    registry.define(describe_capability_definition(), move |input: Value| {
        describe_capability(input, discovery.clone())
    });

    let call_definition =
        call_capability_definition().with_options(ToolOptions::new().with_timeout(call_timeout));
    registry.define(call_definition, move |input: Value| {
        call_capability(input, source.clone())
    });
}

fn parse_provider(value: &str) -> Result<ProviderName, ToolError> {
    value.parse().map_err(ToolError::validation)
}

async fn search_capabilities(input: Value, discovery: Arc<CapabilityDiscovery>) -> HandlerResult {
    let query = required_str(&input, "query")?;
    let limit = optional_u64(&input, "limit").unwrap_or(DEFAULT_SEARCH_LIMIT).max(1) as usize;
    if input["refresh"].as_bool() == Some(true) {
        discovery.refresh();
    }

    let hits = discovery.search(query, limit).await;
    if hits.is_empty() {
        return Ok(ToolResult::success(format!(
            "No capabilities match '{}'. Try broader keywords.",
            query
        ))
        .with_metadata(json!({"matches": []})));
    }

    let mut output = format!("Found {} capabilities for '{}':", hits.len(), query);
    for hit in &hits {
        output.push_str(&format!(
            "\n- {} [{}] (score {:.2}): {}",
            hit.entry.name,
            hit.entry.provider,
            hit.score,
            ellipsize(&hit.entry.description, HIT_DESCRIPTION_LEN)
        ));
    }
    output.push_str("\n\nUse describe_capability for parameters before calling a tool.");

    let matches: Vec<Value> = hits
        .iter()
        .map(|hit| json!({"provider": hit.entry.provider, "name": hit.entry.name, "score": hit.score}))
        .collect();
    Ok(ToolResult::success(output).with_metadata(json!({ "matches": matches })))
}

async fn describe_capability(input: Value, discovery: Arc<CapabilityDiscovery>) -> HandlerResult {
    let provider = parse_provider(required_str(&input, "provider")?)?;
    let tool = required_str(&input, "tool")?;

    let Some(entry) = discovery.tool(provider, tool).await else {
        return Err(ToolError::not_found(format!(
            "Unknown capability '{}' on provider '{}'. Use search_capabilities to find available tools.",
            tool, provider
        )));
    };

    let example = generate_example_call(&entry);
    let pretty = serde_json::to_string_pretty(&example).unwrap_or_else(|_| example.to_string());
    Ok(ToolResult::success(format!(
        "{}\n\nExample call_capability input:\n{}",
        format_tool_details(&entry),
        pretty
    ))
    .with_metadata(json!({ "example": example })))
}

async fn call_capability(input: Value, source: Arc<dyn CapabilitySource>) -> HandlerResult {
    let tool = required_str(&input, "tool")?;
    let arguments = match input.get("arguments") {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        _ => json!({}),
    };

    let provider = match input["provider"].as_str() {
        Some(name) => parse_provider(name)?,
        None => {
            source.ensure_initialized().await;
            source.find_tool_server(tool).await.ok_or_else(|| {
                ToolError::not_found(format!(
                    "No provider offers a tool named '{}'. Use search_capabilities to find available tools.",
                    tool
                ))
            })?
        }
    };

    Ok(source.call_tool(provider, tool, arguments).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use toolhost_application::ports::tool_executor::ToolExecutorPort;
    use toolhost_domain::providers::{
        ConnectionSummary, ProviderConfig, ProviderState, RemoteTool,
    };
    use toolhost_domain::tool::value_objects::ErrorCategory;

    struct FakeSource {
        states: Mutex<Vec<ProviderState>>,
        calls: Mutex<Vec<(ProviderName, String, Value)>>,
    }

    impl FakeSource {
        fn new() -> Self {
            let mut search = ProviderState::new(ProviderConfig::default_for(ProviderName::WebSearch));
            search.mark_connected(vec![RemoteTool {
                name: "webSearchPrime".into(),
                description: "Search the web for current information".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "search_query": {"type": "string", "description": "Query"},
                        "count": {"type": "integer", "description": "Result count"}
                    },
                    "required": ["search_query"]
                }),
            }]);
            let mut reader = ProviderState::new(ProviderConfig::default_for(ProviderName::WebReader));
            reader.mark_connected(vec![RemoteTool {
                name: "webReader".into(),
                description: "Fetch a URL and convert it to markdown".into(),
                input_schema: json!({"type": "object"}),
            }]);
            Self {
                states: Mutex::new(vec![search, reader]),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CapabilitySource for FakeSource {
        async fn ensure_initialized(&self) {}

        async fn provider_states(&self) -> Vec<ProviderState> {
            self.states.lock().unwrap().clone()
        }

        async fn call_tool(&self, provider: ProviderName, tool: &str, args: Value) -> ToolResult {
            self.calls.lock().unwrap().push((provider, tool.to_string(), args));
            ToolResult::success(format!("called {tool}"))
        }

        async fn find_tool_server(&self, tool: &str) -> Option<ProviderName> {
            self.states
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.knows_tool(tool))
                .map(ProviderState::name)
        }

        async fn connection_summary(&self) -> ConnectionSummary {
            ConnectionSummary::from_states(self.states.lock().unwrap().iter(), false)
        }
    }

    fn setup() -> (ToolRegistry, Arc<FakeSource>) {
        let source = Arc::new(FakeSource::new());
        let discovery = Arc::new(CapabilityDiscovery::new(source.clone()));
        let registry = ToolRegistry::new();
        register(&registry, discovery, source.clone(), Duration::from_secs(145));
        (registry, source)
    }

    #[tokio::test]
    async fn test_search_ranks_web_search_first() {
        let (registry, _) = setup();
        let result = registry
            .execute(SEARCH_CAPABILITIES, json!({"query": "search web", "limit": 5}))
            .await;

        assert!(result.success);
        let matches = &result.metadata.unwrap()["matches"];
        assert_eq!(matches[0]["name"], "webSearchPrime");
        assert_eq!(matches[0]["provider"], "web-search");
        assert!(result.output.contains("- webSearchPrime [web-search]"));
    }

    #[tokio::test]
    async fn test_search_without_hits() {
        let (registry, _) = setup();
        let result = registry
            .execute(SEARCH_CAPABILITIES, json!({"query": "spreadsheet"}))
            .await;
        assert!(result.success);
        assert!(result.output.starts_with("No capabilities match"));
    }

    #[tokio::test]
    async fn test_describe_includes_example() {
        let (registry, _) = setup();
        let result = registry
            .execute(
                DESCRIBE_CAPABILITY,
                json!({"provider": "web-search", "tool": "webSearchPrime"}),
            )
            .await;

        assert!(result.success, "{}", result.output);
        assert!(result.output.contains("search_query (string, required)"));
        let example = &result.metadata.unwrap()["example"];
        assert_eq!(example["tool"], "webSearchPrime");
        assert_eq!(example["arguments"]["search_query"], "<search_query>");
    }

    #[tokio::test]
    async fn test_describe_unknown_tool() {
        let (registry, _) = setup();
        let result = registry
            .execute(DESCRIBE_CAPABILITY, json!({"provider": "zread", "tool": "webSearchPrime"}))
            .await;
        assert_eq!(result.error_category(), Some(ErrorCategory::NotFound));
    }

    #[tokio::test]
    async fn test_call_resolves_provider_from_tool_name() {
        let (registry, source) = setup();
        let result = registry
            .execute(
                CALL_CAPABILITY,
                json!({"tool": "webReader", "arguments": {"url": "https://example.com"}}),
            )
            .await;

        assert!(result.success);
        let calls = source.calls.lock().unwrap();
        assert_eq!(calls[0].0, ProviderName::WebReader);
        assert_eq!(calls[0].2, json!({"url": "https://example.com"}));
    }

    #[tokio::test]
    async fn test_call_unknown_tool_without_provider() {
        let (registry, source) = setup();
        let result = registry.execute(CALL_CAPABILITY, json!({"tool": "teleport"})).await;

        assert_eq!(result.error_category(), Some(ErrorCategory::NotFound));
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_call_rejects_unknown_provider() {
        let (registry, _) = setup();
        let result = registry
            .execute(CALL_CAPABILITY, json!({"provider": "github", "tool": "x"}))
            .await;
        assert_eq!(result.error_category(), Some(ErrorCategory::Validation));
    }

    #[tokio::test]
    async fn test_search_refresh_picks_up_new_provider() {
        let (registry, source) = setup();
        let query = json!({"query": "repository documentation"});
        let before = registry.execute(SEARCH_CAPABILITIES, query.clone()).await;
        assert!(before.output.starts_with("No capabilities match"));

        let mut zread = ProviderState::new(ProviderConfig::default_for(ProviderName::Zread));
        zread.mark_connected(vec![RemoteTool {
            name: "search_doc".into(),
            description: "Search repository documentation".into(),
            input_schema: json!({"type": "object"}),
        }]);
        source.states.lock().unwrap().push(zread);

        let cached = registry.execute(SEARCH_CAPABILITIES, query).await;
        assert!(cached.output.starts_with("No capabilities match"));

        let refreshed = registry
            .execute(
                SEARCH_CAPABILITIES,
                json!({"query": "repository documentation", "refresh": true}),
            )
            .await;
        assert!(refreshed.output.contains("- search_doc [zread]"), "{}", refreshed.output);
    }

    #[test]
    fn test_call_capability_deadline_is_configurable() {
        let (registry, _) = setup();
        let definition = registry
            .definitions()
            .into_iter()
            .find(|d| d.name == CALL_CAPABILITY)
            .unwrap();
        assert_eq!(
            definition.options.timeout.resolve(Duration::from_secs(120)),
            Some(Duration::from_secs(145))
        );
    }
}
