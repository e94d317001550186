//! Text renderings of the capability catalog for model prompts.

use super::catalog::CatalogEntry;
use crate::tool::schema::{FieldType, Schema};
use crate::util::ellipsize;
use serde_json::{Map, Value, json};
use std::fmt::Write;

/// Descriptions in the compact list are cut to this many characters.
pub const COMPACT_DESCRIPTION_LEN: usize = 60;

/// Provider-grouped one-line-per-tool listing.
///
/// ```text
/// [web-search]
///   - webSearchPrime: Search the web for pages
/// ```
pub fn compact_tool_list(entries: &[CatalogEntry]) -> String {
    let mut out = String::new();
    let mut current = None;

    for entry in entries {
        if current != Some(entry.provider) {
            if current.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "[{}]", entry.provider);
            current = Some(entry.provider);
        }
        let _ = writeln!(
            out,
            "  - {}: {}",
            entry.name,
            ellipsize(&entry.description, COMPACT_DESCRIPTION_LEN)
        );
    }

    out
}

/// Full parameter listing for one capability.
pub fn format_tool_details(entry: &CatalogEntry) -> String {
    let schema = Schema::from_json_schema(&entry.input_schema);
    let mut out = String::new();

    let _ = writeln!(out, "Tool: {} (provider: {})", entry.name, entry.provider);
    if !entry.description.is_empty() {
        let _ = writeln!(out, "Description: {}", entry.description);
    }

    if schema.fields().is_empty() {
        out.push_str("Parameters: none\n");
        return out;
    }

    out.push_str("Parameters:\n");
    for field in schema.fields() {
        let requirement = if field.required { "required" } else { "optional" };
        let mut type_name = field.field_type.to_string();
        if let Some(items) = field.items {
            type_name = format!("array of {}", items);
        }
        let _ = write!(out, "  - {} ({}, {})", field.name, type_name, requirement);
        if let Some(desc) = &field.description {
            let _ = write!(out, ": {}", desc);
        }
        out.push('\n');
        if let Some(values) = &field.enum_values {
            let _ = writeln!(out, "    allowed: {}", values.join(" | "));
        }
    }

    out
}

fn placeholder(name: &str, field_type: FieldType, enum_values: Option<&Vec<String>>) -> Value {
    if let Some(first) = enum_values.and_then(|v| v.first()) {
        return json!(first);
    }
    match field_type {
        FieldType::String => json!(format!("<{}>", name)),
        FieldType::Integer => json!(1),
        FieldType::Number => json!(1.0),
        FieldType::Boolean => json!(true),
        FieldType::Array => json!([]),
        FieldType::Object => json!({}),
        FieldType::Any => Value::Null,
    }
}

/// Synthesized invocation with placeholder arguments.
///
/// Required parameters are filled in; when a tool declares none as required,
/// every parameter is shown.
pub fn generate_example_call(entry: &CatalogEntry) -> Value {
    let schema = Schema::from_json_schema(&entry.input_schema);
    let any_required = schema.fields().iter().any(|f| f.required);

    let arguments: Map<String, Value> = schema
        .fields()
        .iter()
        .filter(|f| f.required || !any_required)
        .map(|f| {
            (
                f.name.clone(),
                placeholder(&f.name, f.field_type, f.enum_values.as_ref()),
            )
        })
        .collect();

    json!({
        "provider": entry.provider,
        "tool": entry.name,
        "arguments": arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderName;

    fn web_search() -> CatalogEntry {
        CatalogEntry {
            name: "webSearchPrime".into(),
            description: "Search the web and return titles, URLs and summaries for each result page found".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "search_query": {"type": "string", "description": "What to search for"},
                    "count": {"type": "integer"},
                    "recency": {"type": "string", "enum": ["oneDay", "oneWeek", "noLimit"]}
                },
                "required": ["search_query"]
            }),
            provider: ProviderName::WebSearch,
        }
    }

    #[test]
    fn test_compact_list_groups_and_truncates() {
        let mut reader = web_search();
        reader.name = "webReader".into();
        reader.description = "Read a page".into();
        reader.provider = ProviderName::WebReader;

        let text = compact_tool_list(&[web_search(), reader]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "[web-search]");
        assert!(lines[1].starts_with("  - webSearchPrime: Search the web"));
        assert!(lines[1].ends_with("..."));
        assert_eq!(lines[1].len(), "  - webSearchPrime: ".len() + COMPACT_DESCRIPTION_LEN + 3);
        assert_eq!(lines[3], "[web-reader]");
        assert_eq!(lines[4], "  - webReader: Read a page");
    }

    #[test]
    fn test_format_tool_details() {
        let text = format_tool_details(&web_search());
        assert!(text.contains("Tool: webSearchPrime (provider: web-search)"));
        assert!(text.contains("  - search_query (string, required): What to search for"));
        assert!(text.contains("  - count (integer, optional)"));
        assert!(text.contains("allowed: oneDay | oneWeek | noLimit"));
    }

    #[test]
    fn test_details_without_parameters() {
        let mut entry = web_search();
        entry.input_schema = json!({"type": "object"});
        assert!(format_tool_details(&entry).contains("Parameters: none"));
    }

    #[test]
    fn test_example_call_fills_required_only() {
        let example = generate_example_call(&web_search());
        assert_eq!(example["provider"], "web-search");
        assert_eq!(example["arguments"], json!({"search_query": "<search_query>"}));
    }

    #[test]
    fn test_example_call_uses_enum_and_types_when_nothing_required() {
        let mut entry = web_search();
        entry.input_schema["required"] = json!([]);
        let example = generate_example_call(&entry);
        assert_eq!(example["arguments"]["recency"], "oneDay");
        assert_eq!(example["arguments"]["count"], 1);
    }
}
