//! CLI entrypoint for toolhost
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod responder;

use anyhow::{Context, Result, bail};
use clap::Parser;
use commands::{Cli, Command};
use serde_json::{Value, json};
use std::path::Path;
use toolhost_application::ports::capability_source::CapabilitySource;
use toolhost_application::ports::tool_executor::ToolExecutorPort;
use toolhost_domain::providers::{ConnectionStatus, ProviderState, TransportConfig};
use toolhost_domain::tool::ToolResult;
use toolhost_infrastructure::tools::capability::{
    CALL_CAPABILITY, DESCRIBE_CAPABILITY, SEARCH_CAPABILITIES,
};
use toolhost_infrastructure::{ConfigLoader, FileConfig, ToolHost};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting toolhost");

    let config: FileConfig = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?
    };

    // === Dependency Injection ===
    let host = ToolHost::from_config(&config).context("Invalid provider configuration")?;
    let _responder = responder::attach(&host, cli.yes);

    match cli.command {
        Command::Status => status(&host, cli.config.as_deref(), cli.json).await,
        Command::Tools => {
            list_tools(&host);
            Ok(())
        }
        Command::Search { query, limit } => {
            run_tool(&host, SEARCH_CAPABILITIES, json!({"query": query, "limit": limit}), cli.json).await
        }
        Command::Describe { provider, tool } => {
            run_tool(
                &host,
                DESCRIBE_CAPABILITY,
                json!({"provider": provider, "tool": tool}),
                cli.json,
            )
            .await
        }
        Command::Call {
            tool,
            provider,
            args,
        } => {
            let mut input = json!({"tool": tool, "arguments": parse_args(args.as_deref())?});
            if let Some(provider) = provider {
                input["provider"] = json!(provider);
            }
            run_tool(&host, CALL_CAPABILITY, input, cli.json).await
        }
        Command::Exec { tool, args } => {
            run_tool(&host, &tool, parse_args(args.as_deref())?, cli.json).await
        }
    }
}

fn parse_args(args: Option<&str>) -> Result<Value> {
    let Some(raw) = args else {
        return Ok(json!({}));
    };
    let value: Value = serde_json::from_str(raw).context("--args is not valid JSON")?;
    if !value.is_object() {
        bail!("--args must be a JSON object");
    }
    Ok(value)
}

async fn run_tool(host: &ToolHost, name: &str, input: Value, as_json: bool) -> Result<()> {
    let result = host.registry.execute(name, input).await;
    print_result(&result, as_json)?;
    if !result.is_success() {
        bail!("{} failed", name);
    }
    Ok(())
}

fn print_result(result: &ToolResult, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if result.is_success() {
        println!("{}", result.output);
    } else {
        eprintln!("Error: {}", result.output);
    }
    Ok(())
}

fn list_tools(host: &ToolHost) {
    for definition in host.registry.definitions() {
        let marker = if definition.is_high_risk() { "!" } else { " " };
        println!("{} {:<22} {}", marker, definition.name, definition.description);
    }
    println!();
    println!("! = asks for permission before running");
}

async fn status(host: &ToolHost, config_path: Option<&Path>, as_json: bool) -> Result<()> {
    host.providers.ensure_initialized().await;
    let summary = host.providers.connection_summary().await;
    let mut states = host.providers.provider_states().await;
    states.sort_by_key(ProviderState::name);

    if as_json {
        let providers: Vec<Value> = states
            .iter()
            .map(|s| {
                json!({
                    "provider": s.name(),
                    "transport": s.config.transport.kind(),
                    "status": s.status,
                    "error": s.error,
                    "tools": s.tool_names(),
                })
            })
            .collect();
        let report = json!({"summary": summary, "providers": providers});
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Configuration sources (in priority order):");
    for line in ConfigLoader::describe_sources(config_path) {
        println!("{}", line);
    }
    println!();

    println!("Providers:");
    for state in &states {
        let endpoint = match &state.config.transport {
            TransportConfig::Http { url, .. } => url.clone(),
            TransportConfig::Stdio { command, args, .. } => {
                format!("{} {}", command, args.join(" ")).trim_end().to_string()
            }
        };
        println!(
            "  {:<11} {:<6} {:<10} {}",
            state.name().as_str(),
            state.config.transport.kind(),
            state.status.as_str(),
            endpoint
        );
        match state.status {
            ConnectionStatus::Connected => {
                println!("              {} tools: {}", state.tools.len(), state.tool_names().join(", "));
            }
            ConnectionStatus::Failed => {
                println!("              error: {}", state.error.as_deref().unwrap_or("unknown"));
            }
            ConnectionStatus::Pending | ConnectionStatus::Disabled => {}
        }
    }
    println!();

    println!(
        "{}/{} connected, {} failed",
        summary.connected, summary.total, summary.failed
    );
    if summary.waiting_for_credential {
        println!(
            "Waiting for an API key: set [credentials] api_key or TOOLHOST_API_KEY / Z_AI_API_KEY"
        );
    }
    Ok(())
}
