//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for toolhost
#[derive(Parser, Debug)]
#[command(name = "toolhost")]
#[command(author, version, about = "Tool-execution host for AI coding agents")]
#[command(long_about = r#"
toolhost runs the tools a coding agent calls: local file, search and command
tools, plus external capabilities (web search, page reading, repository docs,
image analysis) served by capability providers over stdio or HTTP.

Configuration files are loaded from (in priority order):
1. TOOLHOST_* environment variables
2. --config <path>                      Explicit config file
3. ./toolhost.toml                      Project-level config
4. ~/.config/toolhost/config.toml       Global config

Example:
  toolhost status
  toolhost search "web search"
  toolhost describe web-search webSearchPrime
  toolhost call webSearchPrime --args '{"search_query": "rust async"}'
  toolhost exec grep_search --args '{"pattern": "TODO", "path": "src"}'
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Approve high-risk tools without asking
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Print tool results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show configuration sources and provider connection status
    Status,

    /// List the registered tools
    Tools,

    /// Search provider capabilities by keyword
    Search {
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Show the parameters of one provider tool
    Describe { provider: String, tool: String },

    /// Call a provider tool
    Call {
        tool: String,

        /// Provider owning the tool (looked up when omitted)
        #[arg(short, long)]
        provider: Option<String>,

        /// Tool arguments as a JSON object
        #[arg(short, long, value_name = "JSON")]
        args: Option<String>,
    },

    /// Run any registered tool
    Exec {
        tool: String,

        /// Tool input as a JSON object
        #[arg(short, long, value_name = "JSON")]
        args: Option<String>,
    },
}
