//! Diagnostic agent: connect to an ELM327 adapter, run one tool, print
//! its JSON result.
//!
//! ```text
//! diag-agent <config.toml> <tool> [json-args]
//! diag-agent --list
//! ```

use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use diag_agent::config::AgentConfig;
use diag_agent::registry::ToolRegistry;
use diag_agent::stream::StreamTransport;
use diag_elm327::DiagnosticSession;

const USAGE: &str = "usage: diag-agent <config.toml> <tool> [json-args]\n       diag-agent --list";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let registry = ToolRegistry::with_defaults();

    if args.first().map(String::as_str) == Some("--list") {
        let tools: Vec<serde_json::Value> = registry
            .list_tools()
            .into_iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.schema,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(ExitCode::SUCCESS);
    }

    let (config_path, tool_name) = match (args.first(), args.get(1)) {
        (Some(config), Some(tool)) => (config.as_str(), tool.as_str()),
        _ => {
            eprintln!("{USAGE}");
            return Ok(ExitCode::from(2));
        }
    };
    let tool_args: serde_json::Value = match args.get(2) {
        Some(raw) => serde_json::from_str(raw).context("tool arguments are not valid JSON")?,
        None => serde_json::json!({}),
    };

    if registry.get(tool_name).is_none() {
        anyhow::bail!("unknown tool '{tool_name}' (see --list)");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "diag-agent starting");

    let config = AgentConfig::from_file(config_path)
        .with_context(|| format!("loading config from {config_path}"))?;
    tracing::info!(endpoint = %config.adapter.endpoint(), "config loaded");

    let (transport, inbound) = StreamTransport::open(&config.adapter)
        .await
        .context("opening adapter link")?;
    let session = DiagnosticSession::new(transport, inbound, config.session.clone());

    let identity = session
        .initialize()
        .await
        .context("initializing adapter")?;
    tracing::info!(adapter = %identity, "adapter ready");

    let result = tokio::select! {
        result = registry.dispatch(tool_name, tool_args, &session) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            return Ok(ExitCode::from(130));
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
