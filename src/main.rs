use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use weft_core::config::{ChatProviderConfig, WeftConfig};
use weft_core::traits::{ChatClient, DefinitionStore, LogStore};
use weft_core::workflow::Workflow;
use weft_engine::{validate_workflow, Executor, TriggerDispatcher};
use weft_gateway::EventGateway;
use weft_store::SqliteStore;
use weft_units::{ChatAgentUnit, UnitRegistry};

#[derive(Parser)]
#[command(name = "weft", version, about = "Event-driven workflow automation engine")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "weft.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP event gateway
    Serve,
    /// Fire a trigger from the command line and print the outcome
    Fire {
        /// Trigger type to fire (e.g. support_ticket)
        #[arg(long)]
        trigger: String,
        /// Event payload: inline JSON or @path/to/file.json
        #[arg(long, default_value = "{}")]
        data: String,
    },
    /// Import a workflow definition from a JSON file
    Import {
        /// Path to the workflow JSON
        file: PathBuf,
    },
    /// List stored workflows
    List,
    /// Check a workflow definition without storing it
    Validate {
        /// Path to the workflow JSON
        file: PathBuf,
    },
    /// Show recent executions
    Executions {
        /// Number of executions to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show the node-by-node log of one execution
    Log {
        /// Execution id
        execution_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("weft=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Load config
    let config = if cli.config.exists() {
        WeftConfig::load(&cli.config)?
    } else {
        eprintln!("Warning: No config file found. Set ANTHROPIC_API_KEY or create weft.toml");
        eprintln!("See weft.toml.example for reference.");
        create_env_config()?
    };

    // Set up components
    let store = Arc::new(SqliteStore::open(std::path::Path::new(&config.database.path))?);
    let definitions: Arc<dyn DefinitionStore> = store.clone();
    let logs: Arc<dyn LogStore> = store.clone();

    let chat: Arc<dyn ChatClient> = Arc::from(weft_chat::create_client(&config.chat)?);
    let mut units = UnitRegistry::with_builtins();
    for profile in &config.agents {
        let mut profile = profile.clone();
        if profile.timeout_secs.is_none() {
            profile.timeout_secs = Some(config.engine.unit_timeout_secs);
        }
        units.register(ChatAgentUnit::new(profile, config.chat.clone(), chat.clone()));
    }
    let units = Arc::new(units);

    let executor =
        Arc::new(Executor::new(units.clone(), logs.clone()).with_config(config.engine.clone()));
    let dispatcher = Arc::new(TriggerDispatcher::new(definitions.clone(), executor));

    match cli.command {
        Commands::Serve => {
            let gateway_config = config.gateway.clone().unwrap_or_default();
            info!(bind = %gateway_config.bind, "Starting event gateway");
            let server = EventGateway::new(gateway_config, dispatcher, definitions, logs);
            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
        Commands::Fire { trigger, data } => {
            let event = parse_event_data(&data)?;
            let outcomes = dispatcher.dispatch(&trigger, event).await?;
            if outcomes.is_empty() {
                println!("No published workflow matched trigger '{trigger}'");
            }
            for outcome in outcomes {
                match (&outcome.execution_id, &outcome.error) {
                    (Some(execution_id), _) => {
                        let status = outcome
                            .status
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "unknown".to_string());
                        println!("{:<24} {:<9} {}", outcome.workflow_id, status, execution_id);
                        if let Some(error) = &outcome.error {
                            println!("  error: {error}");
                        }
                    }
                    (None, Some(error)) => {
                        error!(workflow = %outcome.workflow_id, %error, "Dispatch failed");
                        println!("{:<24} error     {error}", outcome.workflow_id);
                    }
                    (None, None) => {
                        println!("{:<24} no execution recorded", outcome.workflow_id);
                    }
                }
            }
        }
        Commands::Import { file } => {
            let workflow = read_workflow(&file)?;
            validate_workflow(&workflow, &units)?;
            definitions.save_workflow(&workflow).await?;
            println!(
                "Imported '{}' ({}, {} nodes, {} edges)",
                workflow.id,
                workflow.status,
                workflow.nodes.len(),
                workflow.edges.len()
            );
        }
        Commands::List => {
            let workflows = definitions.list_workflows().await?;
            if workflows.is_empty() {
                println!("No workflows stored. Use `weft import <file.json>` to add one.");
            }
            for workflow in workflows {
                let trigger_type = workflow.trigger().and_then(|t| t.type_ref()).unwrap_or("-");
                println!(
                    "{:<24} {:<10} {:<20} {} nodes",
                    workflow.id,
                    workflow.status.to_string(),
                    trigger_type,
                    workflow.nodes.len()
                );
            }
        }
        Commands::Validate { file } => {
            let workflow = read_workflow(&file)?;
            validate_workflow(&workflow, &units)?;
            println!(
                "'{}' is valid ({} nodes, {} edges)",
                workflow.id,
                workflow.nodes.len(),
                workflow.edges.len()
            );
        }
        Commands::Executions { limit } => {
            let executions = logs.recent_executions(limit).await?;
            if executions.is_empty() {
                println!("No executions recorded yet.");
            }
            for execution in executions {
                println!(
                    "{}  {:<24} {:<9} {:>8}  {}",
                    execution.started_at.format("%Y-%m-%d %H:%M:%S"),
                    execution.workflow_id,
                    execution.status.to_string(),
                    format_duration(execution.duration_ms),
                    execution.id
                );
            }
        }
        Commands::Log { execution_id } => {
            let execution = logs
                .execution(&execution_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("execution '{execution_id}' not found"))?;
            println!(
                "{} [{}] workflow={} duration={}",
                execution.id,
                execution.status,
                execution.workflow_id,
                format_duration(execution.duration_ms)
            );
            if let Some(error) = &execution.error_message {
                println!("error: {error}");
            }
            for log in logs.node_logs(&execution_id).await? {
                println!(
                    "  {:<9} {:<24} {:<10} {:>8}  {}",
                    log.status.to_string(),
                    log.node_id,
                    log.node_type.to_string(),
                    format_duration(log.duration_ms),
                    log.error_message.as_deref().unwrap_or("")
                );
            }
        }
    }

    Ok(())
}

/// Parse the `--data` argument: inline JSON, or `@file` to read from disk.
fn parse_event_data(data: &str) -> anyhow::Result<serde_json::Value> {
    let raw = match data.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read event file '{path}': {e}"))?,
        None => data.to_string(),
    };
    serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("event payload is not valid JSON: {e}"))
}

fn read_workflow(file: &PathBuf) -> anyhow::Result<Workflow> {
    let json = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("cannot read '{}': {e}", file.display()))?;
    let workflow: Workflow = serde_json::from_str(&json)
        .map_err(|e| anyhow::anyhow!("'{}' is not a valid workflow: {e}", file.display()))?;
    Ok(workflow)
}

fn format_duration(duration_ms: Option<u64>) -> String {
    match duration_ms {
        Some(ms) if ms >= 1000 => format!("{:.1}s", ms as f64 / 1000.0),
        Some(ms) => format!("{ms}ms"),
        None => "-".to_string(),
    }
}

/// Build a minimal config from environment variables when no file exists.
fn create_env_config() -> anyhow::Result<WeftConfig> {
    let anthropic_key = std::env::var("ANTHROPIC_API_KEY").ok();
    let openai_key = std::env::var("OPENAI_API_KEY").ok();

    let (provider, model_id, api_key) = if let Some(key) = anthropic_key {
        (
            "anthropic".to_string(),
            "claude-sonnet-4-20250514".to_string(),
            Some(key),
        )
    } else if let Some(key) = openai_key {
        ("openai".to_string(), "gpt-4o".to_string(), Some(key))
    } else {
        anyhow::bail!("no config file found and no ANTHROPIC_API_KEY / OPENAI_API_KEY set");
    };

    let chat = ChatProviderConfig {
        provider,
        model_id,
        api_key,
        base_url: None,
        max_tokens: 4096,
        temperature: 0.7,
        timeout_secs: 30,
    };

    Ok(WeftConfig {
        database: Default::default(),
        chat,
        engine: Default::default(),
        gateway: None,
        agents: Vec::new(),
    })
}
