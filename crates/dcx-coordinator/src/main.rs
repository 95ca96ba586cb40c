//! dcx sandbox
//!
//! Runs the display context coordinator against simulated display workers on
//! an in-process broker and store, and prints what happened as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dcx_core::config::{self, CoordinatorConfig};
use dcx_core::traits::MessageBroker;
use dcx_core::types::{Bounds, LayoutMap, WindowLayout};
use dcx_coordinator::memory::{MemoryBroker, MemoryStore};
use dcx_coordinator::sim::SimulatedWorker;
use dcx_coordinator::{Activation, CloseOutcome, ContextRegistry};
use dcx_protocol::topic;

#[derive(Parser)]
#[command(name = "dcx")]
#[command(author, version, about = "Display context coordinator sandbox")]
#[command(propagate_version = true)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Simulated display workers to start
    #[arg(
        long,
        global = true,
        value_delimiter = ',',
        default_value = "left,right"
    )]
    workers: Vec<String>,

    /// Contexts the simulated workers already remember (one window each)
    #[arg(long, global = true, value_delimiter = ',')]
    seed: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every context the workers know about
    List,

    /// Make a context the active one
    Activate {
        /// Context name
        name: String,
        /// Reload every pane of an existing context
        #[arg(long)]
        reset: bool,
    },

    /// Close a context on every worker
    Close {
        /// Context name
        name: String,
    },

    /// Hide every window and clear the active context
    HideAll,

    /// Show the focused window
    Focus,

    /// Walk through create, pane creation and worker removal
    Demo {
        /// Context name
        #[arg(default_value = "demo")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config: CoordinatorConfig = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_path();
        if default_path.exists() {
            config::load_config(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                CoordinatorConfig::default()
            })
        } else {
            tracing::debug!("Using default configuration");
            CoordinatorConfig::default()
        }
    };

    let broker = Arc::new(MemoryBroker::new());
    let workers = start_workers(&broker, &config, &args.workers, &args.seed);
    tracing::info!("Started {} simulated display workers", workers.len());

    let registry = ContextRegistry::connect(config, broker.clone(), Arc::new(MemoryStore::new()))
        .context("Invalid coordinator configuration")?;

    let output = match args.command {
        Commands::List => json!({ "contexts": registry.list_contexts().await? }),

        Commands::Activate { name, reset } => {
            let (context, activation, outcome) = registry.activate(&name, None, reset).await?;
            json!({
                "context": name,
                "activation": activation_json(&activation),
                "outcome": outcome.map(|o| format!("{:?}", o)),
                "windows": context.windows(),
            })
        }

        Commands::Close { name } => match registry.close(&name).await? {
            CloseOutcome::Closed { details } => json!({ "context": name, "closed": details }),
            CloseOutcome::Hidden { displays } => json!({ "context": name, "hiddenBy": displays }),
        },

        Commands::HideAll => {
            registry.hide_all().await?;
            json!({ "active": registry.active_context().await? })
        }

        Commands::Focus => json!({ "focus": registry.focused_window().await? }),

        Commands::Demo { name } => run_demo(&registry, &broker, &workers, &name).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Bind one simulated worker per display name
fn start_workers(
    broker: &Arc<MemoryBroker>,
    config: &CoordinatorConfig,
    names: &[String],
    seed: &[String],
) -> Vec<Arc<SimulatedWorker>> {
    names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let screen = Bounds::new(1920.0 * index as f64, 0.0, 1920.0, 1080.0);
            let worker = Arc::new(SimulatedWorker::with_screen(name.clone(), screen));
            for context in seed {
                worker.seed_window(context, &format!("{}-main", name), screen);
            }
            broker.bind(&config.reply_channel(name), worker.clone());
            worker
        })
        .collect()
}

fn activation_json(activation: &Activation) -> Value {
    match activation {
        Activation::AlreadyActive => json!("already-active"),
        Activation::Switched { previous } => json!({ "previous": previous }),
    }
}

/// Create a context with one window per worker, put a pane in each, then take
/// the first worker away and report what the context lost
async fn run_demo(
    registry: &ContextRegistry,
    broker: &Arc<MemoryBroker>,
    workers: &[Arc<SimulatedWorker>],
    name: &str,
) -> Result<Value> {
    let first = workers
        .first()
        .context("The demo needs at least one worker")?;

    let layout: LayoutMap = workers
        .iter()
        .enumerate()
        .map(|(index, worker)| {
            let bounds = Bounds::new(1920.0 * index as f64, 0.0, 1280.0, 720.0);
            (
                format!("{}-main", worker.display_name()),
                WindowLayout::new(worker.display_name(), bounds),
            )
        })
        .collect();

    let context = registry.create(name, Some(layout.clone())).await?;

    let (quit_tx, mut quit_rx) = tokio::sync::mpsc::unbounded_channel();
    context
        .on_quit(move |quit| {
            let _ = quit_tx.send(quit.clone());
        })
        .await;

    let mut panes = Vec::new();
    for window_name in layout.keys() {
        let pane = context
            .create_pane(window_name, json!({ "url": "about:blank" }))
            .await?;
        panes.push(pane.pane_id);
    }

    broker
        .publish(topic::DISPLAY_REMOVED, json!(first.display_name()))
        .await?;
    let quit = tokio::time::timeout(std::time::Duration::from_secs(1), quit_rx.recv())
        .await
        .context("Removal was not observed")?;

    Ok(json!({
        "context": name,
        "active": registry.active_context().await?,
        "createdPanes": panes,
        "removed": quit.map(|q| json!({
            "displayName": q.display_name,
            "closedWindows": q.closed_windows,
            "closedViewObjects": q.closed_view_objects,
        })),
        "remainingWindows": context.windows(),
        "remainingPanes": context.panes(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox(
        names: &[&str],
        seed: &[&str],
    ) -> (Arc<MemoryBroker>, Vec<Arc<SimulatedWorker>>, ContextRegistry) {
        let config = CoordinatorConfig::default();
        let broker = Arc::new(MemoryBroker::new());
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let seed: Vec<String> = seed.iter().map(|s| s.to_string()).collect();
        let workers = start_workers(&broker, &config, &names, &seed);
        let registry =
            ContextRegistry::connect(config, broker.clone(), Arc::new(MemoryStore::new())).unwrap();
        (broker, workers, registry)
    }

    #[test]
    fn test_args_parse_worker_list_and_subcommand() {
        let args =
            Args::try_parse_from(["dcx", "--workers", "a,b,c", "activate", "alpha", "--reset"])
                .unwrap();
        assert_eq!(args.workers, vec!["a", "b", "c"]);
        assert!(matches!(
            args.command,
            Commands::Activate { ref name, reset: true } if name == "alpha"
        ));

        let args = Args::try_parse_from(["dcx", "demo"]).unwrap();
        assert_eq!(args.workers, vec!["left", "right"]);
        assert!(matches!(args.command, Commands::Demo { ref name } if name == "demo"));
    }

    #[tokio::test]
    async fn test_seeded_contexts_are_listed() {
        let (_, _, registry) = sandbox(&["left", "right"], &["alpha", "beta"]);
        let contexts = registry.list_contexts().await.unwrap();
        assert_eq!(contexts, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[tokio::test]
    async fn test_demo_reports_what_the_removed_worker_took() {
        let (broker, workers, registry) = sandbox(&["left", "right"], &[]);

        let output = run_demo(&registry, &broker, &workers, "demo").await.unwrap();

        assert_eq!(output["active"], "demo");
        assert_eq!(output["createdPanes"].as_array().unwrap().len(), 2);
        assert_eq!(output["removed"]["displayName"], "left");
        assert_eq!(output["removed"]["closedWindows"], json!(["left-main"]));
        assert_eq!(output["remainingWindows"].as_array().unwrap().len(), 1);
        assert_eq!(output["remainingPanes"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_demo_needs_a_worker() {
        let (broker, workers, registry) = sandbox(&[], &[]);
        assert!(run_demo(&registry, &broker, &workers, "demo").await.is_err());
    }
}
