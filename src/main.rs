use clap::{Parser, Subcommand};
use sentinela_config::Configs;
use sentinela_controller::{Controller, ProceduresRunner, TriggerLoop};
use sentinela_executor::Executor;
use sentinela_monitor::MonitorRegistry;
use sentinela_queue::internal::InternalQueue;
use sentinela_queue::Queue;
use sentinela_reactions::slack::SlackReaction;
use sentinela_reactions::{PluginActionRegistry, ReactionRegistry};
use sentinela_store::memory::InMemoryStore;
use sentinela_store::Store;
use sentinela_task::TaskManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Sentinela monitoring orchestration service", long_about = None)]
struct Cli {
    /// Path to the YAML configs file (overrides CONFIGS_FILE).
    #[clap(long, value_name = "PATH")]
    config: Option<String>,

    #[clap(subcommand)]
    role: Option<Role>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Run only the Controller role (trigger loop + procedures + admin HTTP API).
    Controller,
    /// Run only the Executor role (queue worker pool).
    Executor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let configs = match &cli.config {
        Some(path) => Configs::load_from(path)?,
        None => Configs::load()?,
    };

    init_tracing(&configs.logging);

    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let queue: Arc<dyn Queue> = Arc::new(InternalQueue::new(Duration::from_secs(configs.executor_sleep.max(1))));
    queue.init().await?;

    let registry = Arc::new(MonitorRegistry::new());
    let reactions = build_reaction_registry();
    let plugins = Arc::new(PluginActionRegistry::new());
    let task_manager = TaskManager::new();

    let run_controller = cli.role.is_none() || cli.role == Some(Role::Controller);
    let run_executor = cli.role.is_none() || cli.role == Some(Role::Executor);

    let schedule = sentinela_core::cron::CronSchedule::parse(&configs.controller_process_schedule, parse_tz(&configs.time_zone))
        .map_err(|e| anyhow::anyhow!("invalid controller_process_schedule: {e}"))?;
    let trigger_loop = Arc::new(TriggerLoop::new(store.clone(), queue.clone(), registry.clone(), schedule));
    let procedures = Arc::new(ProceduresRunner::new(store.clone(), configs.controller_procedures.clone()));
    let controller = Arc::new(Controller::new(trigger_loop, procedures));

    let timeouts = sentinela_core::options::ExecutionTimeouts {
        monitor: Duration::from_secs(configs.executor_monitor_timeout),
        reaction: Duration::from_secs(configs.executor_reaction_timeout),
        request: Duration::from_secs(configs.executor_request_timeout),
        monitor_heartbeat: Duration::from_secs(configs.executor_monitor_heartbeat_time),
    };
    let executor = Arc::new(Executor::new(
        store.clone(),
        queue.clone(),
        registry.clone(),
        reactions,
        plugins,
        task_manager.clone(),
        timeouts,
        configs.max_issues_creation,
        configs.executor_concurrency,
    ));

    let http_controller = if run_controller { Some(controller.clone()) } else { None };
    let http_executor = if run_executor { Some(executor.clone()) } else { None };
    let app_state = sentinela_http::AppState {
        store: store.clone(),
        queue: queue.clone(),
        registry: registry.clone(),
        controller: http_controller,
        executor: http_executor,
        metrics: Arc::new(prometheus_client::registry::Registry::default()),
        diagnostics_grace: chrono::Duration::seconds(30),
    };
    let router = sentinela_http::router(app_state);
    let http_addr = format!("0.0.0.0:{}", configs.http_server.port);

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = ctrl_c_tx.send(());
    });

    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    info!(addr = %http_addr, "admin HTTP API listening");

    let http_server = async {
        if let Err(error) = axum::serve(listener, router).with_graceful_shutdown(wait_for(shutdown_tx.subscribe())).await {
            error!(%error, "http server failed");
        }
    };

    let controller_run = async {
        if run_controller {
            controller.run(Duration::from_secs(1), wait_for(shutdown_tx.subscribe())).await;
        }
    };

    let executor_run = async {
        if run_executor {
            executor.run(wait_for(shutdown_tx.subscribe())).await;
        }
    };

    let task_manager_run = task_manager.run(wait_for(shutdown_tx.subscribe()));

    tokio::join!(http_server, controller_run, executor_run, task_manager_run);

    info!("sentinela shutdown complete");
    Ok(())
}

/// Turns one shutdown broadcast receiver into a plain `Future<Output = ()>`
/// every role's `run` accepts, so a single `ctrl_c` listener fans out to all
/// of them.
async fn wait_for(mut rx: tokio::sync::broadcast::Receiver<()>) {
    let _ = rx.recv().await;
}

fn build_reaction_registry() -> Arc<ReactionRegistry> {
    let mut registry = ReactionRegistry::new();
    if let Ok(webhook) = std::env::var("SLACK_WEBHOOK_URL") {
        registry.register("slack", Arc::new(SlackReaction::new(webhook)));
    }
    Arc::new(registry)
}

fn parse_tz(name: &str) -> chrono_tz::Tz {
    name.parse().unwrap_or(chrono_tz::UTC)
}

fn init_tracing(logging: &sentinela_config::LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match logging {
        sentinela_config::LoggingConfig::Json { .. } => {
            tracing_subscriber::fmt().with_env_filter(filter).json().init();
        }
        sentinela_config::LoggingConfig::Friendly { .. } => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
