use clap::Parser;
use shard_scaling::config::{self, ClusterOptions, Role, RuntimeOptions, SystemHost};
use shard_scaling::lifecycle::{setup_tracing, ShardingSystem};
use tracing::{error, info};

/// Sharded shopping-cart workload node.
#[derive(Parser)]
#[command(name = "shard-scaling")]
#[command(about = "Hosts customer entities and, on frontends, produces purchase bursts", long_about = None)]
#[command(version)]
struct Cli {
    /// Run the producer on this node.
    #[arg(long, env = "IS_FRONTEND")]
    frontend: bool,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(flatten)]
    cluster: ClusterOptions,

    #[command(flatten)]
    runtime: RuntimeOptions,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    setup_tracing(&cli.log_level);

    let role = Role::from_is_frontend(cli.frontend);
    let plan = config::plan(role, &cli.cluster, &SystemHost).map_err(|e| {
        error!(error = %e, "Invalid cluster configuration");
        e.to_string()
    })?;

    let system = ShardingSystem::start(&plan, cli.runtime.system_settings());

    // Single-process substrate: this node is a member as soon as it is running.
    system.membership.mark_up();

    tokio::signal::ctrl_c().await.map_err(|e| e.to_string())?;
    info!("Ctrl-C received");

    system.shutdown().await
}
