use anyhow::Context;
use clap::{Parser, Subcommand};
use cmdb_migrator::utils::{CONFIG_FILE, DEFAULT_DATA_DIR};
use cmdb_migrator::{
    create_registry, read_config, ExecutionContext, FileStore, MigrationExecutor, MigratorConfig,
};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// CMDB Migrator - applies pending database migrations in version order
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the database file
    #[arg(short, long, env = "CMDB_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Configuration file. Defaults to migrator.json inside the data directory.
    #[arg(short, long, env = "CMDB_MIGRATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Tenant the migration runs for (overrides the config file)
    #[arg(long, env = "CMDB_TENANT")]
    tenant: Option<String>,

    /// Acting user recorded by migration steps (overrides the config file)
    #[arg(long, env = "CMDB_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply every migration newer than the recorded version
    Upgrade,
    /// Re-apply a single migration without touching the recorded version
    UpgradeVersion {
        /// Version of the registered migration to run
        version: String,
    },
    /// Show the recorded version and pending migrations
    Status,
    /// List every registered migration version in execution order
    Versions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| args.data_dir.join(CONFIG_FILE));
    let mut config = read_config(&config_path)
        .await
        .with_context(|| format!("reading config {}", config_path.display()))?
        .unwrap_or_else(MigratorConfig::default);
    if let Some(tenant) = args.tenant {
        config.tenant_id = tenant;
    }
    if let Some(user) = args.user {
        config.user = user;
    }

    // A malformed migration version must stop start-up.
    let rules = config
        .version_rules()
        .with_context(|| format!("invalid config {}", config_path.display()))?;
    let registry = create_registry(rules).map_err(|e| {
        error!(error = %e, "Invalid migration registration");
        e
    })?;
    let executor = MigrationExecutor::new(registry)
        .with_installation(config.distro.clone(), config.distro_version.clone());

    let store = FileStore::open(&args.data_dir)
        .await
        .with_context(|| format!("opening store in {}", args.data_dir.display()))?;

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt, stopping after the current migration...");
            let _ = shutdown_tx.send(true);
        }
    });
    let ctx = ExecutionContext::with_shutdown(shutdown_rx);
    let run = config.run_configuration();

    match args.command {
        Command::Upgrade => match executor.upgrade(&ctx, &store, None, None, &run).await {
            Ok(result) => {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            Err(e) => {
                error!(
                    current_version = %e.current_version,
                    finished = ?e.finished_versions,
                    error = %e,
                    "Upgrade failed"
                );
                return Err(e.into());
            }
        },
        Command::UpgradeVersion { version } => {
            executor
                .upgrade_specific_version(&ctx, &store, None, None, &run, &version)
                .await?;
            info!(version = %version, "Migration re-applied");
        }
        Command::Status => {
            let status = executor.status(&store).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Versions => {
            for version in executor.registry().versions() {
                println!("{}", version);
            }
        }
    }

    Ok(())
}
