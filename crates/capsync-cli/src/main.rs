use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "capsync")]
#[command(about = "Subscription capacity sync operator CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env -> overrides).
    /// Defaults to $CAPSYNC_CONFIG, then config/base.yaml.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash,

    /// Subscription definition registry queries
    Registry {
        #[command(subcommand)]
        cmd: RegistryCmd,
    },

    /// Offering catalog commands
    Offering {
        #[command(subcommand)]
        cmd: OfferingCmd,
    },

    /// Capacity record commands
    Capacity {
        #[command(subcommand)]
        cmd: CapacityCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum RegistryCmd {
    /// Print the definitions matching exactly one lookup key.
    Lookup {
        #[command(flatten)]
        key: LookupKey,

        /// Read definitions from this directory instead of the configured one.
        #[arg(long)]
        definitions_dir: Option<PathBuf>,
    },

    /// List every declared service type.
    ServiceTypes {
        #[arg(long)]
        definitions_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct LookupKey {
    /// Variant tag (e.g. "RHEL for x86")
    #[arg(long)]
    pub tag: Option<String>,

    /// Engineering product id
    #[arg(long)]
    pub engineering_id: Option<i32>,

    /// System-purpose role
    #[arg(long)]
    pub role: Option<String>,

    /// Marketing product name
    #[arg(long)]
    pub product_name: Option<String>,
}

#[derive(Subcommand)]
enum OfferingCmd {
    /// Fetch one SKU from the catalog, persist it if changed and reconcile
    /// capacity for its subscriptions.
    Sync { sku: String },
}

#[derive(Subcommand)]
enum CapacityCmd {
    /// Reconcile capacity records for one subscription.
    Reconcile { subscription_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    let paths = commands::resolve_config_paths(cli.config_paths);

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => commands::db::status(&paths).await?,
            DbCmd::Migrate => commands::db::migrate(&paths).await?,
        },

        Commands::ConfigHash => {
            let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
            let loaded = capsync_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Registry { cmd } => match cmd {
            RegistryCmd::Lookup {
                key,
                definitions_dir,
            } => {
                let registry = commands::registry::load(definitions_dir, &paths)?;
                commands::registry::lookup(&registry, &key)?;
            }
            RegistryCmd::ServiceTypes { definitions_dir } => {
                let registry = commands::registry::load(definitions_dir, &paths)?;
                for service_type in registry.all_service_types() {
                    println!("{service_type}");
                }
            }
        },

        Commands::Offering { cmd } => match cmd {
            OfferingCmd::Sync { sku } => commands::capacity::sync_offering(&paths, &sku).await?,
        },

        Commands::Capacity { cmd } => match cmd {
            CapacityCmd::Reconcile { subscription_id } => {
                commands::capacity::reconcile_subscription(&paths, &subscription_id).await?
            }
        },
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
