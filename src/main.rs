use clap::{Parser, Subcommand};
use std::sync::Arc;

use hal_bot::infrastructure::adapters::ConsoleBroker;
use hal_bot::infrastructure::config::{BrokerKind, Config};
use hal_bot::infrastructure::storage::MemoryPrefStore;
use hal_bot::plugins::{attach_configured, register_builtins};
use hal_bot::{BotError, BotService, Broker, PrefStore, Registry, Router};

#[derive(Parser)]
#[command(name = "hal-bot")]
#[command(about = "A chat bot with pattern-routed plugins", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            if let Err(e) = run_bot(&cli.config).await {
                tracing::error!("Bot stopped: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("hal-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

async fn run_bot(config_path: &str) -> Result<(), BotError> {
    let config = if std::path::Path::new(config_path).exists() {
        Config::load(config_path)?
    } else {
        tracing::info!("No config at {}, using defaults", config_path);
        Config::load_env()
    };

    tracing::info!("Starting {}", config.bot.name);

    let registry = Arc::new(Registry::new());
    let store: Arc<dyn PrefStore> = Arc::new(MemoryPrefStore::new());

    register_builtins(&registry, Arc::clone(&store), &config.bot.prefix);
    let attached = attach_configured(&registry, store.as_ref(), &config.plugins.instances)?;
    tracing::info!(
        "Plugin registry ready: {} plugins, {} instances",
        registry.len_definitions(),
        attached.len()
    );

    let broker: Arc<dyn Broker> = match config.broker.kind {
        BrokerKind::Console => Arc::new(ConsoleBroker::new(config.broker.room.clone())),
    };

    BotService::new(Router::new(registry), broker).run().await
}

fn init_config() {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("Failed to render default config: {}", e),
    }
}
