use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config listing the reference personas.
    Init {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the gateway: accept messages from the bridge and answer them through the persona backends.
    Serve {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the persona routing table.
    Personas {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Send one message straight to a persona backend and print the reply.
    Ask {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Persona name as configured (e.g. maya).
        #[arg(long)]
        persona: String,

        /// Sender identifier the backend keys the conversation on.
        #[arg(long, value_name = "ID")]
        user: String,

        /// Message text.
        message: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Personas { config }) => {
            if let Err(e) = run_personas(config) {
                log::error!("personas failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask {
            config,
            persona,
            user,
            message,
        }) => {
            if let Err(e) = run_ask(config, &persona, &user, &message).await {
                eprintln!("ask failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{} with config {}",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    lib::gateway::run_gateway(config).await
}

fn run_personas(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let router = lib::routing::PersonaRouter::from_config(&config, reqwest::Client::new())?;
    if router.is_empty() {
        println!("no personas configured");
        return Ok(());
    }
    for (address, persona) in router.entries() {
        println!(
            "{:<24} {:<12} {}  (voice: {})",
            address,
            persona.name(),
            persona.chat_url(),
            persona.voice_url()
        );
    }
    Ok(())
}

async fn run_ask(
    config_path: Option<PathBuf>,
    persona_name: &str,
    user: &str,
    message: &str,
) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let route = config
        .persona_by_name(persona_name)
        .ok_or_else(|| anyhow::anyhow!("unknown persona: {}", persona_name))?;
    let router = lib::routing::PersonaRouter::from_config(&config, reqwest::Client::new())?;
    let persona = router
        .resolve(&route.address)
        .ok_or_else(|| anyhow::anyhow!("persona {} has no route", persona_name))?;
    let reply = persona.send(message, user).await?;
    println!("{}", reply.msg);
    Ok(())
}
