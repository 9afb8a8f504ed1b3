use clap::{Parser, Subcommand};

mod cli;
mod config;
mod error;
mod resolve;
mod ssh;
mod swarm;

pub use error::{DsexecError, Result};

use cli::commands;
use config::Settings;

#[derive(Parser)]
#[command(name = "dsexec")]
#[command(about = "Reach containers and nodes of a Docker Swarm over SSH")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command (a shell by default) inside a container
    Exec {
        /// Node name, service name or container id
        target: String,

        /// Only consider containers whose id starts with this prefix
        #[arg(short, long)]
        container: Option<String>,

        /// Print the docker command instead of running it
        #[arg(short, long)]
        print: bool,

        /// Command to run, after `--`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Start a tool container sharing a container's network and pid namespaces
    Run {
        /// Node name, service name or container id
        target: String,

        #[arg(short, long)]
        container: Option<String>,

        /// Tool image (netshoot unless configured)
        #[arg(short, long)]
        image: Option<String>,

        #[arg(short, long)]
        print: bool,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show container stats of a node
    Stats {
        /// Node name
        node: String,

        /// Print a single snapshot
        #[arg(long)]
        no_stream: bool,

        #[arg(short, long)]
        print: bool,
    },

    /// Stop a container, letting the orchestrator reschedule it
    Stop {
        /// Node name, service name or container id
        target: String,

        #[arg(short, long)]
        container: Option<String>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,

        #[arg(short, long)]
        print: bool,
    },

    /// Scale a service
    Scale {
        /// Service name
        service: String,

        /// Desired number of replicas
        replicas: u32,

        #[arg(short, long)]
        print: bool,
    },

    /// Open a local shell with DOCKER_HOST pointing at the target's node
    Env {
        /// Node name, service name or container id
        target: String,

        #[arg(short, long)]
        container: Option<String>,

        /// Print an export line instead of starting a shell
        #[arg(short, long)]
        print: bool,
    },

    /// Show where a target lives without connecting
    Resolve {
        /// Node name, service name or container id
        target: String,

        #[arg(short, long)]
        container: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record the host key of an SSH address in known_hosts
    Trust {
        /// host, host:port or [host]:port
        address: String,
    },

    /// Configure CLI and check prerequisites
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Check prerequisites and install the SSH alias config
    Init,

    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        match e.downcast_ref::<DsexecError>() {
            Some(err) => {
                eprintln!("Error: {}", err);
                std::process::exit(err.exit_code());
            }
            None => {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Commands::Config { command } = &cli.command {
        match command {
            ConfigCommands::Init => commands::config::init()?,
            ConfigCommands::Show => commands::config::show()?,
        }
        return Ok(());
    }

    let settings = Settings::load()?;

    match cli.command {
        Commands::Exec {
            target,
            container,
            print,
            command,
        } => commands::exec::execute(&settings, target, container, command, print).await?,
        Commands::Run {
            target,
            container,
            image,
            print,
            command,
        } => {
            commands::run::execute(&settings, target, container, image, command, print).await?
        }
        Commands::Stats {
            node,
            no_stream,
            print,
        } => commands::stats::execute(&settings, node, no_stream, print).await?,
        Commands::Stop {
            target,
            container,
            force,
            print,
        } => commands::stop::execute(&settings, target, container, force, print).await?,
        Commands::Scale {
            service,
            replicas,
            print,
        } => commands::scale::execute(&settings, service, replicas, print).await?,
        Commands::Env {
            target,
            container,
            print,
        } => commands::env::execute(&settings, target, container, print).await?,
        Commands::Resolve {
            target,
            container,
            json,
        } => commands::resolve::execute(&settings, target, container, json).await?,
        Commands::Trust { address } => commands::trust::execute(&settings, address).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
