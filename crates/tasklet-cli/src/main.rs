//! Tasklet CLI: run the server or drive workflows from the terminal.
//!
//! Reuses the engine (tasklet-core) and the HTTP bootstrap (tasklet-server)
//! so a workflow behaves the same in the terminal as over HTTP.

mod commands;

use clap::{Parser, Subcommand};

/// Tasklet: suspendable, interactive workflow tasks
#[derive(Parser)]
#[command(name = "tasklet", version, about = "Tasklet: suspendable, interactive workflow tasks")]
pub struct Cli {
    /// Path to the engine config file (YAML)
    #[arg(long, env = "TASKLET_CONFIG", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Tasklet HTTP server
    Server {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value_t = 5005)]
        port: u16,
    },

    /// List and run workflows
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Send a raw JSON-RPC request
    Rpc {
        /// JSON-RPC method name (e.g. "workflows.list")
        #[arg(long)]
        method: String,
        /// JSON-RPC params as a JSON string
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// List registered workflows
    List,
    /// Run a workflow interactively in the terminal
    Run {
        /// Workflow name (see `tasklet workflow list`)
        name: String,
        /// Free-text input for workflows that take one
        #[arg(long, short = 'i')]
        input: Option<String>,
        /// Model selector for workflows that take one
        #[arg(long, short = 'm')]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // The server installs its own, more verbose subscriber.
    if !matches!(cli.command, Some(Commands::Server { .. })) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "tasklet_core=warn,tasklet_cli=info".into()),
            )
            .with_writer(std::io::stderr)
            .try_init();
    }

    let result = match cli.command {
        Some(Commands::Server { host, port }) => commands::server::run(host, port, config).await,

        Some(Commands::Workflow { action }) => {
            let state = commands::init_state(config);
            match action {
                WorkflowAction::List => commands::workflow::list(&state).await,
                WorkflowAction::Run { name, input, model } => {
                    commands::workflow::run(&state, &name, input, model).await
                }
            }
        }

        Some(Commands::Rpc { method, params }) => {
            let state = commands::init_state(config);
            commands::rpc::call(&state, &method, &params).await
        }

        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
