//! mcpi - MCP server installer
//!
//! Usage:
//!   mcpi start                 # Serve the tools over stdio (MCP)
//!   mcpi list --refresh        # Discover servers and list the registry
//!   mcpi install <name>        # Install via npx, falling back to clone
//!   mcpi save-command <name> <command> [args...]

use std::collections::BTreeMap;
use std::io::Read;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use serde_json::Value;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcpi_core::config::Settings;
use mcpi_core::context::AppContext;
use mcpi_core::registry::ServerRecord;
use mcpi_core::router::{
    ConfigureArgs, InstallArgs, ParseConfigArgs, Router, SaveCommandArgs, ServerNameArgs,
    ToolCall, ToolResponse,
};
use mcpi_core::server::McpServer;

#[derive(Parser)]
#[command(name = "mcpi")]
#[command(about = "Install and configure MCP servers", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose logging (overridden by RUST_LOG)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the mcpi tools to an MCP client over stdio
    Start,

    /// List servers in the registry
    #[command(alias = "ls")]
    List {
        /// Query the package index before listing
        #[arg(long)]
        refresh: bool,

        /// Machine-readable JSON output
        #[arg(long)]
        json: bool,
    },

    /// Query the package index and merge new servers into the registry
    Discover,

    /// Install a registered server
    Install {
        /// Server name (a unique fragment also works)
        name: String,

        /// Clone and build instead of trying npx first
        #[arg(long)]
        clone: bool,
    },

    /// Add a server to the registry, replacing any entry with the same name
    Register {
        /// Server name
        name: String,

        /// Repository URL
        #[arg(short = 'r', long = "repo")]
        repo_url: String,

        /// Command that runs the server
        #[arg(short, long)]
        command: String,

        /// Short description
        #[arg(short, long)]
        description: String,

        /// Search keywords
        #[arg(short, long = "keyword", value_name = "KEYWORD")]
        keywords: Vec<String>,

        /// Shell commands run inside the clone instead of the npm build
        #[arg(short, long = "install-command", value_name = "COMMAND")]
        install_commands: Vec<String>,
    },

    /// Remove a server from the registry (exact name)
    #[command(alias = "rm")]
    Remove {
        /// Server name
        name: String,
    },

    /// Show a server's README with configuration guidance
    Configure {
        /// Server name (a unique fragment also works)
        name: String,

        /// What the server will be used for
        #[arg(short, long)]
        purpose: Option<String>,

        /// Original request to pass along
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Print a server's cached README
    Readme {
        /// Server name (a unique fragment also works)
        name: String,
    },

    /// Write a server's launch command into the host config
    SaveCommand {
        /// Server name
        name: String,

        /// Executable to launch
        command: String,

        /// Arguments passed to the command
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,

        /// Environment variable for the server (KEY=VALUE)
        #[arg(short, long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,
    },

    /// Validate a JSON config with an mcpServers object and merge it into the host config
    ParseConfig {
        /// File to read, or "-" for stdin
        file: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries protocol traffic in `start`
    let default_filter = if cli.debug { "mcpi=debug,info" } else { "mcpi=info,warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = Settings::load()
        .context("Failed to load settings")
        .and_then(AppContext::with_defaults)
        .and_then(|mut ctx| run_cli(&mut ctx, cli.command));
    log_failure(result)
}

/// Setup faults reach the log as well as the exit status.
fn log_failure(result: Result<()>) -> Result<()> {
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

fn run_cli(ctx: &mut AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Start => run_start(ctx)?,
        Commands::List { refresh, json } => run_list(ctx, refresh, json)?,
        Commands::Discover => run_discover(ctx),
        Commands::Install { name, clone } => {
            let response = Router::new(ctx).dispatch(ToolCall::InstallServer(InstallArgs {
                server_name: name,
                use_npx: !clone,
            }));
            print_response(&response);
            if let Some(Value::Array(warnings)) = response.data.get("warnings") {
                for warning in warnings.iter().filter_map(Value::as_str) {
                    println!("  ⚠ {}", warning);
                }
            }
        }
        Commands::Register {
            name,
            repo_url,
            command,
            description,
            keywords,
            install_commands,
        } => {
            let record = ServerRecord::new(name, repo_url, command)
                .with_description(description)
                .with_keywords(keywords)
                .with_install_commands(install_commands);
            let response = Router::new(ctx).dispatch(ToolCall::RegisterServer(record));
            print_response(&response);
        }
        Commands::Remove { name } => {
            let response = Router::new(ctx).dispatch(ToolCall::RemoveServer(ServerNameArgs {
                server_name: name,
            }));
            print_response(&response);
        }
        Commands::Configure {
            name,
            purpose,
            query,
        } => {
            let response = Router::new(ctx).dispatch(ToolCall::ConfigureServer(ConfigureArgs {
                server_name: name,
                purpose,
                query,
            }));
            print_response(&response);
            if response.success {
                if let Some(readme) = response.data.get("readmeContent").and_then(Value::as_str) {
                    println!();
                    println!("{}", readme);
                }
                if let Some(explanation) =
                    response.data.get("explanation").and_then(Value::as_str)
                {
                    println!();
                    println!("{}", style(explanation).dim());
                }
            }
        }
        Commands::Readme { name } => {
            let response = Router::new(ctx).dispatch(ToolCall::GetServerReadme(ServerNameArgs {
                server_name: name,
            }));
            match response.data.get("readmeContent").and_then(Value::as_str) {
                Some(readme) if response.success => println!("{}", readme),
                _ => print_response(&response),
            }
        }
        Commands::SaveCommand {
            name,
            command,
            args,
            env,
        } => {
            let env = match parse_env_pairs(&env) {
                Ok(env) => env,
                Err(message) => {
                    print_response(&ToolResponse::fail(message));
                    return Ok(());
                }
            };
            let response = Router::new(ctx).dispatch(ToolCall::SaveCommand(SaveCommandArgs {
                server_name: name,
                command,
                args,
                env,
            }));
            print_response(&response);
        }
        Commands::ParseConfig { file } => {
            let config = match read_input(&file) {
                Ok(config) => config,
                Err(e) => {
                    print_response(&ToolResponse::fail(format!("{:#}", e)));
                    return Ok(());
                }
            };
            let response =
                Router::new(ctx).dispatch(ToolCall::ParseConfig(ParseConfigArgs { config }));
            print_response(&response);
        }
    }
    Ok(())
}

fn run_start(ctx: &mut AppContext) -> Result<()> {
    ctx.populate();

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    McpServer::new(ctx)
        .run(stdin.lock(), stdout.lock())
        .context("stdio transport failed")
}

fn run_list(ctx: &mut AppContext, refresh: bool, json: bool) -> Result<()> {
    if refresh || ctx.registry().is_empty() {
        ctx.populate();
    }

    let servers: Vec<&ServerRecord> = ctx.registry().list().collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&servers)?);
        return Ok(());
    }

    if servers.is_empty() {
        println!("No servers registered.");
        println!("Discover some with: mcpi discover");
        return Ok(());
    }

    println!("{:<45} {:<8} Description", "Name", "README");
    println!("{}", "-".repeat(90));
    for server in servers {
        let readme = if server.has_readme() { "yes" } else { "-" };
        println!(
            "{:<45} {:<8} {}",
            server.name, readme, server.description
        );
    }
    Ok(())
}

fn run_discover(ctx: &mut AppContext) {
    match ctx.try_populate() {
        Ok(report) => {
            println!(
                "{} Discovered {} new servers, backfilled {} READMEs",
                style("✓").green(),
                report.added.len(),
                report.readme_backfilled.len()
            );
            for name in &report.added {
                println!("  + {}", name);
            }
            println!("  Registry holds {} servers", ctx.registry().len());
        }
        Err(e) => print_response(&ToolResponse::from_error(&e)),
    }
}

fn print_response(response: &ToolResponse) {
    if response.success {
        println!("{} {}", style("✓").green(), response.message);
    } else {
        println!("{} {}", style("✗").red(), response.message);
    }
}

fn parse_env_pairs(pairs: &[String]) -> std::result::Result<BTreeMap<String, String>, String> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(format!("Invalid env '{}', expected KEY=VALUE", pair)),
        })
        .collect()
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read config from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))
    }
}
