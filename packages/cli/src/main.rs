mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{delete, get, scene, set, DeleteArgs, GetArgs, SceneArgs, SetArgs};
use config::Config;

/// Composer CLI - inspect and edit scene and project documents
#[derive(Parser, Debug)]
#[command(name = "composer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the value at a path
    Get(GetArgs),

    /// Replace or insert a value, keeping comments and formatting
    Set(SetArgs),

    /// Remove the value at a path
    Delete(DeleteArgs),

    /// Edit a scene the way the editor does and save it
    Scene(SceneArgs),
}

fn init_tracing(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Cannot get current directory")?;
    let config = Config::load(&cwd)?;
    init_tracing(&config);

    match cli.command {
        Command::Get(args) => get(args, &config),
        Command::Set(args) => set(args, &config),
        Command::Delete(args) => delete(args, &config),
        Command::Scene(args) => {
            // editor state is single-threaded
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Cannot start async runtime")?;
            runtime.block_on(scene(args, &config))
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
