//! Command-line interface for webroot
//!
//! Provides the main CLI structure using clap with subcommands for:
//! - `build`: Production build
//! - `dev`: Development server with rebuild on change
//! - `route`: Show which chunk a module identifier lands in
//! - `init`: Project scaffolding

mod build;
mod dev;
mod init;
mod route;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

pub use build::{BuildCommand, BuildOptions};
pub use dev::{DevCommand, DevServerOptions};
pub use init::InitCommand;
pub use route::RouteCommand;

/// webroot - build a web UI into a fixed output directory with predictable chunks
#[derive(Parser, Debug)]
#[command(name = "webroot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to webroot.toml config file
    #[arg(short, long, global = true, default_value = crate::config::CONFIG_FILE)]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the project into the output directory
    Build(BuildCommand),

    /// Build, serve and rebuild on change
    Dev(DevCommand),

    /// Print the chunk each module identifier is routed to
    Route(RouteCommand),

    /// Initialize a new project
    Init(InitCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Build(cmd) => {
                print_banner();
                cmd.execute(&self.config).await
            }
            Commands::Dev(cmd) => {
                print_banner();
                cmd.execute(&self.config).await
            }
            // Route output is meant for piping; keep stdout and stderr clean
            Commands::Route(cmd) => cmd.execute(&self.config),
            Commands::Init(cmd) => {
                print_banner();
                cmd.execute()
            }
        }
    }
}

/// Print the webroot banner
fn print_banner() {
    eprintln!(
        "\n{} {}\n",
        "webroot".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
