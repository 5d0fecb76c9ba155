//! Development server command implementation

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::config::Config;
use crate::server::DevServer;

/// Build, serve and rebuild on change
#[derive(Args, Debug)]
pub struct DevCommand {
    /// Port to run the dev server on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,

    /// Do not rebuild on file changes
    #[arg(long)]
    pub no_watch: bool,
}

impl DevCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        info!("Loading configuration from {}", config_path);
        let config = Config::load(config_path)?;
        let options = self.options(&config);

        eprintln!(
            "{} Starting dev server at {}\n",
            "→".blue(),
            format!("http://{}:{}", options.host, options.port).cyan().underline()
        );

        if options.watch {
            eprintln!("  {} Rebuild on change {}", "•".dimmed(), "enabled".green());
        }

        eprintln!("  {} Press {} to stop\n", "•".dimmed(), "Ctrl+C".yellow());

        let server = DevServer::new(Arc::new(config), options);
        server.start().await
    }

    fn options(&self, config: &Config) -> DevServerOptions {
        DevServerOptions {
            host: self.host.clone().unwrap_or_else(|| config.server.host.clone()),
            port: self.port.unwrap_or(config.server.port),
            open: self.open || config.server.open,
            watch: config.server.watch && !self.no_watch,
        }
    }
}

/// Development server options
#[derive(Debug, Clone)]
pub struct DevServerOptions {
    pub host: String,
    pub port: u16,
    pub open: bool,
    pub watch: bool,
}
