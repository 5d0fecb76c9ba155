//! Build command implementation

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::bundler::{Bundler, ChunkType};
use crate::config::{Config, SourcemapMode};
use crate::utils::{format_duration, format_size};

/// Build the project into the output directory
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Output directory (overrides build.out_dir)
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,

    /// Source maps: true, false, inline or hidden (overrides build.sourcemap)
    #[arg(long)]
    pub sourcemap: Option<SourcemapMode>,

    /// Keep existing files in the output directory
    #[arg(long)]
    pub no_empty_out_dir: bool,
}

impl BuildCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        let start = Instant::now();

        info!("Loading configuration from {}", config_path);
        let config = Config::load(config_path)?;
        let options = self.options(&config)?;

        let bundler = Bundler::new(Arc::new(config), options)?;

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
        spinner.set_message("Building project...");
        spinner.enable_steady_tick(Duration::from_millis(80));

        let result = tokio::task::spawn_blocking(move || bundler.build()).await?;
        spinner.finish_and_clear();
        let result = result?;

        eprintln!(
            "{} Built {} chunk(s) from {} module(s) in {}\n",
            "✓".green().bold(),
            result.bundles.len(),
            result.module_count,
            format_duration(start.elapsed())
        );

        for bundle in &result.bundles {
            let kind = match bundle.chunk_type {
                ChunkType::Entry => "entry",
                ChunkType::Partition => "partition",
            };
            let path = bundle
                .output_path
                .strip_prefix(&result.out_dir)
                .unwrap_or(&bundle.output_path);

            eprintln!(
                "  {} {} {} {}",
                "•".dimmed(),
                path.display().to_string().cyan(),
                format_size(bundle.size).dimmed(),
                format!("({}, {} modules)", kind, bundle.module_count).dimmed()
            );
        }

        eprintln!("\n  {} {}\n", "→".blue(), result.out_dir.display());

        Ok(())
    }

    /// Merge command-line overrides into the configured build settings.
    ///
    /// `--outdir` is relative to the working directory, like any other path
    /// given on the command line.
    pub fn options(&self, config: &Config) -> Result<BuildOptions> {
        let mut options = BuildOptions::from_config(config);
        if let Some(outdir) = &self.outdir {
            let cwd = std::env::current_dir().context("Failed to read the working directory")?;
            options.outdir = Some(cwd.join(outdir));
        }
        if let Some(sourcemap) = self.sourcemap {
            options.sourcemap = sourcemap;
        }
        if self.no_empty_out_dir {
            options.empty_out_dir = Some(false);
        }
        Ok(options)
    }
}

/// Build options resolved from config and command arguments
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Output directory override, relative paths are taken from the project root
    pub outdir: Option<PathBuf>,
    pub sourcemap: SourcemapMode,
    pub empty_out_dir: Option<bool>,
}

impl BuildOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            outdir: None,
            sourcemap: config.build.sourcemap,
            empty_out_dir: config.build.empty_out_dir,
        }
    }
}
