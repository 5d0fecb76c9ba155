//! Development server
//!
//! Provides a local server with:
//! - Static serving of the build output, falling back to index.html
//! - File watching and auto-rebuild
//! - A JSON build status endpoint at `/__webroot/status`

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Json, Router};
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use parking_lot::RwLock;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, error, info};

use crate::bundler::Bundler;
use crate::cli::{BuildOptions, DevServerOptions};
use crate::config::Config;
use crate::utils::{format_duration, is_within};

/// Outcome of the most recent build, served as JSON
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStatus {
    /// Number of builds run since the server started
    pub builds: u64,

    pub duration_ms: u128,

    /// Chunk names written by the last successful build
    pub chunks: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type SharedStatus = Arc<RwLock<BuildStatus>>;

/// Development server
pub struct DevServer {
    /// Project configuration
    config: Arc<Config>,

    /// Server options
    options: DevServerOptions,
}

impl DevServer {
    /// Create a new development server
    pub fn new(config: Arc<Config>, options: DevServerOptions) -> Self {
        Self { config, options }
    }

    /// Build once, then serve the output directory until Ctrl+C
    pub async fn start(&self) -> Result<()> {
        let bundler = Arc::new(Bundler::new(
            self.config.clone(),
            BuildOptions::from_config(&self.config),
        )?);
        let out_dir = bundler.out_dir();
        let status: SharedStatus = Arc::new(RwLock::new(BuildStatus::default()));

        {
            let bundler = bundler.clone();
            let status = status.clone();
            tokio::task::spawn_blocking(move || run_build(&bundler, &status)).await?;
        }

        if self.options.watch {
            self.setup_file_watcher(bundler.clone(), status.clone(), out_dir.clone())?;
        }

        let index = ServeFile::new(out_dir.join("index.html"));
        let app = Router::new()
            .route("/__webroot/status", get(build_status))
            .fallback_service(ServeDir::new(&out_dir).fallback(index))
            .layer(CorsLayer::permissive())
            .with_state(status);

        let listener = tokio::net::TcpListener::bind((self.options.host.as_str(), self.options.port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind {}:{} (is another server using the port?)",
                    self.options.host, self.options.port
                )
            })?;

        let url = format!("http://{}:{}", self.options.host, self.options.port);
        info!("Serving {} at {}", out_dir.display(), url);

        if self.options.open {
            if let Err(e) = webbrowser_open(&url) {
                debug!("Failed to open browser: {}", e);
            }
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }

    /// Rebuild whenever a project file changes
    fn setup_file_watcher(
        &self,
        bundler: Arc<Bundler>,
        status: SharedStatus,
        out_dir: PathBuf,
    ) -> Result<()> {
        let root = self.config.root.clone();

        let (tx, rx) = std::sync::mpsc::channel();
        let mut debouncer = new_debouncer(Duration::from_millis(100), tx)?;
        debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;

        // The debouncer is moved into the thread to keep it alive
        std::thread::spawn(move || {
            let _debouncer = debouncer;

            loop {
                match rx.recv() {
                    Ok(Ok(events)) => {
                        let changed: Vec<&Path> = events
                            .iter()
                            .map(|event| event.path.as_path())
                            .filter(|path| should_rebuild(path, &out_dir))
                            .collect();

                        if let Some(first) = changed.first() {
                            eprintln!(
                                "  {} File changed: {}",
                                "↻".yellow(),
                                first.display().to_string().dimmed()
                            );
                            run_build(&bundler, &status);
                        }
                    }
                    Ok(Err(e)) => {
                        error!("Watch error: {:?}", e);
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(())
    }
}

/// Changes to the output, dependencies or VCS metadata never trigger a rebuild
fn should_rebuild(path: &Path, out_dir: &Path) -> bool {
    if is_within(path, out_dir) {
        return false;
    }

    !path.components().any(|c| {
        matches!(c, Component::Normal(name) if name == "node_modules" || name == ".git")
    })
}

/// Run a build and record the outcome; failures keep the server running
fn run_build(bundler: &Bundler, status: &RwLock<BuildStatus>) {
    let start = Instant::now();
    let result = bundler.build();
    let elapsed = start.elapsed();

    let mut status = status.write();
    status.builds += 1;
    status.duration_ms = elapsed.as_millis();

    match result {
        Ok(result) => {
            eprintln!(
                "  {} Built {} chunk(s) in {}",
                "✓".green(),
                result.bundles.len(),
                format_duration(elapsed)
            );
            status.chunks = result.bundles.into_iter().map(|b| b.name).collect();
            status.error = None;
        }
        Err(e) => {
            error!("Build failed: {:#}", e);
            status.error = Some(format!("{:#}", e));
        }
    }
}

async fn build_status(State(status): State<SharedStatus>) -> Json<BuildStatus> {
    Json(status.read().clone())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
}

/// Open URL in browser (simple implementation)
fn webbrowser_open(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_rebuild() {
        let out = Path::new("/work/webui/dist");
        assert!(should_rebuild(Path::new("/work/webui/src/main.js"), out));
        assert!(!should_rebuild(Path::new("/work/webui/dist/assets/main.js"), out));
        assert!(!should_rebuild(Path::new("/work/webui/node_modules/mdui/mdui.js"), out));
        assert!(!should_rebuild(Path::new("/work/webui/.git/index"), out));
    }

    #[test]
    fn test_status_serializes_without_error() {
        let status = BuildStatus {
            builds: 2,
            duration_ms: 15,
            chunks: vec!["mdui".to_string(), "vendor".to_string(), "main".to_string()],
            error: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["builds"], 2);
        assert_eq!(json["chunks"][0], "mdui");
        assert!(json.get("error").is_none());
    }
}
