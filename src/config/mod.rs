//! Configuration handling for webroot
//!
//! Parses and manages webroot.toml configuration files.

mod schema;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::router::{is_valid_chunk_name, RuleTable};
use crate::utils::clean_path;

pub use schema::*;

/// Default config file name
pub const CONFIG_FILE: &str = "webroot.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project metadata
    pub project: ProjectConfig,

    /// Entry points for bundling, by chunk name
    #[serde(default)]
    pub entrypoints: BTreeMap<String, String>,

    /// Output and chunking configuration
    #[serde(default)]
    pub build: BuildConfig,

    /// Development server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Root directory (computed from config file location)
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Load configuration from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let canonical_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let content = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read config file: {}", canonical_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", canonical_path.display()))?;

        // Set root directory to the directory containing the config file
        let root = canonical_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        config.root = fs::canonicalize(&root)
            .with_context(|| format!("Failed to resolve project root: {}", root.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Create a default configuration mirroring the stock webui layout
    pub fn default_config() -> Self {
        Self {
            project: ProjectConfig {
                name: "webui".to_string(),
                version: "0.1.0".to_string(),
            },
            entrypoints: BTreeMap::from([("main".to_string(), "src/main.js".to_string())]),
            build: BuildConfig {
                out_dir: "../module/webroot".to_string(),
                empty_out_dir: Some(true),
                ..BuildConfig::default()
            },
            server: ServerConfig {
                open: true,
                ..ServerConfig::default()
            },
            root: PathBuf::from("."),
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.entrypoints.is_empty() {
            return Err(ConfigError::NoEntrypoints);
        }

        for (name, path) in &self.entrypoints {
            if !is_valid_chunk_name(name) {
                return Err(ConfigError::InvalidEntrypointName(name.clone()));
            }

            let full_path = self.root.join(path);
            if !full_path.exists() {
                return Err(ConfigError::MissingEntrypoint {
                    name: name.clone(),
                    path: full_path,
                });
            }
        }

        if let Some(table) = self.build.chunks.rule_table()? {
            if let Some(clash) = table
                .partitions()
                .find(|p| self.entrypoints.contains_key(p.as_str()))
            {
                return Err(ConfigError::PartitionShadowsEntry(clash.to_string()));
            }
        }

        Ok(())
    }

    /// Compile the chunk rules, `None` when splitting is disabled
    pub fn rule_table(&self) -> Result<Option<RuleTable>> {
        self.build
            .chunks
            .rule_table()
            .context("Invalid [build.chunks] configuration")
    }

    /// Get the absolute output directory path, with `.` and `..` folded
    pub fn output_dir(&self) -> PathBuf {
        let joined = self.root.join(&self.build.out_dir);
        PathBuf::from(clean_path(&joined.to_string_lossy()))
    }

    /// Directory whose contents are copied into the output as-is
    pub fn public_dir(&self) -> PathBuf {
        self.root.join(&self.build.public_dir)
    }

    /// Get all entrypoint paths
    pub fn all_entrypoints(&self) -> Vec<(String, PathBuf)> {
        self.entrypoints
            .iter()
            .map(|(name, path)| (name.clone(), self.root.join(path)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_project(config: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.js"), "console.log('hi');").unwrap();
        fs::write(dir.path().join(CONFIG_FILE), config).unwrap();
        dir
    }

    #[test]
    fn test_load_stock_layout() {
        let dir = write_project(
            r#"
            [project]
            name = "webui"

            [entrypoints]
            main = "src/main.js"

            [build]
            out_dir = "../module/webroot"
            empty_out_dir = true
            sourcemap = false

            [[build.chunks.rules]]
            name = "mdui"
            pattern = "mdui"

            [server]
            port = 1234
            open = true
            "#,
        );

        let config = Config::load(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.build.empty_out_dir, Some(true));
        assert_eq!(config.build.sourcemap, SourcemapMode::Off);
        assert_eq!(config.server.port, 1234);
        assert!(config.server.open);
        assert_eq!(
            config.output_dir(),
            dir.path().parent().unwrap().join("module/webroot")
        );

        let table = config.rule_table().unwrap().unwrap();
        assert_eq!(
            table.route("/node_modules/mdui/core.js").map(|p| p.as_str()),
            Some("mdui")
        );
    }

    #[test]
    fn test_defaults() {
        let dir = write_project(
            r#"
            [project]
            name = "app"

            [entrypoints]
            main = "src/main.js"
            "#,
        );

        let config = Config::load(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.build.out_dir, "dist");
        assert_eq!(config.build.empty_out_dir, None);
        assert_eq!(config.build.assets_dir, "assets");
        assert_eq!(config.server.port, 1234);
        assert_eq!(config.server.host, "localhost");
        assert!(!config.server.open);
        assert!(config.build.chunks.enabled);
    }

    #[test]
    fn test_missing_entrypoint() {
        let dir = write_project(
            r#"
            [project]
            name = "app"

            [entrypoints]
            main = "src/missing.js"
            "#,
        );

        let err = Config::load(dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(err.to_string().contains("non-existent file"));
    }

    #[test]
    fn test_partition_shadowing_entry_rejected() {
        let dir = write_project(
            r#"
            [project]
            name = "app"

            [entrypoints]
            vendor = "src/main.js"
            "#,
        );

        let err = Config::load(dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::PartitionShadowsEntry(name)) if name == "vendor"
        ));
    }

    #[test]
    fn test_entrypoint_name_must_be_a_file_stem() {
        let dir = write_project(
            r#"
            [project]
            name = "app"

            [entrypoints]
            "../escape" = "src/main.js"
            "#,
        );

        let err = Config::load(dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidEntrypointName(name)) if name == "../escape"
        ));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let dir = write_project(
            r#"
            [project]
            name = "app"

            [entrypoints]
            main = "src/main.js"

            [[build.chunks.rules]]
            name = "ui"
            pattern = "(mdui"
            match = "regex"
            "#,
        );

        let err = Config::load(dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default_config()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.build.out_dir, "../module/webroot");
        assert_eq!(parsed.build.chunks.rules.len(), 1);
        assert_eq!(parsed.build.chunks.rules[0].name, "mdui");
    }
}
