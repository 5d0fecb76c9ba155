//! Configuration schema definitions

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::router::{MatchStrategy, PartitionName, PartitionRule, Predicate, RuleTable};

/// Project metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Build output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Output directory, relative to the project root
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Remove everything in `out_dir` before writing.
    ///
    /// Unset means "only when `out_dir` is inside the project root".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_out_dir: Option<bool>,

    /// Source map emission
    #[serde(default)]
    pub sourcemap: SourcemapMode,

    /// Subdirectory of `out_dir` that receives chunk files
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    /// Directory copied verbatim into `out_dir`
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// Public URL prefix for assets
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Hash chunk file names for cache busting
    #[serde(default = "default_true")]
    pub hash: bool,

    /// Generate manifest.json
    #[serde(default = "default_true")]
    pub manifest: bool,

    /// Chunk partitioning rules
    #[serde(default)]
    pub chunks: ChunksConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            empty_out_dir: None,
            sourcemap: SourcemapMode::default(),
            assets_dir: default_assets_dir(),
            public_dir: default_public_dir(),
            public_url: default_public_url(),
            hash: true,
            manifest: true,
            chunks: ChunksConfig::default(),
        }
    }
}

fn default_out_dir() -> String {
    "dist".to_string()
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

fn default_public_dir() -> String {
    "public".to_string()
}

fn default_public_url() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

/// Source map emission mode
///
/// Accepts `false`, `true`, `"inline"` or `"hidden"` in `webroot.toml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSourcemap", into = "RawSourcemap")]
pub enum SourcemapMode {
    #[default]
    Off,
    /// Separate `.map` file referenced by a comment
    External,
    /// Map embedded as a base64 data URL
    Inline,
    /// Separate `.map` file without a reference comment
    Hidden,
}

impl std::str::FromStr for SourcemapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "false" | "off" => Ok(SourcemapMode::Off),
            "true" | "external" => Ok(SourcemapMode::External),
            "inline" => Ok(SourcemapMode::Inline),
            "hidden" => Ok(SourcemapMode::Hidden),
            other => Err(format!(
                "unknown sourcemap mode '{}' (expected true, false, inline or hidden)",
                other
            )),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawSourcemap {
    Flag(bool),
    Mode(String),
}

impl TryFrom<RawSourcemap> for SourcemapMode {
    type Error = String;

    fn try_from(raw: RawSourcemap) -> Result<Self, Self::Error> {
        match raw {
            RawSourcemap::Flag(false) => Ok(SourcemapMode::Off),
            RawSourcemap::Flag(true) => Ok(SourcemapMode::External),
            RawSourcemap::Mode(mode) => mode.parse(),
        }
    }
}

impl From<SourcemapMode> for RawSourcemap {
    fn from(mode: SourcemapMode) -> Self {
        match mode {
            SourcemapMode::Off => RawSourcemap::Flag(false),
            SourcemapMode::External => RawSourcemap::Flag(true),
            SourcemapMode::Inline => RawSourcemap::Mode("inline".to_string()),
            SourcemapMode::Hidden => RawSourcemap::Mode("hidden".to_string()),
        }
    }
}

/// A pattern plus the strategy used to match it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub pattern: String,

    #[serde(rename = "match", default)]
    pub strategy: MatchStrategy,
}

impl MatcherConfig {
    pub fn contains(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            strategy: MatchStrategy::Contains,
        }
    }

    fn compile(&self) -> Result<Predicate, ConfigError> {
        Predicate::new(self.strategy, &self.pattern)
    }
}

/// A named library rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRuleConfig {
    /// Partition the matching modules are emitted into
    pub name: String,

    #[serde(flatten)]
    pub matcher: MatcherConfig,
}

/// Chunk partitioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunksConfig {
    /// Split third-party code out of the entry chunks
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Marks a module as third-party
    #[serde(default = "default_third_party")]
    pub third_party: MatcherConfig,

    /// Named library rules, evaluated in order
    #[serde(default = "default_rules")]
    pub rules: Vec<ChunkRuleConfig>,

    /// Partition for third-party modules no rule claims
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

impl Default for ChunksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            third_party: default_third_party(),
            rules: default_rules(),
            fallback: default_fallback(),
        }
    }
}

impl ChunksConfig {
    /// Compile into a rule table, or `None` when splitting is disabled
    pub fn rule_table(&self) -> Result<Option<RuleTable>, ConfigError> {
        if !self.enabled {
            return Ok(None);
        }

        let rules = self
            .rules
            .iter()
            .map(|rule| {
                Ok(PartitionRule::new(
                    rule.matcher.compile()?,
                    PartitionName::new(rule.name.as_str())?,
                ))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        RuleTable::new(
            self.third_party.compile()?,
            rules,
            PartitionName::new(self.fallback.as_str())?,
        )
        .map(Some)
    }
}

fn default_third_party() -> MatcherConfig {
    MatcherConfig::contains("node_modules")
}

fn default_rules() -> Vec<ChunkRuleConfig> {
    vec![ChunkRuleConfig {
        name: "mdui".to_string(),
        matcher: MatcherConfig::contains("mdui"),
    }]
}

fn default_fallback() -> String {
    "vendor".to_string()
}

/// Development server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to run dev server on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Open browser automatically
    #[serde(default)]
    pub open: bool,

    /// Rebuild when project files change
    #[serde(default = "default_true")]
    pub watch: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            open: false,
            watch: true,
        }
    }
}

fn default_port() -> u16 {
    1234
}

fn default_host() -> String {
    "localhost".to_string()
}
