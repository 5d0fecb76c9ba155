//! Core bundler implementation
//!
//! Builds the module graph, routes every module into a chunk and writes the
//! output directory.

mod chunk;
mod graph;
pub mod output;
pub mod sourcemap;

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::BuildOptions;
use crate::config::{Config, SourcemapMode};
use crate::resolver::Resolver;
use crate::router::RuleTable;
use crate::utils::{clean_path, module_id, output_filename, path_to_module_id};

pub use chunk::{plan_chunks, Chunk, ChunkType};
pub use graph::{Module, ModuleGraph, ModuleId, ModuleType};

use sourcemap::MappedWriter;

/// Global registry shared by every chunk loaded into the page
const RUNTIME_HEADER: &str = r#"// webroot runtime
(function (g) {
  if (g.__webroot_require__) return;
  var modules = g.__webroot_modules__ = g.__webroot_modules__ || {};
  var cache = {};
  function load(id) {
    if (cache[id]) return cache[id].exports;
    var entry = modules[id];
    if (!entry) throw new Error("[webroot] module not loaded: " + id);
    var module = cache[id] = { exports: {} };
    entry[0].call(module.exports, module, module.exports, function (spec) {
      if (!Object.prototype.hasOwnProperty.call(entry[1], spec)) {
        throw new Error("[webroot] cannot resolve '" + spec + "' from " + id);
      }
      return load(entry[1][spec]);
    });
    return module.exports;
  }
  g.__webroot_require__ = load;
})(typeof globalThis !== "undefined" ? globalThis : window);
"#;

/// Result of a build operation
#[derive(Debug)]
pub struct BuildResult {
    /// Generated bundles, partitions first
    pub bundles: Vec<BundleInfo>,

    /// Asset manifest, by chunk name
    pub manifest: BTreeMap<String, ManifestEntry>,

    /// Number of modules in the graph
    pub module_count: usize,

    /// Output directory the bundles were written to
    pub out_dir: PathBuf,
}

/// Information about a generated bundle
#[derive(Debug)]
pub struct BundleInfo {
    /// Chunk name
    pub name: String,

    /// Type of the chunk this bundle was generated from
    pub chunk_type: ChunkType,

    /// Output file path
    pub output_path: PathBuf,

    /// Bundle size in bytes
    pub size: usize,

    /// Stylesheet emitted next to the bundle, if the chunk has CSS
    pub css_path: Option<PathBuf>,

    /// Source map path (if written to disk)
    pub sourcemap_path: Option<PathBuf>,

    /// Number of modules in the chunk
    pub module_count: usize,
}

/// One chunk in manifest.json
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    /// Script path relative to the output directory
    pub file: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,

    pub is_entry: bool,

    /// Scripts that must load before this one
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,

    /// Module identifiers bundled into this chunk
    pub modules: Vec<String>,
}

/// The main bundler
pub struct Bundler {
    /// Project configuration
    config: Arc<Config>,

    /// Build options
    options: BuildOptions,

    /// Canonical project root, the base of every module identifier
    root: PathBuf,

    /// Module resolver
    resolver: Resolver,

    /// Chunk routing rules, `None` when splitting is disabled
    rules: Option<RuleTable>,
}

impl Bundler {
    /// Create a new bundler instance
    pub fn new(config: Arc<Config>, options: BuildOptions) -> Result<Self> {
        let root = fs::canonicalize(&config.root)
            .with_context(|| format!("Failed to resolve project root: {}", config.root.display()))?;
        let rules = config.rule_table()?;

        Ok(Self {
            config,
            options,
            root,
            resolver: Resolver::new(),
            rules,
        })
    }

    /// Rule table in effect for this bundler
    pub fn rules(&self) -> Option<&RuleTable> {
        self.rules.as_ref()
    }

    /// Directory the build writes to, always absolute.
    ///
    /// A relative override is taken relative to the project root.
    pub fn out_dir(&self) -> PathBuf {
        match &self.options.outdir {
            Some(outdir) => {
                let joined = self.root.join(outdir);
                PathBuf::from(clean_path(&path_to_module_id(&joined)))
            }
            None => self.config.output_dir(),
        }
    }

    /// Build the project
    pub fn build(&self) -> Result<BuildResult> {
        let start = Instant::now();

        info!("Building module graph...");
        let mut graph = ModuleGraph::new();
        let entries = self.build_module_graph(&mut graph)?;

        info!("Routing {} modules into chunks...", graph.len());
        let chunks = plan_chunks(&graph, &entries, self.rules.as_ref());
        for chunk in &chunks {
            debug!("Chunk '{}': {} module(s)", chunk.name, chunk.len());
        }

        let out_dir = self.out_dir();
        output::prepare_out_dir(&out_dir, &self.root, self.options.empty_out_dir)?;

        info!("Writing bundles to {}", out_dir.display());
        let bundles = self.write_bundles(&graph, &chunks, &out_dir)?;
        output::copy_public_dir(&self.config.public_dir(), &out_dir)?;

        let manifest = self.generate_manifest(&graph, &chunks, &bundles, &out_dir)?;
        self.write_index_html(&bundles, &out_dir)?;

        debug!("Build completed in {:?}", start.elapsed());

        Ok(BuildResult {
            bundles,
            manifest,
            module_count: graph.len(),
            out_dir,
        })
    }

    /// Walk the import graph breadth-first from every entrypoint
    fn build_module_graph(&self, graph: &mut ModuleGraph) -> Result<Vec<(String, ModuleId)>> {
        let mut queue = VecDeque::new();
        let mut entries = Vec::new();

        for (name, path) in self.config.all_entrypoints() {
            debug!("Processing entrypoint: {} -> {}", name, path.display());
            let id = self.load_module(graph, &path, true, &mut queue)?;
            entries.push((name, id));
        }

        while let Some(id) = queue.pop_front() {
            let (path, dependencies) = match graph.get_module(id) {
                Some(module) => (module.path.clone(), module.dependencies.clone()),
                None => continue,
            };

            for specifier in dependencies {
                if let Some(resolved) = self.resolver.resolve(&specifier, &path)? {
                    let dep_id = self.load_module(graph, &resolved, false, &mut queue)?;
                    graph.add_dependency(id, specifier, dep_id);
                }
            }
        }

        Ok(entries)
    }

    /// Read a module into the graph, queueing it if it is new
    fn load_module(
        &self,
        graph: &mut ModuleGraph,
        path: &Path,
        is_entry: bool,
        queue: &mut VecDeque<ModuleId>,
    ) -> Result<ModuleId> {
        let canonical_path = fs::canonicalize(path)
            .with_context(|| format!("Failed to resolve module path: {}", path.display()))?;

        if let Some(id) = graph.get_module_id(&canonical_path) {
            if !is_entry {
                return Ok(id);
            }
        }

        let source = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read module: {}", canonical_path.display()))?;
        let module_type = Module::detect_type(&canonical_path);
        let dependencies = self.resolver.extract_dependencies(&source, &module_type);

        let known = graph.get_module_id(&canonical_path).is_some();
        let id = graph.add_module(Module {
            id: module_id(&self.root, &canonical_path),
            path: canonical_path,
            source,
            module_type,
            is_entry,
            dependencies,
        });

        if !known {
            queue.push_back(id);
        }

        Ok(id)
    }

    /// Write every chunk's script (and stylesheet) into the assets directory
    fn write_bundles(
        &self,
        graph: &ModuleGraph,
        chunks: &[Chunk],
        out_dir: &Path,
    ) -> Result<Vec<BundleInfo>> {
        let assets_dir = out_dir.join(&self.config.build.assets_dir);
        fs::create_dir_all(&assets_dir)
            .with_context(|| format!("Failed to create {}", assets_dir.display()))?;

        let mut bundles = Vec::new();

        for chunk in chunks {
            let (writer, css) = render_chunk(graph, chunk)?;

            let css_path = if css.is_empty() {
                None
            } else {
                let filename = output_filename(&chunk.name, css.as_bytes(), "css", self.config.build.hash);
                let path = assets_dir.join(filename);
                fs::write(&path, &css)
                    .with_context(|| format!("Failed to write stylesheet: {}", path.display()))?;
                Some(path)
            };

            let filename = output_filename(
                &chunk.name,
                writer.code().as_bytes(),
                "js",
                self.config.build.hash,
            );
            let output_path = assets_dir.join(&filename);
            let (mut code, map) = writer.finish(&filename);

            let sourcemap_path = match self.options.sourcemap {
                SourcemapMode::Off => None,
                SourcemapMode::Inline => {
                    code.push_str(&format!("//# sourceMappingURL={}\n", map.to_data_url()));
                    None
                }
                SourcemapMode::External | SourcemapMode::Hidden => {
                    let map_path = assets_dir.join(format!("{}.map", filename));
                    fs::write(&map_path, map.to_json_string())
                        .with_context(|| format!("Failed to write source map: {}", map_path.display()))?;
                    if self.options.sourcemap == SourcemapMode::External {
                        code.push_str(&format!("//# sourceMappingURL={}.map\n", filename));
                    }
                    Some(map_path)
                }
            };

            fs::write(&output_path, &code)
                .with_context(|| format!("Failed to write bundle: {}", output_path.display()))?;

            bundles.push(BundleInfo {
                name: chunk.name.clone(),
                chunk_type: chunk.chunk_type.clone(),
                output_path,
                size: code.len(),
                css_path,
                sourcemap_path,
                module_count: chunk.len(),
            });
        }

        Ok(bundles)
    }

    /// Generate the asset manifest
    fn generate_manifest(
        &self,
        graph: &ModuleGraph,
        chunks: &[Chunk],
        bundles: &[BundleInfo],
        out_dir: &Path,
    ) -> Result<BTreeMap<String, ManifestEntry>> {
        let partition_files: Vec<String> = bundles
            .iter()
            .filter(|b| b.chunk_type == ChunkType::Partition)
            .map(|b| relative_to(out_dir, &b.output_path))
            .collect();

        let mut manifest = BTreeMap::new();

        for (chunk, bundle) in chunks.iter().zip(bundles) {
            let modules = chunk
                .module_ids
                .iter()
                .filter_map(|&id| graph.get_module(id))
                .map(|m| m.id.clone())
                .collect();

            manifest.insert(
                chunk.name.clone(),
                ManifestEntry {
                    file: relative_to(out_dir, &bundle.output_path),
                    css: bundle.css_path.as_deref().map(|p| relative_to(out_dir, p)),
                    is_entry: chunk.is_entry(),
                    imports: if chunk.is_entry() {
                        partition_files.clone()
                    } else {
                        Vec::new()
                    },
                    modules,
                },
            );
        }

        if self.config.build.manifest {
            let manifest_path = out_dir.join("manifest.json");
            let manifest_json = serde_json::to_string_pretty(&manifest)?;
            fs::write(&manifest_path, manifest_json).context("Failed to write manifest.json")?;
        }

        Ok(manifest)
    }

    /// Write index.html with every chunk linked, partitions before entries
    fn write_index_html(&self, bundles: &[BundleInfo], out_dir: &Path) -> Result<()> {
        let source_path = self.root.join("index.html");
        let html = if source_path.is_file() {
            let html = fs::read_to_string(&source_path)
                .with_context(|| format!("Failed to read {}", source_path.display()))?;
            self.strip_entry_scripts(&html)
        } else {
            generate_default_index(&self.config.project.name)
        };

        let base = &self.config.build.public_url;
        let mut styles = String::new();
        let mut scripts = String::new();

        for bundle in bundles {
            if let Some(css) = &bundle.css_path {
                styles.push_str(&format!(
                    "    <link rel=\"stylesheet\" href=\"{}{}\">\n",
                    base,
                    relative_to(out_dir, css)
                ));
            }
            scripts.push_str(&format!(
                "    <script src=\"{}{}\"></script>\n",
                base,
                relative_to(out_dir, &bundle.output_path)
            ));
        }

        let html = insert_before(&html, "</head>", &styles);
        let html = insert_before(&html, "</body>", &scripts);

        let index_path = out_dir.join("index.html");
        fs::write(&index_path, html)
            .with_context(|| format!("Failed to write {}", index_path.display()))?;

        Ok(())
    }

    /// Remove `<script>` tags that load entry sources directly
    fn strip_entry_scripts(&self, html: &str) -> String {
        let mut html = html.to_string();

        for path in self.config.entrypoints.values() {
            let path = path.trim_start_matches("./").trim_start_matches('/');
            let pattern = format!(
                r#"<script[^>]*\ssrc=["'](?:\./|/)?{}["'][^>]*>\s*</script>\s*"#,
                regex::escape(path)
            );
            if let Ok(re) = Regex::new(&pattern) {
                html = re.replace_all(&html, "").into_owned();
            }
        }

        html
    }
}

/// Render a chunk's script and concatenated CSS
fn render_chunk(graph: &ModuleGraph, chunk: &Chunk) -> Result<(MappedWriter, String)> {
    let mut writer = MappedWriter::new();
    let mut css = String::new();

    writer.push_generated(RUNTIME_HEADER);

    for &id in &chunk.module_ids {
        let Some(module) = graph.get_module(id) else {
            continue;
        };

        let imports: BTreeMap<&str, &str> = graph
            .imports(id)
            .into_iter()
            .flatten()
            .filter_map(|(spec, dep)| graph.get_module(*dep).map(|m| (spec.as_str(), m.id.as_str())))
            .collect();
        let key = serde_json::to_string(&module.id)?;
        let import_map = serde_json::to_string(&imports)?;

        writer.push_generated(&format!(
            "globalThis.__webroot_modules__[{}] = [function (module, exports, require) {{",
            key
        ));
        match module.module_type {
            ModuleType::Css => {
                css.push_str(&format!("/* {} */\n{}\n", module.id, module.source));
            }
            ModuleType::Json => {
                writer.push_generated("module.exports =");
                writer.push_source(&module.id, &module.source);
                writer.push_generated(";");
            }
            _ => writer.push_source(&module.id, &module.source),
        }
        writer.push_generated(&format!("}}, {}];", import_map));
    }

    if chunk.is_entry() {
        if let Some(entry) = chunk.module_ids.first().and_then(|&id| graph.get_module(id)) {
            writer.push_generated(&format!(
                "globalThis.__webroot_require__({});",
                serde_json::to_string(&entry.id)?
            ));
        }
    }

    Ok((writer, css))
}

/// `/`-separated path of `path` relative to `base`
fn relative_to(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn insert_before(html: &str, tag: &str, content: &str) -> String {
    match html.rfind(tag) {
        Some(pos) => {
            let mut result = html.to_string();
            result.insert_str(pos, content);
            result
        }
        None => format!("{}{}", html, content),
    }
}

/// Generate a default index.html
fn generate_default_index(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>{}</title>
  </head>
  <body>
    <div id="app"></div>
  </body>
</html>
"#,
        title
    )
}
