//! Module graph data structures

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Unique identifier for a module
pub type ModuleId = usize;

/// Types of modules the bundler can handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleType {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
    Css,
    Json,
    Unknown,
}

impl ModuleType {
    /// Determine module type from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" => ModuleType::JavaScript,
            "ts" | "mts" | "cts" => ModuleType::TypeScript,
            "jsx" => ModuleType::Jsx,
            "tsx" => ModuleType::Tsx,
            "css" => ModuleType::Css,
            "json" => ModuleType::Json,
            _ => ModuleType::Unknown,
        }
    }

    /// Check if this is a JavaScript-like module
    pub fn is_js_like(&self) -> bool {
        matches!(
            self,
            ModuleType::JavaScript | ModuleType::TypeScript | ModuleType::Jsx | ModuleType::Tsx
        )
    }
}

/// A module in the dependency graph
#[derive(Debug, Clone)]
pub struct Module {
    /// Absolute, canonical path to the module
    pub path: PathBuf,

    /// Root-relative identifier, the key used for routing and at runtime
    pub id: String,

    /// Original source code
    pub source: String,

    /// Module type
    pub module_type: ModuleType,

    /// Whether this is an entry point
    pub is_entry: bool,

    /// Import specifiers found in this module
    pub dependencies: Vec<String>,
}

impl Module {
    /// Detect module type from path
    pub fn detect_type(path: &Path) -> ModuleType {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(ModuleType::from_extension)
            .unwrap_or(ModuleType::Unknown)
    }
}

/// The module dependency graph
#[derive(Debug, Default)]
pub struct ModuleGraph {
    /// All modules indexed by their ID
    modules: HashMap<ModuleId, Module>,

    /// Map from path to module ID
    path_to_id: HashMap<PathBuf, ModuleId>,

    /// Resolved imports: module ID -> specifier -> dependency ID
    edges: HashMap<ModuleId, BTreeMap<String, ModuleId>>,

    /// Next available module ID
    next_id: ModuleId,
}

impl ModuleGraph {
    /// Create a new empty module graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module to the graph
    pub fn add_module(&mut self, module: Module) -> ModuleId {
        if let Some(&id) = self.path_to_id.get(&module.path) {
            if module.is_entry {
                if let Some(existing) = self.modules.get_mut(&id) {
                    existing.is_entry = true;
                }
            }
            return id;
        }

        let id = self.next_id;
        self.next_id += 1;

        self.path_to_id.insert(module.path.clone(), id);
        self.modules.insert(id, module);
        self.edges.insert(id, BTreeMap::new());

        id
    }

    /// Record that `from` imports `to` under `specifier`
    pub fn add_dependency(&mut self, from: ModuleId, specifier: String, to: ModuleId) {
        if let Some(deps) = self.edges.get_mut(&from) {
            deps.insert(specifier, to);
        }
    }

    /// Get module ID from path
    pub fn get_module_id(&self, path: &Path) -> Option<ModuleId> {
        self.path_to_id.get(path).copied()
    }

    /// Get a module by ID
    pub fn get_module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(&id)
    }

    /// Get all module IDs in insertion order
    pub fn all_module_ids(&self) -> Vec<ModuleId> {
        let mut ids: Vec<ModuleId> = self.modules.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Get all modules reachable from a given module (BFS, deterministic order)
    pub fn get_reachable_modules(&self, start: ModuleId) -> Vec<ModuleId> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::new();

        queue.push_back(start);
        visited.insert(start);

        while let Some(id) = queue.pop_front() {
            result.push(id);

            if let Some(deps) = self.edges.get(&id) {
                for &dep_id in deps.values() {
                    if visited.insert(dep_id) {
                        queue.push_back(dep_id);
                    }
                }
            }
        }

        result
    }

    /// Resolved imports of a module, keyed by specifier
    pub fn imports(&self, id: ModuleId) -> Option<&BTreeMap<String, ModuleId>> {
        self.edges.get(&id)
    }

    /// Total number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
