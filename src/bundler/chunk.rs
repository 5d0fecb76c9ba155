//! Chunk planning
//!
//! Every module is routed once through the rule table. Application modules
//! are copied into each entry chunk that reaches them; routed modules are
//! collected into one chunk per partition.

use std::collections::HashMap;

use crate::router::{PartitionName, RuleTable};

use super::{ModuleGraph, ModuleId};

/// Type of chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkType {
    /// Entry point chunk, executes its entry module when loaded
    Entry,
    /// Partition chunk, only registers modules for entry chunks to require
    Partition,
}

/// A chunk is a group of modules that will be bundled together
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk name (used for output filename)
    pub name: String,

    /// Type of chunk
    pub chunk_type: ChunkType,

    /// Module IDs included in this chunk; for entries the entry module is first
    pub module_ids: Vec<ModuleId>,
}

impl Chunk {
    /// Create a new entry chunk
    pub fn entry(name: String, module_ids: Vec<ModuleId>) -> Self {
        Self {
            name,
            chunk_type: ChunkType::Entry,
            module_ids,
        }
    }

    /// Create a new partition chunk
    pub fn partition(name: &PartitionName, module_ids: Vec<ModuleId>) -> Self {
        Self {
            name: name.to_string(),
            chunk_type: ChunkType::Partition,
            module_ids,
        }
    }

    pub fn is_entry(&self) -> bool {
        self.chunk_type == ChunkType::Entry
    }

    /// Check if chunk is empty
    pub fn is_empty(&self) -> bool {
        self.module_ids.is_empty()
    }

    /// Number of modules in chunk
    pub fn len(&self) -> usize {
        self.module_ids.len()
    }
}

/// Split the graph into entry and partition chunks.
///
/// Partition chunks come first, in rule table order, then entry chunks in
/// the order given. Entry modules always stay in their own entry chunk.
/// Partitions that receive no modules are not emitted.
pub fn plan_chunks(
    graph: &ModuleGraph,
    entries: &[(String, ModuleId)],
    rules: Option<&RuleTable>,
) -> Vec<Chunk> {
    let mut routed: HashMap<ModuleId, &PartitionName> = HashMap::new();

    if let Some(table) = rules {
        for id in graph.all_module_ids() {
            let Some(module) = graph.get_module(id) else {
                continue;
            };
            if module.is_entry {
                continue;
            }
            if let Some(partition) = table.route(&module.id) {
                routed.insert(id, partition);
            }
        }
    }

    let mut chunks = Vec::new();

    if let Some(table) = rules {
        for partition in table.partitions() {
            let mut members: Vec<ModuleId> = routed
                .iter()
                .filter(|(_, p)| **p == partition)
                .map(|(&id, _)| id)
                .collect();

            members.sort_by(|a, b| module_key(graph, *a).cmp(module_key(graph, *b)));

            let chunk = Chunk::partition(partition, members);
            if !chunk.is_empty() {
                chunks.push(chunk);
            }
        }
    }

    for (name, entry_id) in entries {
        let module_ids = graph
            .get_reachable_modules(*entry_id)
            .into_iter()
            .filter(|id| !routed.contains_key(id))
            .collect();

        chunks.push(Chunk::entry(name.clone(), module_ids));
    }

    chunks
}

fn module_key(graph: &ModuleGraph, id: ModuleId) -> &str {
    graph.get_module(id).map(|m| m.id.as_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::bundler::{Module, ModuleType};
    use crate::router::{MatchStrategy, PartitionRule, Predicate};

    fn add(graph: &mut ModuleGraph, id: &str, is_entry: bool) -> ModuleId {
        graph.add_module(Module {
            path: PathBuf::from(format!("/app{}", id)),
            id: id.to_string(),
            source: String::new(),
            module_type: ModuleType::JavaScript,
            is_entry,
            dependencies: vec![],
        })
    }

    fn names(graph: &ModuleGraph, chunk: &Chunk) -> Vec<String> {
        chunk
            .module_ids
            .iter()
            .map(|&id| graph.get_module(id).unwrap().id.clone())
            .collect()
    }

    fn sample_graph() -> (ModuleGraph, ModuleId) {
        let mut graph = ModuleGraph::new();
        let main = add(&mut graph, "/src/main.js", true);
        let button = add(&mut graph, "/src/Button.js", false);
        let mdui = add(&mut graph, "/node_modules/mdui/core.js", false);
        let icons = add(&mut graph, "/node_modules/mdui-icons/icon.js", false);
        let lodash = add(&mut graph, "/node_modules/lodash/index.js", false);

        graph.add_dependency(main, "./Button".to_string(), button);
        graph.add_dependency(main, "mdui".to_string(), mdui);
        graph.add_dependency(button, "lodash".to_string(), lodash);
        graph.add_dependency(button, "mdui-icons".to_string(), icons);

        (graph, main)
    }

    #[test]
    fn test_default_policy() {
        let (graph, main) = sample_graph();
        let table = RuleTable::default();
        let chunks = plan_chunks(&graph, &[("main".to_string(), main)], Some(&table));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].name, "mdui");
        assert_eq!(
            names(&graph, &chunks[0]),
            vec!["/node_modules/mdui-icons/icon.js", "/node_modules/mdui/core.js"]
        );
        assert_eq!(chunks[1].name, "vendor");
        assert_eq!(names(&graph, &chunks[1]), vec!["/node_modules/lodash/index.js"]);
        assert_eq!(chunks[2].name, "main");
        assert!(chunks[2].is_entry());
        assert_eq!(names(&graph, &chunks[2]), vec!["/src/main.js", "/src/Button.js"]);
    }

    #[test]
    fn test_segment_policy_moves_lookalike_to_vendor() {
        let (graph, main) = sample_graph();
        let table = RuleTable::new(
            Predicate::new(MatchStrategy::Segment, "node_modules").unwrap(),
            vec![PartitionRule::new(
                Predicate::new(MatchStrategy::Segment, "mdui").unwrap(),
                PartitionName::new("mdui").unwrap(),
            )],
            PartitionName::new("vendor").unwrap(),
        )
        .unwrap();

        let chunks = plan_chunks(&graph, &[("main".to_string(), main)], Some(&table));
        assert_eq!(names(&graph, &chunks[0]), vec!["/node_modules/mdui/core.js"]);
        assert_eq!(
            names(&graph, &chunks[1]),
            vec!["/node_modules/lodash/index.js", "/node_modules/mdui-icons/icon.js"]
        );
    }

    #[test]
    fn test_no_rules_keeps_everything_in_entry() {
        let (graph, main) = sample_graph();
        let chunks = plan_chunks(&graph, &[("main".to_string(), main)], None);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 5);
    }

    #[test]
    fn test_empty_partitions_are_skipped() {
        let mut graph = ModuleGraph::new();
        let main = add(&mut graph, "/src/main.js", true);
        let lodash = add(&mut graph, "/node_modules/lodash/index.js", false);
        graph.add_dependency(main, "lodash".to_string(), lodash);

        let table = RuleTable::default();
        let chunks = plan_chunks(&graph, &[("main".to_string(), main)], Some(&table));
        let chunk_names: Vec<&str> = chunks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(chunk_names, vec!["vendor", "main"]);
    }

    #[test]
    fn test_entry_module_is_never_routed_away() {
        let mut graph = ModuleGraph::new();
        let main = add(&mut graph, "/node_modules/app-shell/main.js", true);

        let table = RuleTable::default();
        let chunks = plan_chunks(&graph, &[("main".to_string(), main)], Some(&table));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].module_ids, vec![main]);
    }

    #[test]
    fn test_shared_application_module_lands_in_each_entry() {
        let mut graph = ModuleGraph::new();
        let a = add(&mut graph, "/src/a.js", true);
        let b = add(&mut graph, "/src/b.js", true);
        let shared = add(&mut graph, "/src/shared.js", false);
        graph.add_dependency(a, "./shared".to_string(), shared);
        graph.add_dependency(b, "./shared".to_string(), shared);

        let chunks = plan_chunks(
            &graph,
            &[("a".to_string(), a), ("b".to_string(), b)],
            Some(&RuleTable::default()),
        );
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.module_ids.contains(&shared)));
    }
}
