//! Path-keyed summary of a project's import graph.
//!
//! Unlike the [`crate::Script`] tree, every module appears once here, so
//! the graph can be checked for cycles and ordered before anything is
//! transpiled.

use std::collections::{HashMap, HashSet, VecDeque};

use dynscript_transpile::ScriptTarget;
use tracing::{debug, debug_span};

use crate::error::LoaderError;
use crate::path::{ScriptPath, RECOGNIZED_EXTENSIONS};
use crate::resolver::DependencyResolver;
use crate::scanner::scan;
use crate::source::SourceAsset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub path: ScriptPath,
    /// Import specifiers as written, in source order
    pub specifiers: Vec<String>,
    /// Resolved files, parallel to `specifiers`
    pub dependencies: Vec<ScriptPath>,
}

#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    modules: HashMap<ScriptPath, ModuleNode>,
    /// Insertion order, so iteration and sorting are deterministic
    order: Vec<ScriptPath>,
    entry: Option<ScriptPath>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Breadth-first discovery from `entry`. Each file is read and scanned
    /// once. Unresolvable imports fail exactly as they would while
    /// preparing the module tree.
    pub fn discover(
        entry: ScriptPath,
        resolver: &dyn DependencyResolver,
        target: ScriptTarget,
    ) -> Result<Self, LoaderError> {
        let _span = debug_span!("discover", entry = %entry).entered();

        let mut graph = DepGraph::new();
        graph.set_entry(entry.clone());
        let mut queued: HashSet<ScriptPath> = HashSet::from([entry.clone()]);
        let mut queue = VecDeque::from([entry]);

        while let Some(path) = queue.pop_front() {
            let asset = SourceAsset::read(path.clone())?;
            let specifiers = scan(&path, asset.text(), target)?;
            let mut dependencies = Vec::with_capacity(specifiers.len());
            for specifier in &specifiers {
                let mut dependency = resolver.resolve(&path, specifier).ok_or_else(|| {
                    LoaderError::UnresolvedDependency {
                        specifier: specifier.clone(),
                        from: path.clone(),
                    }
                })?;
                if !dependency.has_extension(RECOGNIZED_EXTENSIONS) {
                    dependency.resolve_extension()?;
                }
                if queued.insert(dependency.clone()) {
                    queue.push_back(dependency.clone());
                }
                dependencies.push(dependency);
            }
            graph.add_module(path, specifiers, dependencies);
        }

        debug!(modules = graph.len(), "discovered graph");
        Ok(graph)
    }

    pub fn set_entry(&mut self, path: ScriptPath) {
        self.entry = Some(path);
    }

    pub fn entry(&self) -> Option<&ScriptPath> {
        self.entry.as_ref()
    }

    pub fn add_module(
        &mut self,
        path: ScriptPath,
        specifiers: Vec<String>,
        dependencies: Vec<ScriptPath>,
    ) {
        if !self.modules.contains_key(&path) {
            self.order.push(path.clone());
        }
        let node = ModuleNode {
            path: path.clone(),
            specifiers,
            dependencies,
        };
        self.modules.insert(path, node);
    }

    pub fn get_module(&self, path: &ScriptPath) -> Option<&ModuleNode> {
        self.modules.get(path)
    }

    pub fn contains(&self, path: &ScriptPath) -> bool {
        self.modules.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Modules in discovery order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode> {
        self.order.iter().filter_map(|path| self.modules.get(path))
    }

    /// Fails with the first cycle found, listed from the module that closes
    /// it back to itself: `a -> b -> a`.
    pub fn detect_cycles(&self) -> Result<(), LoaderError> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for path in &self.order {
            if !visited.contains(path) {
                if let Some(cycle) = self.find_cycle(path, &mut visited, &mut stack) {
                    return Err(LoaderError::CircularDependency { cycle });
                }
            }
        }
        Ok(())
    }

    fn find_cycle(
        &self,
        current: &ScriptPath,
        visited: &mut HashSet<ScriptPath>,
        stack: &mut Vec<ScriptPath>,
    ) -> Option<Vec<ScriptPath>> {
        visited.insert(current.clone());
        stack.push(current.clone());

        if let Some(node) = self.modules.get(current) {
            for dep in &node.dependencies {
                if let Some(start) = stack.iter().position(|p| p == dep) {
                    let mut cycle = stack[start..].to_vec();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
                if !visited.contains(dep) {
                    if let Some(cycle) = self.find_cycle(dep, visited, stack) {
                        return Some(cycle);
                    }
                }
            }
        }

        stack.pop();
        None
    }

    /// Modules with their dependencies first (Kahn's algorithm). Ties keep
    /// discovery order.
    pub fn topological_sort(&self) -> Result<Vec<ScriptPath>, LoaderError> {
        self.detect_cycles()?;

        let mut in_degree: HashMap<&ScriptPath, usize> = HashMap::new();
        let mut dependents: HashMap<&ScriptPath, Vec<&ScriptPath>> = HashMap::new();

        for path in &self.order {
            let node = &self.modules[path];
            let known: HashSet<&ScriptPath> = node
                .dependencies
                .iter()
                .filter(|dep| self.modules.contains_key(*dep))
                .collect();
            in_degree.insert(path, known.len());
            for dep in known {
                dependents.entry(dep).or_default().push(path);
            }
        }

        let mut queue: VecDeque<&ScriptPath> = self
            .order
            .iter()
            .filter(|path| in_degree[path] == 0)
            .collect();
        let mut result = Vec::with_capacity(self.order.len());

        while let Some(current) = queue.pop_front() {
            result.push(current.clone());
            for dependent in dependents.get(current).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }

        Ok(result)
    }
}
