use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, warn};

use crate::error::Result;

use super::finder::{CallFinder, LoadReference};
use super::parser::{strip_shebang, JsParser};
use super::resolve::{canonicalize_entry, is_core_reference, is_script, resolve_module_path};
use super::speculate::DynamicResolver;

/// Canonical identity of one resolved load target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModulePath {
    /// Core/builtin-style reference; never touched the filesystem.
    Builtin(String),
    /// A script file that is (or was) a candidate for expansion.
    File(PathBuf),
    /// A resolvable file that is not a script; never parsed.
    NonScript(PathBuf),
    /// A dynamic reference that could not be reduced to a name.
    /// The ordinal keeps several failures in one file distinguishable.
    UnresolvedDynamic { label: String, ordinal: usize },
}

/// What hangs below one key of a module tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleNode {
    /// Terminal: builtins, non-scripts, unresolved dynamics.
    Leaf,
    /// Deliberately not expanded here: a cycle back-reference, a
    /// module already expanded elsewhere, or a depth cutoff.
    Unexpanded,
    /// A fully expanded subtree.
    Expanded(ModuleTree),
}

/// Insertion-ordered mapping from module identity to its subtree.
/// Order equals discovery order within the parent source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleTree {
    entries: IndexMap<ModulePath, ModuleNode>,
}

impl ModuleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry unless the key is already present; the first
    /// discovery of a path within one parent wins.
    pub fn insert(&mut self, key: ModulePath, node: ModuleNode) {
        if let Entry::Vacant(slot) = self.entries.entry(key) {
            slot.insert(node);
        }
    }

    pub fn get(&self, key: &ModulePath) -> Option<&ModuleNode> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModulePath, &ModuleNode)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ModuleTree {
    /// Mirrors the classic JSON shape of require-tree output: leaves
    /// are `null`, unexpanded nodes `{}`, subtrees nested objects and
    /// unresolved dynamics their captured source text.
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct Empty {}

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, node) in &self.entries {
            let name = match key {
                ModulePath::Builtin(name) => name.clone(),
                ModulePath::File(path) | ModulePath::NonScript(path) => {
                    path.display().to_string()
                }
                ModulePath::UnresolvedDynamic { ordinal, .. } => format!("dynamic load_{ordinal}"),
            };
            if let ModulePath::UnresolvedDynamic { label, .. } = key {
                map.serialize_entry(&name, label)?;
                continue;
            }
            match node {
                ModuleNode::Leaf => map.serialize_entry(&name, &())?,
                ModuleNode::Unexpanded => map.serialize_entry(&name, &Empty {})?,
                ModuleNode::Expanded(subtree) => map.serialize_entry(&name, subtree)?,
            }
        }
        map.end()
    }
}

/// State threaded through one top-level build, never shared across
/// builds: the path of modules currently being expanded (cycle
/// detection) and every module fully expanded anywhere in the run
/// (duplicate suppression).
#[derive(Debug)]
struct VisitationState {
    ancestors: Vec<PathBuf>,
    expanded: HashSet<PathBuf>,
}

impl VisitationState {
    fn new(entry: PathBuf) -> Self {
        let mut expanded = HashSet::new();
        expanded.insert(entry.clone());
        Self {
            ancestors: vec![entry],
            expanded,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Identifier of the module-loading call.
    pub loader: String,
    /// Attempt speculative resolution of dynamic arguments.
    pub resolve_dynamic: bool,
    /// Recursion beyond this depth is left unexpanded.
    pub depth_limit: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            loader: "require".to_string(),
            resolve_dynamic: false,
            depth_limit: 10,
        }
    }
}

/// Orchestrates parse → find → resolve → recurse over the load graph.
pub struct GraphBuilder {
    options: BuildOptions,
    parser: JsParser,
    finder: CallFinder,
    resolver: DynamicResolver,
}

impl GraphBuilder {
    pub fn new(options: BuildOptions) -> Result<Self> {
        let parser = JsParser::new()?;
        let finder = CallFinder::new(&options.loader);
        let resolver = DynamicResolver::new(&options.loader);
        Ok(Self {
            options,
            parser,
            finder,
            resolver,
        })
    }

    /// Build the module tree rooted at `entry`.
    pub fn build(&mut self, entry: &Path) -> Result<ModuleTree> {
        let entry = canonicalize_entry(entry)?;
        let mut state = VisitationState::new(entry.clone());
        match self.expand(&entry, 0, &mut state)? {
            ModuleNode::Expanded(tree) => Ok(tree),
            _ => Ok(ModuleTree::new()),
        }
    }

    /// Expand one file into its mapping of direct loads.
    fn expand(
        &mut self,
        file: &Path,
        depth: u32,
        state: &mut VisitationState,
    ) -> Result<ModuleNode> {
        if depth > self.options.depth_limit {
            debug!(file = %file.display(), depth, "depth limit reached");
            return Ok(ModuleNode::Unexpanded);
        }

        let raw = std::fs::read_to_string(file).map_err(|e| crate::error::ReqtreeError::Read {
            path: file.to_path_buf(),
            source: e,
        })?;
        let source = strip_shebang(&raw);
        let tree = self.parser.parse(&source, file)?;
        let calls = self.finder.find(tree.root_node(), &source);

        let dir = file.parent().unwrap_or(Path::new("/")).to_path_buf();
        let mut result = ModuleTree::new();
        let mut unresolved = 0usize;

        for call in calls {
            match &call.reference {
                LoadReference::Literal(name) => {
                    self.record(name, &dir, depth, state, &mut result)?;
                }
                LoadReference::Dynamic(label) => {
                    let names = if self.options.resolve_dynamic {
                        self.resolver.resolve(file, &call)
                    } else {
                        None
                    };
                    match names {
                        Some(names) => {
                            for name in names {
                                self.record(&name, &dir, depth, state, &mut result)?;
                            }
                        }
                        None => {
                            if self.options.resolve_dynamic {
                                warn!(
                                    file = %file.display(),
                                    %label,
                                    "dynamic load could not be resolved"
                                );
                            }
                            result.insert(
                                ModulePath::UnresolvedDynamic {
                                    label: label.clone(),
                                    ordinal: unresolved,
                                },
                                ModuleNode::Leaf,
                            );
                            unresolved += 1;
                        }
                    }
                }
            }
        }

        Ok(ModuleNode::Expanded(result))
    }

    /// Classify one concrete reference and record it, recursing into
    /// script files that are neither cyclic nor already expanded.
    fn record(
        &mut self,
        reference: &str,
        dir: &Path,
        depth: u32,
        state: &mut VisitationState,
        result: &mut ModuleTree,
    ) -> Result<()> {
        if is_core_reference(reference) {
            result.insert(ModulePath::Builtin(reference.to_string()), ModuleNode::Leaf);
            return Ok(());
        }

        let target = resolve_module_path(dir, reference)?;

        if !is_script(&target) {
            result.insert(ModulePath::NonScript(target), ModuleNode::Leaf);
            return Ok(());
        }

        if state.ancestors.contains(&target) {
            debug!(target = %target.display(), "cycle back-reference");
            result.insert(ModulePath::File(target), ModuleNode::Unexpanded);
            return Ok(());
        }

        if state.expanded.contains(&target) {
            debug!(target = %target.display(), "already expanded elsewhere");
            result.insert(ModulePath::File(target), ModuleNode::Unexpanded);
            return Ok(());
        }

        state.ancestors.push(target.clone());
        state.expanded.insert(target.clone());
        let node = self.expand(&target, depth + 1, state);
        state.ancestors.pop();

        result.insert(ModulePath::File(target), node?);
        Ok(())
    }
}
