use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use owo_colors::OwoColorize;

use super::graph::{ModuleNode, ModulePath, ModuleTree};

const BRANCH: &str = "├── ";
const CORNER: &str = "└── ";
const PIPE: &str = "│   ";
const BLANK: &str = "    ";

/// Renders a module tree as indented text with per-category color.
///
/// The tree itself only distinguishes leaf/unexpanded/expanded; which
/// unexpanded nodes are cycles and which are duplicates is
/// reconstructed here by walking the same ancestor-chain discipline
/// the builder used.
pub struct TreeRenderer {
    color: bool,
}

impl TreeRenderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Render `tree` under the canonical entry path. File labels are
    /// relative to the entry's directory.
    pub fn render(&self, entry: &Path, tree: &ModuleTree) -> String {
        let base = entry.parent().unwrap_or(Path::new("/"));
        let mut out = format!("{}\n", entry.display());
        let mut seen = HashSet::new();
        let mut ancestors = vec![entry.to_path_buf()];
        self.render_level(&mut out, tree, "", base, &mut seen, &mut ancestors);
        out
    }

    fn render_level(
        &self,
        out: &mut String,
        tree: &ModuleTree,
        indent: &str,
        base: &Path,
        seen: &mut HashSet<PathBuf>,
        ancestors: &mut Vec<PathBuf>,
    ) {
        let count = tree.len();
        for (position, (key, node)) in tree.iter().enumerate() {
            let last = position + 1 == count;
            let connector = if last { CORNER } else { BRANCH };
            let continuation = if last { BLANK } else { PIPE };

            match key {
                ModulePath::Builtin(name) => {
                    let label = self.paint(name, Category::Builtin);
                    out.push_str(&format!("{indent}{connector}{label}\n"));
                }
                ModulePath::UnresolvedDynamic { label, .. } => {
                    let text = format!("dynamic load  code=> {label}");
                    let label = self.paint(&text, Category::Dynamic);
                    out.push_str(&format!("{indent}{connector}{label}\n"));
                }
                ModulePath::NonScript(path) => {
                    let relative = relative_label(base, path);
                    let label = self.paint(&relative, Category::NonScript);
                    out.push_str(&format!("{indent}{connector}{label}\n"));
                }
                ModulePath::File(path) => {
                    let relative = relative_label(base, path);
                    if ancestors.contains(path) {
                        let label = self.paint(&relative, Category::Cycle);
                        out.push_str(&format!("{indent}{connector}{label}\n"));
                    } else if seen.contains(path) {
                        let label = self.paint(&relative, Category::Duplicate);
                        out.push_str(&format!("{indent}{connector}{label}\n"));
                    } else {
                        out.push_str(&format!("{indent}{connector}{relative}\n"));
                        seen.insert(path.clone());
                        if let ModuleNode::Expanded(subtree) = node {
                            ancestors.push(path.clone());
                            let next = format!("{indent}{continuation}");
                            self.render_level(out, subtree, &next, base, seen, ancestors);
                            ancestors.pop();
                        }
                    }
                }
            }
        }
    }

    fn paint(&self, text: &str, category: Category) -> String {
        if !self.color {
            return text.to_string();
        }
        match category {
            Category::Builtin => text.magenta().to_string(),
            Category::Dynamic => text.yellow().to_string(),
            Category::Cycle => text.red().to_string(),
            Category::Duplicate => text.cyan().to_string(),
            Category::NonScript => text.green().to_string(),
        }
    }
}

enum Category {
    Builtin,
    Dynamic,
    Cycle,
    Duplicate,
    NonScript,
}

/// Path of `target` relative to `base`, walking up with `..` when
/// `target` is not below `base`.
fn relative_label(base: &Path, target: &Path) -> String {
    if let Ok(relative) = target.strip_prefix(base) {
        return relative.display().to_string();
    }

    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();
    let shared = base_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in shared..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[shared..] {
        relative.push(part);
    }
    relative.display().to_string()
}
