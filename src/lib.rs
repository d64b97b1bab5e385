//! Static dependency-graph extraction for scripts loaded through
//! single-argument `require("...")` calls, plus a tree formatter for
//! the result.

pub mod config;
pub mod core;
pub mod error;

use std::path::Path;

pub use crate::core::{
    BuildOptions, GraphBuilder, ModuleNode, ModulePath, ModuleTree, TreeRenderer,
};
pub use crate::error::{ReqtreeError, Result};

/// Build the module tree rooted at `entry`.
pub fn build_graph(entry: &Path, options: &BuildOptions) -> Result<ModuleTree> {
    GraphBuilder::new(options.clone())?.build(entry)
}

/// Build and render the module tree of `entry` in one step.
pub fn render_tree(entry: &Path, color: bool, resolve_dynamic: bool) -> Result<String> {
    let options = BuildOptions {
        resolve_dynamic,
        ..Default::default()
    };
    let entry = crate::core::canonicalize_entry(entry)?;
    let tree = build_graph(&entry, &options)?;
    Ok(TreeRenderer::new(color).render(&entry, &tree))
}
