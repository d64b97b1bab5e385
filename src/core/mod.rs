mod finder;
mod graph;
mod parser;
mod render;
mod resolve;
mod speculate;

pub use finder::{CallFinder, FoundCall, LoadReference};
pub use graph::{BuildOptions, GraphBuilder, ModuleNode, ModulePath, ModuleTree};
pub use parser::JsParser;
pub use render::TreeRenderer;
pub use resolve::{canonicalize_entry, resolve_module_path};
pub use speculate::DynamicResolver;
