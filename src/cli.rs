use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use reqtree::config::Config;
use reqtree::core::{canonicalize_entry, BuildOptions, GraphBuilder, TreeRenderer};

#[derive(Parser)]
#[command(name = "reqtree")]
#[command(about = "List the transitive require() tree of a JavaScript entry file")]
#[command(version)]
pub struct Cli {
    /// JavaScript entry file
    pub entry: PathBuf,

    /// Resolve dynamic require() arguments by speculative execution
    #[arg(short, long)]
    pub dynamic: bool,

    /// Disable ANSI colors in the output
    #[arg(long)]
    pub no_color: bool,

    /// Maximum recursion depth before subtrees are left unexpanded
    #[arg(long)]
    pub depth: Option<u32>,

    /// Emit the tree as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        let config = Config::load_or_default(self.config.as_deref())?;

        let options = BuildOptions {
            loader: config.analysis.loader.clone(),
            resolve_dynamic: self.dynamic || config.analysis.resolve_dynamic,
            depth_limit: self.depth.unwrap_or(config.analysis.depth_limit),
        };

        let entry = canonicalize_entry(&self.entry)?;
        let tree = GraphBuilder::new(options)?.build(&entry)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&tree)?);
        } else {
            let color = config.output.color && !self.no_color;
            print!("{}", TreeRenderer::new(color).render(&entry, &tree));
        }

        Ok(())
    }
}
