use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "pypad", about = "Interactive Python snippet pad for the terminal", version)]
#[command(group(ArgGroup::new("initial_source").args(["file", "snippet"]).multiple(false)))]
#[command(group(ArgGroup::new("action").args(["exec", "list_snippets"]).multiple(false)))]
pub struct Cli {
    /// Python file to load into the editor instead of a catalog snippet.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Start from the catalog snippet at this index (see --list-snippets).
    #[arg(short = 'n', long)]
    pub snippet: Option<usize>,

    /// Execute the initial source once, print the captured output and exit.
    ///
    /// Faults raised by the snippet itself are not tool errors: they are
    /// printed to stderr and the exit code stays 0.
    #[arg(short = 'x', long)]
    pub exec: bool,

    /// List catalog snippets with their indices.
    #[arg(short = 'l', long = "list-snippets", visible_alias = "ls")]
    pub list_snippets: bool,

    /// Load the snippet catalog from a JSON file ([{"title", "source"}]).
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Editor/output layout (stacked|side).
    #[arg(long)]
    pub layout: Option<String>,

    /// Override the detected device class (constrained|capable).
    ///
    /// Constrained devices get a fresh interpreter per run; capable ones
    /// keep the session warm between runs.
    #[arg(long = "device-class")]
    pub device_class: Option<String>,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
