mod runner;

use crate::runner::{Runnable, Runner};
use runner::TemplateRunner;
use std::path::PathBuf;

#[derive(clap::Args, Clone)]
pub(crate) struct TemplateCommand {
    /// Print only the stacks of this environment
    #[arg(short, long)]
    env: Option<String>,

    /// Path to flotilla.toml, defaults to the current directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// The set of stacks to print, comma separated, all stacks when empty
    #[arg(value_delimiter = ',')]
    stacks: Vec<String>,
}

impl Runnable for TemplateCommand {
    fn runner(&self) -> impl Runner {
        TemplateRunner {
            command: self.clone(),
        }
    }
}
