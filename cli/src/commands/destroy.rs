mod runner;

use crate::runner::{Runnable, Runner};
use clap::ArgAction;
use runner::DestroyRunner;
use std::path::PathBuf;

#[derive(clap::Args, Clone)]
pub(crate) struct DestroyCommand {
    /// The environment whose stacks are deleted
    #[arg(short, long)]
    env: String,

    /// Path to flotilla.toml, defaults to the current directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable termination protection before deleting protected stacks
    #[arg(long, action = ArgAction::SetTrue)]
    force: bool,

    /// The set of stacks to delete, comma separated
    #[arg(value_delimiter = ',', required = true)]
    stacks: Vec<String>,
}

impl Runnable for DestroyCommand {
    fn runner(&self) -> impl Runner {
        DestroyRunner {
            command: self.clone(),
        }
    }
}
