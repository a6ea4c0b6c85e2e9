mod config_file;

use config_file::ConfigFile;
use flotilla_synth::Config;
use std::path::{Path, PathBuf};

/// The project the CLI operates on: a parsed flotilla.toml and its location
#[derive(Debug, Clone)]
pub(crate) struct Project {
    pub path: PathBuf,
    pub config: Config,
}

impl Project {
    /// Read flotilla.toml from the current directory
    pub fn from_current_dir() -> eyre::Result<Self> {
        Ok(ConfigFile::from_path(&std::env::current_dir()?.join("flotilla.toml"))?.into())
    }

    pub fn from_path(path: &Path) -> eyre::Result<Self> {
        Ok(ConfigFile::from_path(path)?.into())
    }
}
