use crate::error::Error;
use eyre::WrapErr;
use flotilla_synth::Config;
use std::fs;
use std::path::{Path, PathBuf};

/// ConfigFile is the parsed content of flotilla.toml
///
/// The file is the single source of every environment-specific value: the
/// synthesizers receive its typed form and nothing else.
#[derive(Debug, Clone)]
pub(super) struct ConfigFile {
    config: Config,
    path: PathBuf,
}

impl ConfigFile {
    /// Reads a `ConfigFile` instance from a given path
    pub(super) fn from_path(path: &Path) -> eyre::Result<Self> {
        let toml_string = fs::read_to_string(path).wrap_err(Error::new(
            &format!("Failed to read {path:?}"),
            Some("Run the command next to flotilla.toml, or pass --config."),
        ))?;

        let config: Config = toml::from_str(&toml_string).wrap_err(Error::new(
            &format!("Failed to parse {path:?}"),
            None,
        ))?;

        Ok(ConfigFile {
            config,
            path: path.to_path_buf(),
        })
    }
}

impl From<ConfigFile> for super::Project {
    fn from(file: ConfigFile) -> Self {
        super::Project {
            path: file.path,
            config: file.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_parses_a_config_file() {
        let path = std::env::temp_dir().join("flotilla-config-file-test.toml");

        fs::write(
            &path,
            r#"
                [project]
                name = "demo-app"
                account = "111122223333"
                region = "eu-west-3"

                [network]
                name = "paris"
                max_azs = 2
                nat_gateways = 1
            "#,
        )
        .unwrap();

        let project: crate::project::Project = ConfigFile::from_path(&path).unwrap().into();

        assert_eq!(project.config.project.name, "demo-app");
        assert!(project.config.environments.is_empty());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_points_at_the_config_flag() {
        let error = ConfigFile::from_path(Path::new("/nonexistent/flotilla.toml"))
            .unwrap_err()
            .to_string();

        assert!(error.contains("Failed to read"));
    }
}
