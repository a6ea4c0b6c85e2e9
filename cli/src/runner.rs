use crate::error::Error;
use crate::project::Project;
use aws_config::{BehaviorVersion, Region};
use std::error::Error as StdError;
use std::path::Path;

pub(crate) trait Runner {
    /// Current working project
    ///
    /// Reads flotilla.toml next to the current directory, or wherever
    /// --config points.
    fn project(&self, config: Option<&Path>) -> Result<Project, Error> {
        let project = match config {
            Some(path) => Project::from_path(path),
            None => Project::from_current_dir(),
        };

        if project.is_err() {
            return Err(self.error(
                Some("Project not found"),
                Some("Could not read flotilla.toml in the specified directory"),
                None,
            ));
        }

        let project = project?;
        log::debug!("Using configuration at {:?}", project.path);

        Ok(project)
    }

    /// CloudFormation client bound to the configured region
    ///
    /// Fails when the caller identity belongs to a different account than
    /// flotilla.toml declares: with hard-coded cross-stack identifiers a
    /// deploy into the wrong account must never start.
    async fn cloudformation(
        &self,
        project: &Project,
    ) -> Result<aws_sdk_cloudformation::Client, Error> {
        let config = aws_config::defaults(BehaviorVersion::v2025_01_17())
            .region(Region::new(project.config.project.region.clone()))
            .load()
            .await;

        let identity = aws_sdk_sts::Client::new(&config)
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                self.error(
                    Some("Not authenticated with AWS"),
                    Some("Check your credentials, e.g. run `aws sts get-caller-identity`."),
                    Some(Box::new(e)),
                )
            })?;

        let account = identity.account().unwrap_or_default();

        if account != project.config.project.account {
            return Err(self.error(
                Some("Wrong AWS account"),
                Some(&format!(
                    "Credentials belong to account {account}, flotilla.toml expects {}.",
                    project.config.project.account
                )),
                None,
            ));
        }

        Ok(aws_sdk_cloudformation::Client::new(&config))
    }

    /// Run the command
    ///
    /// Returns an error shown to the user in case of failure
    async fn run(&mut self) -> Result<(), Error>;

    /// Construct an error shown to the user
    fn error(
        &self,
        title: Option<&str>,
        description: Option<&str>,
        origin: Option<Box<dyn StdError>>,
    ) -> Error {
        if let Some(origin) = origin {
            log::error!("{origin:?}");
        }

        if let Some(title) = title {
            Error::new(title, description)
        } else {
            Error::new(
                "Failed to run the command",
                Some("Please report a bug at https://github.com/flotilla-dev/flotilla/issues"),
            )
        }
    }
}

/// Return a runner for a command
///
/// Ideally this should be a macro
pub(crate) trait Runnable {
    fn runner(&self) -> impl Runner;
}
