use crate::commands::destroy::DestroyCommand;
use crate::error::Error;
use crate::runner::Runner;
use crate::stack::{Progress, ProgressStatus, Stack, Status};
use flotilla_synth::Plan;

pub(crate) struct DestroyRunner {
    pub(crate) command: DestroyCommand,
}

impl Runner for DestroyRunner {
    /// Delete the named stacks in teardown order, dependents first
    ///
    /// Stacks marked unrecoverable stay protected unless --force is passed,
    /// and the database cluster's own deletion protection still applies
    /// after that: a protected production cluster fails the delete with the
    /// provider's reason.
    async fn run(&mut self) -> Result<(), Error> {
        let project = self.project(self.command.config.as_deref())?;

        project.config.environment(&self.command.env)?;

        let plan = Plan::new(&project.config);
        let stacks = plan.select_reversed(Some(self.command.env.as_str()), &self.command.stacks)?;
        let client = self.cloudformation(&project).await?;

        for planned in stacks {
            let stack = Stack::new(&client, &planned.name);
            let progress = Progress::new(&planned.name);

            if !stack.is_exists().await? {
                progress.finish("Missing", ProgressStatus::Warn, Some("not deployed"));
                continue;
            }

            if planned.termination_protection || stack.is_termination_protected().await? {
                if !self.command.force {
                    progress.error("Protected");

                    return Err(self.error(
                        Some(&format!("{} is termination-protected", planned.name)),
                        Some("Pass --force to disable the protection and delete it anyway."),
                        None,
                    ));
                }

                stack.set_termination_protection(false).await?;
            }

            progress.stage("Deleting");
            stack.delete().await?;

            match stack.wait().await? {
                Status::Failed(reasons) => {
                    progress.error("Failed");

                    return Err(self.error(
                        Some(&format!("Failed to delete {}", planned.name)),
                        Some(&reasons.join("\n")),
                        None,
                    ));
                }

                _ => progress.finish("Destroyed", ProgressStatus::Success, None),
            }
        }

        Ok(())
    }
}
