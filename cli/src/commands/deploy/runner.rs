use crate::commands::deploy::DeployCommand;
use crate::error::Error;
use crate::runner::Runner;
use crate::stack::{Progress, ProgressStatus, Stack, Status};
use flotilla_synth::{validate, Plan};
use std::time::Instant;

pub(crate) struct DeployRunner {
    pub(crate) command: DeployCommand,
}

impl Runner for DeployRunner {
    /// Create or update every selected stack in dependency order
    ///
    /// Each stack must reach a terminal status before its dependents start.
    /// The run stops at the first failure, CloudFormation owns rollback of
    /// the failed stack itself and nothing deploys against a broken
    /// dependency.
    async fn run(&mut self) -> Result<(), Error> {
        let project = self.project(self.command.config.as_deref())?;

        validate::check(&project.config)?;

        // A mistyped environment must not narrow the run down to the
        // shared network stack alone
        if let Some(env) = self.command.env.as_deref() {
            project.config.environment(env)?;
        }

        let plan = Plan::new(&project.config);
        let stacks = plan.select(self.command.env.as_deref(), &self.command.stacks)?;
        let client = self.cloudformation(&project).await?;
        let start_time = Instant::now();

        for planned in &stacks {
            let template = planned.synthesize(&project.config)?;
            let stack = Stack::new(&client, &planned.name);
            let progress = Progress::new(&planned.name);

            progress.stage("Deploying");
            log::debug!("Submitting template for {}", planned.name);

            let updated = stack
                .provision(&template.body(), planned.termination_protection)
                .await?;

            if !updated {
                progress.finish("Unchanged", ProgressStatus::Warn, Some("nothing to update"));
                continue;
            }

            match stack.wait().await? {
                Status::Failed(reasons) => {
                    progress.error("Failed");

                    return Err(self.error(
                        Some(&format!("Failed to deploy {}", planned.name)),
                        Some(&reasons.join("\n")),
                        None,
                    ));
                }

                _ => progress.finish("Deployed", ProgressStatus::Success, None),
            }
        }

        println!(
            "    {} {} stack(s) in {:.2}s",
            console::style("Finished").green().bold(),
            stacks.len(),
            start_time.elapsed().as_secs_f64(),
        );

        Ok(())
    }
}
