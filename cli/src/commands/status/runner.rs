use crate::commands::status::StatusCommand;
use crate::error::Error;
use crate::runner::Runner;
use crate::stack::{Stack, Status};
use flotilla_synth::Plan;

pub(crate) struct StatusRunner {
    pub(crate) command: StatusCommand,
}

impl Runner for StatusRunner {
    /// Report each selected stack's state from its CloudFormation events
    async fn run(&mut self) -> Result<(), Error> {
        let project = self.project(self.command.config.as_deref())?;

        if let Some(env) = self.command.env.as_deref() {
            project.config.environment(env)?;
        }

        let plan = Plan::new(&project.config);
        let stacks = plan.select(self.command.env.as_deref(), &self.command.stacks)?;
        let client = self.cloudformation(&project).await?;

        for planned in stacks {
            let stack = Stack::new(&client, &planned.name);

            let (label, reasons) = match stack.status().await? {
                Status::Missing => (console::style("not deployed").dim(), Vec::new()),
                Status::InProgress => (console::style("in progress").cyan(), Vec::new()),
                Status::Complete => (console::style("complete").green(), Vec::new()),
                Status::Failed(reasons) => (console::style("failed").red().bold(), reasons),
            };

            println!("{} {label}", console::style(&planned.name).bold());

            for reason in reasons {
                println!("  {}", console::style(reason).dim());
            }
        }

        Ok(())
    }
}
