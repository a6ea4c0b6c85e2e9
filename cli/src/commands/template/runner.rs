use crate::commands::template::TemplateCommand;
use crate::error::Error;
use crate::runner::Runner;
use color_eyre::owo_colors::OwoColorize;
use flotilla_synth::{validate, Plan};

pub(crate) struct TemplateRunner {
    pub(crate) command: TemplateCommand,
}

impl Runner for TemplateRunner {
    /// Print the exact template bodies `deploy` would submit
    ///
    /// Synthesis is deterministic, so this output is the full inspection
    /// surface: reviewing it reviews the deployment.
    async fn run(&mut self) -> Result<(), Error> {
        let project = self.project(self.command.config.as_deref())?;

        validate::check(&project.config)?;

        if let Some(env) = self.command.env.as_deref() {
            project.config.environment(env)?;
        }

        let plan = Plan::new(&project.config);

        for planned in plan.select(self.command.env.as_deref(), &self.command.stacks)? {
            let template = planned.synthesize(&project.config)?;

            println!("{}", planned.name.green().bold());
            println!("{template}");
        }

        Ok(())
    }
}
