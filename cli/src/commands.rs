pub mod deploy;
pub mod destroy;
pub mod status;
pub mod template;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy all stacks, or a selection, in dependency order
    Deploy(deploy::DeployCommand),

    /// Print the synthesized template of each selected stack
    Template(template::TemplateCommand),

    /// Current provisioning status of each selected stack
    Status(status::StatusCommand),

    /// Delete stacks, dependents first
    Destroy(destroy::DestroyCommand),
}
