mod progress;
mod status;

pub(crate) use progress::{Progress, ProgressStatus};
pub(crate) use status::Status;

use aws_sdk_cloudformation::error::SdkError;
use aws_sdk_cloudformation::operation::update_stack::UpdateStackError;
use aws_sdk_cloudformation::types::Capability;
use eyre::WrapErr;

/// One CloudFormation stack, addressed by name
///
/// The template body is synthesized elsewhere, this type only talks to the
/// provisioning API: create or update, delete, and the protection switch.
pub(crate) struct Stack<'a> {
    client: &'a aws_sdk_cloudformation::Client,
    name: String,
}

impl<'a> Stack<'a> {
    pub(crate) fn new(client: &'a aws_sdk_cloudformation::Client, name: &str) -> Self {
        Stack {
            client,
            name: name.to_string(),
        }
    }

    /// CloudFormation reports an unknown stack name as a ValidationError,
    /// anything else while describing is a real failure
    pub(crate) async fn is_exists(&self) -> eyre::Result<bool> {
        match self
            .client
            .describe_stacks()
            .stack_name(&self.name)
            .send()
            .await
        {
            Ok(_) => Ok(true),

            Err(error) => {
                if error.as_service_error().and_then(|service| service.meta().code())
                    == Some("ValidationError")
                {
                    return Ok(false);
                }

                Err(error).wrap_err("Failed to describe stack")
            }
        }
    }

    /// Create the stack, or update it in place when it already exists
    ///
    /// Returns false when CloudFormation finds nothing to change, the caller
    /// then skips the wait. The stacks declare IAM roles and users with fixed
    /// names, hence the named-IAM capability.
    pub(crate) async fn provision(&self, body: &str, protect: bool) -> eyre::Result<bool> {
        let capabilities = Capability::CapabilityNamedIam;

        if self.is_exists().await? {
            return match self
                .client
                .update_stack()
                .capabilities(capabilities)
                .stack_name(&self.name)
                .template_body(body)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(error) if is_no_updates(&error) => Ok(false),
                Err(error) => Err(error).wrap_err("Failed to update stack"),
            };
        }

        self.client
            .create_stack()
            .capabilities(capabilities)
            .stack_name(&self.name)
            .template_body(body)
            .enable_termination_protection(protect)
            .send()
            .await
            .wrap_err("Failed to create stack")?;

        Ok(true)
    }

    pub(crate) async fn is_termination_protected(&self) -> eyre::Result<bool> {
        let response = self
            .client
            .describe_stacks()
            .stack_name(&self.name)
            .send()
            .await
            .wrap_err("Failed to describe stack")?;

        Ok(response
            .stacks()
            .first()
            .and_then(|stack| stack.enable_termination_protection())
            .unwrap_or(false))
    }

    pub(crate) async fn set_termination_protection(&self, enabled: bool) -> eyre::Result<()> {
        self.client
            .update_termination_protection()
            .stack_name(&self.name)
            .enable_termination_protection(enabled)
            .send()
            .await
            .wrap_err("Failed to update termination protection")?;

        Ok(())
    }

    pub(crate) async fn delete(&self) -> eyre::Result<()> {
        self.client
            .delete_stack()
            .stack_name(&self.name)
            .send()
            .await
            .wrap_err("Failed to delete stack")?;

        Ok(())
    }
}

/// An update with an identical template is not an error, only a no-op
fn is_no_updates(error: &SdkError<UpdateStackError>) -> bool {
    error
        .as_service_error()
        .and_then(|service| service.meta().message())
        .is_some_and(|message| message.contains("No updates are to be performed"))
}
