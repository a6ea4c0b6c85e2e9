use super::Stack;
use aws_sdk_cloudformation::types::StackEvent;
use eyre::WrapErr;
use std::time::Duration;

/// State of a stack's most recent operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Status {
    /// No stack under this name
    Missing,

    InProgress,
    Complete,

    /// Terminal failure, with the reason of every failed resource
    Failed(Vec<String>),
}

const SUCCESS: [&str; 3] = ["CREATE_COMPLETE", "UPDATE_COMPLETE", "DELETE_COMPLETE"];

const FAILURE: [&str; 7] = [
    "CREATE_FAILED",
    "UPDATE_FAILED",
    "DELETE_FAILED",
    "ROLLBACK_COMPLETE",
    "ROLLBACK_FAILED",
    "UPDATE_ROLLBACK_COMPLETE",
    "UPDATE_ROLLBACK_FAILED",
];

impl Stack<'_> {
    /// Classify the latest operation from the stack's event stream
    ///
    /// Events arrive newest first, so everything up to the "User Initiated"
    /// stack event belongs to the current operation. The first terminal
    /// stack-level status decides the outcome, failed resource events carry
    /// the reasons shown to the operator.
    pub(crate) async fn status(&self) -> eyre::Result<Status> {
        if !self.is_exists().await? {
            return Ok(Status::Missing);
        }

        let mut walk = Walk::default();
        let mut next_token: Option<String> = None;

        loop {
            let response = self
                .client
                .describe_stack_events()
                .stack_name(&self.name)
                .set_next_token(next_token.take())
                .send()
                .await
                .wrap_err("Failed to read stack events")?;

            for event in response.stack_events() {
                walk.observe(event);
            }

            next_token = response.next_token().map(|token| token.to_string());

            if next_token.is_none() || walk.started {
                break;
            }
        }

        Ok(walk.status())
    }

    /// Poll until the operation settles, one request every few seconds
    pub(crate) async fn wait(&self) -> eyre::Result<Status> {
        let mut status = self.status().await?;

        while status == Status::InProgress {
            tokio::time::sleep(Duration::from_secs(3)).await;
            status = self.status().await?;
        }

        Ok(status)
    }
}

/// Accumulates the event walk, newest events first
#[derive(Default)]
struct Walk {
    complete: bool,
    failed: bool,

    /// The "User Initiated" marker of the current operation was reached,
    /// older events belong to previous operations
    started: bool,

    reasons: Vec<String>,
}

impl Walk {
    fn observe(&mut self, event: &StackEvent) {
        if self.started {
            return;
        }

        let status = event
            .resource_status()
            .map(|status| status.as_str())
            .unwrap_or_default();

        let is_stack_event = event.resource_type() == Some("AWS::CloudFormation::Stack");

        if is_stack_event && event.resource_status_reason() == Some("User Initiated") {
            self.started = true;
            return;
        }

        if is_stack_event && !self.complete && !self.failed {
            if SUCCESS.contains(&status) {
                self.complete = true;
            } else if FAILURE.contains(&status) {
                self.failed = true;
            }
        }

        if !is_stack_event && status.ends_with("FAILED") {
            self.reasons.push(format!(
                "{}: {}",
                event.logical_resource_id().unwrap_or_default(),
                event
                    .resource_status_reason()
                    .unwrap_or("no reason reported"),
            ));
        }
    }

    fn status(self) -> Status {
        if self.failed {
            return Status::Failed(self.reasons);
        }

        if self.complete {
            return Status::Complete;
        }

        Status::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_cloudformation::primitives::DateTime;
    use aws_sdk_cloudformation::types::ResourceStatus;

    fn event(resource_type: &str, status: ResourceStatus, reason: Option<&str>) -> StackEvent {
        let mut builder = StackEvent::builder()
            .stack_id("arn:aws:cloudformation:eu-west-3:111122223333:stack/demo/1")
            .event_id("1")
            .stack_name("demo")
            .logical_resource_id("DemoResource")
            .resource_type(resource_type)
            .resource_status(status)
            .timestamp(DateTime::from_secs(0));

        if let Some(reason) = reason {
            builder = builder.resource_status_reason(reason);
        }

        builder.build().unwrap()
    }

    fn stack_event(status: ResourceStatus, reason: Option<&str>) -> StackEvent {
        event("AWS::CloudFormation::Stack", status, reason)
    }

    fn classify(events: Vec<StackEvent>) -> Status {
        let mut walk = Walk::default();

        for event in &events {
            walk.observe(event);
        }

        walk.status()
    }

    #[test]
    fn an_operation_without_a_terminal_event_is_in_progress() {
        let status = classify(vec![
            event("AWS::ECS::Service", ResourceStatus::CreateInProgress, None),
            stack_event(ResourceStatus::CreateInProgress, Some("User Initiated")),
        ]);

        assert_eq!(status, Status::InProgress);
    }

    #[test]
    fn a_terminal_stack_event_completes_the_operation() {
        let status = classify(vec![
            stack_event(ResourceStatus::UpdateComplete, None),
            event("AWS::ECS::Service", ResourceStatus::UpdateComplete, None),
            stack_event(ResourceStatus::UpdateInProgress, Some("User Initiated")),
        ]);

        assert_eq!(status, Status::Complete);
    }

    #[test]
    fn failures_collect_the_resource_reasons() {
        let status = classify(vec![
            stack_event(ResourceStatus::RollbackComplete, None),
            event(
                "AWS::ElasticLoadBalancingV2::ListenerRule",
                ResourceStatus::CreateFailed,
                Some("Priority '210' is currently in use"),
            ),
            stack_event(ResourceStatus::CreateInProgress, Some("User Initiated")),
        ]);

        let Status::Failed(reasons) = status else {
            panic!("expected a failure");
        };

        assert_eq!(
            reasons,
            vec!["DemoResource: Priority '210' is currently in use"]
        );
    }

    #[test]
    fn events_of_previous_operations_are_ignored() {
        let status = classify(vec![
            stack_event(ResourceStatus::UpdateComplete, None),
            stack_event(ResourceStatus::UpdateInProgress, Some("User Initiated")),
            // An older, failed operation must not leak into the outcome
            stack_event(ResourceStatus::UpdateRollbackComplete, None),
            event(
                "AWS::RDS::DBCluster",
                ResourceStatus::UpdateFailed,
                Some("quota exceeded"),
            ),
            stack_event(ResourceStatus::UpdateInProgress, Some("User Initiated")),
        ]);

        assert_eq!(status, Status::Complete);
    }
}
