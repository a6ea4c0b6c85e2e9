use crate::config::Config;
use crate::naming::{app_id, env_export, logical_id};
use crate::template::{CfnResource, Output, Template};
use serde_json::json;

/// Message queue names, one entry per priority class plus the dead-letter
/// queue for failed deliveries
pub const QUEUES: [(&str, &str); 3] = [
    ("HighPriority", "messages-high-priority"),
    ("LowPriority", "messages-low-priority"),
    ("Failed", "messages-failed"),
];

/// Synthesize the message queue stack for one environment
///
/// Gated behind `queue.enabled`: the stack only enters the deployment plan
/// when the flag is set, and the app stack wires the transport environment
/// variables and task-role grants at the same time.
pub fn template(config: &Config, env: &str) -> eyre::Result<Template> {
    let environment = config.environment(env)?;
    let slug = app_id(&config.project.name, env);
    let prefix = logical_id(&slug);

    let mut template = Template::new(&format!(
        "Message queues for {} ({env})",
        config.project.name
    ));

    for (role, suffix) in QUEUES {
        template.add_resource(CfnResource {
            name: format!("{prefix}{role}Queue"),
            resource: json!({
                "Type": "AWS::SQS::Queue",
                "Properties": {
                    "QueueName": format!("{slug}-{suffix}"),
                    "VisibilityTimeout": environment.queue.visibility_timeout_seconds
                }
            }),
        });

        template.add_outputs(vec![
            Output::exported(
                &format!("{role}QueueUrl"),
                json!({ "Ref": format!("{prefix}{role}Queue") }),
                &env_export(&config.project.name, "queue", env, &format!("{suffix}-url")),
            ),
            Output::exported(
                &format!("{role}QueueArn"),
                json!({ "Fn::GetAtt": [format!("{prefix}{role}Queue"), "Arn"] }),
                &env_export(&config.project.name, "queue", env, &format!("{suffix}-arn")),
            ),
        ]);
    }

    Ok(template)
}
