use crate::config::Config;
use crate::naming::{app_id, env_export, logical_id};
use crate::template::{CfnResource, Output, Template};
use serde_json::json;

/// Synthesize the image registry stack for one environment
///
/// Two repositories, one per component type: the web-tier (proxy) image and
/// the application-runtime image. Retention is enforced by the registry
/// itself, the lifecycle policy keeps the newest `max_image_count` images
/// and evicts the rest in push order.
pub fn template(config: &Config, env: &str) -> eyre::Result<Template> {
    let environment = config.environment(env)?;
    let registry = &environment.registry;
    let prefix = logical_id(&app_id(&config.project.name, env));

    let mut template = Template::new(&format!(
        "Container image repositories for {} ({env})",
        config.project.name
    ));

    for (role, repository) in [
        ("Proxy", &registry.proxy_image),
        ("Runtime", &registry.runtime_image),
    ] {
        template.add_resource(CfnResource {
            name: format!("{prefix}{role}Repository"),
            resource: json!({
                "Type": "AWS::ECR::Repository",
                "Properties": {
                    "RepositoryName": repository,
                    "LifecyclePolicy": {
                        "LifecyclePolicyText": retention_policy(registry.max_image_count)?
                    }
                }
            }),
        });

        template.add_output(Output::exported(
            &format!("{role}RepositoryName"),
            json!({ "Ref": format!("{prefix}{role}Repository") }),
            &env_export(
                &config.project.name,
                "registry",
                env,
                &format!("{}-repository", role.to_lowercase()),
            ),
        ));
    }

    Ok(template)
}

/// ECR lifecycle policies are embedded as a JSON string, not a JSON object
fn retention_policy(max_image_count: u32) -> eyre::Result<String> {
    Ok(serde_json::to_string(&json!({
        "rules": [{
            "rulePriority": 1,
            "description": format!("Keep only {max_image_count} images"),
            "selection": {
                "tagStatus": "any",
                "countType": "imageCountMoreThan",
                "countNumber": max_image_count
            },
            "action": { "type": "expire" }
        }]
    }))?)
}
