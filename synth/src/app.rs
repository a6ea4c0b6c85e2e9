use crate::config::{Config, Container, Environment, Project};
use crate::naming::{app_id, env_export, logical_id, network_export};
use crate::queue::QUEUES;
use crate::template::{CfnResource, Template};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Stop grace period of the web-tier container, it holds no state worth
/// draining
const PROXY_STOP_TIMEOUT: u32 = 2;

/// Runtime and supervisor get the full two minutes to finish in-flight work
const WORKER_STOP_TIMEOUT: u32 = 120;

/// Local port the web tier forwards requests to
const RUNTIME_PORT: u16 = 9000;

/// Synthesize the application stack for one environment
///
/// The composition root: every other stack's exported value and every
/// per-environment literal meets here. A routing target group is attached to
/// the shared listener at the configured priority, a security group narrows
/// ingress to the load balancer, and a three-container task (web tier,
/// application runtime, background supervisor) runs as a scaled service.
pub fn template(config: &Config, env: &str) -> eyre::Result<Template> {
    let environment = config.environment(env)?;

    let app = App {
        project: &config.project,
        environment,
        network_stack: config.network_stack_name(),
        max_azs: config.network.max_azs,
        env,
        slug: app_id(&config.project.name, env),
        prefix: logical_id(&app_id(&config.project.name, env)),
    };

    let mut template = Template::new(&format!(
        "Application service for {} ({env})",
        config.project.name
    ));

    template.add_resources(app.routing());
    template.add_resources(app.mailer());
    template.add_resources(app.roles());
    template.add_resource(app.cluster());
    template.add_resource(app.task_definition());
    template.add_resource(app.service());

    if environment.service.bucket.enabled {
        template.add_resource(app.bucket());
    }

    Ok(template)
}

/// Variable names the app stack injects into the runtime and supervisor on
/// top of their configured sets
///
/// Validation uses the same list to report collisions with per-container
/// configuration, keeping the overwrite rule visible instead of silent.
pub(crate) fn shared_variable_names(environment: &Environment) -> Vec<&'static str> {
    let mut names = vec![
        "APP_SES_ACCESS_KEY_ID",
        "APP_SES_ACCESS_KEY_SECRET",
        "AWS_REGION",
        "DATABASE_URL",
    ];

    if environment.service.bucket.enabled {
        names.push("APP_S3_BUCKET_NAME");
    }

    if environment.queue.enabled {
        names.extend([
            "MESSENGER_TRANSPORT_HIGH_DSN",
            "MESSENGER_TRANSPORT_LOW_DSN",
            "MESSENGER_TRANSPORT_FAILED_DEPRECATED_DSN",
            "MESSENGER_TRANSPORT_FAILED_DSN",
        ]);
    }

    names
}

/// Tracing flags appended to the supervisor alone
pub(crate) const SUPERVISOR_TRACING: [(&str, &str); 3] = [
    ("DD_TRACE_CLI_ENABLED", "1"),
    ("DD_TRACE_AUTO_FLUSH_ENABLED", "1"),
    ("DD_TRACE_GENERATE_ROOT_SPAN", "0"),
];

struct App<'a> {
    project: &'a Project,
    environment: &'a Environment,
    network_stack: String,
    max_azs: usize,
    env: &'a str,
    slug: String,
    prefix: String,
}

impl App<'_> {
    /// Target group, listener rule and the security group narrowing ingress
    /// to the load balancer
    fn routing(&self) -> Vec<CfnResource> {
        let App { prefix, slug, .. } = self;
        let attachment = &self.environment.service.load_balancer;

        vec![
            CfnResource {
                name: format!("{prefix}TargetGroup"),
                resource: json!({
                    "Type": "AWS::ElasticLoadBalancingV2::TargetGroup",
                    "Properties": {
                        "Name": format!("{slug}-target"),
                        "Port": 80,
                        "Protocol": "HTTP",
                        "TargetType": "ip",
                        "VpcId": { "Fn::ImportValue": network_export(&self.network_stack, "vpc-id") },
                        "HealthCheckPath": "/ping",
                        "HealthCheckProtocol": "HTTP",
                        "HealthCheckIntervalSeconds": 5,
                        "HealthCheckTimeoutSeconds": 2,
                        "HealthyThresholdCount": 2,
                        "UnhealthyThresholdCount": 2,
                        "TargetGroupAttributes": [
                            { "Key": "deregistration_delay.timeout_seconds", "Value": "5" }
                        ]
                    }
                }),
            },
            // The priority is a manually assigned integer, unique across all
            // applications on this listener, it decides match order
            CfnResource {
                name: format!("{prefix}ListenerRule"),
                resource: json!({
                    "Type": "AWS::ElasticLoadBalancingV2::ListenerRule",
                    "Properties": {
                        "ListenerArn": attachment.listener_arn,
                        "Priority": attachment.listener_priority,
                        "Conditions": [{
                            "Field": "http-request-method",
                            "HttpRequestMethodConfig": { "Values": ["GET", "POST"] }
                        }],
                        "Actions": [{
                            "Type": "forward",
                            "TargetGroupArn": { "Ref": format!("{prefix}TargetGroup") }
                        }]
                    }
                }),
            },
            CfnResource {
                name: format!("{prefix}SecurityGroup"),
                resource: json!({
                    "Type": "AWS::EC2::SecurityGroup",
                    "Properties": {
                        "GroupName": format!("{slug}-security-group"),
                        "GroupDescription": format!("Service containers of {slug}"),
                        "VpcId": { "Fn::ImportValue": network_export(&self.network_stack, "vpc-id") },
                        "SecurityGroupIngress": [{
                            "SourceSecurityGroupId": attachment.security_group_id,
                            "IpProtocol": "tcp",
                            "FromPort": 80,
                            "ToPort": 80,
                            "Description": "Application load balancer"
                        }],
                        "SecurityGroupEgress": [{ "CidrIp": "0.0.0.0/0", "IpProtocol": "-1" }]
                    }
                }),
            },
        ]
    }

    /// Mail-sending identity and its access key
    ///
    /// The key id and secret feed the shared container environment, the
    /// application signs SES requests with them directly.
    fn mailer(&self) -> Vec<CfnResource> {
        let App { prefix, slug, .. } = self;

        vec![
            CfnResource {
                name: format!("{prefix}SesMailUser"),
                resource: json!({
                    "Type": "AWS::IAM::User",
                    "Properties": {
                        "UserName": format!("{slug}-ses-mail-user"),
                        "ManagedPolicyArns": ["arn:aws:iam::aws:policy/AmazonSESFullAccess"]
                    }
                }),
            },
            CfnResource {
                name: format!("{prefix}SesMailAccessKey"),
                resource: json!({
                    "Type": "AWS::IAM::AccessKey",
                    "Properties": { "UserName": { "Ref": format!("{prefix}SesMailUser") } }
                }),
            },
        ]
    }

    /// Task role (what the application may call) and execution role (what
    /// the orchestrator needs to start it)
    fn roles(&self) -> Vec<CfnResource> {
        let App { prefix, slug, .. } = self;
        let assume_role = json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": ["ecs-tasks.amazonaws.com"] },
                "Action": ["sts:AssumeRole"]
            }]
        });

        let mut task_role = json!({
            "Type": "AWS::IAM::Role",
            "Properties": {
                "RoleName": format!("{slug}-task-role"),
                "AssumeRolePolicyDocument": assume_role,
                "Path": "/"
            }
        });

        let mut policies = Vec::new();

        if self.environment.queue.enabled {
            policies.push(self.queue_policy());
        }

        if self.environment.service.bucket.enabled {
            policies.push(self.bucket_policy());
        }

        if !policies.is_empty() {
            task_role["Properties"]
                .as_object_mut()
                .unwrap()
                .insert("Policies".into(), Value::Array(policies));
        }

        vec![
            CfnResource {
                name: format!("{prefix}TaskRole"),
                resource: task_role,
            },
            CfnResource {
                name: format!("{prefix}ExecutionRole"),
                resource: json!({
                    "Type": "AWS::IAM::Role",
                    "Properties": {
                        "RoleName": format!("{slug}-execution-role"),
                        "AssumeRolePolicyDocument": assume_role,
                        "Path": "/",
                        "ManagedPolicyArns": [
                            "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy"
                        ],
                        "Policies": [{
                            "PolicyName": "ReadAppSecretPolicy",
                            "PolicyDocument": {
                                "Version": "2012-10-17",
                                "Statement": [{
                                    "Effect": "Allow",
                                    "Action": ["secretsmanager:GetSecretValue"],
                                    "Resource": [self.environment.service.secret.app]
                                }]
                            }
                        }]
                    }
                }),
            },
        ]
    }

    /// Send, consume and purge on all three queues of the environment
    fn queue_policy(&self) -> Value {
        let arns = QUEUES
            .map(|(_, suffix)| {
                json!({ "Fn::ImportValue": env_export(
                    &self.project.name,
                    "queue",
                    self.env,
                    &format!("{suffix}-arn"),
                ) })
            })
            .to_vec();

        json!({
            "PolicyName": "QueuePolicy",
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": [
                        "sqs:ChangeMessageVisibility",
                        "sqs:DeleteMessage",
                        "sqs:GetQueueAttributes",
                        "sqs:GetQueueUrl",
                        "sqs:PurgeQueue",
                        "sqs:ReceiveMessage",
                        "sqs:SendMessage"
                    ],
                    "Resource": arns
                }]
            }
        })
    }

    fn bucket_policy(&self) -> Value {
        json!({
            "PolicyName": "BucketPolicy",
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": [
                        "s3:AbortMultipartUpload",
                        "s3:DeleteObject",
                        "s3:GetBucketLocation",
                        "s3:GetObject",
                        "s3:ListBucket",
                        "s3:PutObject"
                    ],
                    "Resource": [
                        { "Fn::GetAtt": [format!("{}Bucket", self.prefix), "Arn"] },
                        { "Fn::Sub": format!("${{{}Bucket.Arn}}/*", self.prefix) }
                    ]
                }]
            }
        })
    }

    fn cluster(&self) -> CfnResource {
        CfnResource {
            name: format!("{}Cluster", self.prefix),
            resource: json!({
                "Type": "AWS::ECS::Cluster",
                "Properties": {
                    "ClusterName": self.slug,
                    "CapacityProviders": ["FARGATE", "FARGATE_SPOT"],
                    "ClusterSettings": [{ "Name": "containerInsights", "Value": "disabled" }]
                }
            }),
        }
    }

    /// The connection string is assembled at synthesis time from dynamic
    /// references against the database stack's secret, the resolved values
    /// never appear in the template body.
    fn database_url(&self) -> Value {
        let database = &self.environment.database;

        let url = format!(
            "mysql://{u}:{p}@{h}:{port}/{name}?serverVersion={version}",
            u = "{{resolve:secretsmanager:${SecretArn}:SecretString:username}}",
            p = "{{resolve:secretsmanager:${SecretArn}:SecretString:password}}",
            h = "{{resolve:secretsmanager:${SecretArn}:SecretString:host}}",
            port = "{{resolve:secretsmanager:${SecretArn}:SecretString:port}}",
            name = database.database_name,
            version = database.engine_version,
        );

        json!({
            "Fn::Sub": [url, {
                "SecretArn": { "Fn::ImportValue": env_export(
                    &self.project.name,
                    "database",
                    self.env,
                    "secret-arn",
                ) }
            }]
        })
    }

    /// Environment variables injected identically into the runtime and the
    /// supervisor, on top of their own configured sets
    fn shared_environment(&self) -> BTreeMap<String, Value> {
        let mut shared = BTreeMap::from([
            (
                "APP_SES_ACCESS_KEY_ID".to_string(),
                json!({ "Ref": format!("{}SesMailAccessKey", self.prefix) }),
            ),
            (
                "APP_SES_ACCESS_KEY_SECRET".to_string(),
                json!({ "Fn::GetAtt": [format!("{}SesMailAccessKey", self.prefix), "SecretAccessKey"] }),
            ),
            (
                "AWS_REGION".to_string(),
                Value::String(self.project.region.clone()),
            ),
            ("DATABASE_URL".to_string(), self.database_url()),
        ]);

        if self.environment.service.bucket.enabled {
            shared.insert(
                "APP_S3_BUCKET_NAME".to_string(),
                json!({ "Ref": format!("{}Bucket", self.prefix) }),
            );
        }

        if self.environment.queue.enabled {
            for (variable, suffix) in [
                ("MESSENGER_TRANSPORT_HIGH_DSN", "messages-high-priority-url"),
                ("MESSENGER_TRANSPORT_LOW_DSN", "messages-low-priority-url"),
                ("MESSENGER_TRANSPORT_FAILED_DEPRECATED_DSN", "messages-failed-url"),
            ] {
                shared.insert(
                    variable.to_string(),
                    json!({ "Fn::ImportValue": env_export(
                        &self.project.name,
                        "queue",
                        self.env,
                        suffix,
                    ) }),
                );
            }

            shared.insert(
                "MESSENGER_TRANSPORT_FAILED_DSN".to_string(),
                Value::String("doctrine://default?queue_name=failed".to_string()),
            );
        }

        shared
    }

    /// Secrets resolved by the orchestrator at task start, never synthesized
    /// into the template
    fn shared_secrets(&self) -> Value {
        json!([{
            "Name": "APP_SECRET",
            "ValueFrom": format!("{}:APP_SECRET::", self.environment.service.secret.app)
        }])
    }

    fn container(
        &self,
        container: &Container,
        extra: &BTreeMap<String, Value>,
        with_secrets: bool,
        port: Option<u16>,
        stop_timeout: u32,
    ) -> Value {
        // Later inserts win: shared entries overwrite the container's own,
        // validation reports every such collision up front
        let mut variables: BTreeMap<String, Value> = container
            .environment
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();

        for (name, value) in extra {
            variables.insert(name.clone(), value.clone());
        }

        let environment = variables
            .into_iter()
            .map(|(name, value)| json!({ "Name": name, "Value": value }))
            .collect::<Vec<_>>();

        let mut definition = json!({
            "Name": container.name,
            "Image": self.environment.image_uri(
                self.project,
                container.repository,
                &self.environment.image_tag,
            ),
            "Essential": true,
            "MemoryReservation": container.memory_reservation,
            "Environment": environment,
            "StopTimeout": stop_timeout,
        });

        let definition_map = definition.as_object_mut().unwrap();

        if let Some(entry_point) = &container.entry_point {
            definition_map.insert("EntryPoint".into(), json!(entry_point));
        }

        if let Some(port) = port {
            definition_map.insert(
                "PortMappings".into(),
                json!([{ "ContainerPort": port, "HostPort": port, "Protocol": "tcp" }]),
            );
        }

        if with_secrets {
            definition_map.insert("Secrets".into(), self.shared_secrets());
        }

        definition
    }

    fn task_definition(&self) -> CfnResource {
        let App { prefix, slug, .. } = self;
        let service = &self.environment.service;
        let shared = self.shared_environment();

        let proxy = self.container(
            &service.containers.proxy,
            &BTreeMap::new(),
            false,
            Some(80),
            PROXY_STOP_TIMEOUT,
        );

        let runtime = self.container(
            &service.containers.runtime,
            &shared,
            true,
            Some(RUNTIME_PORT),
            WORKER_STOP_TIMEOUT,
        );

        // The supervisor additionally flushes traces from its short-lived
        // child processes
        let mut supervisor_extra = shared;
        for (name, value) in SUPERVISOR_TRACING {
            supervisor_extra.insert(name.to_string(), Value::String(value.to_string()));
        }

        let supervisor = self.container(
            &service.containers.supervisor,
            &supervisor_extra,
            true,
            None,
            WORKER_STOP_TIMEOUT,
        );

        CfnResource {
            name: format!("{prefix}TaskDefinition"),
            resource: json!({
                "Type": "AWS::ECS::TaskDefinition",
                "Properties": {
                    "Family": format!("{slug}-taskdef"),
                    "Cpu": service.cpu,
                    "Memory": service.memory,
                    "NetworkMode": "awsvpc",
                    "RequiresCompatibilities": ["EC2", "FARGATE"],
                    "TaskRoleArn": { "Fn::GetAtt": [format!("{prefix}TaskRole"), "Arn"] },
                    "ExecutionRoleArn": { "Fn::GetAtt": [format!("{prefix}ExecutionRole"), "Arn"] },
                    "ContainerDefinitions": [proxy, runtime, supervisor]
                }
            }),
        }
    }

    fn service(&self) -> CfnResource {
        let App { prefix, slug, .. } = self;
        let service = &self.environment.service;

        let strategies = service
            .capacity_provider
            .iter()
            .map(|strategy| {
                json!({
                    "CapacityProvider": strategy.capacity_provider,
                    "Weight": strategy.weight
                })
            })
            .collect::<Vec<_>>();

        let subnets = (1..=self.max_azs)
            .map(|n| {
                json!({ "Fn::ImportValue": network_export(&self.network_stack, &format!("private-subnet-{n}")) })
            })
            .collect::<Vec<_>>();

        CfnResource {
            name: format!("{prefix}Service"),
            // The target group only becomes attachable once its listener
            // rule exists
            resource: json!({
                "Type": "AWS::ECS::Service",
                "DependsOn": format!("{prefix}ListenerRule"),
                "Properties": {
                    "ServiceName": slug,
                    "Cluster": { "Ref": format!("{prefix}Cluster") },
                    "TaskDefinition": { "Ref": format!("{prefix}TaskDefinition") },
                    "DesiredCount": service.desired_count,
                    "EnableExecuteCommand": true,
                    "CapacityProviderStrategy": strategies,
                    "DeploymentConfiguration": {
                        "MinimumHealthyPercent": 100,
                        "MaximumPercent": 200
                    },
                    "NetworkConfiguration": {
                        "AwsvpcConfiguration": {
                            "AssignPublicIp": "DISABLED",
                            "SecurityGroups": [
                                { "Fn::GetAtt": [format!("{prefix}SecurityGroup"), "GroupId"] }
                            ],
                            "Subnets": subnets
                        }
                    },
                    "LoadBalancers": [{
                        "ContainerName": service.containers.proxy.name,
                        "ContainerPort": 80,
                        "TargetGroupArn": { "Ref": format!("{prefix}TargetGroup") }
                    }]
                }
            }),
        }
    }

    fn bucket(&self) -> CfnResource {
        CfnResource {
            name: format!("{}Bucket", self.prefix),
            resource: json!({
                "Type": "AWS::S3::Bucket",
                "Properties": {
                    "BucketName": format!("{}-s3-bucket", self.slug),
                    "PublicAccessBlockConfiguration": {
                        "BlockPublicAcls": true,
                        "BlockPublicPolicy": true,
                        "IgnorePublicAcls": true,
                        "RestrictPublicBuckets": true
                    }
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::fixture;

    fn container<'a>(template: &'a Template, name: &str) -> &'a Value {
        template.resource("DemoAppDevTaskDefinition").unwrap()["Properties"]
            ["ContainerDefinitions"]
            .as_array()
            .unwrap()
            .iter()
            .find(|definition| definition["Name"] == name)
            .unwrap()
    }

    fn variable<'a>(container: &'a Value, name: &str) -> Option<&'a Value> {
        container["Environment"]
            .as_array()
            .unwrap()
            .iter()
            .find(|entry| entry["Name"] == name)
            .map(|entry| &entry["Value"])
    }

    #[test]
    fn dev_names_carry_the_dev_suffix_and_leave_prod_priorities_alone() {
        let config = fixture();
        let template = template(&config, "dev").unwrap();

        let target = template.resource("DemoAppDevTargetGroup").unwrap();
        let group = template.resource("DemoAppDevSecurityGroup").unwrap();
        let rule = template.resource("DemoAppDevListenerRule").unwrap();

        assert_eq!(target["Properties"]["Name"], "demo-app-dev-target");
        assert_eq!(
            group["Properties"]["GroupName"],
            "demo-app-dev-security-group"
        );
        assert_eq!(rule["Properties"]["Priority"], 210);

        // The priority-200 attachment stays reserved for production
        assert!(!template.body().contains("\"Priority\": 200"));
    }

    #[test]
    fn only_the_load_balancer_may_reach_the_service_port() {
        let config = fixture();
        let template = template(&config, "dev").unwrap();

        let ingress = &template.resource("DemoAppDevSecurityGroup").unwrap()["Properties"]
            ["SecurityGroupIngress"];

        assert_eq!(ingress.as_array().unwrap().len(), 1);
        assert_eq!(ingress[0]["SourceSecurityGroupId"], "sg-0f1e2d3c4b5a69788");
        assert_eq!(ingress[0]["FromPort"], 80);
    }

    #[test]
    fn shared_environment_reaches_runtime_and_supervisor_but_not_the_proxy() {
        let config = fixture();
        let template = template(&config, "dev").unwrap();

        for name in ["php-fpm", "supervisor"] {
            let definition = container(&template, name);

            assert!(variable(definition, "DATABASE_URL").is_some());
            assert!(variable(definition, "APP_SES_ACCESS_KEY_ID").is_some());
            assert_eq!(
                definition["Secrets"][0]["Name"], "APP_SECRET",
                "{name} should receive the app secret"
            );
        }

        let proxy = container(&template, "nginx");
        assert!(variable(proxy, "DATABASE_URL").is_none());
        assert!(proxy.get("Secrets").is_none());
        assert_eq!(variable(proxy, "PHP_HOST").unwrap(), "localhost");
    }

    #[test]
    fn shared_entries_overwrite_container_entries() {
        let mut config = fixture();

        config
            .environments
            .get_mut("dev")
            .unwrap()
            .service
            .containers
            .runtime
            .environment
            .insert("AWS_REGION".into(), "us-east-1".into());

        let template = template(&config, "dev").unwrap();
        let runtime = container(&template, "php-fpm");

        assert_eq!(variable(runtime, "AWS_REGION").unwrap(), "eu-west-3");
    }

    #[test]
    fn tracing_flush_flags_are_supervisor_only() {
        let config = fixture();
        let template = template(&config, "dev").unwrap();

        let supervisor = container(&template, "supervisor");
        assert_eq!(variable(supervisor, "DD_TRACE_CLI_ENABLED").unwrap(), "1");

        let runtime = container(&template, "php-fpm");
        assert!(variable(runtime, "DD_TRACE_CLI_ENABLED").is_none());
    }

    #[test]
    fn connection_string_resolves_credentials_from_the_database_secret() {
        let config = fixture();
        let template = template(&config, "dev").unwrap();

        let url = variable(container(&template, "php-fpm"), "DATABASE_URL").unwrap();
        let format = url["Fn::Sub"][0].as_str().unwrap();

        assert!(format.starts_with("mysql://{{resolve:secretsmanager:${SecretArn}"));
        assert!(format.ends_with("/demo-app-dev?serverVersion=8.0"));
        assert_eq!(
            url["Fn::Sub"][1]["SecretArn"]["Fn::ImportValue"],
            "demo-app-database-dev-secret-arn"
        );
    }

    #[test]
    fn queue_wiring_appears_only_when_the_queue_is_enabled() {
        let mut config = fixture();
        let template_without = template(&config, "dev").unwrap();

        let runtime = container(&template_without, "php-fpm");
        assert!(variable(runtime, "MESSENGER_TRANSPORT_HIGH_DSN").is_none());
        assert!(template_without.resource("DemoAppDevTaskRole").unwrap()["Properties"]
            .get("Policies")
            .is_none());

        config.environments.get_mut("dev").unwrap().queue.enabled = true;
        let template_with = template(&config, "dev").unwrap();

        let runtime = container(&template_with, "php-fpm");
        assert_eq!(
            variable(runtime, "MESSENGER_TRANSPORT_HIGH_DSN").unwrap()["Fn::ImportValue"],
            "demo-app-queue-dev-messages-high-priority-url"
        );
        assert_eq!(
            variable(runtime, "MESSENGER_TRANSPORT_FAILED_DSN").unwrap(),
            "doctrine://default?queue_name=failed"
        );

        let policies =
            &template_with.resource("DemoAppDevTaskRole").unwrap()["Properties"]["Policies"];
        assert_eq!(policies[0]["PolicyName"], "QueuePolicy");
    }

    #[test]
    fn bucket_is_gated_and_grants_the_task_role_access() {
        let mut config = fixture();
        assert!(template(&config, "dev")
            .unwrap()
            .resource("DemoAppDevBucket")
            .is_none());

        config
            .environments
            .get_mut("dev")
            .unwrap()
            .service
            .bucket
            .enabled = true;

        let template = template(&config, "dev").unwrap();

        assert_eq!(
            template.resource("DemoAppDevBucket").unwrap()["Properties"]["BucketName"],
            "demo-app-dev-s3-bucket"
        );

        let runtime = container(&template, "php-fpm");
        assert_eq!(
            variable(runtime, "APP_S3_BUCKET_NAME").unwrap()["Ref"],
            "DemoAppDevBucket"
        );

        let policies = &template.resource("DemoAppDevTaskRole").unwrap()["Properties"]["Policies"];
        assert_eq!(policies[0]["PolicyName"], "BucketPolicy");
    }

    #[test]
    fn service_waits_for_the_listener_rule_and_uses_the_configured_strategy() {
        let config = fixture();
        let template = template(&config, "dev").unwrap();

        let service = template.resource("DemoAppDevService").unwrap();

        assert_eq!(service["DependsOn"], "DemoAppDevListenerRule");
        assert_eq!(
            service["Properties"]["CapacityProviderStrategy"][0]["CapacityProvider"],
            "FARGATE_SPOT"
        );
        assert_eq!(service["Properties"]["DesiredCount"], 1);
        assert_eq!(
            service["Properties"]["LoadBalancers"][0]["ContainerName"],
            "nginx"
        );
    }

    #[test]
    fn two_synthesis_runs_produce_identical_bodies() {
        let config = fixture();

        assert_eq!(
            template(&config, "dev").unwrap().body(),
            template(&config, "dev").unwrap().body()
        );
    }
}
