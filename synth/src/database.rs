use crate::config::Config;
use crate::naming::{app_id, env_export, logical_id, network_export};
use crate::template::{CfnResource, Output, Template};
use serde_json::json;

/// Synthesize the serverless database stack for one environment
///
/// An Aurora MySQL cluster in the private subnets, scaling between the
/// configured capacity bounds, with its master credentials generated into a
/// Secrets Manager secret. The secret ARN is exported so the app stack can
/// assemble a connection string without ever seeing a password.
pub fn template(config: &Config, env: &str) -> eyre::Result<Template> {
    let environment = config.environment(env)?;
    let database = &environment.database;
    let network_stack = config.network_stack_name();
    let prefix = logical_id(&app_id(&config.project.name, env));

    let mut template = Template::new(&format!(
        "Serverless database cluster for {} ({env})",
        config.project.name
    ));

    let subnets = (1..=config.network.max_azs)
        .map(|n| {
            json!({ "Fn::ImportValue": network_export(&network_stack, &format!("private-subnet-{n}")) })
        })
        .collect::<Vec<_>>();

    template.add_resource(CfnResource {
        name: format!("{prefix}DatabaseSubnetGroup"),
        resource: json!({
            "Type": "AWS::RDS::DBSubnetGroup",
            "Properties": {
                "DBSubnetGroupName": format!("{}-subnets", database.cluster_name),
                "DBSubnetGroupDescription": format!("Subnets of {}", database.cluster_name),
                "SubnetIds": subnets
            }
        }),
    });

    // Default port open to any IPv4 source, reachability is bounded by the
    // private subnets the cluster lives in
    template.add_resource(CfnResource {
        name: format!("{prefix}DatabaseSecurityGroup"),
        resource: json!({
            "Type": "AWS::EC2::SecurityGroup",
            "Properties": {
                "GroupDescription": format!("Default port of {}", database.cluster_name),
                "VpcId": { "Fn::ImportValue": network_export(&network_stack, "vpc-id") },
                "SecurityGroupIngress": [{
                    "CidrIp": "0.0.0.0/0",
                    "IpProtocol": "tcp",
                    "FromPort": 3306,
                    "ToPort": 3306
                }],
                "SecurityGroupEgress": [{ "CidrIp": "0.0.0.0/0", "IpProtocol": "-1" }]
            }
        }),
    });

    template.add_resource(CfnResource {
        name: format!("{prefix}DatabaseSecret"),
        resource: json!({
            "Type": "AWS::SecretsManager::Secret",
            "Properties": {
                "Name": format!("{}-credentials", database.cluster_name),
                "Description": format!("Master credentials of {}", database.cluster_name),
                "GenerateSecretString": {
                    "SecretStringTemplate": "{\"username\": \"admin\"}",
                    "GenerateStringKey": "password",
                    "PasswordLength": 30,
                    "ExcludeCharacters": "\"@/\\"
                }
            }
        }),
    });

    template.add_resource(CfnResource {
        name: format!("{prefix}Database"),
        resource: json!({
            "Type": "AWS::RDS::DBCluster",
            "Properties": {
                "DBClusterIdentifier": database.cluster_name,
                "Engine": "aurora-mysql",
                "EngineMode": "serverless",
                "EnableHttpEndpoint": true,
                "MasterUsername": { "Fn::Sub": format!(
                    "{{{{resolve:secretsmanager:${{{prefix}DatabaseSecret}}:SecretString:username}}}}"
                ) },
                "MasterUserPassword": { "Fn::Sub": format!(
                    "{{{{resolve:secretsmanager:${{{prefix}DatabaseSecret}}:SecretString:password}}}}"
                ) },
                "ScalingConfiguration": scaling(database),
                "BackupRetentionPeriod": database.backup_retention_days,
                "DeletionProtection": database.deletion_protection,
                "DBSubnetGroupName": { "Ref": format!("{prefix}DatabaseSubnetGroup") },
                "VpcSecurityGroupIds": [
                    { "Fn::GetAtt": [format!("{prefix}DatabaseSecurityGroup"), "GroupId"] }
                ]
            }
        }),
    });

    // Adds host and port to the generated secret once the cluster exists
    template.add_resource(CfnResource {
        name: format!("{prefix}DatabaseSecretAttachment"),
        resource: json!({
            "Type": "AWS::SecretsManager::SecretTargetAttachment",
            "Properties": {
                "SecretId": { "Ref": format!("{prefix}DatabaseSecret") },
                "TargetId": { "Ref": format!("{prefix}Database") },
                "TargetType": "AWS::RDS::DBCluster"
            }
        }),
    });

    template.add_outputs(vec![
        Output::exported(
            "DatabaseEndpoint",
            json!({ "Fn::GetAtt": [format!("{prefix}Database"), "Endpoint.Address"] }),
            &env_export(&config.project.name, "database", env, "endpoint"),
        ),
        Output::exported(
            "DatabasePort",
            json!({ "Fn::GetAtt": [format!("{prefix}Database"), "Endpoint.Port"] }),
            &env_export(&config.project.name, "database", env, "port"),
        ),
        Output::exported(
            "DatabaseSecretArn",
            json!({ "Ref": format!("{prefix}DatabaseSecret") }),
            &env_export(&config.project.name, "database", env, "secret-arn"),
        ),
        Output::new(
            "ClusterIdentifier",
            json!({ "Ref": format!("{prefix}Database") }),
        ),
    ]);

    Ok(template)
}

/// Capacity bounds and the auto-pause switch
///
/// An auto-pause of zero seconds disables pausing entirely: the cluster
/// never scales to zero, trading idle cost for no cold starts.
fn scaling(database: &crate::config::Database) -> serde_json::Value {
    if database.auto_pause_seconds == 0 {
        json!({
            "AutoPause": false,
            "MinCapacity": database.min_capacity,
            "MaxCapacity": database.max_capacity
        })
    } else {
        json!({
            "AutoPause": true,
            "SecondsUntilAutoPause": database.auto_pause_seconds,
            "MinCapacity": database.min_capacity,
            "MaxCapacity": database.max_capacity
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::fixture;

    #[test]
    fn auto_pause_is_disabled_at_zero_seconds() {
        let config = fixture();
        let template = template(&config, "dev").unwrap();

        let cluster = template.resource("DemoAppDevDatabase").unwrap();
        let scaling = &cluster["Properties"]["ScalingConfiguration"];

        assert_eq!(scaling["AutoPause"], false);
        assert!(scaling.get("SecondsUntilAutoPause").is_none());
    }

    #[test]
    fn auto_pause_carries_the_configured_idle_window() {
        let mut config = fixture();
        config
            .environments
            .get_mut("dev")
            .unwrap()
            .database
            .auto_pause_seconds = 600;

        let template = template(&config, "dev").unwrap();
        let scaling = &template.resource("DemoAppDevDatabase").unwrap()["Properties"]["ScalingConfiguration"];

        assert_eq!(scaling["AutoPause"], true);
        assert_eq!(scaling["SecondsUntilAutoPause"], 600);
    }

    #[test]
    fn production_keeps_stronger_protection_than_dev() {
        let config = fixture();

        let dev = template(&config, "dev").unwrap();
        let prod = template(&config, "prod").unwrap();

        let dev_props = &dev.resource("DemoAppDevDatabase").unwrap()["Properties"];
        let prod_props = &prod.resource("DemoAppProdDatabase").unwrap()["Properties"];

        assert_eq!(prod_props["DeletionProtection"], true);
        assert!(
            prod_props["BackupRetentionPeriod"].as_u64().unwrap()
                >= dev_props["BackupRetentionPeriod"].as_u64().unwrap()
        );
    }

    #[test]
    fn master_credentials_come_from_the_generated_secret() {
        let config = fixture();
        let template = template(&config, "dev").unwrap();

        let cluster = template.resource("DemoAppDevDatabase").unwrap();
        let username = cluster["Properties"]["MasterUsername"]["Fn::Sub"]
            .as_str()
            .unwrap();

        assert!(username.starts_with("{{resolve:secretsmanager:${DemoAppDevDatabaseSecret}"));
        assert!(username.ends_with(":SecretString:username}}"));

        assert!(template.resource("DemoAppDevDatabaseSecretAttachment").is_some());
    }

    #[test]
    fn secret_arn_is_exported_for_the_app_stack() {
        let config = fixture();
        let body = template(&config, "prod").unwrap().body();

        assert!(body.contains("demo-app-database-prod-secret-arn"));
    }
}
