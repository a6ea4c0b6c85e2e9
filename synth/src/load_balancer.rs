use crate::config::Config;
use crate::naming::{env_export, logical_id, network_export};
use crate::template::{CfnResource, Output, Template};
use serde_json::json;

/// Synthesize a public load balancer stack for one environment
///
/// The default listener action is a fixed 503: until an application attaches
/// a target group, every request fails closed instead of being routed to
/// nothing.
pub fn template(config: &Config, env: &str) -> eyre::Result<Template> {
    let environment = config.environment(env)?;
    let balancer = &environment.load_balancer;
    let network_stack = config.network_stack_name();
    let id = logical_id(&balancer.name);

    let mut template = Template::new(&format!(
        "Public load balancer for {} ({env})",
        config.project.name
    ));

    template.add_resource(CfnResource {
        name: format!("{id}SecurityGroup"),
        resource: json!({
            "Type": "AWS::EC2::SecurityGroup",
            "Properties": {
                "GroupDescription": format!("Listener port of {}", balancer.name),
                "VpcId": { "Fn::ImportValue": network_export(&network_stack, "vpc-id") },
                "SecurityGroupIngress": [{
                    "CidrIp": "0.0.0.0/0",
                    "IpProtocol": "tcp",
                    "FromPort": balancer.listener_port,
                    "ToPort": balancer.listener_port
                }],
                "SecurityGroupEgress": [{ "CidrIp": "0.0.0.0/0", "IpProtocol": "-1" }]
            }
        }),
    });

    let subnets = (1..=config.network.max_azs)
        .map(|n| {
            json!({ "Fn::ImportValue": network_export(&network_stack, &format!("public-subnet-{n}")) })
        })
        .collect::<Vec<_>>();

    template.add_resource(CfnResource {
        name: format!("{id}LoadBalancer"),
        resource: json!({
            "Type": "AWS::ElasticLoadBalancingV2::LoadBalancer",
            "Properties": {
                "Name": balancer.name,
                "Type": "application",
                "Scheme": "internet-facing",
                "IpAddressType": "ipv4",
                "Subnets": subnets,
                "SecurityGroups": [{ "Fn::GetAtt": [format!("{id}SecurityGroup"), "GroupId"] }],
                "LoadBalancerAttributes": [
                    { "Key": "routing.http2.enabled", "Value": "true" }
                ]
            }
        }),
    });

    template.add_resource(CfnResource {
        name: format!("{id}Listener{port}", port = balancer.listener_port),
        resource: json!({
            "Type": "AWS::ElasticLoadBalancingV2::Listener",
            "Properties": {
                "LoadBalancerArn": { "Ref": format!("{id}LoadBalancer") },
                "Port": balancer.listener_port,
                "Protocol": "HTTP",
                "DefaultActions": [{
                    "Type": "fixed-response",
                    "FixedResponseConfig": {
                        "StatusCode": "503",
                        "ContentType": "application/json"
                    }
                }]
            }
        }),
    });

    template.add_outputs(vec![
        Output::exported(
            "LoadBalancerArn",
            json!({ "Ref": format!("{id}LoadBalancer") }),
            &env_export(&config.project.name, "load-balancer", env, "arn"),
        ),
        Output::exported(
            "LoadBalancerDnsName",
            json!({ "Fn::GetAtt": [format!("{id}LoadBalancer"), "DNSName"] }),
            &env_export(&config.project.name, "load-balancer", env, "dns-name"),
        ),
        Output::exported(
            &format!("Listener{}Arn", balancer.listener_port),
            json!({ "Ref": format!("{id}Listener{}", balancer.listener_port) }),
            &env_export(&config.project.name, "load-balancer", env, "listener-arn"),
        ),
        Output::exported(
            "SecurityGroupId",
            json!({ "Fn::GetAtt": [format!("{id}SecurityGroup"), "GroupId"] }),
            &env_export(&config.project.name, "load-balancer", env, "security-group-id"),
        ),
    ]);

    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::fixture;

    #[test]
    fn default_action_fails_closed_with_503() {
        let config = fixture();
        let template = template(&config, "dev").unwrap();

        let listener = template.resource("DemoAppBalancerDevListener80").unwrap();
        let action = &listener["Properties"]["DefaultActions"][0];

        assert_eq!(action["Type"], "fixed-response");
        assert_eq!(action["FixedResponseConfig"]["StatusCode"], "503");
        assert_eq!(
            action["FixedResponseConfig"]["ContentType"],
            "application/json"
        );
    }

    #[test]
    fn balancer_spans_every_public_subnet() {
        let config = fixture();
        let template = template(&config, "dev").unwrap();

        let balancer = template.resource("DemoAppBalancerDevLoadBalancer").unwrap();
        let subnets = balancer["Properties"]["Subnets"].as_array().unwrap();

        assert_eq!(subnets.len(), config.network.max_azs);
        assert_eq!(
            subnets[0]["Fn::ImportValue"],
            "demo-app-network-public-subnet-1"
        );
    }

    #[test]
    fn environments_get_distinct_exports() {
        let config = fixture();

        let dev = template(&config, "dev").unwrap().body();
        let prod = template(&config, "prod").unwrap().body();

        assert!(dev.contains("demo-app-load-balancer-dev-listener-arn"));
        assert!(prod.contains("demo-app-load-balancer-prod-listener-arn"));
        assert!(!dev.contains("load-balancer-prod"));
    }
}
