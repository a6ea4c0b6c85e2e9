use crate::config::Config;
use crate::naming::{logical_id, network_export};
use crate::template::{CfnResource, Output, Template};
use eyre::WrapErr;
use serde_json::json;

/// Synthesize the shared network stack
///
/// One VPC with a public and a private subnet per availability zone, an
/// internet gateway for the public side and `nat_gateways` NAT gateways for
/// the private side. Dependents never look the network up at runtime: the
/// vpc id, its CIDR and every subnet id are exported under names derived
/// from the stack name.
pub fn template(config: &Config) -> eyre::Result<Template> {
    let network = &config.network;
    let stack_name = config.network_stack_name();
    let id = logical_id(&network.name);

    let mut template = Template::new(&format!(
        "Shared network for {}",
        config.project.name
    ));

    template.add_resource(CfnResource {
        name: format!("{id}Vpc"),
        resource: json!({
            "Type": "AWS::EC2::VPC",
            "Properties": {
                "CidrBlock": network.cidr,
                "EnableDnsHostnames": true,
                "EnableDnsSupport": true,
                "Tags": [{ "Key": "Name", "Value": network.name }]
            }
        }),
    });

    template.add_resource(CfnResource {
        name: format!("{id}InternetGateway"),
        resource: json!({ "Type": "AWS::EC2::InternetGateway" }),
    });

    template.add_resource(CfnResource {
        name: format!("{id}VpcGatewayAttachment"),
        resource: json!({
            "Type": "AWS::EC2::VPCGatewayAttachment",
            "Properties": {
                "VpcId": { "Ref": format!("{id}Vpc") },
                "InternetGatewayId": { "Ref": format!("{id}InternetGateway") }
            }
        }),
    });

    // One shared route table for all public subnets
    template.add_resource(CfnResource {
        name: format!("{id}PublicRouteTable"),
        resource: json!({
            "Type": "AWS::EC2::RouteTable",
            "Properties": { "VpcId": { "Ref": format!("{id}Vpc") } }
        }),
    });

    template.add_resource(CfnResource {
        name: format!("{id}PublicDefaultRoute"),
        resource: json!({
            "Type": "AWS::EC2::Route",
            "DependsOn": format!("{id}VpcGatewayAttachment"),
            "Properties": {
                "RouteTableId": { "Ref": format!("{id}PublicRouteTable") },
                "DestinationCidrBlock": "0.0.0.0/0",
                "GatewayId": { "Ref": format!("{id}InternetGateway") }
            }
        }),
    });

    let mut outputs = vec![
        Output::exported(
            "VpcId",
            json!({ "Ref": format!("{id}Vpc") }),
            &network_export(&stack_name, "vpc-id"),
        ),
        Output::exported(
            "VpcCidr",
            json!({ "Fn::GetAtt": [format!("{id}Vpc"), "CidrBlock"] }),
            &network_export(&stack_name, "vpc-cidr"),
        ),
    ];

    for az in 0..network.max_azs {
        let n = az + 1;

        template.add_resource(CfnResource {
            name: format!("{id}PublicSubnet{n}"),
            resource: json!({
                "Type": "AWS::EC2::Subnet",
                "Properties": {
                    "VpcId": { "Ref": format!("{id}Vpc") },
                    "CidrBlock": subnet_cidr(&network.cidr, az)?,
                    "AvailabilityZone": { "Fn::Select": [az, { "Fn::GetAZs": "" }] },
                    "MapPublicIpOnLaunch": true,
                    "Tags": [{ "Key": "Name", "Value": format!("{}-public-{n}", network.name) }]
                }
            }),
        });

        template.add_resource(CfnResource {
            name: format!("{id}PublicSubnet{n}RouteTableAssociation"),
            resource: json!({
                "Type": "AWS::EC2::SubnetRouteTableAssociation",
                "Properties": {
                    "SubnetId": { "Ref": format!("{id}PublicSubnet{n}") },
                    "RouteTableId": { "Ref": format!("{id}PublicRouteTable") }
                }
            }),
        });

        // Private subnets are carved from the upper half of the VPC range
        template.add_resource(CfnResource {
            name: format!("{id}PrivateSubnet{n}"),
            resource: json!({
                "Type": "AWS::EC2::Subnet",
                "Properties": {
                    "VpcId": { "Ref": format!("{id}Vpc") },
                    "CidrBlock": subnet_cidr(&network.cidr, 128 + az)?,
                    "AvailabilityZone": { "Fn::Select": [az, { "Fn::GetAZs": "" }] },
                    "MapPublicIpOnLaunch": false,
                    "Tags": [{ "Key": "Name", "Value": format!("{}-private-{n}", network.name) }]
                }
            }),
        });

        outputs.push(Output::exported(
            &format!("PublicSubnet{n}Id"),
            json!({ "Ref": format!("{id}PublicSubnet{n}") }),
            &network_export(&stack_name, &format!("public-subnet-{n}")),
        ));

        outputs.push(Output::exported(
            &format!("PrivateSubnet{n}Id"),
            json!({ "Ref": format!("{id}PrivateSubnet{n}") }),
            &network_export(&stack_name, &format!("private-subnet-{n}")),
        ));
    }

    for nat in 0..network.nat_gateways {
        let n = nat + 1;

        template.add_resource(CfnResource {
            name: format!("{id}NatEip{n}"),
            resource: json!({
                "Type": "AWS::EC2::EIP",
                "DependsOn": format!("{id}VpcGatewayAttachment"),
                "Properties": { "Domain": "vpc" }
            }),
        });

        template.add_resource(CfnResource {
            name: format!("{id}NatGateway{n}"),
            resource: json!({
                "Type": "AWS::EC2::NatGateway",
                "Properties": {
                    "AllocationId": { "Fn::GetAtt": [format!("{id}NatEip{n}"), "AllocationId"] },
                    "SubnetId": { "Ref": format!("{id}PublicSubnet{n}") }
                }
            }),
        });
    }

    for az in 0..network.max_azs {
        let n = az + 1;

        // Fewer NAT gateways than zones: spread the zones over them
        let nat = az % network.nat_gateways + 1;

        template.add_resource(CfnResource {
            name: format!("{id}PrivateRouteTable{n}"),
            resource: json!({
                "Type": "AWS::EC2::RouteTable",
                "Properties": { "VpcId": { "Ref": format!("{id}Vpc") } }
            }),
        });

        template.add_resource(CfnResource {
            name: format!("{id}PrivateDefaultRoute{n}"),
            resource: json!({
                "Type": "AWS::EC2::Route",
                "Properties": {
                    "RouteTableId": { "Ref": format!("{id}PrivateRouteTable{n}") },
                    "DestinationCidrBlock": "0.0.0.0/0",
                    "NatGatewayId": { "Ref": format!("{id}NatGateway{nat}") }
                }
            }),
        });

        template.add_resource(CfnResource {
            name: format!("{id}PrivateSubnet{n}RouteTableAssociation"),
            resource: json!({
                "Type": "AWS::EC2::SubnetRouteTableAssociation",
                "Properties": {
                    "SubnetId": { "Ref": format!("{id}PrivateSubnet{n}") },
                    "RouteTableId": { "Ref": format!("{id}PrivateRouteTable{n}") }
                }
            }),
        });
    }

    template.add_outputs(outputs);
    Ok(template)
}

/// Nth /24 inside the VPC range
fn subnet_cidr(vpc_cidr: &str, index: usize) -> eyre::Result<String> {
    let base = vpc_cidr
        .split('/')
        .next()
        .and_then(|address| {
            let octets: Vec<&str> = address.splitn(4, '.').collect();
            (octets.len() == 4).then(|| format!("{}.{}", octets[0], octets[1]))
        })
        .wrap_err_with(|| format!("Invalid VPC CIDR {vpc_cidr:?}"))?;

    Ok(format!("{base}.{index}.0/24"))
}
