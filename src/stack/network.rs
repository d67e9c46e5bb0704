//! Network layout: one VPC, two public and two private subnets.
//!
//! Public subnets route to the internet gateway and host the load balancer
//! and the NAT gateway. Private subnets host the tasks and reach out through
//! the single NAT gateway in public subnet A.

use crate::config::StackConfig;
use crate::core::SynthResult;
use crate::graph::{Attributes, GraphBuilder, NodeHandle, ResourceKind};

use super::named;

const VPC_CIDR: &str = "10.0.0.0/16";
const ANYWHERE: &str = "0.0.0.0/0";

/// Handles of the network nodes the rest of the stack uses.
#[derive(Debug, Clone)]
pub struct Network {
    /// The VPC
    pub vpc: NodeHandle,
    /// Public subnets in az1 and az2
    pub public_subnets: [NodeHandle; 2],
    /// Private subnets in az1 and az2
    pub private_subnets: [NodeHandle; 2],
}

/// Declare the network.
pub fn declare_network(config: &StackConfig, builder: &mut GraphBuilder) -> SynthResult<Network> {
    let vpc = builder.add_node(
        ResourceKind::Vpc,
        "vpc",
        named(config, "vpc")
            .set("cidr_block", VPC_CIDR)
            .set("instance_tenancy", "default")
            .set("enable_dns_support", true)
            .set("enable_dns_hostnames", true),
    )?;

    let igw = builder.add_node(
        ResourceKind::InternetGateway,
        "igw",
        named(config, "igw").set("vpc_id", vpc.attr("id")),
    )?;

    let public_rt = builder.add_node(
        ResourceKind::RouteTable,
        "public-rt",
        named(config, "public-rt").set("vpc_id", vpc.attr("id")),
    )?;
    builder.add_node(
        ResourceKind::Route,
        "public-default-route",
        Attributes::new()
            .set("route_table_id", public_rt.attr("id"))
            .set("destination_cidr_block", ANYWHERE)
            .set("gateway_id", igw.attr("id")),
    )?;

    let public_a = subnet(builder, config, &vpc, "public-subnet-a", "10.0.1.0/24", &config.az1, "public-a", true)?;
    let public_b = subnet(builder, config, &vpc, "public-subnet-b", "10.0.2.0/24", &config.az2, "public-b", true)?;
    associate(builder, "public-rta-a", &public_a, &public_rt)?;
    associate(builder, "public-rta-b", &public_b, &public_rt)?;

    let nat_eip = builder.add_node(ResourceKind::Eip, "nat-eip", named(config, "nat-eip"))?;
    let nat_gw = builder.add_node(
        ResourceKind::NatGateway,
        "nat-gw",
        named(config, "nat-gw")
            .set("subnet_id", public_a.attr("id"))
            .set("allocation_id", nat_eip.attr("id"))
            .set("connectivity_type", "public"),
    )?;

    let private_rt = builder.add_node(
        ResourceKind::RouteTable,
        "private-rt",
        named(config, "private-rt").set("vpc_id", vpc.attr("id")),
    )?;
    builder.add_node(
        ResourceKind::Route,
        "private-default-route",
        Attributes::new()
            .set("route_table_id", private_rt.attr("id"))
            .set("destination_cidr_block", ANYWHERE)
            .set("nat_gateway_id", nat_gw.attr("id")),
    )?;

    let private_1 = subnet(
        builder,
        config,
        &vpc,
        "private-subnet-az1",
        "10.0.11.0/24",
        &config.az1,
        &format!("subnet-private-{}", config.az1),
        false,
    )?;
    let private_2 = subnet(
        builder,
        config,
        &vpc,
        "private-subnet-az2",
        "10.0.12.0/24",
        &config.az2,
        &format!("subnet-private-{}", config.az2),
        false,
    )?;
    associate(builder, "rta-private-az1", &private_1, &private_rt)?;
    associate(builder, "rta-private-az2", &private_2, &private_rt)?;

    Ok(Network {
        vpc,
        public_subnets: [public_a, public_b],
        private_subnets: [private_1, private_2],
    })
}

#[allow(clippy::too_many_arguments)]
fn subnet(
    builder: &mut GraphBuilder,
    config: &StackConfig,
    vpc: &NodeHandle,
    id: &str,
    cidr: &str,
    zone: &str,
    name: &str,
    public: bool,
) -> SynthResult<NodeHandle> {
    builder.add_node(
        ResourceKind::Subnet,
        id,
        named(config, name)
            .set("vpc_id", vpc.attr("id"))
            .set("cidr_block", cidr)
            .set("availability_zone", zone)
            .set("map_public_ip_on_launch", public),
    )
}

fn associate(
    builder: &mut GraphBuilder,
    id: &str,
    subnet: &NodeHandle,
    route_table: &NodeHandle,
) -> SynthResult<NodeHandle> {
    builder.add_node(
        ResourceKind::RouteTableAssociation,
        id,
        Attributes::new().set("subnet_id", subnet.attr("id")).set("route_table_id", route_table.attr("id")),
    )
}
