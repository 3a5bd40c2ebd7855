//! Inventory wire model
//!
//! These are the slices of the ECS JSON API responses hoplink actually
//! reads. Unknown fields are ignored on deserialization; everything here is
//! immutable once fetched and discarded after the catalog is built.

use serde::Deserialize;

/// One running instance of a service's workload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identity (ARN)
    pub task_arn: String,
    /// Reference to the container instance hosting this task
    #[serde(default)]
    pub container_instance_arn: Option<String>,
    /// Containers in task-definition order
    #[serde(default)]
    pub containers: Vec<Container>,
}

/// A named process group within a Task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    /// Port bindings in definition order
    #[serde(default)]
    pub network_bindings: Vec<NetworkBinding>,
}

/// A (host port, container port) pair exposed by a Container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkBinding {
    pub host_port: u16,
    pub container_port: u16,
}

/// The host record a task's container-instance reference resolves to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInstance {
    pub container_instance_arn: String,
    /// Absent on records that have not yet registered an EC2 instance
    #[serde(default)]
    pub ec2_instance_id: Option<String>,
}
