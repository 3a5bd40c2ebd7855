//! Endpoint catalog builder
//!
//! Turns a (cluster, app, service) triple into the flat, ordered list of
//! connectable endpoints behind it: every running task is joined with the
//! EC2 instance hosting it and flattened across its containers' port
//! bindings. The whole build is fail-fast - any lookup anomaly abandons the
//! catalog rather than returning a partial one.

use std::fmt;

use tracing::debug;

use crate::errors::{HoplinkError, Result};
use crate::inventory::{Inventory, Task};

/// Flattened, connectable join of one task, its host and one port binding.
///
/// Value object: safe to clone, enumerate and display. A task exposing
/// several ports yields several endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Identity of the task behind this endpoint
    pub task_arn: String,
    /// EC2 instance the task runs on - the tunnel target
    pub instance_id: String,
    /// Port on the instance
    pub host_port: u16,
    /// Port inside the container
    pub container_port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ Task: {}, EC2 Instance: {}, Host Port: {}, Container Port: {} }}",
            self.task_arn, self.instance_id, self.host_port, self.container_port
        )
    }
}

/// Build the endpoint catalog for `app`'s `service` in `cluster`.
///
/// The service identifier is `{app}-{service}`, the naming convention the
/// deploy pipeline uses for ECS services. Returns the endpoints in
/// deterministic insertion order: task iteration order x container order x
/// binding order. An empty catalog is a valid result when the service's
/// tasks expose no port bindings; zero *tasks* is `NotFound`.
pub async fn build_catalog<I: Inventory>(
    inventory: &I,
    cluster: &str,
    app: &str,
    service: &str,
) -> Result<Vec<Endpoint>> {
    let service_name = format!("{}-{}", app, service);

    let task_arns = inventory.list_running_tasks(cluster, &service_name).await?;
    if task_arns.is_empty() {
        return Err(HoplinkError::NotFound {
            cluster: cluster.to_string(),
            service: service_name,
        });
    }
    debug!(count = task_arns.len(), service = %service_name, "listed running tasks");

    // Per-task lookups stay sequential so the first anomaly is attributable
    // to a single task.
    let mut tasks = Vec::with_capacity(task_arns.len());
    for arn in &task_arns {
        let records = inventory.describe_task(cluster, arn).await?;
        tasks.push(exactly_one(records, "task", arn)?);
    }

    let mut endpoints = Vec::new();
    for task in &tasks {
        let instance_id = instance_id_for_task(inventory, cluster, task).await?;
        endpoints.extend(task.containers.iter().flat_map(|container| {
            container.network_bindings.iter().map(|binding| Endpoint {
                task_arn: task.task_arn.clone(),
                instance_id: instance_id.clone(),
                host_port: binding.host_port,
                container_port: binding.container_port,
            })
        }));
    }
    Ok(endpoints)
}

/// Resolve the EC2 instance id hosting `task`.
async fn instance_id_for_task<I: Inventory>(
    inventory: &I,
    cluster: &str,
    task: &Task,
) -> Result<String> {
    let instance_arn = task.container_instance_arn.as_deref().ok_or_else(|| {
        HoplinkError::IncompleteData {
            entity: "task",
            id: task.task_arn.clone(),
            field: "container instance reference",
        }
    })?;

    let records = inventory
        .describe_container_instance(cluster, instance_arn)
        .await?;
    let instance = exactly_one(records, "container instance", &task.task_arn)?;

    instance
        .ec2_instance_id
        .ok_or_else(|| HoplinkError::IncompleteData {
            entity: "container instance",
            id: instance.container_instance_arn,
            field: "EC2 instance ID",
        })
}

/// Single-entity lookups must return exactly one record; anything else is an
/// inventory race and fatal for the whole build.
fn exactly_one<T>(mut records: Vec<T>, entity: &'static str, id: &str) -> Result<T> {
    match records.len() {
        1 => Ok(records.remove(0)),
        count => Err(HoplinkError::Consistency {
            entity,
            id: id.to_string(),
            count,
        }),
    }
}
