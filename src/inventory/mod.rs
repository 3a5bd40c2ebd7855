//! Cluster inventory capability
//!
//! The catalog builder consumes this seam; the real implementation is the
//! ECS-backed [`EcsInventory`]. Lookups return the raw record cardinality so
//! the caller can tell "not found" from "multiple found" from a transport
//! failure - the 0/1/many policy lives with the catalog builder, not here.

pub mod ecs;
pub mod types;

pub use ecs::EcsInventory;
pub use types::{Container, ContainerInstance, NetworkBinding, Task};

use crate::errors::Result;

/// Query capability over the cluster's task inventory.
#[allow(async_fn_in_trait)]
pub trait Inventory {
    /// List the identities of all tasks in `cluster` whose desired status is
    /// running and which belong to `service_name`.
    async fn list_running_tasks(&self, cluster: &str, service_name: &str) -> Result<Vec<String>>;

    /// Fetch the full detail records for one task identity. The ECS API is
    /// batched; callers pass one ARN at a time and own the cardinality check.
    async fn describe_task(&self, cluster: &str, task_arn: &str) -> Result<Vec<Task>>;

    /// Resolve a container-instance reference to its host records.
    async fn describe_container_instance(
        &self,
        cluster: &str,
        instance_arn: &str,
    ) -> Result<Vec<ContainerInstance>>;
}
