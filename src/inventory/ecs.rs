//! ECS-backed inventory client
//!
//! Speaks the ECS JSON API (`x-amz-json-1.1`) directly over reqwest with
//! SigV4-signed requests. Only the three operations the catalog builder
//! needs are implemented.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::types::{ContainerInstance, Task};
use super::Inventory;
use crate::aws::{self, AwsCredentials};
use crate::errors::{HoplinkError, Result};

/// API version prefix for the X-Amz-Target header.
const TARGET_PREFIX: &str = "AmazonEC2ContainerServiceV20141113";

const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Inventory implementation backed by the ECS HTTP API.
pub struct EcsInventory {
    http: reqwest::Client,
    endpoint: String,
    credentials: AwsCredentials,
    region: String,
}

impl EcsInventory {
    /// Create a client for the region's public ECS endpoint.
    pub fn new(credentials: AwsCredentials, region: impl Into<String>) -> Self {
        let region = region.into();
        let endpoint = format!("https://ecs.{}.amazonaws.com/", region);
        Self::with_endpoint(credentials, region, endpoint)
    }

    /// Create a client against an explicit endpoint URL. Used by tests to
    /// point at a local mock server.
    pub fn with_endpoint(
        credentials: AwsCredentials,
        region: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            credentials,
            region: region.into(),
        }
    }

    /// POST one signed API action and decode the response body.
    async fn call<Req, Resp>(&self, action: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request)?;
        let headers = vec![
            ("content-type".to_string(), AMZ_JSON.to_string()),
            (
                "x-amz-target".to_string(),
                format!("{}.{}", TARGET_PREFIX, action),
            ),
        ];

        let signed = aws::sign_request(
            &self.credentials,
            &self.region,
            aws::ECS_SERVICE,
            "POST",
            &self.endpoint,
            &headers,
            &body,
        )?;

        let mut req = self.http.post(&self.endpoint).body(body);
        for (name, value) in headers.iter().chain(signed.iter()) {
            req = req.header(name.as_str(), value.as_str());
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(HoplinkError::Transport(format!(
                "{} returned {}: {}",
                action,
                status,
                text.trim()
            )));
        }

        Ok(response.json::<Resp>().await?)
    }
}

impl Inventory for EcsInventory {
    async fn list_running_tasks(&self, cluster: &str, service_name: &str) -> Result<Vec<String>> {
        let response: ListTasksResponse = self
            .call(
                "ListTasks",
                &ListTasksRequest {
                    cluster,
                    desired_status: "RUNNING",
                    service_name,
                },
            )
            .await?;
        Ok(response.task_arns)
    }

    async fn describe_task(&self, cluster: &str, task_arn: &str) -> Result<Vec<Task>> {
        let response: DescribeTasksResponse = self
            .call(
                "DescribeTasks",
                &DescribeTasksRequest {
                    cluster,
                    tasks: vec![task_arn],
                },
            )
            .await?;
        Ok(response.tasks)
    }

    async fn describe_container_instance(
        &self,
        cluster: &str,
        instance_arn: &str,
    ) -> Result<Vec<ContainerInstance>> {
        let response: DescribeContainerInstancesResponse = self
            .call(
                "DescribeContainerInstances",
                &DescribeContainerInstancesRequest {
                    cluster,
                    container_instances: vec![instance_arn],
                },
            )
            .await?;
        Ok(response.container_instances)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListTasksRequest<'a> {
    cluster: &'a str,
    desired_status: &'a str,
    service_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTasksResponse {
    #[serde(default)]
    task_arns: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeTasksRequest<'a> {
    cluster: &'a str,
    tasks: Vec<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeTasksResponse {
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeContainerInstancesRequest<'a> {
    cluster: &'a str,
    container_instances: Vec<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeContainerInstancesResponse {
    #[serde(default)]
    container_instances: Vec<ContainerInstance>,
}
