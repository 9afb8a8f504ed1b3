use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::process::Command;

use super::inventory::{Filter, Inventory};
use super::model::{
    Node, RawNode, RawService, RawTask, Service, Task, TaskState, STACK_NAMESPACE_LABEL,
};
use crate::{DsexecError, Result};

/// Swarm inventory backed by the `docker` CLI of a manager node.
///
/// Listings are done with `-q` and then inspected in one batch, so the
/// JSON we parse is the engine's stable inspect format rather than the
/// table output.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run a docker command, returning stdout only if it exited 0
    async fn run(&self, args: &[&str]) -> Result<String> {
        let cmd_str = format!("{} {}", self.binary, args.join(" "));
        tracing::debug!(command = %cmd_str, "running");

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| DsexecError::docker(format!("{}: {}", cmd_str, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DsexecError::Docker(format!(
                "{} exited with {:?}: {}",
                cmd_str,
                output.status.code(),
                stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a `-q` listing and collect the ids it prints
    async fn ids(&self, args: &[&str]) -> Result<Vec<String>> {
        let stdout = self.run(args).await?;
        Ok(parse_ids(&stdout))
    }

    /// Inspect a batch of objects, preserving the order of `ids`
    async fn inspect<T: DeserializeOwned>(&self, prefix: &[&str], ids: &[String]) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut args: Vec<&str> = prefix.to_vec();
        args.extend(ids.iter().map(String::as_str));
        let stdout = self.run(&args).await?;
        serde_json::from_str(&stdout).map_err(|e| {
            DsexecError::DockerOutput(format!("{}: {}", prefix.join(" "), e))
        })
    }
}

/// Build the `--filter` arguments docker understands for a listing
fn filter_args(filter: &Filter) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(id) = &filter.id {
        args.push("--filter".to_string());
        args.push(format!("id={}", id));
    }
    if let Some(name) = &filter.name {
        args.push("--filter".to_string());
        args.push(format!("name={}", name));
    }
    if let Some(namespace) = &filter.namespace {
        args.push("--filter".to_string());
        args.push(format!("label={}={}", STACK_NAMESPACE_LABEL, namespace));
    }
    args
}

fn desired_state_arg(state: TaskState) -> String {
    format!("desired-state={}", state)
}

fn parse_ids(stdout: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !ids.iter().any(|id| id == line) {
            ids.push(line.to_string());
        }
    }
    ids
}

#[async_trait]
impl Inventory for DockerCli {
    async fn list_nodes(&self, filter: &Filter) -> Result<Vec<Node>> {
        let filters = filter_args(filter);
        let mut args = vec!["node", "ls", "-q"];
        args.extend(filters.iter().map(String::as_str));

        let ids = self.ids(&args).await?;
        let raw: Vec<RawNode> = self.inspect(&["node", "inspect"], &ids).await?;
        Ok(raw.into_iter().map(Node::from).collect())
    }

    async fn list_services(&self, filter: &Filter) -> Result<Vec<Service>> {
        let filters = filter_args(filter);
        let mut args = vec!["service", "ls", "-q"];
        args.extend(filters.iter().map(String::as_str));

        let ids = self.ids(&args).await?;
        let raw: Vec<RawService> = self.inspect(&["service", "inspect"], &ids).await?;
        Ok(raw.into_iter().map(Service::from).collect())
    }

    async fn list_tasks_for_service(
        &self,
        service_id: &str,
        state: TaskState,
    ) -> Result<Vec<Task>> {
        let desired = desired_state_arg(state);
        let ids = self
            .ids(&[
                "service",
                "ps",
                "-q",
                "--no-trunc",
                "--filter",
                desired.as_str(),
                service_id,
            ])
            .await?;
        let raw: Vec<RawTask> = self.inspect(&["inspect", "--type", "task"], &ids).await?;
        Ok(raw.into_iter().map(Task::from).collect())
    }

    async fn list_all_tasks(&self, state: TaskState) -> Result<Vec<Task>> {
        let nodes = self.ids(&["node", "ls", "-q"]).await?;
        if nodes.is_empty() {
            return Ok(Vec::new());
        }

        let desired = desired_state_arg(state);
        let mut args = vec!["node", "ps", "-q", "--no-trunc", "--filter", desired.as_str()];
        args.extend(nodes.iter().map(String::as_str));

        let ids = self.ids(&args).await?;
        let raw: Vec<RawTask> = self.inspect(&["inspect", "--type", "task"], &ids).await?;
        Ok(raw.into_iter().map(Task::from).collect())
    }
}
