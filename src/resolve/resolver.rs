use std::fmt;

use super::endpoint::{Endpoint, Materializer};
use crate::swarm::{Filter, Inventory, Node, Service, Task, TaskState};
use crate::{DsexecError, Result};

/// One way of interpreting a target string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NodeName,
    ServiceName,
    ContainerId,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::NodeName => write!(f, "node name"),
            Strategy::ServiceName => write!(f, "service name"),
            Strategy::ContainerId => write!(f, "container id"),
        }
    }
}

/// Node first: node and service names rarely collide and a node hit
/// skips the service scan entirely.
pub const ANY_TARGET: &[Strategy] = &[
    Strategy::NodeName,
    Strategy::ServiceName,
    Strategy::ContainerId,
];

/// Chain for operations that need a container
pub const CONTAINER_TARGET: &[Strategy] = &[Strategy::ServiceName, Strategy::ContainerId];

/// Outcome of a single strategy. I/O failures travel separately as `Err`.
#[derive(Debug)]
enum Attempt {
    Found(Endpoint),
    Missed(DsexecError),
}

impl Attempt {
    fn map(self, f: impl FnOnce(Endpoint) -> Endpoint) -> Self {
        match self {
            Attempt::Found(endpoint) => Attempt::Found(f(endpoint)),
            missed => missed,
        }
    }
}

/// Resolves operator-supplied identifiers against a fresh inventory on every call
pub struct Resolver<I> {
    inventory: I,
    materializer: Materializer,
    stack: Option<String>,
}

impl<I: Inventory> Resolver<I> {
    pub fn new(inventory: I, materializer: Materializer) -> Self {
        Self {
            inventory,
            materializer,
            stack: None,
        }
    }

    /// Scope service lookups to a stack namespace
    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack;
        self
    }

    #[cfg(test)]
    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Resolve a node, service or container id, in that order
    pub async fn resolve(&self, target: &str, container: Option<&str>) -> Result<Endpoint> {
        self.resolve_with(ANY_TARGET, target, container).await
    }

    /// Resolve to a container, by service name then by container id
    pub async fn resolve_container(&self, target: &str, container: Option<&str>) -> Result<Endpoint> {
        self.resolve_with(CONTAINER_TARGET, target, container).await
    }

    /// Resolve a node by name only; no match is an error
    pub async fn resolve_node(&self, target: &str) -> Result<Endpoint> {
        let target = validate_target(target)?;
        match self.by_node_name(target).await? {
            Attempt::Found(endpoint) => Ok(endpoint),
            Attempt::Missed(reason) => Err(reason),
        }
    }

    /// Find the service a name pattern designates, first match wins
    pub async fn find_service(&self, target: &str) -> Result<Service> {
        let target = validate_target(target)?;
        let services = self.matching_services(target).await?;
        services
            .into_iter()
            .next()
            .ok_or_else(|| DsexecError::ServiceNotFound(target.to_string()))
    }

    /// Run `chain` in order, stopping at the first strategy that finds something.
    ///
    /// Misses are kept; when all strategies miss the most specific one is
    /// returned instead of a bare `TargetNotFound`.
    pub async fn resolve_with(
        &self,
        chain: &[Strategy],
        target: &str,
        container: Option<&str>,
    ) -> Result<Endpoint> {
        let target = validate_target(target)?;
        let container = validate_container_filter(container)?;

        let mut misses = Vec::new();
        for &strategy in chain {
            match self.attempt(strategy, target, container).await? {
                Attempt::Found(endpoint) => {
                    tracing::debug!(%strategy, input = %target, "resolved");
                    return Ok(endpoint);
                }
                Attempt::Missed(reason) => {
                    tracing::debug!(%strategy, input = %target, %reason, "strategy missed");
                    misses.push(reason);
                }
            }
        }

        Err(misses
            .into_iter()
            .find(DsexecError::is_specific_miss)
            .unwrap_or_else(|| DsexecError::TargetNotFound(target.to_string())))
    }

    async fn attempt(
        &self,
        strategy: Strategy,
        target: &str,
        container: Option<&str>,
    ) -> Result<Attempt> {
        match strategy {
            Strategy::NodeName => self.by_node_name(target).await,
            Strategy::ServiceName => self.by_service_name(target, container).await,
            Strategy::ContainerId => self.by_container_id(target, container).await,
        }
    }

    async fn by_node_name(&self, target: &str) -> Result<Attempt> {
        let nodes = self.inventory.list_nodes(&Filter::by_name(target)).await?;
        let Some(node) = nodes.first() else {
            return Ok(Attempt::Missed(DsexecError::NodeNotFound(target.to_string())));
        };
        if nodes.len() > 1 {
            tracing::debug!(matches = nodes.len(), node = %node.hostname, "several nodes match, using first");
        }
        self.materialize(node, None).await
    }

    async fn by_service_name(&self, target: &str, container: Option<&str>) -> Result<Attempt> {
        let services = self.matching_services(target).await?;
        let Some(service) = services.first() else {
            return Ok(Attempt::Missed(DsexecError::ServiceNotFound(target.to_string())));
        };

        let tasks = self
            .inventory
            .list_tasks_for_service(&service.id, TaskState::Running)
            .await?;
        let candidates: Vec<&Task> = tasks
            .iter()
            .filter(|t| match container {
                Some(prefix) => t.container_id_starts_with(prefix),
                None => t.container_id.is_some(),
            })
            .collect();

        let Some(first) = candidates.first() else {
            let what = match container {
                Some(prefix) => format!("service {} with container {}", service.name, prefix),
                None => format!("service {}", service.name),
            };
            return Ok(Attempt::Missed(DsexecError::NoRunningTasks(what)));
        };

        let Some(task) = candidates.iter().find(|t| t.state == TaskState::Running) else {
            return Ok(Attempt::Missed(DsexecError::TaskNotRunning {
                task: first.id.clone(),
                state: first.state.to_string(),
            }));
        };

        let name = service.name.clone();
        Ok(self.task_endpoint(task).await?.map(|e| e.with_service(name)))
    }

    async fn by_container_id(&self, target: &str, container: Option<&str>) -> Result<Attempt> {
        let tasks = self.inventory.list_all_tasks(TaskState::Running).await?;
        let matching: Vec<&Task> = tasks
            .iter()
            .filter(|t| {
                t.container_id_starts_with(target)
                    && container.map_or(true, |prefix| t.container_id_starts_with(prefix))
            })
            .collect();

        let Some(first) = matching.first() else {
            return Ok(Attempt::Missed(DsexecError::TargetNotFound(target.to_string())));
        };
        let Some(task) = matching.iter().find(|t| t.state == TaskState::Running) else {
            return Ok(Attempt::Missed(DsexecError::TaskNotRunning {
                task: first.id.clone(),
                state: first.state.to_string(),
            }));
        };

        tracing::info!(task = %task.id, "Found container {} cluster-wide", target);
        self.task_endpoint(task).await
    }

    async fn matching_services(&self, target: &str) -> Result<Vec<Service>> {
        let filter = Filter::by_name(self.service_name(target)).in_namespace(self.stack.clone());
        let services = self.inventory.list_services(&filter).await?;

        match services.as_slice() {
            [] => {}
            [only] => tracing::info!("Looking up for '{}' service tasks", only.name),
            [first, ..] => tracing::warn!(
                matches = services.len(),
                "'{}' matches several services, using '{}'",
                target,
                first.name
            ),
        }
        Ok(services)
    }

    /// Stack services are named `<stack>_<name>` and the inventory matches
    /// name prefixes, so a short name gets the stack prepended.
    fn service_name(&self, target: &str) -> String {
        match &self.stack {
            Some(stack) if !target.starts_with(&format!("{}_", stack)) => {
                format!("{}_{}", stack, target)
            }
            _ => target.to_string(),
        }
    }

    async fn task_endpoint(&self, task: &Task) -> Result<Attempt> {
        let nodes = self.inventory.list_nodes(&Filter::by_id(&task.node_id)).await?;
        let Some(node) = nodes.first() else {
            return Ok(Attempt::Missed(DsexecError::NodeUnreachable(task.node_id.clone())));
        };
        self.materialize(node, task.container_id.as_deref()).await
    }

    async fn materialize(&self, node: &Node, container: Option<&str>) -> Result<Attempt> {
        match self.materializer.materialize(node, container).await {
            Ok(endpoint) => Ok(Attempt::Found(endpoint)),
            Err(e) if e.is_specific_miss() => Ok(Attempt::Missed(e)),
            Err(e) => Err(e),
        }
    }
}

fn validate_target(target: &str) -> Result<&str> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(DsexecError::InvalidTarget("target cannot be empty".to_string()));
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(DsexecError::InvalidTarget(format!(
            "'{}' cannot contain whitespace",
            target
        )));
    }
    Ok(trimmed)
}

fn validate_container_filter(container: Option<&str>) -> Result<Option<&str>> {
    match container.map(str::trim) {
        Some("") => Err(DsexecError::InvalidTarget(
            "container filter cannot be empty".to_string(),
        )),
        other => Ok(other),
    }
}
