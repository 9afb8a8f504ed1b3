//! In-memory inventory for tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::inventory::{Filter, Inventory};
use super::model::{GuestOs, Node, Service, Task, TaskState};
use crate::Result;

/// A fixed swarm. Tasks handed out are the ones the orchestrator would
/// report with the requested desired state, so a task may still be in
/// a transitional actual state.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    pub nodes: Vec<Node>,
    pub services: Vec<Service>,
    pub tasks: Vec<Task>,
    calls: AtomicUsize,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, id: &str, hostname: &str, os: GuestOs, addr: &str) -> Self {
        self.nodes.push(Node {
            id: id.to_string(),
            hostname: hostname.to_string(),
            os,
            addr: addr.to_string(),
            labels: BTreeMap::new(),
        });
        self
    }

    pub fn with_label(mut self, node_id: &str, key: &str, value: &str) -> Self {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) {
            node.labels.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn with_service(mut self, id: &str, name: &str, namespace: Option<&str>) -> Self {
        self.services.push(Service {
            id: id.to_string(),
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
        });
        self
    }

    pub fn with_task(
        mut self,
        id: &str,
        service_id: &str,
        node_id: &str,
        container_id: &str,
        state: TaskState,
    ) -> Self {
        self.tasks.push(Task {
            id: id.to_string(),
            service_id: service_id.to_string(),
            node_id: node_id.to_string(),
            container_id: Some(container_id.to_string()).filter(|c| !c.is_empty()),
            state,
        });
        self
    }

    /// Number of inventory queries answered so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn matches_name(name: &str, pattern: &Option<String>) -> bool {
    pattern.as_deref().map_or(true, |p| name.starts_with(p))
}

fn matches_id(id: &str, wanted: &Option<String>) -> bool {
    wanted.as_deref().map_or(true, |w| id == w)
}

#[async_trait]
impl Inventory for MemoryInventory {
    async fn list_nodes(&self, filter: &Filter) -> Result<Vec<Node>> {
        self.record();
        Ok(self
            .nodes
            .iter()
            .filter(|n| matches_id(&n.id, &filter.id) && matches_name(&n.hostname, &filter.name))
            .cloned()
            .collect())
    }

    async fn list_services(&self, filter: &Filter) -> Result<Vec<Service>> {
        self.record();
        Ok(self
            .services
            .iter()
            .filter(|s| matches_id(&s.id, &filter.id) && matches_name(&s.name, &filter.name))
            .filter(|s| {
                filter
                    .namespace
                    .as_deref()
                    .map_or(true, |ns| s.namespace.as_deref() == Some(ns))
            })
            .cloned()
            .collect())
    }

    async fn list_tasks_for_service(
        &self,
        service_id: &str,
        _state: TaskState,
    ) -> Result<Vec<Task>> {
        self.record();
        Ok(self
            .tasks
            .iter()
            .filter(|t| t.service_id == service_id)
            .cloned()
            .collect())
    }

    async fn list_all_tasks(&self, _state: TaskState) -> Result<Vec<Task>> {
        self.record();
        Ok(self.tasks.clone())
    }
}
