use async_trait::async_trait;

use super::model::{Node, Service, Task, TaskState};
use crate::Result;

/// Selection applied to inventory listings.
///
/// `id` is an exact match; `name` matches names starting with it, the
/// way the orchestrator's `name` filter does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub id: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
}

impl Filter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn in_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }
}

/// Read-only view of the swarm.
///
/// Every call hits the orchestrator again; results keep its listing order.
#[async_trait]
pub trait Inventory: Send + Sync {
    async fn list_nodes(&self, filter: &Filter) -> Result<Vec<Node>>;

    async fn list_services(&self, filter: &Filter) -> Result<Vec<Service>>;

    async fn list_tasks_for_service(&self, service_id: &str, state: TaskState)
        -> Result<Vec<Task>>;

    async fn list_all_tasks(&self, state: TaskState) -> Result<Vec<Task>>;
}
