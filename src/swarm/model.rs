use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label docker stack deploy puts on every service it creates
pub const STACK_NAMESPACE_LABEL: &str = "com.docker.stack.namespace";

/// Operating system a node's engine runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestOs {
    #[default]
    Linux,
    Windows,
}

impl GuestOs {
    pub fn from_platform(os: &str) -> Self {
        if os.eq_ignore_ascii_case("windows") {
            GuestOs::Windows
        } else {
            GuestOs::Linux
        }
    }

    /// Windows nodes sit outside the `Host ds-*` alias and need explicit trust
    pub fn requires_explicit_trust(self) -> bool {
        self == GuestOs::Windows
    }

    pub fn default_shell(self) -> &'static str {
        match self {
            GuestOs::Linux => "/bin/bash",
            GuestOs::Windows => "powershell",
        }
    }
}

impl fmt::Display for GuestOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestOs::Linux => write!(f, "linux"),
            GuestOs::Windows => write!(f, "windows"),
        }
    }
}

/// Swarm task lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    New,
    Pending,
    Assigned,
    Accepted,
    Preparing,
    Ready,
    Starting,
    Running,
    Complete,
    Shutdown,
    Failed,
    Rejected,
    Remove,
    Orphaned,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::New => "new",
            TaskState::Pending => "pending",
            TaskState::Assigned => "assigned",
            TaskState::Accepted => "accepted",
            TaskState::Preparing => "preparing",
            TaskState::Ready => "ready",
            TaskState::Starting => "starting",
            TaskState::Running => "running",
            TaskState::Complete => "complete",
            TaskState::Shutdown => "shutdown",
            TaskState::Failed => "failed",
            TaskState::Rejected => "rejected",
            TaskState::Remove => "remove",
            TaskState::Orphaned => "orphaned",
            TaskState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub hostname: String,
    pub os: GuestOs,
    /// Address the node advertises to the swarm
    pub addr: String,
    pub labels: BTreeMap<String, String>,
}

impl Node {
    /// Operator-assigned SSH address, if the node carries one
    pub fn address_override(&self, label: &str) -> Option<&str> {
        self.labels
            .get(label)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub service_id: String,
    pub node_id: String,
    /// Full container id, absent until the task has been scheduled
    pub container_id: Option<String>,
    pub state: TaskState,
}

impl Task {
    pub fn container_id_starts_with(&self, prefix: &str) -> bool {
        self.container_id
            .as_deref()
            .is_some_and(|id| id.starts_with(prefix))
    }
}

// Shapes of `docker <object> inspect` output. Only the fields we read.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawNode {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub spec: RawNodeSpec,
    #[serde(default)]
    pub description: RawNodeDescription,
    #[serde(default)]
    pub status: RawNodeStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawNodeSpec {
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawNodeDescription {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub platform: RawPlatform,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawPlatform {
    #[serde(rename = "OS", default)]
    pub os: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawNodeStatus {
    #[serde(default)]
    pub addr: String,
}

impl From<RawNode> for Node {
    fn from(raw: RawNode) -> Self {
        Node {
            id: raw.id,
            hostname: raw.description.hostname,
            os: GuestOs::from_platform(&raw.description.platform.os),
            addr: raw.status.addr,
            labels: raw.spec.labels.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawService {
    #[serde(rename = "ID")]
    pub id: String,
    pub spec: RawServiceSpec,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawServiceSpec {
    pub name: String,
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
}

impl From<RawService> for Service {
    fn from(raw: RawService) -> Self {
        let namespace = raw
            .spec
            .labels
            .as_ref()
            .and_then(|labels| labels.get(STACK_NAMESPACE_LABEL))
            .cloned();
        Service {
            id: raw.id,
            name: raw.spec.name,
            namespace,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawTask {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,
    #[serde(rename = "NodeID", default)]
    pub node_id: String,
    pub status: RawTaskStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawTaskStatus {
    pub state: TaskState,
    #[serde(default)]
    pub container_status: Option<RawContainerStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawContainerStatus {
    #[serde(rename = "ContainerID", default)]
    pub container_id: Option<String>,
}

impl From<RawTask> for Task {
    fn from(raw: RawTask) -> Self {
        let container_id = raw
            .status
            .container_status
            .and_then(|c| c.container_id)
            .filter(|id| !id.is_empty());
        Task {
            id: raw.id,
            service_id: raw.service_id,
            node_id: raw.node_id,
            container_id,
            state: raw.status.state,
        }
    }
}
