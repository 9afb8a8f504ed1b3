use thiserror::Error;

#[derive(Error, Debug)]
pub enum DsexecError {
    // Resolution Errors
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("No service matches '{0}'")]
    ServiceNotFound(String),

    #[error("No node matches '{0}'")]
    NodeNotFound(String),

    #[error("No running tasks available for {0}")]
    NoRunningTasks(String),

    #[error("Task {task} is {state}, cannot exec in a non running task")]
    TaskNotRunning { task: String, state: String },

    #[error("Node {0} hosting the task could not be found")]
    NodeUnreachable(String),

    #[error("Cannot lookup '{0}' as a node, service or container")]
    TargetNotFound(String),

    // Trust Errors
    #[error("Failed to fetch host key for {address}: {reason}")]
    TrustFetchFailed { address: String, reason: String },

    #[error("Invalid host address: {0}")]
    InvalidAddress(String),

    // Docker Errors
    #[error("Docker error: {0}")]
    Docker(String),

    #[error("Unexpected docker output: {0}")]
    DockerOutput(String),

    // SSH/Process Errors
    #[error("SSH config error: {0}")]
    SshConfig(String),

    #[error("Command failed: {0}")]
    Command(String),

    // Config Errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prerequisites not met: {0}")]
    Prerequisites(String),

    // File/IO Errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // User cancelled
    #[error("Operation cancelled by user")]
    Cancelled,
}

impl DsexecError {
    pub fn docker(err: impl std::fmt::Display) -> Self {
        DsexecError::Docker(err.to_string())
    }

    pub fn command(err: impl std::fmt::Display) -> Self {
        DsexecError::Command(err.to_string())
    }

    pub fn trust_fetch(address: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        DsexecError::TrustFetchFailed {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this is a strategy miss that says more than "nothing matched".
    ///
    /// The resolver prefers these over a generic `TargetNotFound` once every
    /// strategy is exhausted.
    pub fn is_specific_miss(&self) -> bool {
        matches!(
            self,
            DsexecError::NoRunningTasks(_)
                | DsexecError::TaskNotRunning { .. }
                | DsexecError::NodeUnreachable(_)
        )
    }

    /// Process exit code a CLI layer should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DsexecError::InvalidTarget(_) | DsexecError::InvalidAddress(_) => 64,
            DsexecError::ServiceNotFound(_)
            | DsexecError::NodeNotFound(_)
            | DsexecError::NoRunningTasks(_)
            | DsexecError::TaskNotRunning { .. }
            | DsexecError::NodeUnreachable(_)
            | DsexecError::TargetNotFound(_) => 2,
            DsexecError::TrustFetchFailed { .. } => 3,
            DsexecError::Cancelled => 130,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, DsexecError>;
