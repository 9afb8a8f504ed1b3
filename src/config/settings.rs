use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use crate::{DsexecError, Result};

/// Environment variable naming the stack services are scoped to
pub const STACK_ENV: &str = "STACK_NAME";

/// Environment variable forcing known_hosts verification on every node
pub const CHECK_KNOWN_HOSTS_ENV: &str = "DSEXEC_CHECK_KNOWN_HOSTS";

/// Global settings for dsexec
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Stack namespace service lookups are scoped to
    pub stack: Option<String>,

    /// Verify and record host keys for every node, not only Windows ones
    pub check_known_hosts: bool,

    /// Override for ~/.ssh/known_hosts
    pub known_hosts_path: Option<PathBuf>,

    /// Where the `Host <prefix>*` snippet gets installed
    pub ssh_config_path: PathBuf,

    /// Prefix of the per-node SSH alias (`ds-<node id>`)
    pub host_alias_prefix: String,

    /// Node label holding an operator-assigned SSH address
    pub address_label: String,

    /// SSH port used to reach Windows nodes on their raw address
    pub alternate_port: u16,

    pub docker_binary: String,

    pub keyscan_binary: String,

    /// Image used by `dsexec run` when none is given
    pub default_tool_image: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stack: None,
            check_known_hosts: false,
            known_hosts_path: None,
            ssh_config_path: PathBuf::from("/etc/ssh/ssh_config.d/dsexec.conf"),
            host_alias_prefix: "ds-".to_string(),
            address_label: "dsexec.ssh.address".to_string(),
            alternate_port: 8022,
            docker_binary: "docker".to_string(),
            keyscan_binary: "ssh-keyscan".to_string(),
            default_tool_image: "nicolaka/netshoot".to_string(),
        }
    }
}

impl Settings {
    /// Get the path to the config file
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dsexec").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load settings from the config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()
            .ok_or_else(|| DsexecError::Config("Cannot determine config directory".to_string()))?;

        let mut settings = Self::load_from(&path)?;
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a specific file, defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content).map_err(|e| {
            DsexecError::Config(format!("Failed to parse config file: {}", e))
        })?;

        Ok(settings)
    }

    /// Save settings with restricted permissions (0600)
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;

        #[cfg(unix)]
        {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)?;
            file.write_all(content.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            std::fs::write(path, content)?;
        }

        Ok(())
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(stack) = lookup(STACK_ENV).filter(|s| !s.trim().is_empty()) {
            self.stack = Some(stack.trim().to_string());
        }
        if let Some(flag) = lookup(CHECK_KNOWN_HOSTS_ENV) {
            self.check_known_hosts = matches!(flag.trim(), "1" | "true" | "yes");
        }
    }

    pub fn validate(&self) -> Result<()> {
        let prefix = &self.host_alias_prefix;
        if prefix.is_empty() {
            return Err(DsexecError::Config(
                "host_alias_prefix cannot be empty".to_string(),
            ));
        }
        if prefix.chars().any(|c| c.is_whitespace() || c == '*' || c == '?') {
            return Err(DsexecError::Config(format!(
                "host_alias_prefix '{}' cannot contain whitespace or wildcards",
                prefix
            )));
        }
        if self.alternate_port == 0 {
            return Err(DsexecError::Config(
                "alternate_port must be non-zero".to_string(),
            ));
        }
        if self.address_label.trim().is_empty() {
            return Err(DsexecError::Config(
                "address_label cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Trust file in effect, ~/.ssh/known_hosts unless overridden
    pub fn known_hosts_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.known_hosts_path {
            return Ok(path.clone());
        }
        BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
            .ok_or_else(|| DsexecError::Config("Cannot determine home directory".to_string()))
    }
}
