use std::path::Path;

use crate::{DsexecError, Result};

/// Check whether the SSH client config routes `<prefix>*` aliases the way we need
pub fn check_ssh_config(path: &Path, prefix: &str) -> Result<SshConfigStatus> {
    if !path.exists() {
        return Ok(SshConfigStatus::Missing);
    }

    let content = std::fs::read_to_string(path)?;

    let host_line = format!("Host {}*", prefix);
    let has_alias_host = content.lines().any(|l| l.trim() == host_line);
    let has_no_prompt = content.contains("StrictHostKeyChecking no");

    if has_alias_host && has_no_prompt {
        Ok(SshConfigStatus::Configured)
    } else {
        Ok(SshConfigStatus::NeedsConfiguration)
    }
}

/// Generate the SSH config block for node aliases
pub fn generate_ssh_config_block(prefix: &str) -> String {
    format!(
        r#"# Docker swarm nodes reached through dsexec
Host {}*
    StrictHostKeyChecking no
    CheckHostIP no
    UserKnownHostsFile /dev/null
    LogLevel ERROR
"#,
        prefix
    )
}

/// Write the config block if the file does not exist yet.
///
/// Returns `true` if the file was written. An existing file is left
/// alone even when it lacks the block, it belongs to the operator.
pub fn install_ssh_config(path: &Path, prefix: &str) -> Result<bool> {
    match check_ssh_config(path, prefix)? {
        SshConfigStatus::Configured => Ok(false),
        SshConfigStatus::NeedsConfiguration => {
            tracing::warn!(
                path = %path.display(),
                "SSH config exists but has no 'Host {}*' entry, leaving it untouched",
                prefix
            );
            Ok(false)
        }
        SshConfigStatus::Missing => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DsexecError::SshConfig(format!("{}: {}", parent.display(), e))
                })?;
            }
            std::fs::write(path, generate_ssh_config_block(prefix))
                .map_err(|e| DsexecError::SshConfig(format!("{}: {}", path.display(), e)))?;
            tracing::info!(path = %path.display(), "Installed SSH config");
            Ok(true)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshConfigStatus {
    Configured,
    NeedsConfiguration,
    Missing,
}

impl std::fmt::Display for SshConfigStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SshConfigStatus::Configured => write!(f, "configured"),
            SshConfigStatus::NeedsConfiguration => write!(f, "needs configuration"),
            SshConfigStatus::Missing => write!(f, "missing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ssh_config() {
        let config = generate_ssh_config_block("ds-");
        assert!(config.contains("Host ds-*"));
        assert!(config.contains("StrictHostKeyChecking no"));
        assert!(config.contains("CheckHostIP no"));
    }

    #[test]
    fn test_install_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ssh_config.d").join("dsexec.conf");

        assert_eq!(check_ssh_config(&path, "ds-").unwrap(), SshConfigStatus::Missing);
        assert!(install_ssh_config(&path, "ds-").unwrap());
        assert_eq!(check_ssh_config(&path, "ds-").unwrap(), SshConfigStatus::Configured);
        assert!(!install_ssh_config(&path, "ds-").unwrap());
    }

    #[test]
    fn test_foreign_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dsexec.conf");
        std::fs::write(&path, "Host *\n    ForwardAgent no\n").unwrap();

        assert_eq!(
            check_ssh_config(&path, "ds-").unwrap(),
            SshConfigStatus::NeedsConfiguration
        );
        assert!(!install_ssh_config(&path, "ds-").unwrap());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Host *\n    ForwardAgent no\n"
        );
    }
}
