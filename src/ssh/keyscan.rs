use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use super::known_hosts::DEFAULT_SSH_PORT;
use crate::{DsexecError, Result};

/// Source of a remote host's public key material
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// Returns the known_hosts lines for `host:port`
    async fn fetch_key(&self, host: &str, port: u16) -> Result<String>;
}

/// Fetches host keys with `ssh-keyscan`
#[derive(Debug, Clone)]
pub struct SshKeyscan {
    binary: String,
}

impl SshKeyscan {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

fn keyscan_args(host: &str, port: u16) -> Vec<String> {
    let mut args = Vec::new();
    if port != DEFAULT_SSH_PORT {
        args.push("-p".to_string());
        args.push(port.to_string());
    }
    args.push(host.to_string());
    args
}

#[async_trait]
impl KeyFetcher for SshKeyscan {
    async fn fetch_key(&self, host: &str, port: u16) -> Result<String> {
        let address = format!("{}:{}", host, port);
        tracing::debug!(%address, binary = %self.binary, "scanning host key");

        let mut child = Command::new(&self.binary)
            .args(keyscan_args(host, port))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DsexecError::trust_fetch(&address, e))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| DsexecError::trust_fetch(&address, "stdout not captured"))?;

        // Drain stdout while waiting, the scan output can outgrow the pipe
        let mut body = String::new();
        let (status, _) = tokio::try_join!(child.wait(), stdout.read_to_string(&mut body))
            .map_err(|e| DsexecError::trust_fetch(&address, e))?;

        if !status.success() {
            return Err(DsexecError::trust_fetch(
                &address,
                format!("{} exited with {:?}", self.binary, status.code()),
            ));
        }
        if body.trim().is_empty() {
            return Err(DsexecError::trust_fetch(&address, "no host key returned"));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_implicit() {
        assert_eq!(keyscan_args("10.0.0.5", 22), vec!["10.0.0.5"]);
        assert_eq!(keyscan_args("10.0.0.5", 8022), vec!["-p", "8022", "10.0.0.5"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collects_stdout() {
        let fetcher = SshKeyscan::new("echo");
        let body = fetcher.fetch_key("10.0.0.5", 8022).await.unwrap();
        assert_eq!(body.trim(), "-p 8022 10.0.0.5");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let fetcher = SshKeyscan::new("false");
        let err = fetcher.fetch_key("10.0.0.5", 22).await.unwrap_err();
        assert!(matches!(err, DsexecError::TrustFetchFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_output_fails() {
        let fetcher = SshKeyscan::new("true");
        let err = fetcher.fetch_key("10.0.0.5", 22).await.unwrap_err();
        assert!(matches!(err, DsexecError::TrustFetchFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_fails() {
        let fetcher = SshKeyscan::new("/nonexistent/ssh-keyscan");
        let err = fetcher.fetch_key("10.0.0.5", 22).await.unwrap_err();
        assert!(matches!(err, DsexecError::TrustFetchFailed { .. }));
    }
}
