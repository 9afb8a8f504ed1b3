use serde::Serialize;
use std::path::PathBuf;

use crate::config::Settings;
use crate::ssh::{install_ssh_config, KnownHosts};
use crate::swarm::{GuestOs, Node};
use crate::{DsexecError, Result};

/// Length of the container id shown to users and passed to docker
pub const SHORT_ID_LEN: usize = 12;

pub fn short_container_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// Where and how to reach a resolved target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    docker_host: String,
    hostname: String,
    os: GuestOs,
    container_id: Option<String>,
    service: Option<String>,
}

impl Endpoint {
    /// Control socket for `docker -H`, always `ssh://...`
    pub fn docker_host(&self) -> &str {
        &self.docker_host
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn os(&self) -> GuestOs {
        self.os
    }

    /// Short (12 character) container id, `None` for node-scoped endpoints
    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    /// Service the container was picked from, when resolved by service name
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub(crate) fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

/// Knobs deciding how a node is addressed over SSH
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub alias_prefix: String,
    pub address_label: String,
    pub alternate_port: u16,
    pub check_known_hosts: bool,
    /// Install the alias config here on first alias use; `None` skips it
    pub ssh_config_path: Option<PathBuf>,
}

impl From<&Settings> for TransportOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            alias_prefix: settings.host_alias_prefix.clone(),
            address_label: settings.address_label.clone(),
            alternate_port: settings.alternate_port,
            check_known_hosts: settings.check_known_hosts,
            ssh_config_path: Some(settings.ssh_config_path.clone()),
        }
    }
}

/// Turns a node (and maybe a container on it) into an [`Endpoint`]
#[derive(Debug, Clone)]
pub struct Materializer {
    options: TransportOptions,
    trust: KnownHosts,
}

impl Materializer {
    pub fn new(options: TransportOptions, trust: KnownHosts) -> Self {
        Self { options, trust }
    }

    #[cfg(test)]
    pub fn trust(&self) -> &KnownHosts {
        &self.trust
    }

    /// SSH address for `node`: label override, raw address for Windows, alias otherwise
    pub fn connection_address(&self, node: &Node) -> Result<String> {
        if let Some(address) = node.address_override(&self.options.address_label) {
            return Ok(address.to_string());
        }

        match node.os {
            GuestOs::Windows => {
                if node.addr.is_empty() {
                    return Err(DsexecError::NodeUnreachable(node.hostname.clone()));
                }
                if node.addr.contains(':') {
                    Ok(format!("[{}]:{}", node.addr, self.options.alternate_port))
                } else {
                    Ok(format!("{}:{}", node.addr, self.options.alternate_port))
                }
            }
            GuestOs::Linux => {
                self.ensure_alias_config();
                Ok(format!("{}{}", self.options.alias_prefix, node.id))
            }
        }
    }

    // The alias only resolves with the config in place. Failing to write it
    // (usually no root) is not fatal, the operator may have it elsewhere.
    fn ensure_alias_config(&self) {
        if let Some(path) = &self.options.ssh_config_path {
            if let Err(e) = install_ssh_config(path, &self.options.alias_prefix) {
                tracing::warn!("Could not install SSH config: {}", e);
            }
        }
    }

    pub async fn materialize(&self, node: &Node, container_id: Option<&str>) -> Result<Endpoint> {
        let address = self.connection_address(node)?;

        if self.options.check_known_hosts || node.os.requires_explicit_trust() {
            self.trust.ensure_trusted(trust_address(&address)).await?;
        }

        Ok(Endpoint {
            docker_host: format!("ssh://{}", address),
            hostname: node.hostname.clone(),
            os: node.os,
            container_id: container_id.map(short_container_id),
            service: None,
        })
    }
}

/// Drop a `user@` part, known_hosts is keyed by host only
fn trust_address(address: &str) -> &str {
    address.rsplit_once('@').map_or(address, |(_, host)| host)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ssh::known_hosts::tests::CountingFetcher;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    pub(crate) fn options(dir: &tempfile::TempDir) -> TransportOptions {
        TransportOptions {
            alias_prefix: "ds-".to_string(),
            address_label: "dsexec.ssh.address".to_string(),
            alternate_port: 8022,
            check_known_hosts: false,
            ssh_config_path: Some(dir.path().join("ssh_config.d").join("dsexec.conf")),
        }
    }

    pub(crate) fn materializer(
        dir: &tempfile::TempDir,
        options: TransportOptions,
    ) -> (Materializer, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher::default());
        let trust = KnownHosts::new(dir.path().join("known_hosts"), fetcher.clone());
        (Materializer::new(options, trust), fetcher)
    }

    /// Endpoint as the materializer would build it, for dispatcher tests
    pub(crate) fn endpoint(docker_host: &str, os: GuestOs, container_id: Option<&str>) -> Endpoint {
        Endpoint {
            docker_host: docker_host.to_string(),
            hostname: "web-01".to_string(),
            os,
            container_id: container_id.map(short_container_id),
            service: None,
        }
    }

    fn node(id: &str, hostname: &str, os: GuestOs, addr: &str) -> Node {
        Node {
            id: id.to_string(),
            hostname: hostname.to_string(),
            os,
            addr: addr.to_string(),
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn test_short_container_id() {
        assert_eq!(short_container_id("abcdef123456789"), "abcdef123456");
        assert_eq!(short_container_id("abc"), "abc");
    }

    #[test]
    fn test_trust_address_strips_user() {
        assert_eq!(trust_address("root@10.0.0.5:8022"), "10.0.0.5:8022");
        assert_eq!(trust_address("ds-n1"), "ds-n1");
    }

    #[tokio::test]
    async fn test_linux_node_uses_alias_without_trust() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(&dir);
        let config_path = opts.ssh_config_path.clone().unwrap();
        let (materializer, fetcher) = materializer(&dir, opts);

        let n = node("n1abc", "web-01", GuestOs::Linux, "10.0.0.5");
        let endpoint = materializer.materialize(&n, None).await.unwrap();

        assert_eq!(endpoint.docker_host(), "ssh://ds-n1abc");
        assert_eq!(endpoint.hostname(), "web-01");
        assert_eq!(endpoint.os(), GuestOs::Linux);
        assert_eq!(endpoint.container_id(), None);
        assert_eq!(fetcher.calls(), 0);
        assert!(config_path.exists());
    }

    #[tokio::test]
    async fn test_windows_node_is_trusted_on_alternate_port() {
        let dir = tempfile::tempdir().unwrap();
        let (materializer, fetcher) = materializer(&dir, options(&dir));

        let n = node("w1", "win-01", GuestOs::Windows, "10.0.0.9");
        let endpoint = materializer
            .materialize(&n, Some("0123456789abcdef0123"))
            .await
            .unwrap();

        assert_eq!(endpoint.docker_host(), "ssh://10.0.0.9:8022");
        assert_eq!(endpoint.container_id(), Some("0123456789ab"));
        assert_eq!(fetcher.calls(), 1);

        materializer.materialize(&n, None).await.unwrap();
        assert_eq!(fetcher.calls(), 1);

        let body = std::fs::read_to_string(materializer.trust().path()).unwrap();
        assert!(body.starts_with("[10.0.0.9]:8022 "));
    }

    #[tokio::test]
    async fn test_windows_ipv6_address_is_bracketed() {
        let dir = tempfile::tempdir().unwrap();
        let (materializer, _) = materializer(&dir, options(&dir));

        let n = node("w2", "win-02", GuestOs::Windows, "fd00::9");
        let endpoint = materializer.materialize(&n, None).await.unwrap();
        assert_eq!(endpoint.docker_host(), "ssh://[fd00::9]:8022");
    }

    #[tokio::test]
    async fn test_label_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let (materializer, fetcher) = materializer(&dir, options(&dir));

        let mut n = node("n2", "db-01", GuestOs::Linux, "10.0.0.6");
        n.labels
            .insert("dsexec.ssh.address".to_string(), "bastion.example:2200".to_string());

        let endpoint = materializer.materialize(&n, None).await.unwrap();
        assert_eq!(endpoint.docker_host(), "ssh://bastion.example:2200");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_check_known_hosts_trusts_alias() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(&dir);
        opts.check_known_hosts = true;
        let (materializer, fetcher) = materializer(&dir, opts);

        let n = node("n1abc", "web-01", GuestOs::Linux, "10.0.0.5");
        materializer.materialize(&n, None).await.unwrap();
        assert_eq!(fetcher.calls(), 1);

        let body = std::fs::read_to_string(materializer.trust().path()).unwrap();
        assert!(body.starts_with("ds-n1abc "));
    }

    #[tokio::test]
    async fn test_windows_node_without_address_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let (materializer, _) = materializer(&dir, options(&dir));

        let n = node("w3", "win-03", GuestOs::Windows, "");
        let err = materializer.materialize(&n, None).await.unwrap_err();
        assert!(matches!(err, DsexecError::NodeUnreachable(_)));
    }
}
