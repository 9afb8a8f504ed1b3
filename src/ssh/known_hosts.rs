//! Trust-on-first-use store over an OpenSSH known_hosts file.
//!
//! The file is read whole, checked for a line starting with the host
//! specifier, and rewritten whole with the new key appended. Nothing is
//! ever removed. There is no locking: two first-time checks of the same
//! host racing each other both append, which leaves a duplicate line
//! that ssh ignores.

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::keyscan::KeyFetcher;
use crate::{DsexecError, Result};

pub const DEFAULT_SSH_PORT: u16 = 22;

/// An SSH address as written on a command line: `host`, `host:port` or `[host]:port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddr {
    literal: String,
    host: String,
    port: u16,
}

impl HostAddr {
    pub fn parse(address: &str) -> Result<Self> {
        let literal = address.trim();
        let invalid = || DsexecError::InvalidAddress(address.to_string());

        if literal.is_empty() || literal.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        let (host, port) = if let Some(rest) = literal.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match tail {
                "" => DEFAULT_SSH_PORT,
                _ => parse_port(tail.strip_prefix(':').ok_or_else(invalid)?).ok_or_else(invalid)?,
            };
            (host, port)
        } else if literal.matches(':').count() == 1 {
            let (host, port) = literal.split_once(':').ok_or_else(invalid)?;
            (host, parse_port(port).ok_or_else(invalid)?)
        } else {
            // No colon, or a bare IPv6 address
            (literal, DEFAULT_SSH_PORT)
        };

        if host.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            literal: literal.to_string(),
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Host specifiers a known_hosts line may start with for this address.
    ///
    /// Matching is by string identity: an alias and the IP it resolves to
    /// are distinct trust subjects.
    pub fn specifiers(&self) -> Vec<String> {
        let bracketed = format!("[{}]:{}", self.host, self.port);
        if bracketed == self.literal {
            vec![bracketed]
        } else {
            vec![self.literal.clone(), bracketed]
        }
    }

    fn line_pattern(&self) -> Result<Regex> {
        let alternatives: Vec<String> = self
            .specifiers()
            .iter()
            .map(|s| regex::escape(s))
            .collect();
        // known_hosts may list several hosts per line, comma separated
        let pattern = format!(r"(?m)^(?:{})[,\s]", alternatives.join("|"));
        Regex::new(&pattern).map_err(|e| DsexecError::InvalidAddress(e.to_string()))
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

fn parse_port(port: &str) -> Option<u16> {
    port.parse::<u16>().ok().filter(|p| *p != 0)
}

/// In-memory copy of the trust file
#[derive(Debug, Clone, Default)]
pub struct TrustFile {
    body: String,
}

impl TrustFile {
    /// Load the trust file, empty if it does not exist yet
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(body) => Ok(Self { body }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn contains(&self, addr: &HostAddr) -> Result<bool> {
        Ok(addr.line_pattern()?.is_match(&self.body))
    }

    pub fn append(&mut self, entry: &str) {
        if !self.body.is_empty() && !self.body.ends_with('\n') {
            self.body.push('\n');
        }
        self.body.push_str(entry);
        if !entry.ends_with('\n') {
            self.body.push('\n');
        }
    }

    /// Write the whole buffer back, creating the file and its directory
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.body).await?;
        Ok(())
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.body
    }
}

/// The trust store: a known_hosts path plus a way to fetch unseen keys
#[derive(Clone)]
pub struct KnownHosts {
    path: PathBuf,
    fetcher: Arc<dyn KeyFetcher>,
}

impl KnownHosts {
    pub fn new(path: impl Into<PathBuf>, fetcher: Arc<dyn KeyFetcher>) -> Self {
        Self {
            path: path.into(),
            fetcher,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the host key of `address` unless it is already trusted.
    ///
    /// Returns `true` when a key was fetched and written.
    pub async fn ensure_trusted(&self, address: &str) -> Result<bool> {
        let addr = HostAddr::parse(address)?;
        tracing::info!(%addr, file = %self.path.display(), "Checking for known host");

        let mut file = TrustFile::load(&self.path).await?;
        if file.contains(&addr)? {
            tracing::debug!(%addr, "already trusted");
            return Ok(false);
        }

        let key = self.fetcher.fetch_key(addr.host(), addr.port()).await?;
        file.append(&key);
        file.save(&self.path).await?;

        tracing::info!(%addr, file = %self.path.display(), "Wrote host key");
        Ok(true)
    }
}

impl fmt::Debug for KnownHosts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnownHosts")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
