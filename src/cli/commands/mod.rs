pub mod config;
pub mod env;
pub mod exec;
pub mod resolve;
pub mod run;
pub mod scale;
pub mod stats;
pub mod stop;
pub mod trust;

use std::borrow::Cow;
use std::process::Stdio;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use shell_escape::escape;
use tokio::process::Command;

use crate::config::Settings;
use crate::resolve::{Endpoint, Materializer, Resolver, TransportOptions};
use crate::ssh::{KnownHosts, SshKeyscan};
use crate::swarm::DockerCli;
use crate::{DsexecError, Result};

/// Build the production resolver: docker CLI inventory, ssh-keyscan trust
pub fn build_resolver(settings: &Settings) -> Result<Resolver<DockerCli>> {
    let fetcher = Arc::new(SshKeyscan::new(settings.keyscan_binary.as_str()));
    let trust = KnownHosts::new(settings.known_hosts_file()?, fetcher);
    let materializer = Materializer::new(TransportOptions::from(settings), trust);

    Ok(Resolver::new(DockerCli::new(settings.docker_binary.as_str()), materializer)
        .with_stack(settings.stack.clone()))
}

/// An external command ready to be spawned or printed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// `docker -H ssh://...` against the endpoint's engine
    pub fn docker(binary: &str, endpoint: &Endpoint) -> Self {
        Self::new(binary).arg("-H").arg(endpoint.docker_host())
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Shell-escaped command line, env assignments first
    pub fn command_line(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, escape(Cow::Borrowed(v.as_str()))))
            .collect();
        parts.push(escape(Cow::Borrowed(self.program.as_str())).into_owned());
        parts.extend(
            self.args
                .iter()
                .map(|a| escape(Cow::Borrowed(a.as_str())).into_owned()),
        );
        parts.join(" ")
    }

    /// Run attached to the terminal.
    ///
    /// A non-zero exit is the interactive program's business and is only
    /// logged; failing to start the program is an error.
    pub async fn spawn_interactive(&self) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| DsexecError::command(format!("{}: {}", self.program, e)))?;

        if !status.success() {
            tracing::warn!("{} exited with code: {:?}", self.program, status.code());
        }

        Ok(())
    }

    /// Print the command line, or announce and run it
    pub async fn dispatch(&self, print_only: bool) -> Result<()> {
        if print_only {
            println!("{}", self.command_line());
            return Ok(());
        }
        eprintln!("Entering {}", self.command_line());
        self.spawn_interactive().await
    }
}

pub(crate) fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

/// Await a resolution behind a spinner, clearing it before any output
pub(crate) async fn with_spinner<T>(
    message: &str,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    let spinner = create_spinner(message);
    let result = fut.await;
    spinner.finish_and_clear();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_escapes() {
        let invocation = Invocation::new("docker")
            .args(["exec", "-it", "abcdef123456"])
            .arg("sh -c 'ls'");
        assert_eq!(
            invocation.command_line(),
            r#"docker exec -it abcdef123456 'sh -c '\''ls'\'''"#
        );
    }

    #[test]
    fn test_command_line_env_prefix() {
        let invocation = Invocation::new("/bin/zsh").env("DOCKER_CONTEXT", "swarm");
        assert_eq!(invocation.command_line(), "DOCKER_CONTEXT=swarm /bin/zsh");
    }

    #[test]
    fn test_build_resolver_from_defaults() {
        let mut settings = Settings::default();
        settings.known_hosts_path = Some(std::path::PathBuf::from("/tmp/known_hosts"));
        assert!(build_resolver(&settings).is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_program_is_swallowed() {
        let invocation = Invocation::new("false");
        assert!(invocation.spawn_interactive().await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let invocation = Invocation::new("/nonexistent/program");
        let err = invocation.spawn_interactive().await.unwrap_err();
        assert!(matches!(err, DsexecError::Command(_)));
    }
}
