use std::borrow::Cow;

use shell_escape::escape;

use super::{build_resolver, with_spinner, Invocation};
use crate::config::Settings;
use crate::resolve::Endpoint;
use crate::Result;

const FALLBACK_SHELL: &str = "/bin/sh";

/// Open a local shell whose docker CLI talks to the target's node
pub async fn execute(
    settings: &Settings,
    target: String,
    container: Option<String>,
    print: bool,
) -> Result<()> {
    let resolver = build_resolver(settings)?;

    let endpoint = with_spinner(
        &format!("Looking up '{}'...", target),
        resolver.resolve(&target, container.as_deref()),
    )
    .await?;

    if print {
        println!("{}", export_line(&endpoint));
        return Ok(());
    }

    let shell = std::env::var("SHELL").ok();
    invocation(shell.as_deref(), &endpoint).dispatch(false).await
}

pub fn invocation(shell: Option<&str>, endpoint: &Endpoint) -> Invocation {
    let shell = shell.filter(|s| !s.is_empty()).unwrap_or(FALLBACK_SHELL);
    Invocation::new(shell).env("DOCKER_HOST", endpoint.docker_host())
}

/// `export DOCKER_HOST=...`, ready for `eval`
pub fn export_line(endpoint: &Endpoint) -> String {
    format!(
        "export DOCKER_HOST={}",
        escape(Cow::Borrowed(endpoint.docker_host()))
    )
}
