use super::{build_resolver, with_spinner, Invocation};
use crate::config::Settings;
use crate::resolve::Endpoint;
use crate::{DsexecError, Result};

pub async fn execute(
    settings: &Settings,
    target: String,
    container: Option<String>,
    command: Vec<String>,
    print: bool,
) -> Result<()> {
    let resolver = build_resolver(settings)?;

    let endpoint = with_spinner(
        &format!("Looking up '{}'...", target),
        resolver.resolve_container(&target, container.as_deref()),
    )
    .await?;

    invocation(&settings.docker_binary, &endpoint, &command)?
        .dispatch(print)
        .await
}

/// `docker -H <node> exec -it <container> <command>`, the OS shell by default
pub fn invocation(docker: &str, endpoint: &Endpoint, command: &[String]) -> Result<Invocation> {
    let container_id = require_container(endpoint)?;

    let invocation = Invocation::docker(docker, endpoint).args(["exec", "-it", container_id]);
    if command.is_empty() {
        Ok(invocation.arg(endpoint.os().default_shell()))
    } else {
        Ok(invocation.args(command.iter().cloned()))
    }
}

pub(crate) fn require_container(endpoint: &Endpoint) -> Result<&str> {
    endpoint.container_id().ok_or_else(|| {
        DsexecError::InvalidTarget(format!(
            "{} is a node, a container is needed",
            endpoint.hostname()
        ))
    })
}
