use dialoguer::Confirm;

use super::exec::require_container;
use super::{build_resolver, with_spinner, Invocation};
use crate::config::Settings;
use crate::resolve::Endpoint;
use crate::{DsexecError, Result};

pub async fn execute(
    settings: &Settings,
    target: String,
    container: Option<String>,
    force: bool,
    print: bool,
) -> Result<()> {
    let resolver = build_resolver(settings)?;

    let endpoint = with_spinner(
        &format!("Looking up '{}'...", target),
        resolver.resolve_container(&target, container.as_deref()),
    )
    .await?;

    let invocation = invocation(&settings.docker_binary, &endpoint)?;

    if !force && !print {
        let prompt = format!(
            "Stop container {} on {}? The orchestrator will reschedule the task",
            require_container(&endpoint)?,
            endpoint.hostname()
        );
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| DsexecError::command(format!("Failed to read input: {}", e)))?;

        if !confirmed {
            return Err(DsexecError::Cancelled);
        }
    }

    invocation.dispatch(print).await
}

pub fn invocation(docker: &str, endpoint: &Endpoint) -> Result<Invocation> {
    let container_id = require_container(endpoint)?;
    Ok(Invocation::docker(docker, endpoint).args(["stop", container_id]))
}
