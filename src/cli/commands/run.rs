use super::exec::require_container;
use super::{build_resolver, with_spinner, Invocation};
use crate::config::Settings;
use crate::resolve::Endpoint;
use crate::swarm::GuestOs;
use crate::{DsexecError, Result};

/// Start a throwaway tool container next to the target one
pub async fn execute(
    settings: &Settings,
    target: String,
    container: Option<String>,
    image: Option<String>,
    command: Vec<String>,
    print: bool,
) -> Result<()> {
    let resolver = build_resolver(settings)?;

    let endpoint = with_spinner(
        &format!("Looking up '{}'...", target),
        resolver.resolve_container(&target, container.as_deref()),
    )
    .await?;

    let image = image.unwrap_or_else(|| settings.default_tool_image.clone());
    invocation(&settings.docker_binary, &endpoint, &image, &command)?
        .dispatch(print)
        .await
}

/// `docker run --rm -it` sharing the target's network and pid namespaces
pub fn invocation(
    docker: &str,
    endpoint: &Endpoint,
    image: &str,
    command: &[String],
) -> Result<Invocation> {
    let container_id = require_container(endpoint)?;
    if endpoint.os() == GuestOs::Windows {
        return Err(DsexecError::command(
            "sharing container namespaces is not supported on windows nodes",
        ));
    }

    let shared = format!("container:{}", container_id);
    let shared = shared.as_str();
    Ok(Invocation::docker(docker, endpoint)
        .args(["run", "--rm", "-it", "--network", shared, "--pid", shared, image])
        .args(command.iter().cloned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::endpoint::tests::endpoint;

    #[test]
    fn test_shares_target_namespaces() {
        let linux = endpoint("ssh://ds-n1", GuestOs::Linux, Some("abcdef123456789"));
        let inv = invocation("docker", &linux, "nicolaka/netshoot", &["tcpdump".to_string()]).unwrap();
        assert_eq!(
            inv.args,
            vec![
                "-H",
                "ssh://ds-n1",
                "run",
                "--rm",
                "-it",
                "--network",
                "container:abcdef123456",
                "--pid",
                "container:abcdef123456",
                "nicolaka/netshoot",
                "tcpdump"
            ]
        );
    }

    #[test]
    fn test_windows_is_refused() {
        let windows = endpoint("ssh://10.0.0.9:8022", GuestOs::Windows, Some("cafebabe0011"));
        assert!(invocation("docker", &windows, "busybox", &[]).is_err());
    }
}
