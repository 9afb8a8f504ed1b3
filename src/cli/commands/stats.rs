use super::{build_resolver, with_spinner, Invocation};
use crate::config::Settings;
use crate::resolve::Endpoint;
use crate::Result;

/// Live container stats of one node; only node names are accepted
pub async fn execute(settings: &Settings, node: String, no_stream: bool, print: bool) -> Result<()> {
    let resolver = build_resolver(settings)?;

    let endpoint = with_spinner(
        &format!("Looking up node '{}'...", node),
        resolver.resolve_node(&node),
    )
    .await?;

    invocation(&settings.docker_binary, &endpoint, no_stream)
        .dispatch(print)
        .await
}

pub fn invocation(docker: &str, endpoint: &Endpoint, no_stream: bool) -> Invocation {
    let invocation = Invocation::docker(docker, endpoint).arg("stats");
    if no_stream {
        invocation.arg("--no-stream")
    } else {
        invocation
    }
}
