use super::{build_resolver, Invocation};
use crate::config::Settings;
use crate::Result;

/// Scale a service on the local manager, the name is resolved like `exec` does
pub async fn execute(settings: &Settings, service: String, replicas: u32, print: bool) -> Result<()> {
    let resolver = build_resolver(settings)?;
    let service = resolver.find_service(&service).await?;

    invocation(&settings.docker_binary, &service.name, replicas)
        .dispatch(print)
        .await
}

pub fn invocation(docker: &str, service: &str, replicas: u32) -> Invocation {
    Invocation::new(docker).args([
        "service".to_string(),
        "scale".to_string(),
        format!("{}={}", service, replicas),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_targets_local_manager() {
        let inv = invocation("docker", "stack_api", 3);
        assert_eq!(inv.args, vec!["service", "scale", "stack_api=3"]);
        assert!(!inv.args.iter().any(|a| a == "-H"));
    }
}
