use super::{build_resolver, with_spinner};
use crate::config::Settings;
use crate::resolve::Endpoint;
use crate::Result;

/// Resolve a target and print where it lives, without connecting to it
pub async fn execute(
    settings: &Settings,
    target: String,
    container: Option<String>,
    json: bool,
) -> Result<()> {
    let resolver = build_resolver(settings)?;

    let endpoint = with_spinner(
        &format!("Looking up '{}'...", target),
        resolver.resolve(&target, container.as_deref()),
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&endpoint)?);
    } else {
        print!("{}", render(&endpoint));
    }
    Ok(())
}

pub fn render(endpoint: &Endpoint) -> String {
    let mut out = String::new();
    out.push_str(&format!("Host:        {}\n", endpoint.hostname()));
    out.push_str(&format!("OS:          {}\n", endpoint.os()));
    out.push_str(&format!("DOCKER_HOST: {}\n", endpoint.docker_host()));
    if let Some(service) = endpoint.service() {
        out.push_str(&format!("Service:     {}\n", service));
    }
    if let Some(container_id) = endpoint.container_id() {
        out.push_str(&format!("Container:   {}\n", container_id));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::endpoint::tests::endpoint;
    use crate::swarm::GuestOs;

    #[test]
    fn test_render_container() {
        let ep = endpoint("ssh://ds-n1", GuestOs::Linux, Some("abcdef123456789"));
        let text = render(&ep);
        assert!(text.contains("Host:        web-01"));
        assert!(text.contains("OS:          linux"));
        assert!(text.contains("DOCKER_HOST: ssh://ds-n1"));
        assert!(text.contains("Container:   abcdef123456"));
    }

    #[test]
    fn test_render_node_has_no_container() {
        let ep = endpoint("ssh://ds-n1", GuestOs::Linux, None);
        assert!(!render(&ep).contains("Container"));
    }

    #[test]
    fn test_json_shape() {
        let ep = endpoint("ssh://10.0.0.9:8022", GuestOs::Windows, Some("cafebabe0011"));
        let value = serde_json::to_value(&ep).unwrap();
        assert_eq!(value["docker_host"], "ssh://10.0.0.9:8022");
        assert_eq!(value["os"], "windows");
        assert_eq!(value["container_id"], "cafebabe0011");
    }
}
