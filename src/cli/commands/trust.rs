use std::sync::Arc;

use super::with_spinner;
use crate::config::Settings;
use crate::ssh::{KnownHosts, SshKeyscan};
use crate::Result;

/// Record the host key of an SSH address in the trust file
pub async fn execute(settings: &Settings, address: String) -> Result<()> {
    let fetcher = Arc::new(SshKeyscan::new(settings.keyscan_binary.as_str()));
    let trust = KnownHosts::new(settings.known_hosts_file()?, fetcher);

    let written = with_spinner(
        &format!("Checking host key of {}...", address),
        trust.ensure_trusted(&address),
    )
    .await?;

    if written {
        println!("Added {} to {}", address, trust.path().display());
    } else {
        println!("{} is already trusted in {}", address, trust.path().display());
    }
    Ok(())
}
