use std::process::{Command, Stdio};

use crate::config::Settings;
use crate::ssh::{check_ssh_config, generate_ssh_config_block, install_ssh_config, SshConfigStatus};
use crate::{DsexecError, Result};

pub fn init() -> Result<()> {
    println!("Checking prerequisites...\n");

    let settings = Settings::load()?;
    let mut all_ok = true;

    // Check Docker CLI
    print!("  Docker CLI: ");
    match check_version(&settings.docker_binary, "--version") {
        Ok(version) => println!("OK ({})", version),
        Err(e) => {
            println!("MISSING");
            println!("    {}", e);
            all_ok = false;
        }
    }

    // Check the engine is a swarm manager
    print!("  Swarm manager: ");
    match check_swarm_manager(&settings.docker_binary) {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("NO");
            println!("    {}", e);
            all_ok = false;
        }
    }

    // Check ssh-keyscan
    print!("  ssh-keyscan: ");
    match check_runs(&settings.keyscan_binary) {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("MISSING");
            println!("    {}", e);
            all_ok = false;
        }
    }

    // Check SSH Config
    print!("  SSH Config: ");
    let path = &settings.ssh_config_path;
    let prefix = &settings.host_alias_prefix;
    match check_ssh_config(path, prefix) {
        Ok(SshConfigStatus::Configured) => println!("OK ({})", path.display()),
        Ok(SshConfigStatus::NeedsConfiguration) => {
            println!("NEEDS CONFIGURATION");
            println!("    Add the following to {}:\n", path.display());
            println!("{}", generate_ssh_config_block(prefix));
            all_ok = false;
        }
        Ok(SshConfigStatus::Missing) => match install_ssh_config(path, prefix) {
            Ok(_) => println!("INSTALLED ({})", path.display()),
            Err(e) => {
                println!("MISSING");
                println!("    {}", e);
                println!("    Create {} with:\n", path.display());
                println!("{}", generate_ssh_config_block(prefix));
                all_ok = false;
            }
        },
        Err(e) => {
            println!("ERROR: {}", e);
            all_ok = false;
        }
    }

    // Persist the effective settings so they can be edited
    if let Some(config_path) = Settings::config_path() {
        if !config_path.exists() {
            settings.save_to(&config_path)?;
            println!("\n  Wrote default settings to {}", config_path.display());
        }
    }

    println!();

    if all_ok {
        println!("All prerequisites met! Try 'dsexec exec <service>'.");
        Ok(())
    } else {
        Err(DsexecError::Prerequisites(
            "Some prerequisites are not met".to_string(),
        ))
    }
}

pub fn show() -> Result<()> {
    let settings = Settings::load()?;
    print!("{}", render(&settings));
    Ok(())
}

fn render(settings: &Settings) -> String {
    let mut out = String::from("Configuration:\n\n");

    out.push_str("Config file:\n");
    match Settings::config_path() {
        Some(path) => out.push_str(&format!("  {}\n", path.display())),
        None => out.push_str("  (unavailable)\n"),
    }

    out.push_str("\nStack:\n");
    match &settings.stack {
        Some(stack) => out.push_str(&format!("  {}\n", stack)),
        None => out.push_str("  (none, all services)\n"),
    }

    out.push_str("\nTrust:\n");
    match settings.known_hosts_file() {
        Ok(path) => out.push_str(&format!("  known_hosts: {}\n", path.display())),
        Err(e) => out.push_str(&format!("  known_hosts: {}\n", e)),
    }
    out.push_str(&format!(
        "  check every node: {}\n",
        settings.check_known_hosts
    ));

    out.push_str("\nSSH:\n");
    out.push_str(&format!(
        "  alias: {}<node id> ({})\n",
        settings.host_alias_prefix,
        settings.ssh_config_path.display()
    ));
    out.push_str(&format!("  address label: {}\n", settings.address_label));
    out.push_str(&format!("  windows port: {}\n", settings.alternate_port));

    out.push_str("\nTools:\n");
    out.push_str(&format!("  docker: {}\n", settings.docker_binary));
    out.push_str(&format!("  ssh-keyscan: {}\n", settings.keyscan_binary));
    out.push_str(&format!("  run image: {}\n", settings.default_tool_image));
    out
}

fn check_version(binary: &str, flag: &str) -> Result<String> {
    let output = Command::new(binary)
        .arg(flag)
        .output()
        .map_err(|_| DsexecError::Prerequisites(format!("{} not found", binary)))?;

    if output.status.success() {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(version)
    } else {
        Err(DsexecError::Prerequisites(format!("{} not working", binary)))
    }
}

fn check_swarm_manager(docker: &str) -> Result<()> {
    let output = Command::new(docker)
        .args(["info", "--format", "{{.Swarm.ControlAvailable}}"])
        .output()
        .map_err(|_| DsexecError::Prerequisites(format!("{} not found", docker)))?;

    let control = String::from_utf8_lossy(&output.stdout);
    if output.status.success() && control.trim() == "true" {
        Ok(())
    } else {
        Err(DsexecError::Prerequisites(
            "the local engine is not a swarm manager".to_string(),
        ))
    }
}

// ssh-keyscan has no version flag and exits non-zero without arguments,
// so only a failure to start it counts
fn check_runs(binary: &str) -> Result<()> {
    Command::new(binary)
        .stdin(Stdio::null())
        .output()
        .map(|_| ())
        .map_err(|_| DsexecError::Prerequisites(format!("{} not found", binary)))
}
