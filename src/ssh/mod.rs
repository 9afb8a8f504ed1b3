pub mod config;
pub mod keyscan;
pub mod known_hosts;

pub use config::{check_ssh_config, generate_ssh_config_block, install_ssh_config, SshConfigStatus};
pub use keyscan::SshKeyscan;
pub use known_hosts::KnownHosts;
