pub mod client;
pub mod inventory;
#[cfg(test)]
pub mod memory;
pub mod model;

pub use client::DockerCli;
pub use inventory::{Filter, Inventory};
pub use model::{GuestOs, Node, Service, Task, TaskState};
