pub mod endpoint;
pub mod resolver;

pub use endpoint::{Endpoint, Materializer, TransportOptions};
pub use resolver::Resolver;
