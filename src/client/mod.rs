// One timed request against the service
pub mod executor;

// Route construction for the info and purchase endpoints
pub mod service;

pub use executor::{RequestExecutor, TimedExecutor};
pub use service::ServiceClient;
