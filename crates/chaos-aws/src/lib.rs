pub mod actuator;
pub mod client;
pub mod snapshot;
pub mod topology;
