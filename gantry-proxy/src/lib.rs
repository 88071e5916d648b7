pub mod forwarder;
pub mod gateway;

pub use forwarder::Forwarder;
pub use gateway::Gateway;
