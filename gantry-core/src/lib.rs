pub mod authz;
pub mod claims;
pub mod config;
pub mod context;
pub mod error;
pub mod resolver;
pub mod route;

pub use authz::{AuthzDecision, authorize};
pub use claims::{AuthOutcome, IdentityClaim, Role};
pub use config::GantryConfig;
pub use context::{ProxyResponse, RequestContext};
pub use error::GatewayError;
pub use resolver::RouteTable;
pub use route::{RouteRule, ServiceKey};
