//! Stripe adapter - transport, wire types, customer provisioning, and
//! the resilient billing gateway.

mod gateway;
mod mock_transport;
mod provisioning;
mod transport;
mod types;

pub use gateway::StripeBillingGateway;
pub use mock_transport::ScriptedTransport;
pub use provisioning::CustomerProvisioner;
pub use transport::HttpTransport;
