pub mod agent;
pub mod azure;

pub use agent::AgentOrchestrator;
pub use azure::Integrations;
