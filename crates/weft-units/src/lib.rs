pub mod agent;
pub mod builtin;
pub mod registry;

pub use agent::ChatAgentUnit;
pub use builtin::buttons::ApprovalButtonsUnit;
pub use builtin::webhook::WebhookUnit;
pub use registry::UnitRegistry;
