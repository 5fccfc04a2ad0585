//! Workflow state machine: templates, instances and the engine facade.

pub mod engine;
pub mod error;
pub mod gates;
pub mod instance;
pub mod locks;
pub mod status;
pub mod template;

pub use engine::WorkflowEngine;
pub use error::WorkflowError;
pub use gates::{infer_gates, template_with_inferred_gates, InferredGates};
pub use instance::{Advance, AdvanceOutcome, WorkflowInstance};
pub use locks::InstanceLocks;
pub use status::InstanceStatus;
pub use template::{TemplateDefinition, WorkflowTemplate};
