use crate::store::StoreError;
use crate::workflow::status::InstanceStatus;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("template `{template}` is invalid: {reason}")]
    InvalidTemplate { template: String, reason: String },
    #[error("template `{template}` not found")]
    TemplateNotFound { template: String },
    #[error("workflow instance `{instance_id}` not found")]
    InstanceNotFound { instance_id: String },
    #[error(
        "workflow instance `{instance}` cannot approve step `{step}`: {reason} (status `{status}`)"
    )]
    StepNotApprovable {
        instance: String,
        step: String,
        status: InstanceStatus,
        reason: String,
    },
    #[error("workflow instance `{instance}` step `{step}` is awaiting approval")]
    AwaitingApproval { instance: String, step: String },
    #[error("workflow instance `{instance}` is terminated with status `{status}`")]
    InstanceTerminated {
        instance: String,
        status: InstanceStatus,
    },
    #[error("workflow instance `{instance}` status transition `{from}` -> `{to}` is invalid")]
    InvalidTransition {
        instance: String,
        from: InstanceStatus,
        to: InstanceStatus,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub fn invalid_template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Failures raised by a store or lock rather than by the state machine.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, WorkflowError::Store(_))
    }
}
