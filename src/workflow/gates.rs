use crate::workflow::error::WorkflowError;
use crate::workflow::template::WorkflowTemplate;

pub const APPROVAL_KEYWORD: &str = "approval";
pub const AUTOMATION_KEYWORD: &str = "auto";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferredGates {
    pub approval_steps: Vec<String>,
    pub automation_steps: Vec<String>,
}

/// Derives gate sets from step names: names containing "approval" are
/// approval-gated, names containing "auto" are automatic. Matching is
/// case-insensitive and approval wins when both keywords appear.
pub fn infer_gates(steps: &[String]) -> InferredGates {
    let mut gates = InferredGates::default();
    for step in steps {
        let lowered = step.to_lowercase();
        if lowered.contains(APPROVAL_KEYWORD) {
            gates.approval_steps.push(step.clone());
        } else if lowered.contains(AUTOMATION_KEYWORD) {
            gates.automation_steps.push(step.clone());
        }
    }
    gates
}

pub fn template_with_inferred_gates(
    name: &str,
    steps: Vec<String>,
) -> Result<WorkflowTemplate, WorkflowError> {
    let gates = infer_gates(&steps);
    WorkflowTemplate::new(name, steps, gates.approval_steps, gates.automation_steps)
}
