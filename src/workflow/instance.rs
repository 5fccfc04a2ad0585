use crate::shared::InstanceId;
use crate::workflow::error::WorkflowError;
use crate::workflow::status::InstanceStatus;
use crate::workflow::template::WorkflowTemplate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Landed on a plain step that waits for the caller.
    Ready { step: String },
    /// Landed on an approval-gated step.
    Gated { step: String },
    /// Moved past the last step.
    Completed,
    /// The instance was already completed; nothing changed.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub outcome: AdvanceOutcome,
    /// Automation steps passed through during this call, in order.
    pub cascaded: Vec<String>,
}

impl Advance {
    fn unchanged() -> Self {
        Self {
            outcome: AdvanceOutcome::Unchanged,
            cascaded: Vec::new(),
        }
    }
}

/// One execution of a template.
///
/// Step lists are copied from the template at creation so later template
/// redefinitions never reach in-flight instances. Position is tracked by
/// `current_index`; `current_step` mirrors `steps[current_index]`.
///
/// Every transition method is all-or-nothing: it either succeeds and replaces
/// `self`, or fails and leaves `self` untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInstance {
    #[serde(default)]
    id: Option<InstanceId>,
    template_name: String,
    steps: Vec<String>,
    #[serde(default)]
    approval_steps: BTreeSet<String>,
    #[serde(default)]
    automation_steps: BTreeSet<String>,
    current_index: usize,
    current_step: String,
    status: InstanceStatus,
    started_at: i64,
    updated_at: i64,
    #[serde(default)]
    completed_at: Option<i64>,
    #[serde(default)]
    terminal_reason: Option<String>,
}

impl WorkflowInstance {
    pub fn create(template: &WorkflowTemplate, now: i64) -> Result<Self, WorkflowError> {
        let first = template.steps().first().cloned().ok_or_else(|| {
            WorkflowError::invalid_template(template.name().as_str(), "steps must be non-empty")
        })?;
        Ok(Self {
            id: None,
            template_name: template.name().to_string(),
            steps: template.steps().to_vec(),
            approval_steps: template.approval_steps().clone(),
            automation_steps: template.automation_steps().clone(),
            current_index: 0,
            current_step: first,
            status: InstanceStatus::Pending,
            started_at: now,
            updated_at: now,
            completed_at: None,
            terminal_reason: None,
        })
    }

    pub fn id(&self) -> Option<InstanceId> {
        self.id
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn approval_steps(&self) -> &BTreeSet<String> {
        &self.approval_steps
    }

    pub fn automation_steps(&self) -> &BTreeSet<String> {
        &self.automation_steps
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_step(&self) -> &str {
        &self.current_step
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<i64> {
        self.completed_at
    }

    pub fn terminal_reason(&self) -> Option<&str> {
        self.terminal_reason.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Identifier used in error messages; unsaved instances are named by template.
    pub fn label(&self) -> String {
        match self.id {
            Some(id) => id.to_string(),
            None => format!("unsaved:{}", self.template_name),
        }
    }

    pub(crate) fn assign_id(&mut self, id: InstanceId) {
        self.id = Some(id);
    }

    /// Moves execution past the current step, cascading through automation steps.
    ///
    /// Idempotent once completed. Fails on a cancelled instance and on an
    /// instance blocked at an approval gate.
    pub fn advance(&mut self, now: i64) -> Result<Advance, WorkflowError> {
        match self.status {
            InstanceStatus::Completed => return Ok(Advance::unchanged()),
            InstanceStatus::Cancelled => return Err(self.terminated()),
            InstanceStatus::AwaitingApproval => {
                return Err(WorkflowError::AwaitingApproval {
                    instance: self.label(),
                    step: self.current_step.clone(),
                })
            }
            _ => {}
        }
        let mut next = self.clone();
        let report = next.step_forward(now)?;
        *self = next;
        Ok(report)
    }

    pub fn approve(&mut self, now: i64) -> Result<Advance, WorkflowError> {
        if self.status.is_terminal() {
            return Err(self.terminated());
        }
        if self.status != InstanceStatus::AwaitingApproval {
            return Err(self.not_approvable("instance is not awaiting approval"));
        }
        if !self.approval_steps.contains(&self.current_step) {
            return Err(self.not_approvable("step is not approval-gated"));
        }
        let mut next = self.clone();
        next.transition(InstanceStatus::Approved, now)?;
        let report = next.step_forward(now)?;
        *self = next;
        Ok(report)
    }

    /// Advances until blocked at an approval gate or completed. Returns the
    /// number of advances performed.
    pub fn auto_process(&mut self, now: i64) -> Result<usize, WorkflowError> {
        if self.status == InstanceStatus::Cancelled {
            return Err(self.terminated());
        }
        let mut next = self.clone();
        let mut advances = 0;
        while !next.is_blocked() {
            next.step_forward(now)?;
            advances += 1;
        }
        *self = next;
        Ok(advances)
    }

    /// Returns `false` when the instance was already cancelled.
    pub fn cancel(&mut self, now: i64, reason: Option<&str>) -> Result<bool, WorkflowError> {
        match self.status {
            InstanceStatus::Cancelled => Ok(false),
            InstanceStatus::Completed => Err(self.terminated()),
            _ => {
                self.status = InstanceStatus::Cancelled;
                self.updated_at = now;
                self.terminal_reason = Some(reason.unwrap_or("cancelled").to_string());
                Ok(true)
            }
        }
    }

    /// Administrative completion regardless of remaining steps.
    pub fn force_complete(&mut self, now: i64, reason: Option<&str>) -> Result<(), WorkflowError> {
        if self.status.is_terminal() {
            return Err(self.terminated());
        }
        self.status = InstanceStatus::Completed;
        self.updated_at = now;
        self.completed_at = Some(now);
        self.terminal_reason = Some(reason.unwrap_or("completed by override").to_string());
        Ok(())
    }

    /// Checks the record-level invariants of a persisted instance.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.steps.is_empty() {
            return Err("steps must be non-empty".to_string());
        }
        let Some(step) = self.steps.get(self.current_index) else {
            return Err(format!(
                "current index {} is outside {} steps",
                self.current_index,
                self.steps.len()
            ));
        };
        if step != &self.current_step {
            return Err(format!(
                "current step `{}` does not match step `{step}` at index {}",
                self.current_step, self.current_index
            ));
        }
        if self.completed_at.is_some() != (self.status == InstanceStatus::Completed) {
            return Err(format!(
                "completedAt must be set exactly when status is completed (status `{}`)",
                self.status
            ));
        }
        for gate in self.approval_steps.iter().chain(&self.automation_steps) {
            if !self.steps.contains(gate) {
                return Err(format!("gated step `{gate}` is not a declared step"));
            }
        }
        Ok(())
    }

    fn is_blocked(&self) -> bool {
        matches!(
            self.status,
            InstanceStatus::AwaitingApproval | InstanceStatus::Completed
        )
    }

    fn step_forward(&mut self, now: i64) -> Result<Advance, WorkflowError> {
        // A gate on the very first step is entered by the first advance.
        if self.status == InstanceStatus::Pending && self.approval_steps.contains(&self.current_step)
        {
            self.transition(InstanceStatus::AwaitingApproval, now)?;
            return Ok(Advance {
                outcome: AdvanceOutcome::Gated {
                    step: self.current_step.clone(),
                },
                cascaded: Vec::new(),
            });
        }

        let mut cascaded = Vec::new();
        loop {
            let next_index = self.current_index + 1;
            let Some(next_step) = self.steps.get(next_index).cloned() else {
                self.transition(InstanceStatus::Completed, now)?;
                self.completed_at = Some(now);
                self.terminal_reason = Some("all steps finished".to_string());
                return Ok(Advance {
                    outcome: AdvanceOutcome::Completed,
                    cascaded,
                });
            };

            self.current_index = next_index;
            self.current_step = next_step.clone();
            if self.approval_steps.contains(&next_step) {
                self.transition(InstanceStatus::AwaitingApproval, now)?;
                return Ok(Advance {
                    outcome: AdvanceOutcome::Gated { step: next_step },
                    cascaded,
                });
            }
            if self.automation_steps.contains(&next_step) {
                self.transition(InstanceStatus::AutoProcessing, now)?;
                cascaded.push(next_step);
                continue;
            }
            self.transition(InstanceStatus::InProgress, now)?;
            return Ok(Advance {
                outcome: AdvanceOutcome::Ready { step: next_step },
                cascaded,
            });
        }
    }

    fn transition(&mut self, next: InstanceStatus, now: i64) -> Result<(), WorkflowError> {
        if !self.status.can_transition_to(next) {
            return Err(WorkflowError::InvalidTransition {
                instance: self.label(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    fn terminated(&self) -> WorkflowError {
        WorkflowError::InstanceTerminated {
            instance: self.label(),
            status: self.status,
        }
    }

    fn not_approvable(&self, reason: &str) -> WorkflowError {
        WorkflowError::StepNotApprovable {
            instance: self.label(),
            step: self.current_step.clone(),
            status: self.status,
            reason: reason.to_string(),
        }
    }
}
