use crate::shared::TemplateName;
use crate::workflow::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Raw, unvalidated template shape as it appears in YAML catalogs and CLI input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateDefinition {
    pub name: String,
    pub steps: Vec<String>,
    #[serde(default)]
    pub approval_steps: Vec<String>,
    #[serde(default)]
    pub automation_steps: Vec<String>,
}

/// Immutable, validated workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TemplateDefinition", into = "TemplateDefinition")]
pub struct WorkflowTemplate {
    name: TemplateName,
    steps: Vec<String>,
    approval_steps: BTreeSet<String>,
    automation_steps: BTreeSet<String>,
}

impl WorkflowTemplate {
    pub fn new<S: Into<String>>(
        name: &str,
        steps: impl IntoIterator<Item = S>,
        approval_steps: impl IntoIterator<Item = S>,
        automation_steps: impl IntoIterator<Item = S>,
    ) -> Result<Self, WorkflowError> {
        Self::try_from(TemplateDefinition {
            name: name.to_string(),
            steps: steps.into_iter().map(Into::into).collect(),
            approval_steps: approval_steps.into_iter().map(Into::into).collect(),
            automation_steps: automation_steps.into_iter().map(Into::into).collect(),
        })
    }

    pub fn name(&self) -> &TemplateName {
        &self.name
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

    pub fn is_approval_step(&self, step: &str) -> bool {
        self.approval_steps.contains(step)
    }

    pub fn is_automation_step(&self, step: &str) -> bool {
        self.automation_steps.contains(step)
    }
}

impl TryFrom<TemplateDefinition> for WorkflowTemplate {
    type Error = WorkflowError;

    fn try_from(raw: TemplateDefinition) -> Result<Self, Self::Error> {
        let invalid = |reason: String| WorkflowError::invalid_template(&raw.name, reason);

        let name = TemplateName::parse(raw.name.trim()).map_err(invalid)?;
        if raw.steps.is_empty() {
            return Err(invalid("steps must be non-empty".to_string()));
        }

        let mut seen = BTreeSet::new();
        for step in &raw.steps {
            if step.trim().is_empty() {
                return Err(invalid("step names must be non-blank".to_string()));
            }
            if !seen.insert(step.as_str()) {
                return Err(invalid(format!("step `{step}` is declared more than once")));
            }
        }

        let approval_steps = collect_subset(&seen, &raw.approval_steps, "approval_steps")
            .map_err(invalid)?;
        let automation_steps = collect_subset(&seen, &raw.automation_steps, "automation_steps")
            .map_err(invalid)?;
        if let Some(step) = approval_steps.intersection(&automation_steps).next() {
            return Err(invalid(format!(
                "step `{step}` cannot be both approval-gated and automatic"
            )));
        }

        Ok(Self {
            name,
            steps: raw.steps,
            approval_steps,
            automation_steps,
        })
    }
}

impl From<WorkflowTemplate> for TemplateDefinition {
    fn from(template: WorkflowTemplate) -> Self {
        Self {
            name: template.name.to_string(),
            steps: template.steps,
            approval_steps: template.approval_steps.into_iter().collect(),
            automation_steps: template.automation_steps.into_iter().collect(),
        }
    }
}

fn collect_subset(
    steps: &BTreeSet<&str>,
    entries: &[String],
    field: &str,
) -> Result<BTreeSet<String>, String> {
    let mut subset = BTreeSet::new();
    for entry in entries {
        if !steps.contains(entry.as_str()) {
            return Err(format!("{field} entry `{entry}` is not a declared step"));
        }
        subset.insert(entry.clone());
    }
    Ok(subset)
}
