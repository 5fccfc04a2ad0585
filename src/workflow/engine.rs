use crate::shared::InstanceId;
use crate::store::{InstanceStore, TemplateSource};
use crate::workflow::error::WorkflowError;
use crate::workflow::instance::WorkflowInstance;
use crate::workflow::locks::InstanceLocks;
use crate::workflow::template::WorkflowTemplate;
use tracing::{debug, info, warn};

/// Stateless orchestration facade over an [`InstanceStore`] and a [`TemplateSource`].
///
/// Every mutating operation goes through [`InstanceStore::update`], which
/// excludes other writers of the same id for the whole load-transition-save,
/// including writers in other processes. Threads of one engine first queue on
/// an in-process lock so they never contend on the store's.
#[derive(Debug)]
pub struct WorkflowEngine<S, T> {
    store: S,
    templates: T,
    locks: InstanceLocks,
}

impl<S: InstanceStore, T: TemplateSource> WorkflowEngine<S, T> {
    pub fn new(store: S, templates: T) -> Self {
        Self {
            store,
            templates,
            locks: InstanceLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn templates(&self) -> &T {
        &self.templates
    }

    pub fn start(&self, template_name: &str, now: i64) -> Result<WorkflowInstance, WorkflowError> {
        let template = self.templates.find_by_name(template_name)?.ok_or_else(|| {
            WorkflowError::TemplateNotFound {
                template: template_name.to_string(),
            }
        })?;
        self.start_with_template(&template, now)
    }

    pub fn start_with_steps(
        &self,
        template_name: &str,
        steps: Vec<String>,
        approval_steps: Vec<String>,
        automation_steps: Vec<String>,
        now: i64,
    ) -> Result<WorkflowInstance, WorkflowError> {
        let template =
            WorkflowTemplate::new(template_name, steps, approval_steps, automation_steps)?;
        self.start_with_template(&template, now)
    }

    pub fn start_with_template(
        &self,
        template: &WorkflowTemplate,
        now: i64,
    ) -> Result<WorkflowInstance, WorkflowError> {
        let instance = WorkflowInstance::create(template, now)?;
        let saved = self.store.save(instance)?;
        info!(
            instance_id = %saved.label(),
            template = saved.template_name(),
            step = saved.current_step(),
            "workflow instance started"
        );
        Ok(saved)
    }

    pub fn get(&self, id: InstanceId) -> Result<WorkflowInstance, WorkflowError> {
        self.store
            .find_by_id(id)?
            .ok_or_else(|| WorkflowError::InstanceNotFound {
                instance_id: id.to_string(),
            })
    }

    pub fn list(&self) -> Result<Vec<WorkflowInstance>, WorkflowError> {
        Ok(self.store.find_all()?)
    }

    pub fn advance(&self, id: InstanceId, now: i64) -> Result<WorkflowInstance, WorkflowError> {
        self.apply(id, "advance", |instance| {
            let report = instance.advance(now)?;
            if !report.cascaded.is_empty() {
                debug!(instance_id = %id, cascaded = ?report.cascaded, "automation steps executed");
            }
            Ok(())
        })
    }

    pub fn approve_step(
        &self,
        id: InstanceId,
        now: i64,
    ) -> Result<WorkflowInstance, WorkflowError> {
        self.apply(id, "approve", |instance| {
            let approved = instance.current_step().to_string();
            let report = instance.approve(now)?;
            debug!(
                instance_id = %id,
                step = %approved,
                cascaded = ?report.cascaded,
                "approval recorded"
            );
            Ok(())
        })
    }

    pub fn auto_process(
        &self,
        id: InstanceId,
        now: i64,
    ) -> Result<WorkflowInstance, WorkflowError> {
        self.apply(id, "auto_process", |instance| {
            let advances = instance.auto_process(now)?;
            debug!(instance_id = %id, advances, "auto-process finished");
            Ok(())
        })
    }

    pub fn cancel(
        &self,
        id: InstanceId,
        now: i64,
        reason: Option<&str>,
    ) -> Result<WorkflowInstance, WorkflowError> {
        self.apply(id, "cancel", |instance| {
            instance.cancel(now, reason).map(|_| ())
        })
    }

    pub fn complete(
        &self,
        id: InstanceId,
        now: i64,
        reason: Option<&str>,
    ) -> Result<WorkflowInstance, WorkflowError> {
        self.apply(id, "complete", |instance| {
            instance.force_complete(now, reason)
        })
    }

    fn apply<F>(
        &self,
        id: InstanceId,
        operation: &'static str,
        mut transition: F,
    ) -> Result<WorkflowInstance, WorkflowError>
    where
        F: FnMut(&mut WorkflowInstance) -> Result<(), WorkflowError>,
    {
        let result = self.locks.with_lock(id, || -> Result<_, WorkflowError> {
            self.store
                .update(id, &mut transition)?
                .ok_or_else(|| WorkflowError::InstanceNotFound {
                    instance_id: id.to_string(),
                })
        });

        match &result {
            Ok(instance) => info!(
                instance_id = %id,
                operation,
                template = instance.template_name(),
                step = instance.current_step(),
                status = %instance.status(),
                "workflow transition applied"
            ),
            Err(err) if err.is_infrastructure() => warn!(
                instance_id = %id,
                operation,
                error = %err,
                "workflow transition failed"
            ),
            Err(err) => debug!(
                instance_id = %id,
                operation,
                error = %err,
                "workflow transition rejected"
            ),
        }
        result
    }
}
