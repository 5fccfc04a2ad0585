use super::{transitioned, InstanceStore, StoreError, TemplateSource, Transition};
use crate::shared::InstanceId;
use crate::workflow::{WorkflowError, WorkflowInstance, WorkflowTemplate};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryInstances {
    next_id: u64,
    records: BTreeMap<InstanceId, WorkflowInstance>,
}

#[derive(Debug, Default)]
pub struct MemoryInstanceStore {
    inner: Mutex<MemoryInstances>,
}

impl MemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInstances>, StoreError> {
        self.inner
            .lock()
            .map_err(|err| StoreError::Poisoned(err.to_string()))
    }
}

impl MemoryInstances {
    fn store(&mut self, mut instance: WorkflowInstance) -> WorkflowInstance {
        let id = match instance.id() {
            Some(id) => id,
            None => {
                self.next_id += 1;
                let id = InstanceId::new(self.next_id);
                instance.assign_id(id);
                id
            }
        };
        self.records.insert(id, instance.clone());
        instance
    }
}

impl InstanceStore for MemoryInstanceStore {
    fn save(&self, instance: WorkflowInstance) -> Result<WorkflowInstance, StoreError> {
        Ok(self.lock()?.store(instance))
    }

    fn update(
        &self,
        id: InstanceId,
        transition: &mut Transition<'_>,
    ) -> Result<Option<WorkflowInstance>, WorkflowError> {
        let mut inner = self.lock()?;
        let Some(current) = inner.records.get(&id).cloned() else {
            return Ok(None);
        };
        match transitioned(&current, transition)? {
            Some(next) => Ok(Some(inner.store(next))),
            None => Ok(Some(current)),
        }
    }

    fn find_by_id(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, StoreError> {
        Ok(self.lock()?.records.get(&id).cloned())
    }

    fn find_all(&self) -> Result<Vec<WorkflowInstance>, StoreError> {
        Ok(self.lock()?.records.values().cloned().collect())
    }
}

/// In-process template registry, injected wherever a [`TemplateSource`] is needed.
#[derive(Debug, Default)]
pub struct MemoryTemplateSource {
    templates: Mutex<BTreeMap<String, WorkflowTemplate>>,
}

impl MemoryTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: impl IntoIterator<Item = WorkflowTemplate>) -> Self {
        let source = Self::new();
        if let Ok(mut map) = source.templates.lock() {
            for template in templates {
                map.insert(template.name().to_string(), template);
            }
        }
        source
    }

    /// Registers or redefines a template. Returns the replaced definition.
    pub fn define(&self, template: WorkflowTemplate) -> Result<Option<WorkflowTemplate>, StoreError> {
        let mut map = self
            .templates
            .lock()
            .map_err(|err| StoreError::Poisoned(err.to_string()))?;
        Ok(map.insert(template.name().to_string(), template))
    }
}

impl TemplateSource for MemoryTemplateSource {
    fn find_by_name(&self, name: &str) -> Result<Option<WorkflowTemplate>, StoreError> {
        let map = self
            .templates
            .lock()
            .map_err(|err| StoreError::Poisoned(err.to_string()))?;
        Ok(map.get(name).cloned())
    }
}
