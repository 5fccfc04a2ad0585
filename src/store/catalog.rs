use super::{StoreError, TemplateSource};
use crate::shared::{atomic_write_file, read_optional, LockFile, LOCK_WAIT_TIMEOUT};
use crate::workflow::WorkflowTemplate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    templates: Vec<WorkflowTemplate>,
}

/// YAML file of template definitions, read on every lookup so administrative
/// edits are visible to the next `start`. Edits hold `<file>.lock` from read
/// to rewrite.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    path: PathBuf,
}

impl TemplateCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Result<Vec<WorkflowTemplate>, StoreError> {
        Ok(self.load()?.templates)
    }

    /// Creates or redefines a template; returns the definition it replaced.
    pub fn define(
        &self,
        template: WorkflowTemplate,
    ) -> Result<Option<WorkflowTemplate>, StoreError> {
        let _lock = self.lock()?;
        let mut file = self.load()?;
        let previous = match file
            .templates
            .iter_mut()
            .find(|existing| existing.name() == template.name())
        {
            Some(existing) => Some(std::mem::replace(existing, template)),
            None => {
                file.templates.push(template);
                None
            }
        };
        self.persist(&file)?;
        Ok(previous)
    }

    pub fn remove(&self, name: &str) -> Result<bool, StoreError> {
        let _lock = self.lock()?;
        let mut file = self.load()?;
        let before = file.templates.len();
        file.templates
            .retain(|template| template.name().as_str() != name);
        if file.templates.len() == before {
            return Ok(false);
        }
        self.persist(&file)?;
        Ok(true)
    }

    fn lock(&self) -> Result<LockFile, StoreError> {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".lock");
        let path = PathBuf::from(name);
        LockFile::acquire(&path, LOCK_WAIT_TIMEOUT).map_err(|e| StoreError::io(&path, e))
    }

    fn load(&self) -> Result<CatalogFile, StoreError> {
        let Some(raw) = read_optional(&self.path).map_err(|e| StoreError::io(&self.path, e))?
        else {
            return Ok(CatalogFile::default());
        };
        if raw.trim().is_empty() {
            return Ok(CatalogFile::default());
        }
        let file: CatalogFile =
            serde_yaml::from_str(&raw).map_err(|e| StoreError::yaml(&self.path, e))?;

        let mut names = BTreeSet::new();
        for template in &file.templates {
            if !names.insert(template.name().as_str()) {
                return Err(StoreError::Corrupt {
                    record: self.path.display().to_string(),
                    reason: format!("template `{}` is defined more than once", template.name()),
                });
            }
        }
        Ok(file)
    }

    fn persist(&self, file: &CatalogFile) -> Result<(), StoreError> {
        let body = serde_yaml::to_string(file).map_err(|e| StoreError::yaml(&self.path, e))?;
        atomic_write_file(&self.path, body.as_bytes())
            .map_err(|e| StoreError::io(&self.path, e))?;
        debug!(
            path = %self.path.display(),
            templates = file.templates.len(),
            "template catalog written"
        );
        Ok(())
    }
}

impl TemplateSource for TemplateCatalog {
    fn find_by_name(&self, name: &str) -> Result<Option<WorkflowTemplate>, StoreError> {
        Ok(self
            .load()?
            .templates
            .into_iter()
            .find(|template| template.name().as_str() == name))
    }
}
