//! Persistence collaborators consumed by the workflow engine.
//!
//! The engine only depends on [`InstanceStore`] and [`TemplateSource`]; the
//! concrete backends here are reference implementations selected by settings.

pub mod catalog;
pub mod file;
pub mod memory;
pub mod sqlite;

use crate::shared::InstanceId;
use crate::workflow::{WorkflowError, WorkflowInstance, WorkflowTemplate};
use std::path::Path;

pub use catalog::TemplateCatalog;
pub use file::FileInstanceStore;
pub use memory::{MemoryInstanceStore, MemoryTemplateSource};
pub use sqlite::SqliteInstanceStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("yaml error at {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("sqlite error at {path}: {source}")]
    Sqlite {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("stored record {record} is corrupt: {reason}")]
    Corrupt { record: String, reason: String },
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn yaml(path: &Path, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn sqlite(path: &Path, source: rusqlite::Error) -> Self {
        Self::Sqlite {
            path: path.display().to_string(),
            source,
        }
    }
}

/// One read-modify-write step over a stored instance.
pub type Transition<'a> = dyn FnMut(&mut WorkflowInstance) -> Result<(), WorkflowError> + 'a;

/// Durable home of workflow instances.
pub trait InstanceStore {
    /// Persists `instance`, assigning an identity on first save.
    fn save(&self, instance: WorkflowInstance) -> Result<WorkflowInstance, StoreError>;

    /// Loads `id`, applies `transition` and saves the result while every other
    /// writer of `id`, in this process or another, is kept out.
    ///
    /// Returns `Ok(None)` when no such instance exists. A rejected transition
    /// leaves the record untouched, and a transition that changes nothing is
    /// not written.
    fn update(
        &self,
        id: InstanceId,
        transition: &mut Transition<'_>,
    ) -> Result<Option<WorkflowInstance>, WorkflowError>;

    fn find_by_id(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, StoreError>;

    /// All instances ordered by id.
    fn find_all(&self) -> Result<Vec<WorkflowInstance>, StoreError>;
}

pub trait TemplateSource {
    fn find_by_name(&self, name: &str) -> Result<Option<WorkflowTemplate>, StoreError>;
}

impl<S: InstanceStore + ?Sized> InstanceStore for Box<S> {
    fn save(&self, instance: WorkflowInstance) -> Result<WorkflowInstance, StoreError> {
        (**self).save(instance)
    }

    fn update(
        &self,
        id: InstanceId,
        transition: &mut Transition<'_>,
    ) -> Result<Option<WorkflowInstance>, WorkflowError> {
        (**self).update(id, transition)
    }

    fn find_by_id(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, StoreError> {
        (**self).find_by_id(id)
    }

    fn find_all(&self) -> Result<Vec<WorkflowInstance>, StoreError> {
        (**self).find_all()
    }
}

impl<T: TemplateSource + ?Sized> TemplateSource for Box<T> {
    fn find_by_name(&self, name: &str) -> Result<Option<WorkflowTemplate>, StoreError> {
        (**self).find_by_name(name)
    }
}

pub(crate) fn verified(
    record: impl std::fmt::Display,
    instance: WorkflowInstance,
) -> Result<WorkflowInstance, StoreError> {
    instance
        .check_invariants()
        .map_err(|reason| StoreError::Corrupt {
            record: record.to_string(),
            reason,
        })?;
    Ok(instance)
}

/// Applies `transition` to a copy of `current`; `None` means nothing changed.
pub(crate) fn transitioned(
    current: &WorkflowInstance,
    transition: &mut Transition<'_>,
) -> Result<Option<WorkflowInstance>, WorkflowError> {
    let mut next = current.clone();
    transition(&mut next)?;
    Ok((next != *current).then_some(next))
}
