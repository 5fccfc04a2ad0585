use super::{transitioned, verified, InstanceStore, StoreError, Transition};
use crate::shared::{atomic_write_file, read_optional, InstanceId, LockFile, LOCK_WAIT_TIMEOUT};
use crate::workflow::{WorkflowError, WorkflowInstance};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_ID_RESERVATION_ATTEMPTS: usize = 64;

/// One pretty-printed JSON document per instance under `<state_root>/instances`.
///
/// Identity is reserved by exclusively creating `<id>.json`; a zero-length
/// document is a reservation whose first write has not landed yet and is
/// treated as absent. Updates hold `<id>.lock` for the whole
/// load-transition-save so concurrent processes cannot lose each other's writes.
#[derive(Debug, Clone)]
pub struct FileInstanceStore {
    state_root: PathBuf,
}

impl FileInstanceStore {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: state_root.into(),
        }
    }

    pub fn state_root(&self) -> &Path {
        &self.state_root
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.state_root.join("instances")
    }

    fn instance_path(&self, id: InstanceId) -> PathBuf {
        self.instances_dir().join(format!("{id}.json"))
    }

    fn lock_path(&self, id: InstanceId) -> PathBuf {
        self.instances_dir().join(format!("{id}.lock"))
    }

    fn next_id_path(&self) -> PathBuf {
        self.instances_dir().join("next_id")
    }

    fn reserve_id(&self) -> Result<InstanceId, StoreError> {
        let dir = self.instances_dir();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let hint_path = self.next_id_path();
        let mut candidate = read_optional(&hint_path)
            .map_err(|e| StoreError::io(&hint_path, e))?
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(1)
            .max(1);

        for _ in 0..MAX_ID_RESERVATION_ATTEMPTS {
            let id = InstanceId::new(candidate);
            let path = self.instance_path(id);
            match fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&path)
            {
                Ok(_) => {
                    atomic_write_file(&hint_path, (candidate + 1).to_string().as_bytes())
                        .map_err(|e| StoreError::io(&hint_path, e))?;
                    debug!(instance_id = %id, path = %path.display(), "reserved instance id");
                    return Ok(id);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => candidate += 1,
                Err(err) => return Err(StoreError::io(&path, err)),
            }
        }
        Err(StoreError::Corrupt {
            record: hint_path.display().to_string(),
            reason: format!(
                "failed to reserve an instance id after {MAX_ID_RESERVATION_ATTEMPTS} attempts"
            ),
        })
    }

    fn write(&self, id: InstanceId, instance: &WorkflowInstance) -> Result<(), StoreError> {
        let path = self.instance_path(id);
        let body = serde_json::to_vec_pretty(instance).map_err(|e| StoreError::json(&path, e))?;
        atomic_write_file(&path, &body).map_err(|e| StoreError::io(&path, e))
    }

    fn load_path(&self, path: &Path) -> Result<Option<WorkflowInstance>, StoreError> {
        let Some(raw) = read_optional(path).map_err(|e| StoreError::io(path, e))? else {
            return Ok(None);
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let instance: WorkflowInstance =
            serde_json::from_str(&raw).map_err(|e| StoreError::json(path, e))?;
        verified(path.display(), instance).map(Some)
    }
}

impl InstanceStore for FileInstanceStore {
    fn save(&self, mut instance: WorkflowInstance) -> Result<WorkflowInstance, StoreError> {
        let Some(id) = instance.id() else {
            let id = self.reserve_id()?;
            instance.assign_id(id);
            self.write(id, &instance)?;
            return Ok(instance);
        };
        let lock_path = self.lock_path(id);
        let _lock = LockFile::acquire(&lock_path, LOCK_WAIT_TIMEOUT)
            .map_err(|e| StoreError::io(&lock_path, e))?;
        self.write(id, &instance)?;
        Ok(instance)
    }

    fn update(
        &self,
        id: InstanceId,
        transition: &mut Transition<'_>,
    ) -> Result<Option<WorkflowInstance>, WorkflowError> {
        let lock_path = self.lock_path(id);
        let _lock = LockFile::acquire(&lock_path, LOCK_WAIT_TIMEOUT)
            .map_err(|e| StoreError::io(&lock_path, e))?;

        let Some(current) = self.find_by_id(id)? else {
            return Ok(None);
        };
        match transitioned(&current, transition)? {
            Some(next) => {
                self.write(id, &next)?;
                Ok(Some(next))
            }
            None => Ok(Some(current)),
        }
    }

    fn find_by_id(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, StoreError> {
        self.load_path(&self.instance_path(id))
    }

    fn find_all(&self) -> Result<Vec<WorkflowInstance>, StoreError> {
        let dir = self.instances_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::io(&dir, source)),
        };

        let mut instances = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::io(&dir, source))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|value| value.to_str()) != Some("json") {
                continue;
            }
            let is_record = path
                .file_stem()
                .and_then(|value| value.to_str())
                .is_some_and(|stem| InstanceId::parse(stem).is_ok());
            if !is_record {
                continue;
            }
            if let Some(instance) = self.load_path(&path)? {
                instances.push(instance);
            }
        }
        instances.sort_by_key(|instance| instance.id());
        Ok(instances)
    }
}
