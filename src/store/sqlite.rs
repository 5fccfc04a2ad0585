use super::{transitioned, verified, InstanceStore, StoreError, Transition};
use crate::shared::InstanceId;
use crate::workflow::{WorkflowError, WorkflowInstance};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// SQLite-backed instance store.
///
/// Each row keeps the full instance document alongside a few scalar columns
/// for listing and inspection; the document is the source of truth. Updates
/// read and write inside one `BEGIN IMMEDIATE` transaction, which SQLite
/// serializes across connections and processes.
#[derive(Debug, Clone)]
pub struct SqliteInstanceStore {
    db_path: PathBuf,
}

impl SqliteInstanceStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::io(parent, source))?;
        }
        let store = Self {
            db_path: db_path.to_path_buf(),
        };
        store.ensure_schema()?;
        debug!(path = %store.db_path.display(), "sqlite instance store ready");
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        let connection = self.connect()?;
        connection
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS workflow_instances (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    template_name TEXT NOT NULL,
                    status TEXT NOT NULL,
                    current_step TEXT NOT NULL,
                    started_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    completed_at INTEGER,
                    document TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_workflow_instances_template_status
                    ON workflow_instances(template_name, status);
                ",
            )
            .map_err(|source| self.sql_error(source))
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let connection =
            Connection::open(&self.db_path).map_err(|source| self.sql_error(source))?;
        connection
            .execute_batch("PRAGMA busy_timeout=5000; PRAGMA journal_mode=WAL;")
            .map_err(|source| self.sql_error(source))?;
        Ok(connection)
    }

    fn sql_error(&self, source: rusqlite::Error) -> StoreError {
        StoreError::sqlite(&self.db_path, source)
    }

    fn decode(&self, id: i64, document: &str) -> Result<WorkflowInstance, StoreError> {
        let record = format!("{}#{id}", self.db_path.display());
        let instance: WorkflowInstance =
            serde_json::from_str(document).map_err(|source| StoreError::Json {
                path: record.clone(),
                source,
            })?;
        verified(record, instance)
    }

    fn load_document(
        &self,
        connection: &Connection,
        rowid: i64,
    ) -> Result<Option<WorkflowInstance>, StoreError> {
        let document = connection
            .query_row(
                "SELECT document FROM workflow_instances WHERE id = ?1",
                params![rowid],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|source| self.sql_error(source))?;
        match document {
            Some(document) if !document.is_empty() => self.decode(rowid, &document).map(Some),
            _ => Ok(None),
        }
    }

    fn write_row(
        &self,
        connection: &Connection,
        instance: &WorkflowInstance,
        id: InstanceId,
    ) -> Result<(), StoreError> {
        let document = serde_json::to_string(instance).map_err(|source| StoreError::Json {
            path: format!("{}#{id}", self.db_path.display()),
            source,
        })?;
        connection
            .execute(
                "
                INSERT INTO workflow_instances (
                    id, template_name, status, current_step, started_at, updated_at,
                    completed_at, document
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    status = excluded.status,
                    current_step = excluded.current_step,
                    updated_at = excluded.updated_at,
                    completed_at = excluded.completed_at,
                    document = excluded.document
                ",
                params![
                    rowid_for(id)?,
                    instance.template_name(),
                    instance.status().as_str(),
                    instance.current_step(),
                    instance.started_at(),
                    instance.updated_at(),
                    instance.completed_at(),
                    document,
                ],
            )
            .map_err(|source| self.sql_error(source))?;
        Ok(())
    }
}

fn rowid_for(id: InstanceId) -> Result<i64, StoreError> {
    i64::try_from(id.get()).map_err(|_| StoreError::Corrupt {
        record: id.to_string(),
        reason: "instance id exceeds sqlite integer range".to_string(),
    })
}

impl InstanceStore for SqliteInstanceStore {
    fn save(&self, mut instance: WorkflowInstance) -> Result<WorkflowInstance, StoreError> {
        let mut connection = self.connect()?;
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|source| self.sql_error(source))?;

        let id = match instance.id() {
            Some(id) => id,
            None => {
                tx.execute(
                    "
                    INSERT INTO workflow_instances (
                        template_name, status, current_step, started_at, updated_at, document
                    ) VALUES (?1, ?2, ?3, ?4, ?5, '')
                    ",
                    params![
                        instance.template_name(),
                        instance.status().as_str(),
                        instance.current_step(),
                        instance.started_at(),
                        instance.updated_at(),
                    ],
                )
                .map_err(|source| self.sql_error(source))?;
                let rowid = u64::try_from(tx.last_insert_rowid()).map_err(|_| {
                    StoreError::Corrupt {
                        record: self.db_path.display().to_string(),
                        reason: "sqlite assigned a negative instance id".to_string(),
                    }
                })?;
                let id = InstanceId::new(rowid);
                instance.assign_id(id);
                id
            }
        };

        self.write_row(&tx, &instance, id)?;
        tx.commit().map_err(|source| self.sql_error(source))?;
        Ok(instance)
    }

    fn update(
        &self,
        id: InstanceId,
        transition: &mut Transition<'_>,
    ) -> Result<Option<WorkflowInstance>, WorkflowError> {
        let Ok(rowid) = i64::try_from(id.get()) else {
            return Ok(None);
        };
        let mut connection = self.connect()?;
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|source| self.sql_error(source))?;

        let Some(current) = self.load_document(&tx, rowid)? else {
            return Ok(None);
        };
        let Some(next) = transitioned(&current, transition)? else {
            return Ok(Some(current));
        };
        self.write_row(&tx, &next, id)?;
        tx.commit().map_err(|source| self.sql_error(source))?;
        Ok(Some(next))
    }

    fn find_by_id(&self, id: InstanceId) -> Result<Option<WorkflowInstance>, StoreError> {
        let Ok(rowid) = i64::try_from(id.get()) else {
            return Ok(None);
        };
        let connection = self.connect()?;
        self.load_document(&connection, rowid)
    }

    fn find_all(&self) -> Result<Vec<WorkflowInstance>, StoreError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare("SELECT id, document FROM workflow_instances ORDER BY id ASC")
            .map_err(|source| self.sql_error(source))?;
        let rows = statement
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .map_err(|source| self.sql_error(source))?;

        let mut instances = Vec::new();
        for row in rows {
            let (id, document) = row.map_err(|source| self.sql_error(source))?;
            if document.is_empty() {
                continue;
            }
            instances.push(self.decode(id, &document)?);
        }
        Ok(instances)
    }
}
