pub mod fs_atomic;
pub mod ids;
pub mod lock_file;

pub use fs_atomic::{atomic_write_file, read_optional};
pub use ids::{validate_identifier_value, InstanceId, TemplateName};
pub use lock_file::{LockFile, LOCK_WAIT_TIMEOUT};
