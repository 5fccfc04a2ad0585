pub mod error;
pub mod load;
pub mod paths;
pub mod save;
pub mod settings;

pub use error::ConfigError;
pub use load::load_global_settings;
pub use paths::{
    default_global_config_path, default_state_root, DEFAULT_TEMPLATES_FILE_NAME,
    GLOBAL_SETTINGS_FILE_NAME, GLOBAL_STATE_DIR,
};
pub use save::save_settings;
pub use settings::{LogFormat, LogLevel, LoggingConfig, Settings, StoreBackend};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct HomeGuard {
        old_home: Option<std::ffi::OsString>,
    }

    impl HomeGuard {
        fn set(home: &Path) -> Self {
            let old_home = std::env::var_os("HOME");
            std::env::set_var("HOME", home);
            Self { old_home }
        }
    }

    impl Drop for HomeGuard {
        fn drop(&mut self) {
            if let Some(old_home) = self.old_home.take() {
                std::env::set_var("HOME", old_home);
            } else {
                std::env::remove_var("HOME");
            }
        }
    }

    #[test]
    fn empty_settings_use_defaults() {
        let settings: Settings = serde_yaml::from_str("{}").expect("parse settings");
        assert_eq!(settings.store, StoreBackend::File);
        assert_eq!(settings.logging.level, LogLevel::Info);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert!(settings.state_root.is_none());
        settings.validate().expect("defaults are valid");
    }

    #[test]
    fn settings_parse_all_fields() {
        let settings: Settings = serde_yaml::from_str(
            r#"
state_root: /srv/docflow
store: sqlite
templates_file: /etc/docflow/templates.yaml
logging:
  level: debug
  format: text
"#,
        )
        .expect("parse settings");
        assert_eq!(settings.store, StoreBackend::Sqlite);
        assert_eq!(settings.logging.level, LogLevel::Debug);
        assert_eq!(settings.logging.format, LogFormat::Text);
        assert_eq!(
            settings.resolve_templates_file().expect("templates file"),
            PathBuf::from("/etc/docflow/templates.yaml")
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_yaml::from_str::<Settings>("store: file\nworkers: 4\n")
            .expect_err("unknown field must fail");
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn unknown_store_backend_is_rejected() {
        let err = serde_yaml::from_str::<Settings>("store: postgres\n")
            .expect_err("unknown backend must fail");
        assert!(err.to_string().contains("store"));
        assert!(StoreBackend::parse("postgres").is_err());
        assert_eq!(StoreBackend::parse(" SQLite ").expect("parse"), StoreBackend::Sqlite);
    }

    #[test]
    fn relative_state_root_fails_validation() {
        let settings: Settings =
            serde_yaml::from_str("state_root: relative/dir\n").expect("parse settings");
        match settings.validate().expect_err("validation should fail") {
            ConfigError::Invalid(message) => assert!(message.contains("state_root")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn templates_file_defaults_under_state_root() {
        let settings: Settings =
            serde_yaml::from_str("state_root: /srv/docflow\n").expect("parse settings");
        assert_eq!(
            settings.resolve_templates_file().expect("templates file"),
            PathBuf::from("/srv/docflow/templates.yaml")
        );
    }

    #[test]
    fn default_global_config_path_targets_home_docflow_config_yaml() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let temp = tempdir().expect("temp dir");
        let _home = HomeGuard::set(temp.path());

        let path = default_global_config_path().expect("resolve global config path");
        assert_eq!(path, temp.path().join(".docflow/config.yaml"));
    }

    #[test]
    fn load_global_settings_requires_setup() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let temp = tempdir().expect("temp dir");
        let _home = HomeGuard::set(temp.path());

        match load_global_settings().expect_err("missing config must fail") {
            ConfigError::NotInitialized { path } => assert!(path.ends_with("config.yaml")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn saved_settings_load_back() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let temp = tempdir().expect("temp dir");
        let _home = HomeGuard::set(temp.path());

        let settings = Settings {
            state_root: Some(temp.path().join("state")),
            store: StoreBackend::Memory,
            ..Settings::default()
        };
        let path = save_settings(&settings).expect("save settings");
        assert!(fs::read_to_string(&path)
            .expect("read saved settings")
            .contains("store: memory"));

        let loaded = load_global_settings().expect("load global settings");
        assert_eq!(loaded, settings);
    }
}
