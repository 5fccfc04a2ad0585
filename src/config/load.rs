use super::{default_global_config_path, ConfigError, Settings};

/// Loads and validates `$HOME/.docflow/config.yaml`.
pub fn load_global_settings() -> Result<Settings, ConfigError> {
    let path = default_global_config_path()?;
    if !path.exists() {
        return Err(ConfigError::NotInitialized {
            path: path.display().to_string(),
        });
    }
    let settings = Settings::from_path(&path)?;
    settings.validate()?;
    Ok(settings)
}
