use crate::app::command_support::{map_config_err, parse_args, start_runtime};
use crate::config::{default_global_config_path, save_settings, Settings, StoreBackend};
use std::path::PathBuf;
use tracing::info;

pub fn cmd_setup(args: &[String]) -> Result<String, String> {
    let parsed = parse_args(args, &["store", "state-root"], &[])?;
    if !parsed.positionals.is_empty() {
        return Err(
            "usage: setup [--store file|sqlite|memory] [--state-root <path>]".to_string(),
        );
    }

    let config_path = default_global_config_path().map_err(map_config_err)?;
    let mut settings = if config_path.exists() {
        Settings::from_path(&config_path).map_err(map_config_err)?
    } else {
        Settings::default()
    };
    if let Some(raw) = parsed.option("store") {
        settings.store = StoreBackend::parse(raw)?;
    }
    if let Some(raw) = parsed.option("state-root") {
        settings.state_root = Some(PathBuf::from(raw));
    }

    let saved = save_settings(&settings).map_err(map_config_err)?;
    let paths = start_runtime(&settings)?;
    let templates_file = settings
        .resolve_templates_file()
        .map_err(map_config_err)?;
    info!(config = %saved.display(), store = %settings.store, "settings written");

    Ok(format!(
        "setup complete\nconfig={}\nstate_root={}\nstore={}\ntemplates_file={}",
        saved.display(),
        paths.root.display(),
        settings.store,
        templates_file.display()
    ))
}
