use crate::config::{load_global_settings, ConfigError, Settings, StoreBackend};
use crate::runtime::{bootstrap_state_root, init_logging, StatePaths};
use crate::store::{
    FileInstanceStore, InstanceStore, MemoryInstanceStore, SqliteInstanceStore, TemplateCatalog,
};
use crate::workflow::{WorkflowEngine, WorkflowInstance};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::{BTreeMap, BTreeSet};

pub use crate::runtime::now_secs;

pub type CliEngine = WorkflowEngine<Box<dyn InstanceStore>, TemplateCatalog>;

pub fn map_config_err(err: ConfigError) -> String {
    err.to_string()
}

pub fn load_settings() -> Result<Settings, String> {
    load_global_settings().map_err(map_config_err)
}

pub fn state_paths(settings: &Settings) -> Result<StatePaths, String> {
    let root = settings.resolve_state_root().map_err(map_config_err)?;
    Ok(StatePaths::new(root))
}

pub fn template_catalog(settings: &Settings) -> Result<TemplateCatalog, String> {
    let path = settings.resolve_templates_file().map_err(map_config_err)?;
    Ok(TemplateCatalog::new(path))
}

pub fn open_instance_store(
    settings: &Settings,
    paths: &StatePaths,
) -> Result<Box<dyn InstanceStore>, String> {
    let store: Box<dyn InstanceStore> = match settings.store {
        StoreBackend::File => Box::new(FileInstanceStore::new(paths.root.clone())),
        StoreBackend::Sqlite => {
            Box::new(SqliteInstanceStore::open(&paths.sqlite_path()).map_err(|e| e.to_string())?)
        }
        StoreBackend::Memory => Box::new(MemoryInstanceStore::new()),
    };
    Ok(store)
}

/// Creates the state directories and installs the log subscriber.
pub fn start_runtime(settings: &Settings) -> Result<StatePaths, String> {
    let paths = state_paths(settings)?;
    bootstrap_state_root(&paths).map_err(|e| e.to_string())?;
    init_logging(&paths, &settings.logging).map_err(|e| e.to_string())?;
    Ok(paths)
}

pub fn open_catalog() -> Result<TemplateCatalog, String> {
    let settings = load_settings()?;
    start_runtime(&settings)?;
    template_catalog(&settings)
}

/// Loads settings, installs logging and wires the engine to the configured backend.
pub fn open_engine() -> Result<CliEngine, String> {
    let settings = load_settings()?;
    let paths = start_runtime(&settings)?;
    let store = open_instance_store(&settings, &paths)?;
    Ok(WorkflowEngine::new(store, template_catalog(&settings)?))
}

pub fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| secs.to_string())
}

pub fn render_instance(instance: &WorkflowInstance) -> String {
    let mut lines = vec![
        format!("instance_id={}", instance.label()),
        format!("template={}", instance.template_name()),
        format!("status={}", instance.status()),
        format!("current_step={}", instance.current_step()),
        format!(
            "position={}/{}",
            instance.current_index() + 1,
            instance.steps().len()
        ),
        format!("started_at={}", format_timestamp(instance.started_at())),
        format!("updated_at={}", format_timestamp(instance.updated_at())),
        format!(
            "completed_at={}",
            instance
                .completed_at()
                .map(format_timestamp)
                .unwrap_or_else(|| "none".to_string())
        ),
    ];
    if let Some(reason) = instance.terminal_reason() {
        lines.push(format!("reason={reason}"));
    }
    lines.join("\n")
}

/// Positional arguments plus `--flag value` options and bare `--switch`es.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub positionals: Vec<String>,
    pub options: BTreeMap<String, String>,
    pub switches: BTreeSet<String>,
}

impl ParsedArgs {
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub fn has_switch(&self, name: &str) -> bool {
        self.switches.contains(name)
    }
}

pub fn parse_args(
    args: &[String],
    value_flags: &[&str],
    switch_flags: &[&str],
) -> Result<ParsedArgs, String> {
    let mut parsed = ParsedArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let Some(flag) = arg.strip_prefix("--") else {
            parsed.positionals.push(arg.clone());
            continue;
        };
        if switch_flags.contains(&flag) {
            parsed.switches.insert(flag.to_string());
        } else if value_flags.contains(&flag) {
            let value = iter
                .next()
                .ok_or_else(|| format!("option `--{flag}` requires a value"))?;
            if parsed.options.insert(flag.to_string(), value.clone()).is_some() {
                return Err(format!("option `--{flag}` given more than once"));
            }
        } else {
            return Err(format!("unknown option `{arg}`"));
        }
    }
    Ok(parsed)
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_args_separates_positionals_options_and_switches() {
        let parsed = parse_args(
            &args(&["intake", "--steps", "a,b", "--infer"]),
            &["steps"],
            &["infer"],
        )
        .expect("parse");
        assert_eq!(parsed.positionals, vec!["intake"]);
        assert_eq!(parsed.option("steps"), Some("a,b"));
        assert!(parsed.has_switch("infer"));
    }

    #[test]
    fn parse_args_rejects_unknown_and_valueless_options() {
        assert!(parse_args(&args(&["--bogus"]), &["steps"], &[])
            .expect_err("unknown")
            .contains("unknown option"));
        assert!(parse_args(&args(&["--steps"]), &["steps"], &[])
            .expect_err("missing value")
            .contains("requires a value"));
    }

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(
            split_list(" Draft , Manager Approval,,Publish "),
            vec!["Draft", "Manager Approval", "Publish"]
        );
    }

    #[test]
    fn timestamps_render_as_utc_rfc3339() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14T22:13:20Z");
    }
}
