use crate::app::command_support::{open_catalog, parse_args, split_list};
use crate::store::TemplateSource;
use crate::workflow::{template_with_inferred_gates, WorkflowTemplate};
use tracing::info;

const TEMPLATE_USAGE: &str = "usage: template <list|show|add|remove> ...";
const ADD_USAGE: &str =
    "usage: template add <name> --steps a,b[,c] [--approval x] [--automation y] [--infer]";

pub fn cmd_template(args: &[String]) -> Result<String, String> {
    if args.is_empty() {
        return Err(TEMPLATE_USAGE.to_string());
    }

    match args[0].as_str() {
        "list" => {
            if args.len() != 1 {
                return Err("usage: template list".to_string());
            }
            let catalog = open_catalog()?;
            let templates = catalog.list().map_err(|e| e.to_string())?;
            if templates.is_empty() {
                return Ok("no templates defined".to_string());
            }
            Ok(templates
                .iter()
                .map(|t| format!("{} steps={}", t.name(), t.steps().len()))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        "show" => {
            if args.len() != 2 {
                return Err("usage: template show <name>".to_string());
            }
            let catalog = open_catalog()?;
            let template = catalog
                .find_by_name(&args[1])
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("template `{}` is not defined", args[1]))?;
            serde_yaml::to_string(&template).map_err(|e| format!("failed to encode template: {e}"))
        }
        "add" => {
            let parsed = parse_args(&args[1..], &["steps", "approval", "automation"], &["infer"])?;
            if parsed.positionals.len() != 1 {
                return Err(ADD_USAGE.to_string());
            }
            let name = &parsed.positionals[0];
            let steps = split_list(parsed.option("steps").ok_or(ADD_USAGE)?);
            let approval = parsed.option("approval").map(split_list);
            let automation = parsed.option("automation").map(split_list);

            let template = if parsed.has_switch("infer") {
                if approval.is_some() || automation.is_some() {
                    return Err(
                        "`--infer` cannot be combined with `--approval` or `--automation`"
                            .to_string(),
                    );
                }
                template_with_inferred_gates(name, steps)
            } else {
                WorkflowTemplate::new(
                    name.as_str(),
                    steps,
                    approval.unwrap_or_default(),
                    automation.unwrap_or_default(),
                )
            }
            .map_err(|e| e.to_string())?;

            let catalog = open_catalog()?;
            let summary = render_template_summary(&template);
            let previous = catalog.define(template).map_err(|e| e.to_string())?;
            info!(template = %name, replaced = previous.is_some(), "template defined");
            Ok(format!(
                "template defined\n{summary}\nreplaced={}",
                previous.is_some()
            ))
        }
        "remove" => {
            if args.len() != 2 {
                return Err("usage: template remove <name>".to_string());
            }
            let catalog = open_catalog()?;
            if !catalog.remove(&args[1]).map_err(|e| e.to_string())? {
                return Err(format!("template `{}` is not defined", args[1]));
            }
            info!(template = %args[1], "template removed");
            Ok(format!("template removed\ntemplate={}", args[1]))
        }
        other => Err(format!("unknown template command `{other}`\n{TEMPLATE_USAGE}")),
    }
}

fn render_template_summary(template: &WorkflowTemplate) -> String {
    let join = |set: &std::collections::BTreeSet<String>| {
        template
            .steps()
            .iter()
            .filter(|step| set.contains(*step))
            .cloned()
            .collect::<Vec<_>>()
            .join(",")
    };
    format!(
        "template={}\nsteps={}\napproval_steps={}\nautomation_steps={}",
        template.name(),
        template.steps().join(","),
        join(template.approval_steps()),
        join(template.automation_steps())
    )
}
