use crate::app::command_support::{now_secs, open_engine, parse_args, render_instance};
use crate::shared::InstanceId;

const INSTANCE_USAGE: &str =
    "usage: instance <start|advance|approve|auto-process|cancel|complete|show|list> ...";

pub fn cmd_instance(args: &[String]) -> Result<String, String> {
    if args.is_empty() {
        return Err(INSTANCE_USAGE.to_string());
    }

    match args[0].as_str() {
        "start" => {
            if args.len() != 2 {
                return Err("usage: instance start <template>".to_string());
            }
            let engine = open_engine()?;
            let instance = engine
                .start(&args[1], now_secs())
                .map_err(|e| e.to_string())?;
            Ok(format!("instance started\n{}", render_instance(&instance)))
        }
        "advance" => {
            let id = single_id(args, "advance")?;
            let instance = open_engine()?
                .advance(id, now_secs())
                .map_err(|e| e.to_string())?;
            Ok(format!("instance advanced\n{}", render_instance(&instance)))
        }
        "approve" => {
            let id = single_id(args, "approve")?;
            let instance = open_engine()?
                .approve_step(id, now_secs())
                .map_err(|e| e.to_string())?;
            Ok(format!("step approved\n{}", render_instance(&instance)))
        }
        "auto-process" => {
            let id = single_id(args, "auto-process")?;
            let instance = open_engine()?
                .auto_process(id, now_secs())
                .map_err(|e| e.to_string())?;
            Ok(format!("instance auto-processed\n{}", render_instance(&instance)))
        }
        "cancel" => {
            let (id, reason) = id_with_reason(args, "cancel")?;
            let instance = open_engine()?
                .cancel(id, now_secs(), reason.as_deref())
                .map_err(|e| e.to_string())?;
            Ok(format!("instance cancelled\n{}", render_instance(&instance)))
        }
        "complete" => {
            let (id, reason) = id_with_reason(args, "complete")?;
            let instance = open_engine()?
                .complete(id, now_secs(), reason.as_deref())
                .map_err(|e| e.to_string())?;
            Ok(format!("instance completed\n{}", render_instance(&instance)))
        }
        "show" => {
            let id = single_id(args, "show")?;
            let instance = open_engine()?.get(id).map_err(|e| e.to_string())?;
            Ok(render_instance(&instance))
        }
        "list" => {
            if args.len() != 1 {
                return Err("usage: instance list".to_string());
            }
            let instances = open_engine()?.list().map_err(|e| e.to_string())?;
            if instances.is_empty() {
                return Ok("no instances".to_string());
            }
            Ok(instances
                .iter()
                .map(|instance| {
                    format!(
                        "{} template={} status={} step={}",
                        instance.label(),
                        instance.template_name(),
                        instance.status(),
                        instance.current_step()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
        other => Err(format!("unknown instance command `{other}`\n{INSTANCE_USAGE}")),
    }
}

fn single_id(args: &[String], command: &str) -> Result<InstanceId, String> {
    if args.len() != 2 {
        return Err(format!("usage: instance {command} <id>"));
    }
    InstanceId::parse(&args[1])
}

fn id_with_reason(args: &[String], command: &str) -> Result<(InstanceId, Option<String>), String> {
    let parsed = parse_args(&args[1..], &["reason"], &[])?;
    if parsed.positionals.len() != 1 {
        return Err(format!("usage: instance {command} <id> [--reason <text>]"));
    }
    let id = InstanceId::parse(&parsed.positionals[0])?;
    Ok((id, parsed.option("reason").map(str::to_string)))
}
