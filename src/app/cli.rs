#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Setup,
    Template,
    Instance,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "setup" => CliVerb::Setup,
        "template" => CliVerb::Template,
        "instance" => CliVerb::Instance,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  setup [--store file|sqlite|memory] [--state-root <path>]".to_string(),
        "                                       Write settings and create state directories"
            .to_string(),
        "  template list                        List defined workflow templates".to_string(),
        "  template show <name>                 Print a template definition".to_string(),
        "  template add <name> --steps a,b [--approval x] [--automation y] [--infer]".to_string(),
        "                                       Define or redefine a template".to_string(),
        "  template remove <name>               Remove a template".to_string(),
        "  instance start <template>            Start a workflow instance".to_string(),
        "  instance advance <id>                Move an instance to its next step".to_string(),
        "  instance approve <id>                Approve the gated step and move on".to_string(),
        "  instance auto-process <id>           Advance until a gate or completion".to_string(),
        "  instance cancel <id> [--reason <text>]".to_string(),
        "                                       Cancel an instance".to_string(),
        "  instance complete <id> [--reason <text>]".to_string(),
        "                                       Force an instance to completion".to_string(),
        "  instance show <id>                   Print an instance snapshot".to_string(),
        "  instance list                        List all instances".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_parse_and_unknown_falls_through() {
        assert_eq!(parse_cli_verb("setup"), CliVerb::Setup);
        assert_eq!(parse_cli_verb("template"), CliVerb::Template);
        assert_eq!(parse_cli_verb("instance"), CliVerb::Instance);
        assert_eq!(parse_cli_verb("--help"), CliVerb::Help);
        assert_eq!(parse_cli_verb("workflow"), CliVerb::Unknown);
    }

    #[test]
    fn help_lists_every_instance_operation() {
        let help = help_text();
        for op in [
            "start", "advance", "approve", "auto-process", "cancel", "complete", "show", "list",
        ] {
            assert!(help.contains(&format!("instance {op}")), "missing {op}");
        }
    }
}
