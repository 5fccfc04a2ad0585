use crate::app::cli::{help_text, parse_cli_verb, CliVerb};

pub mod instances;
pub mod setup;
pub mod templates;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Setup => setup::cmd_setup(&args[1..]),
        CliVerb::Template => templates::cmd_template(&args[1..]),
        CliVerb::Instance => instances::cmd_instance(&args[1..]),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}
