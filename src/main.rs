use summoning_eru::showcase::app;
use summoning_eru::showcase::cli::{CliCommand, HELP_TEXT, parse_cli_args};
use std::env;

fn main() -> anyhow::Result<()> {
    match parse_cli_args(env::args().skip(1)) {
        Ok(CliCommand::Run(options)) => app::run(options),
        Ok(CliCommand::Help) => {
            println!("{HELP_TEXT}");
            Ok(())
        }
        Err(err) => {
            eprintln!("{err}\n\n{HELP_TEXT}");
            std::process::exit(2);
        }
    }
}
