use crate::showcase::CONFIG_PATH_DEFAULT;
use std::path::PathBuf;
use thiserror::Error;

pub const HELP_TEXT: &str = "Usage:\n  summoning-eru [options]\n\nOptions:\n  -c, --config <path>   Scene config file (RON), default config/scene.ron\n  -t, --text <text>     Override the ground text\n      --diagnostics     Log frame time diagnostics\n  -h, --help            Show this help";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("{0} expects a value")]
    MissingValue(String),
    #[error("unknown option: {0}")]
    UnknownOption(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub config_path: PathBuf,
    pub ground_text: Option<String>,
    pub diagnostics: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(CONFIG_PATH_DEFAULT),
            ground_text: None,
            diagnostics: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Run(CliOptions),
    Help,
}

pub fn parse_cli_args<I>(args: I) -> Result<CliCommand, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut options = CliOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                options.config_path = PathBuf::from(value);
            }
            "--text" | "-t" => {
                let value = args.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                options.ground_text = Some(value);
            }
            "--diagnostics" => options.diagnostics = true,
            "--help" | "-h" => return Ok(CliCommand::Help),
            _ => return Err(CliError::UnknownOption(arg)),
        }
    }

    Ok(CliCommand::Run(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_uses_defaults() {
        assert_eq!(
            parse_cli_args(Vec::new()),
            Ok(CliCommand::Run(CliOptions::default()))
        );
    }

    #[test]
    fn reads_every_option() {
        let parsed = parse_cli_args(args(&[
            "--config",
            "alt.ron",
            "-t",
            "HELLO ERU",
            "--diagnostics",
        ]));
        assert_eq!(
            parsed,
            Ok(CliCommand::Run(CliOptions {
                config_path: PathBuf::from("alt.ron"),
                ground_text: Some("HELLO ERU".to_string()),
                diagnostics: true,
            }))
        );
    }

    #[rstest]
    #[case(&["-h"])]
    #[case(&["--diagnostics", "--help", "--bogus"])]
    fn help_wins(#[case] raw: &[&str]) {
        assert_eq!(parse_cli_args(args(raw)), Ok(CliCommand::Help));
    }

    #[rstest]
    #[case(&["--config"], CliError::MissingValue("--config".to_string()))]
    #[case(&["-t"], CliError::MissingValue("-t".to_string()))]
    #[case(&["--fullscreen"], CliError::UnknownOption("--fullscreen".to_string()))]
    fn rejects_bad_input(#[case] raw: &[&str], #[case] expected: CliError) {
        assert_eq!(parse_cli_args(args(raw)), Err(expected));
    }
}
