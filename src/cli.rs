//! Command-line parsing for the `fabric` binary

use thiserror::Error;

pub const USAGE: &str = "\
Usage: fabric [--json] <command>

Commands:
  open <uri>                          Handle a deep link
  workspaces                          List workspaces
  artifacts <workspace-id>...         List artifacts of one or more workspaces
  run <command> <workspace-id> <artifact-id>
                                      Run a satellite command on an artifact
  help                                Show this message";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("Missing command")]
    MissingCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open { uri: String },
    Workspaces,
    Artifacts { workspace_ids: Vec<String> },
    Run {
        command: String,
        workspace_id: String,
        artifact_id: String,
    },
    Help,
}

/// Command-line arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    /// Print listings as JSON
    pub json: bool,
}

impl Args {
    /// Parse the process arguments
    pub fn parse() -> Result<Self, CliError> {
        Self::parse_from(std::env::args().skip(1))
    }

    /// Parse arguments, program name excluded
    pub fn parse_from<I, S>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut json = false;
        let mut positional = Vec::new();

        for arg in args.into_iter().map(Into::into) {
            match arg.as_str() {
                "--json" => json = true,
                "--help" | "-h" => {
                    return Ok(Self {
                        command: Command::Help,
                        json,
                    })
                }
                _ => positional.push(arg),
            }
        }

        let mut rest = positional.into_iter();
        let name = rest.next().ok_or(CliError::MissingCommand)?;
        let command = match name.as_str() {
            "open" => Command::Open {
                uri: rest.next().ok_or(CliError::MissingArgument("uri"))?,
            },
            "workspaces" => Command::Workspaces,
            "artifacts" => {
                let workspace_ids: Vec<String> = rest.by_ref().collect();
                if workspace_ids.is_empty() {
                    return Err(CliError::MissingArgument("workspace-id"));
                }
                Command::Artifacts { workspace_ids }
            }
            "run" => Command::Run {
                command: rest.next().ok_or(CliError::MissingArgument("command"))?,
                workspace_id: rest.next().ok_or(CliError::MissingArgument("workspace-id"))?,
                artifact_id: rest.next().ok_or(CliError::MissingArgument("artifact-id"))?,
            },
            "help" => Command::Help,
            other => return Err(CliError::UnknownCommand(other.to_string())),
        };

        if let Some(extra) = rest.next() {
            return Err(CliError::UnexpectedArgument(extra));
        }

        Ok(Self { command, json })
    }
}
