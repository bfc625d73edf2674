//! Fabric - command-line host for workspaces and artifacts
//!
//! ```text
//! fabric open "fabric://open/?workspaceId=<guid>&artifactId=<guid>"
//! fabric workspaces
//! fabric artifacts <workspace-id>...
//! ```

use fabric_core::{CancellationToken, DeepLinkOutcome};
use fabric_host::cli::{Args, Command, USAGE};
use fabric_host::{init_tracing, Host};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return Ok(ExitCode::from(2));
        }
    };

    if args.command == Command::Help {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let cwd = std::env::current_dir()?;
    let host = Host::start(&cwd)?;

    // Ctrl+C cancels whatever is in flight
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = run(&host, args, &cancel).await;
    host.shutdown().await;
    result
}

async fn run(host: &Host, args: Args, cancel: &CancellationToken) -> anyhow::Result<ExitCode> {
    match args.command {
        Command::Open { uri } => {
            let outcome = host.open(&uri, cancel).await;
            match outcome {
                DeepLinkOutcome::Opened(_) => Ok(ExitCode::SUCCESS),
                DeepLinkOutcome::Declined => {
                    println!("Not opened.");
                    Ok(ExitCode::SUCCESS)
                }
                DeepLinkOutcome::Cancelled => {
                    eprintln!("Cancelled.");
                    Ok(ExitCode::from(130))
                }
                DeepLinkOutcome::Failed { state, message } => {
                    eprintln!("Could not open link ({}): {}", state, message);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Workspaces => {
            let workspaces = host.workspaces(cancel).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&workspaces)?);
            } else {
                for ws in &workspaces {
                    println!("{}  {}", ws.id, ws.display_name);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Artifacts { workspace_ids } => {
            let listings = host.artifacts(&workspace_ids, cancel).await?;
            if args.json {
                let artifacts: Vec<_> = listings.iter().flat_map(|(_, a)| a).collect();
                println!("{}", serde_json::to_string_pretty(&artifacts)?);
            } else {
                for (workspace_id, artifacts) in &listings {
                    println!("{}", workspace_id);
                    for artifact in artifacts {
                        println!(
                            "  {}  {:<16} {}",
                            artifact.id, artifact.artifact_type, artifact.display_name
                        );
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            command,
            workspace_id,
            artifact_id,
        } => {
            let ran = host
                .run_command(&command, &workspace_id, &artifact_id, cancel)
                .await?;
            if !ran {
                eprintln!("Another command is still running.");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Help => {
            println!("{}", USAGE);
            Ok(ExitCode::SUCCESS)
        }
    }
}
