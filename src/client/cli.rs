use crate::client::commands::*;
use crate::client::config::resolve_daemon_url;
use crate::daemon::program::ProgramKind;
use crate::texit;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "overseerctl", version, about = "Process supervisor control client")]
struct Cli {
    /// Base URL of the daemon's HTTP surface, e.g. http://127.0.0.1:8700.
    /// Falls back to $OVERSEER_URL, then http://127.0.0.1:8700.
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every declared program and its live state
    Ps,
    /// Print a page of a program's combined stdout/stderr log
    Logs {
        name: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 100)]
        lines: usize,
    },
    /// Start a stopped/errored/broken program
    Start { name: String },
    /// Gracefully stop a running program
    Stop { name: String },
    /// Stop then start a program, resetting its failure counter
    Restart { name: String },
    /// Declare a new program (no code archive)
    Add {
        name: String,
        #[arg(long, default_value = "python")]
        r#type: String,
        #[arg(long, conflicts_with = "module")]
        script: Option<String>,
        #[arg(long, conflicts_with = "script")]
        module: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        venv: Option<String>,
        #[arg(long)]
        cwd: Option<String>,
        #[arg(long = "arg")]
        args: Vec<String>,
        #[arg(long = "env")]
        environment: Vec<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Remove a declared program (must be stopped or errored)
    Remove { name: String },
    /// Upload a new program bundle and queue its install
    Upload {
        name: String,
        archive: PathBuf,
        #[arg(long, default_value = "python")]
        r#type: String,
        #[arg(long, conflicts_with = "module")]
        script: Option<String>,
        #[arg(long, conflicts_with = "script")]
        module: Option<String>,
        #[arg(long, default_value_t = true)]
        auto_start: bool,
    },
    /// Replace the code of an already-uploaded program
    Update { name: String, archive: PathBuf },
}

fn parse_kind(raw: &str) -> Result<ProgramKind> {
    match raw {
        "python" => Ok(ProgramKind::Python),
        "node" => Ok(ProgramKind::Node),
        "exec" => Ok(ProgramKind::Exec),
        other => Err(anyhow!("unknown program type '{}'", other)),
    }
}

pub fn cli_app() -> Result<()> {
    let cli = Cli::parse();
    let base_url = resolve_daemon_url(cli.url);

    let result = match cli.command {
        Command::Ps => ps_cmd(&base_url),
        Command::Logs { name, offset, lines } => logs_cmd(&base_url, &name, offset, lines),
        Command::Start { name } => start_cmd(&base_url, &name),
        Command::Stop { name } => stop_cmd(&base_url, &name),
        Command::Restart { name } => restart_cmd(&base_url, &name),
        Command::Add {
            name,
            r#type,
            script,
            module,
            enabled,
            venv,
            cwd,
            args,
            environment,
            comment,
        } => add_cmd(
            &base_url,
            &name,
            parse_kind(&r#type)?,
            script,
            module,
            enabled,
            venv,
            cwd,
            args,
            environment,
            comment,
        ),
        Command::Remove { name } => remove_cmd(&base_url, &name),
        Command::Upload {
            name,
            archive,
            r#type,
            script,
            module,
            auto_start,
        } => upload_cmd(
            &base_url,
            &name,
            &r#type,
            script.as_deref(),
            module.as_deref(),
            auto_start,
            &archive,
        ),
        Command::Update { name, archive } => update_cmd(&base_url, &name, &archive),
    };

    if let Err(e) = result {
        texit!(e);
    }
    Ok(())
}
