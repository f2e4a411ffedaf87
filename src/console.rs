//! Line-oriented front ends for the workbench.
//!
//! [`run_console`] reads commands from stdin and prints workbench events as
//! they arrive, multiplexing both in one `tokio::select!` loop.
//! [`run_headless`] drives a single prompt to a terminal state for scripting.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::artifact::preview::render_preview;
use crate::orchestration::{Run, Workbench, WorkbenchEvent};

/// One parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Prompt(String),
    Approve(String),
    Reject(String),
    Stop(String),
    ApproveAgent { run_id: String, sub_agent_id: String },
    RejectAgent { run_id: String, sub_agent_id: String },
    StopAgent { run_id: String, sub_agent_id: String },
    Input { run_id: String, sub_agent_id: String, text: String },
    Save(String),
    Delete(String),
    Revert(String),
    Preview(String),
    ClosePreview,
    Runs,
    Activity,
    Artifacts,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  prompt <text>                     submit a prompt (bare text works too)
  approve|reject|stop <run>         act on a run
  approve-agent|reject-agent|stop-agent <run> <sub-agent>
  input <run> <sub-agent> <text>    send additional guidance
  save|delete <artifact>            act on an artifact
  revert <activity>                 delete the unsaved artifact behind an entry
  preview <artifact> | close-preview
  runs | activity | artifacts
  help | quit";

fn one_arg(rest: &str, usage: &str) -> Result<String, String> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(arg), None) => Ok(arg.to_string()),
        _ => Err(format!("usage: {usage}")),
    }
}

fn two_args(rest: &str, usage: &str) -> Result<(String, String), String> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Ok((a.to_string(), b.to_string())),
        _ => Err(format!("usage: {usage}")),
    }
}

/// Parse one input line. Empty lines yield `Ok(None)`.
///
/// A line whose first word is not a known command is taken as a prompt.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "prompt" => {
            if rest.is_empty() {
                return Err("usage: prompt <text>".into());
            }
            Command::Prompt(rest.to_string())
        }
        "approve" => Command::Approve(one_arg(rest, "approve <run>")?),
        "reject" => Command::Reject(one_arg(rest, "reject <run>")?),
        "stop" => Command::Stop(one_arg(rest, "stop <run>")?),
        "approve-agent" => {
            let (run_id, sub_agent_id) = two_args(rest, "approve-agent <run> <sub-agent>")?;
            Command::ApproveAgent { run_id, sub_agent_id }
        }
        "reject-agent" => {
            let (run_id, sub_agent_id) = two_args(rest, "reject-agent <run> <sub-agent>")?;
            Command::RejectAgent { run_id, sub_agent_id }
        }
        "stop-agent" => {
            let (run_id, sub_agent_id) = two_args(rest, "stop-agent <run> <sub-agent>")?;
            Command::StopAgent { run_id, sub_agent_id }
        }
        "input" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(run_id), Some(sub_agent_id), Some(text))
                    if !run_id.is_empty() && !sub_agent_id.is_empty() =>
                {
                    Command::Input {
                        run_id: run_id.to_string(),
                        sub_agent_id: sub_agent_id.to_string(),
                        text: text.to_string(),
                    }
                }
                _ => return Err("usage: input <run> <sub-agent> <text>".into()),
            }
        }
        "save" => Command::Save(one_arg(rest, "save <artifact>")?),
        "delete" => Command::Delete(one_arg(rest, "delete <artifact>")?),
        "revert" => Command::Revert(one_arg(rest, "revert <activity>")?),
        "preview" => Command::Preview(one_arg(rest, "preview <artifact>")?),
        "close-preview" => Command::ClosePreview,
        "runs" => Command::Runs,
        "activity" => Command::Activity,
        "artifacts" => Command::Artifacts,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Prompt(line.to_string()),
    };
    Ok(Some(command))
}

/// Human-readable rendering of a run and its sub-agents.
pub fn format_run(run: &Run) -> String {
    let mut out = format!("[{}] {} ({})", run.id, run.name, run.status);
    if run.approval_pending {
        out.push_str(" awaiting approval");
    }
    for sa in &run.sub_agents {
        out.push_str(&format!("\n  {} {} ({})", sa.id, sa.name, sa.status));
        if sa.approval_pending {
            out.push_str(" awaiting approval");
        }
        for artifact in &sa.generated_artifacts {
            let state = if artifact.is_saved() { "Saved" } else { "Unsaved" };
            out.push_str(&format!(
                "\n    {} {} - {} [{}]",
                artifact.id,
                artifact.kind(),
                artifact.name,
                state
            ));
        }
    }
    out
}

fn report(applied: bool) {
    if !applied {
        println!("(no change)");
    }
}

/// Apply one command. Returns `true` when the console should exit.
fn execute(workbench: &Workbench, command: Command) -> bool {
    match command {
        Command::Prompt(text) => match workbench.submit_prompt(&text) {
            Some(run_id) => println!("Submitted {run_id}"),
            None => println!("(empty prompt ignored)"),
        },
        Command::Approve(run_id) => report(workbench.approve_run(&run_id)),
        Command::Reject(run_id) => report(workbench.reject_run(&run_id)),
        Command::Stop(run_id) => report(workbench.stop_run(&run_id)),
        Command::ApproveAgent { run_id, sub_agent_id } => {
            report(workbench.approve_sub_agent(&run_id, &sub_agent_id))
        }
        Command::RejectAgent { run_id, sub_agent_id } => {
            report(workbench.reject_sub_agent(&run_id, &sub_agent_id))
        }
        Command::StopAgent { run_id, sub_agent_id } => {
            report(workbench.stop_sub_agent(&run_id, &sub_agent_id))
        }
        Command::Input {
            run_id,
            sub_agent_id,
            text,
        } => report(workbench.send_additional_input(&run_id, &sub_agent_id, &text)),
        Command::Save(id) => report(workbench.save_artifact(&id)),
        Command::Delete(id) => report(workbench.delete_artifact(&id)),
        Command::Revert(id) => report(workbench.revert_activity(&id)),
        Command::Preview(id) => {
            if workbench.open_preview(&id) {
                if let Some(artifact) = workbench.preview() {
                    println!("{}", render_preview(&artifact));
                }
            } else {
                println!("(no such artifact)");
            }
        }
        Command::ClosePreview => report(workbench.close_preview()),
        Command::Runs => {
            let runs = workbench.list_runs();
            if runs.is_empty() {
                println!("(no runs)");
            }
            for run in &runs {
                println!("{}", format_run(run));
            }
        }
        Command::Activity => {
            for entry in workbench.list_activity() {
                let saved = if entry.is_saved { " [Saved]" } else { "" };
                println!("{}  {}{}", entry.id, entry.label, saved);
            }
        }
        Command::Artifacts => {
            for artifact in workbench.list_artifacts() {
                let state = if artifact.is_saved() { "Saved" } else { "Unsaved" };
                println!("{}  {} - {} [{}]", artifact.id, artifact.kind(), artifact.name, state);
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return true,
    }
    false
}

/// Interactive loop: stdin commands in, workbench events out.
pub async fn run_console(
    workbench: Workbench,
    mut event_rx: UnboundedReceiver<WorkbenchEvent>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Workbench console. Type `help` for commands.");

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                println!("* {event}");
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("stdin closed");
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if execute(&workbench, command) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(usage) => println!("{usage}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    workbench.shutdown().await;
    Ok(())
}

/// How a headless run should be driven.
#[derive(Debug, Clone, Default)]
pub struct HeadlessOptions {
    pub reject: bool,
    pub stop_after: Option<Duration>,
    pub save_all: bool,
    pub json: bool,
}

/// Submit one prompt, drive it to a terminal state, and print the result.
pub async fn run_headless(
    workbench: Workbench,
    prompt: &str,
    options: HeadlessOptions,
) -> anyhow::Result<()> {
    let Some(run_id) = workbench.submit_prompt(prompt) else {
        anyhow::bail!("prompt must not be empty");
    };

    let gated = workbench
        .get_run(&run_id)
        .is_some_and(|run| run.approval_pending);
    if gated {
        if options.reject {
            workbench.reject_run(&run_id);
        } else {
            workbench.approve_run(&run_id);
        }
    } else if options.reject {
        tracing::warn!(
            run_id = %run_id,
            "--reject ignored: approval is disabled, the run started on submit"
        );
    }

    if let Some(delay) = options.stop_after {
        let stopper = workbench.clone();
        let id = run_id.clone();
        tokio::select! {
            _ = workbench.settle() => {}
            _ = tokio::time::sleep(delay) => {
                stopper.stop_run(&id);
            }
        }
    }
    workbench.settle().await;

    if options.save_all {
        for artifact in workbench.list_artifacts() {
            workbench.save_artifact(&artifact.id);
        }
    }

    let run = workbench
        .get_run(&run_id)
        .ok_or_else(|| anyhow::anyhow!("run {run_id} disappeared"))?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        println!("{}", format_run(&run));
        for sa in &run.sub_agents {
            if !sa.response.is_empty() {
                println!("\n{} - {}:\n{}", sa.id, sa.name, sa.response);
            }
        }
    }

    workbench.shutdown().await;
    Ok(())
}
