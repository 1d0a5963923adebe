//! Text and JSON rendering of run results

use triage_errors::Error;
use triage_exec::{ActionStatus, RunReport};
use triage_script::Script;

/// Render a run report to stdout.
///
/// # Errors
///
/// Returns an error when JSON serialization fails.
pub fn render_report(report: &RunReport, json: bool) -> Result<(), Error> {
    if json {
        let body = serde_json::to_string_pretty(report)
            .map_err(|e| Error::internal(format!("report encoding: {e}")))?;
        println!("{body}");
        return Ok(());
    }

    for machine in &report.machines {
        if let Some(error) = &machine.connect_error {
            println!("{}: unreachable ({error})", machine.address);
            continue;
        }
        println!("{}:", machine.address);
        for action in &machine.actions {
            match &action.status {
                ActionStatus::Ok => {
                    println!("  {} (line {}): {}", action.kind, action.line, action.detail);
                }
                ActionStatus::Failed { error } => {
                    println!("  {} (line {}): FAILED: {error}", action.kind, action.line);
                }
            }
        }
    }
    println!("archive: {}", report.archive.display());
    Ok(())
}

/// Render a parse-only summary for `triage check`.
///
/// # Errors
///
/// Returns an error when JSON serialization fails.
pub fn render_check(script: &Script, json: bool) -> Result<(), Error> {
    if json {
        let machines: Vec<String> = script.from.machines.iter().map(|m| m.address()).collect();
        let actions: Vec<_> = script
            .actions
            .iter()
            .map(|a| serde_json::json!({ "kind": a.kind(), "line": a.line() }))
            .collect();
        let body = serde_json::to_string_pretty(&serde_json::json!({
            "machines": machines,
            "workdir": script.workdir.path,
            "output": script.output.path,
            "actions": actions,
        }))
        .map_err(|e| Error::internal(format!("summary encoding: {e}")))?;
        println!("{body}");
        return Ok(());
    }

    println!(
        "machines: {}",
        script
            .from
            .machines
            .iter()
            .map(|m| m.address())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("workdir:  {}", script.workdir.path.display());
    println!("output:   {}", script.output.path.display());
    println!("actions:  {}", script.actions.len());
    for action in &script.actions {
        println!("  line {}: {}", action.line(), action.kind());
    }
    Ok(())
}
