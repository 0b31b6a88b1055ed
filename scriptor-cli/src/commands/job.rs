//! Job command handlers
//!
//! Submitting scripts, inspecting jobs, following their output and managing
//! their lifecycle.

use anyhow::{Context, Result};
use colored::*;
use scriptor_client::ScriptorClient;
use scriptor_core::domain::job::{JobStatus, ScriptJob, SortOrder, parse_status_list};
use std::io::{Read, Write};
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;
use crate::id_resolver::resolve_job_id;
use crate::types::IdOrPrefix;

/// Submit a script from a file or stdin
pub async fn submit(config: &Config, file: &str, blocking: bool) -> Result<()> {
    let script = read_script(file)?;
    let client = config.client();

    if blocking {
        let job = client.submit_blocking(script).await?;
        print_job_details(&job);
        if !job.status.is_terminal() {
            println!();
            println!(
                "{}",
                format!("Job is still {}; use `scriptor watch {}` to follow it", job.status, job.id)
                    .yellow()
            );
        }
    } else {
        let id = client.submit(script).await?;
        println!("{} {}", "✓ Submitted job".green().bold(), id.to_string().cyan());
    }

    Ok(())
}

/// List jobs with an optional status filter
pub async fn list(config: &Config, status: Option<&str>, desc: bool) -> Result<()> {
    let statuses = match status {
        Some(text) => parse_status_list(text)?,
        None => Vec::new(),
    };
    let order = desc.then_some(SortOrder::Desc);

    let jobs = config.client().list_jobs(&statuses, order).await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in &jobs {
            print_job_summary(job);
        }
    }

    Ok(())
}

/// Show a single job
pub async fn get(config: &Config, id: &str) -> Result<()> {
    let client = config.client();
    let uuid = resolve(&client, id).await?;

    let job = client.get_job(uuid).await?;
    print_job_details(&job);

    Ok(())
}

/// Poll a job, echoing new output until it reaches a terminal state
pub async fn watch(config: &Config, id: &str, interval_ms: u64) -> Result<()> {
    let client = config.client();
    let uuid = resolve(&client, id).await?;
    let interval = Duration::from_millis(interval_ms.max(1));

    let mut seen_stdout = String::new();
    let mut seen_stderr = String::new();

    loop {
        let job = client.get_job(uuid).await?;

        print!("{}", appended(&seen_stdout, &job.stdout));
        eprint!("{}", appended(&seen_stderr, &job.stderr));
        std::io::stdout().flush().ok();
        seen_stdout = job.stdout.clone();
        seen_stderr = job.stderr.clone();

        if job.status.is_terminal() {
            println!();
            println!("{} {}", "Job finished:".bold(), colorize_status(&job.status));
            print_job_result(&job);
            return Ok(());
        }

        tokio::time::sleep(interval).await;
    }
}

/// Stop a job
pub async fn stop(config: &Config, id: &str) -> Result<()> {
    let client = config.client();
    let uuid = resolve(&client, id).await?;

    if client.stop_job(uuid).await? {
        println!("{} {}", "✓ Stopped job".green().bold(), uuid.to_string().cyan());
    } else {
        println!(
            "{}",
            format!("Job {} was not running or queued; nothing to stop", uuid).yellow()
        );
    }

    Ok(())
}

/// Remove finished jobs
pub async fn cleanup(config: &Config, ids: &[String]) -> Result<()> {
    let client = config.client();

    let mut uuids = Vec::with_capacity(ids.len());
    for id in ids {
        uuids.push(resolve(&client, id).await?);
    }

    let removed = client.cleanup_jobs(&uuids).await?;
    let skipped = uuids.len() - removed.min(uuids.len());

    println!("{} {} job(s)", "✓ Removed".green().bold(), removed);
    if skipped > 0 {
        println!(
            "{}",
            format!("{} job(s) skipped (unknown or still active)", skipped).dimmed()
        );
    }

    Ok(())
}

async fn resolve(client: &ScriptorClient, id: &str) -> Result<Uuid> {
    let id_or_prefix = IdOrPrefix::parse(id);
    resolve_job_id(client, &id_or_prefix)
        .await
        .with_context(|| format!("Cannot resolve job '{}'", id_or_prefix))
}

/// Read a script from `path`, or from stdin when `path` is `-`
fn read_script(path: &str) -> Result<String> {
    if path == "-" {
        let mut script = String::new();
        std::io::stdin()
            .read_to_string(&mut script)
            .context("Failed to read script from stdin")?;
        return Ok(script);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read script file {}", path))
}

/// The part of `current` not yet printed
///
/// Output only ever grows, so anything else means the server restarted the
/// record; print it whole in that case.
fn appended<'a>(seen: &str, current: &'a str) -> &'a str {
    current.strip_prefix(seen).unwrap_or(current)
}

/// Print a one-job summary line block
fn print_job_summary(job: &ScriptJob) {
    println!("  {} Job {}", "▸".cyan(), job.id.to_string().dimmed());
    println!("    Status:    {}", colorize_status(&job.status));
    println!(
        "    Submitted: {}",
        job.submitted_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(ms) = job.execution_time_ms {
        println!("    Duration:  {}ms", ms);
    }
    println!();
}

/// Print detailed job information
fn print_job_details(job: &ScriptJob) {
    println!("{}", "Job Details:".bold());
    println!("  ID:         {}", job.id.to_string().cyan());
    println!("  Status:     {}", colorize_status(&job.status));
    println!("  Submitted:  {}", job.submitted_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(started) = job.started_at {
        println!("  Started:    {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(ms) = job.execution_time_ms {
        println!("  Duration:   {}ms", ms);
    }

    println!("\n{}", "Script:".bold());
    for line in job.script.lines() {
        println!("  {}", line.dimmed());
    }

    if !job.stdout.is_empty() {
        println!("\n{}", "Stdout:".bold());
        print!("{}", job.stdout);
    }

    if !job.stderr.is_empty() {
        println!("\n{}", "Stderr:".bold());
        print!("{}", job.stderr.red());
    }

    print_job_result(job);
}

fn print_job_result(job: &ScriptJob) {
    if let Some(output) = &job.output {
        println!("\n{} {}", "Result:".bold(), output.green());
    }

    if let Some(error) = &job.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());

        if let Some(trace) = job.stack_trace.as_deref().filter(|t| !t.is_empty()) {
            println!("\n{}", "Stack trace:".bold());
            println!("{}", trace.dimmed());
        }
    }
}

/// Colorize job status for display
fn colorize_status(status: &JobStatus) -> ColoredString {
    let text = status.as_str();
    match status {
        JobStatus::Queued => text.yellow(),
        JobStatus::Executing => text.cyan(),
        JobStatus::Completed => text.green(),
        JobStatus::Failed => text.red(),
        JobStatus::Stopped => text.dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appended_returns_new_suffix() {
        assert_eq!(appended("", "hello\n"), "hello\n");
        assert_eq!(appended("hello\n", "hello\nworld\n"), "world\n");
        assert_eq!(appended("hello\n", "hello\n"), "");
    }

    #[test]
    fn test_appended_falls_back_to_whole_output() {
        assert_eq!(appended("old", "new"), "new");
    }

    #[test]
    fn test_appended_handles_multibyte_text() {
        assert_eq!(appended("héllo", "héllo wörld"), " wörld");
    }

    #[test]
    fn test_read_script_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "print('hi')\nreturn 1\n").unwrap();

        let script = read_script(file.path().to_str().unwrap()).unwrap();
        assert_eq!(script, "print('hi')\nreturn 1\n");
    }

    #[test]
    fn test_read_script_missing_file() {
        let err = read_script("/definitely/not/here.lua").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.lua"));
    }

    #[test]
    fn test_colorize_status_uses_wire_names() {
        colored::control::set_override(false);
        for status in JobStatus::ALL {
            assert_eq!(colorize_status(&status).to_string(), status.as_str());
        }
    }
}
