//! Terminal command tool
//!
//! Runs a shell command in the working directory after the permission
//! manager approves it. Known-destructive commands are refused outright,
//! before any permission is requested.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::permissions::operations;
use crate::tools::{ToolContext, ToolFunction, ToolOutput, ToolParameters};

/// Maximum output length in characters
const MAX_OUTPUT_LENGTH: usize = 30000;

/// Substrings that make a command refuse to run
const DANGEROUS_PATTERNS: [&str; 4] = ["rm -rf", "sudo rm", "mkfs", ":(){:|:&};:"];
/// Programs refused when they are the command being run
const DANGEROUS_PROGRAMS: [&str; 2] = ["dd", "format"];
/// Commands that would block on a pager
const PAGER_COMMANDS: [&str; 6] = ["less", "more", "git diff", "git show", "head", "tail"];

/// Run a terminal command
pub struct RunTerminalCommandTool;

#[derive(Debug, Deserialize)]
struct RunTerminalCommandInput {
    command: String,
    explanation: Option<String>,
    #[serde(default)]
    is_background: bool,
    timeout_secs: Option<u64>,
}

impl RunTerminalCommandTool {
    pub const NAME: &'static str = "run_terminal_command";
    pub const DESCRIPTION: &'static str =
        "Run a shell command in the workspace. The user must approve the command before it runs. \
         Commands that would open a pager are piped through cat.";

    pub fn parameters() -> ToolParameters {
        ToolParameters::new()
            .required("command", "string", "The terminal command to execute")
            .optional(
                "explanation",
                "string",
                "One sentence explanation of why this command needs to run",
            )
            .optional(
                "is_background",
                "boolean",
                "Whether the command should be run in the background",
            )
            .optional(
                "timeout_secs",
                "integer",
                "Timeout in seconds, no larger than the configured tool timeout",
            )
    }
}

/// Return the dangerous pattern a command contains, if any
fn dangerous_operation(command: &str) -> Option<&'static str> {
    if let Some(pattern) = DANGEROUS_PATTERNS.iter().find(|p| command.contains(*p)) {
        return Some(pattern);
    }
    command
        .split(|c: char| c == ';' || c == '&' || c == '|')
        .filter_map(|segment| {
            let mut words = segment.split_whitespace();
            match words.next() {
                Some("sudo") => words.next(),
                first => first,
            }
        })
        .find_map(|program| DANGEROUS_PROGRAMS.iter().find(|d| **d == program).copied())
}

/// Pipe pager commands through `cat` so they never wait for input
fn without_pager(command: &str) -> String {
    let trimmed = command.trim();
    if trimmed.contains("| cat") {
        return trimmed.to_string();
    }
    let uses_pager = PAGER_COMMANDS.iter().any(|pager| {
        trimmed == *pager
            || trimmed.starts_with(&format!("{} ", pager))
            || trimmed.contains(&format!("| {} ", pager))
    });
    if uses_pager {
        format!("{} | cat", trimmed)
    } else {
        trimmed.to_string()
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);

    let mut result = String::new();
    if !stdout.is_empty() {
        result.push_str(&stdout);
    }
    if !stderr.is_empty() {
        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str("STDERR:\n");
        result.push_str(&stderr);
    }

    if result.len() > MAX_OUTPUT_LENGTH {
        let mut cut = MAX_OUTPUT_LENGTH;
        while !result.is_char_boundary(cut) {
            cut -= 1;
        }
        result.truncate(cut);
        result.push_str("\n... (output truncated)");
    }
    result
}

#[async_trait]
impl ToolFunction for RunTerminalCommandTool {
    async fn call(&self, args: &Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput> {
        let input: RunTerminalCommandInput = serde_json::from_value(Value::Object(args.clone()))
            .map_err(|e| anyhow::anyhow!("Invalid {} input: {}", Self::NAME, e))?;

        if let Some(pattern) = dangerous_operation(&input.command) {
            tracing::warn!("[run_terminal_command] Refused: {}", input.command);
            return Ok(ToolOutput::error(format!(
                "Command '{}' contains potentially dangerous operation '{}'. Execution aborted.",
                input.command, pattern
            )));
        }

        let mut details = Map::new();
        details.insert("command".into(), json!(input.command));
        details.insert("is_background".into(), json!(input.is_background));
        if let Some(ref explanation) = input.explanation {
            details.insert("explanation".into(), json!(explanation));
        }

        if !ctx
            .request_permission(operations::RUN_TERMINAL_COMMAND, details)
            .await?
        {
            return Ok(ToolOutput::error(format!(
                "Permission denied: not allowed to run '{}'",
                input.command
            )));
        }

        let command = without_pager(&input.command);
        tracing::info!("[run_terminal_command] Executing: {}", command);
        tracing::debug!("[run_terminal_command] Working directory: {}", ctx.working_dir().display());

        if input.is_background {
            let child = Command::new("sh")
                .arg("-c")
                .arg(&command)
                .current_dir(ctx.working_dir())
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?;
            let pid = child
                .id()
                .map_or_else(|| "unknown".to_string(), |id| id.to_string());
            return Ok(ToolOutput::success(format!(
                "Started background command (pid {}): {}",
                pid, command
            )));
        }

        let limit = ctx.default_timeout();
        let duration = input
            .timeout_secs
            .map(Duration::from_secs)
            .map_or(limit, |requested| requested.min(limit));

        let output_future = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(ctx.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match timeout(duration, output_future).await {
            Ok(result) => result?,
            Err(_) => {
                return Ok(ToolOutput::error(format!(
                    "Command timed out after {}s",
                    duration.as_secs()
                )));
            }
        };

        let combined = combine_output(&output.stdout, &output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);
        tracing::debug!("[run_terminal_command] Exit code: {}", exit_code);

        if exit_code != 0 {
            return Ok(ToolOutput {
                output: combined,
                error: Some(format!("Command failed with exit code {}", exit_code)),
            });
        }

        if combined.is_empty() {
            Ok(ToolOutput::success("Command completed successfully (no output)"))
        } else {
            Ok(ToolOutput::success(combined))
        }
    }
}
