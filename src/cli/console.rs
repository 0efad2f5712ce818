use async_trait::async_trait;
use colored::*;
use std::io::{self, BufRead, Write};

use crate::agent::ChatOutcome;
use crate::core::{AgentError, AgentResult};
use crate::permissions::{PermissionCallback, PermissionRequest, PermissionStatus};
use crate::tools::ToolCallResult;

/// Console handles all terminal I/O with colored formatting
pub struct Console {
    user_color: Color,
    assistant_color: Color,
    tool_color: Color,
}

impl Console {
    /// Create a new Console with default colors
    pub fn new() -> Self {
        Self {
            user_color: Color::Cyan,
            assistant_color: Color::Green,
            tool_color: Color::Magenta,
        }
    }

    /// Print a complete assistant message with colored formatting
    pub fn print_assistant(&self, message: &str) {
        println!(
            "{} {}",
            "Assistant:".color(self.assistant_color).bold(),
            message.color(self.assistant_color)
        );
    }

    /// Print a system message (errors, info, etc.)
    pub fn print_system(&self, message: &str) {
        println!("{} {}", "System:".yellow().bold(), message);
    }

    /// Print an error message
    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    /// Read a line of input from the user
    ///
    /// Returns `None` at end of input.
    pub fn read_input(&self) -> io::Result<Option<String>> {
        print!("{} ", ">".color(self.user_color).bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    /// Print a welcome banner
    pub fn print_banner(&self, model: &str) {
        println!("{}", "=".repeat(60).bright_blue());
        println!(
            "{}",
            format!("  Cursor Agent - Powered by {}", model).bright_blue().bold()
        );
        println!("{}", "=".repeat(60).bright_blue());
        println!();
        println!("Type your message and press Enter. Type 'exit' or 'quit' to end the session.");
        println!();
    }

    /// Print a separator line
    pub fn print_separator(&self) {
        println!("{}", "-".repeat(60).bright_black());
    }

    /// Print one tool call and its outcome
    pub fn print_tool_call(&self, call: &ToolCallResult) {
        println!(
            "{} {}",
            "Tool:".color(self.tool_color).bold(),
            format!("[{}]", call.name).color(self.tool_color),
        );

        match &call.error {
            Some(error) => println!("{} {}", "Tool Error:".red().bold(), error),
            None => {
                // Truncate long output
                let display = if call.output.chars().count() > 500 {
                    let head: String = call.output.chars().take(500).collect();
                    format!("{}...\n(output truncated)", head)
                } else {
                    call.output.clone()
                };
                println!("{}", display.bright_black());
            }
        }
    }

    /// Print the outcome of a chat turn
    pub fn print_outcome(&self, outcome: &ChatOutcome) {
        match outcome {
            ChatOutcome::Text(text) => self.print_assistant(text),
            ChatOutcome::Response(response) => {
                if let Some(ref thinking) = response.thinking {
                    println!("{}", thinking.bright_black().italic());
                }
                for call in &response.tool_calls {
                    self.print_tool_call(call);
                }
                self.print_assistant(&response.message);
            }
            ChatOutcome::Failed(message) => self.print_error(message),
        }
    }

    /// Ask the user to grant or deny a permission request on stdin/stdout
    pub fn ask_permission(&self, request: &PermissionRequest) -> io::Result<PermissionStatus> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        prompt_permission(request, &mut input, &mut output)
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a permission request and block until a valid y/n answer arrives
///
/// Invalid answers re-prompt with no retry limit. End of input is an error.
pub fn prompt_permission<R: BufRead, W: Write>(
    request: &PermissionRequest,
    input: &mut R,
    output: &mut W,
) -> io::Result<PermissionStatus> {
    let details = serde_json::to_string_pretty(request.details())
        .unwrap_or_else(|_| format!("{:?}", request.details()));

    writeln!(output)?;
    writeln!(output, "{}", "─".repeat(60).yellow())?;
    writeln!(
        output,
        "{} {}",
        "🔒 Permission Request:".yellow().bold(),
        request.operation().bold()
    )?;
    writeln!(output, "Details: {}", details)?;
    writeln!(output, "{}", "─".repeat(60).yellow())?;

    loop {
        write!(output, "{} ", "Allow this operation? (y/n):".yellow().bold())?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for a permission decision",
            ));
        }

        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => {
                writeln!(output, "{}", "✓ Allowed".green())?;
                return Ok(PermissionStatus::Granted);
            }
            "n" | "no" => {
                writeln!(output, "{}", "✗ Denied".red())?;
                return Ok(PermissionStatus::Denied);
            }
            _ => writeln!(output, "{}", "Please enter 'y' or 'n'".red())?,
        }
    }
}

/// Default decision callback: asks on the terminal
///
/// The prompt blocks on stdin, so it runs on tokio's blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePermissionCallback;

impl ConsolePermissionCallback {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PermissionCallback for ConsolePermissionCallback {
    async fn decide(&self, request: &PermissionRequest) -> AgentResult<PermissionStatus> {
        let request = request.clone();

        let answer = tokio::task::spawn_blocking(move || Console::new().ask_permission(&request))
            .await
            .map_err(|e| AgentError::PermissionCallback(format!("prompt task failed: {}", e)))?;

        answer.map_err(|e| AgentError::PermissionCallback(format!("console prompt failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};
    use std::io::Cursor;

    fn request() -> PermissionRequest {
        let details: Map<String, Value> = json!({ "path": "notes.txt" })
            .as_object()
            .cloned()
            .unwrap();
        PermissionRequest::new("create_file", details)
    }

    #[test]
    fn test_prompt_grants_on_yes() {
        let mut input = Cursor::new("yes\n");
        let mut output = Vec::new();

        let status = prompt_permission(&request(), &mut input, &mut output).unwrap();
        assert_eq!(status, PermissionStatus::Granted);

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("create_file"));
        assert!(printed.contains("notes.txt"));
    }

    #[test]
    fn test_prompt_reprompts_until_valid() {
        let mut input = Cursor::new("maybe\n\nsure\nN\n");
        let mut output = Vec::new();

        let status = prompt_permission(&request(), &mut input, &mut output).unwrap();
        assert_eq!(status, PermissionStatus::Denied);

        let printed = String::from_utf8(output).unwrap();
        assert_eq!(printed.matches("Please enter 'y' or 'n'").count(), 3);
    }

    #[test]
    fn test_prompt_end_of_input_is_error() {
        let mut input = Cursor::new("what\n");
        let mut output = Vec::new();

        let err = prompt_permission(&request(), &mut input, &mut output).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
