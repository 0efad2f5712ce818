//! File tools: read, list, create, edit, delete
//!
//! Reading and listing need no permission. Creating, editing and deleting
//! ask the permission manager first and report a denial as a tool error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

use crate::permissions::operations;
use crate::tools::{ToolContext, ToolFunction, ToolOutput, ToolParameters};

/// Lines returned when no limit is given
const DEFAULT_READ_LIMIT: usize = 250;
/// Lines returned at minimum when that many are available
const MIN_READ_LINES: usize = 150;

/// Markers the model uses for unchanged regions in `code_edit`
const EXISTING_CODE_MARKERS: [&str; 2] = ["// ... existing code ...", "# ... existing code ..."];

fn parse_input<T: for<'de> Deserialize<'de>>(tool: &str, args: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| anyhow::anyhow!("Invalid {} input: {}", tool, e))
}

fn details(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}

// ============================================================================
// read_file
// ============================================================================

/// Read a window of lines from a file
pub struct ReadFileTool;

#[derive(Debug, Deserialize)]
struct ReadFileInput {
    target_file: String,
    offset: Option<usize>,
    limit: Option<usize>,
    #[serde(default)]
    should_read_entire_file: bool,
}

impl ReadFileTool {
    pub const NAME: &'static str = "read_file";
    pub const DESCRIPTION: &'static str =
        "Read the contents of a file. Returns at most 250 lines unless the entire file is requested; \
         lines outside the window are summarized.";

    pub fn parameters() -> ToolParameters {
        ToolParameters::new()
            .required("target_file", "string", "The path of the file to read")
            .optional("offset", "integer", "The line number to start reading from (1-indexed)")
            .optional("limit", "integer", "The number of lines to read")
            .optional(
                "should_read_entire_file",
                "boolean",
                "Whether to read the entire file",
            )
    }
}

/// Compute the 1-indexed line window `(start, count)` to return
fn read_window(total: usize, offset: Option<usize>, limit: Option<usize>) -> (usize, usize) {
    let start = offset.map_or(1, |o| o.min(total).max(1));
    let remaining = (total + 1).saturating_sub(start);
    let requested = limit.unwrap_or_else(|| DEFAULT_READ_LIMIT.min(remaining));
    let count = requested.min(remaining).max(MIN_READ_LINES.min(remaining));
    (start, count)
}

#[async_trait]
impl ToolFunction for ReadFileTool {
    async fn call(&self, args: &Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput> {
        let input: ReadFileInput = parse_input(Self::NAME, args)?;
        let path = ctx.resolve_path(&input.target_file);

        if !path.exists() {
            return Ok(ToolOutput::error(format!(
                "File {} does not exist",
                input.target_file
            )));
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        if input.should_read_entire_file {
            return Ok(ToolOutput::success(content));
        }

        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len();
        let (start, count) = read_window(total, input.offset, input.limit);
        let end = start + count - 1;

        let mut output = String::new();
        if start > 1 {
            output.push_str(&format!("[Lines 1-{} omitted]\n", start - 1));
        }
        for line in lines.iter().skip(start - 1).take(count) {
            output.push_str(line);
            output.push('\n');
        }
        if end < total {
            output.push_str(&format!("[Lines {}-{} omitted]\n", end + 1, total));
        }

        tracing::debug!(
            "[read_file] {} lines {}-{} of {}",
            path.display(),
            start,
            end,
            total
        );
        Ok(ToolOutput::success(output))
    }
}

// ============================================================================
// list_directory
// ============================================================================

/// List the entries of a directory
pub struct ListDirectoryTool;

#[derive(Debug, Deserialize)]
struct ListDirectoryInput {
    relative_workspace_path: String,
}

impl ListDirectoryTool {
    pub const NAME: &'static str = "list_directory";
    pub const DESCRIPTION: &'static str =
        "List the contents of a directory, with entry types and file sizes.";

    pub fn parameters() -> ToolParameters {
        ToolParameters::new().required(
            "relative_workspace_path",
            "string",
            "Path to list contents of, relative to the workspace root",
        )
    }
}

#[async_trait]
impl ToolFunction for ListDirectoryTool {
    async fn call(&self, args: &Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput> {
        let input: ListDirectoryInput = parse_input(Self::NAME, args)?;
        let path = ctx.resolve_path(&input.relative_workspace_path);

        if !path.exists() {
            return Ok(ToolOutput::error(format!(
                "Directory {} does not exist",
                input.relative_workspace_path
            )));
        }
        if !path.is_dir() {
            return Ok(ToolOutput::error(format!(
                "{} is not a directory",
                input.relative_workspace_path
            )));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&path)
            .with_context(|| format!("Failed to read directory: {}", path.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                entries.push((name.clone(), format!("[dir]  {}/", name)));
            } else {
                entries.push((name.clone(), format!("[file] {} ({} bytes)", name, metadata.len())));
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        if entries.is_empty() {
            return Ok(ToolOutput::success("(empty directory)"));
        }

        let listing: Vec<String> = entries.into_iter().map(|(_, line)| line).collect();
        Ok(ToolOutput::success(listing.join("\n")))
    }
}

// ============================================================================
// create_file
// ============================================================================

/// Create a new file; fails if the file already exists
pub struct CreateFileTool;

#[derive(Debug, Deserialize)]
struct CreateFileInput {
    file_path: String,
    content: String,
}

impl CreateFileTool {
    pub const NAME: &'static str = "create_file";
    pub const DESCRIPTION: &'static str =
        "Create a new file with the given content. Parent directories are created as needed. \
         Fails if the file already exists.";

    pub fn parameters() -> ToolParameters {
        ToolParameters::new()
            .required("file_path", "string", "Path where the file should be created")
            .required("content", "string", "Content to write to the file")
    }
}

#[async_trait]
impl ToolFunction for CreateFileTool {
    async fn call(&self, args: &Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput> {
        let input: CreateFileInput = parse_input(Self::NAME, args)?;
        let path = ctx.resolve_path(&input.file_path);

        if path.exists() {
            return Ok(ToolOutput::error(format!(
                "File {} already exists",
                input.file_path
            )));
        }

        let allowed = ctx
            .request_permission(
                operations::CREATE_FILE,
                details(json!({
                    "file_path": input.file_path,
                    "content_length": input.content.len(),
                })),
            )
            .await?;
        if !allowed {
            return Ok(ToolOutput::error(format!(
                "Permission denied: not allowed to create {}",
                input.file_path
            )));
        }

        create_parent_dirs(&path)?;
        fs::write(&path, &input.content)
            .with_context(|| format!("Failed to write file: {}", path.display()))?;

        tracing::info!("[create_file] Created {}", path.display());
        Ok(ToolOutput::success(format!("Created file at {}", input.file_path)))
    }
}

// ============================================================================
// edit_file
// ============================================================================

/// Replace a file's content, creating the file if it is missing
pub struct EditFileTool;

#[derive(Debug, Deserialize)]
struct EditFileInput {
    target_file: String,
    instructions: String,
    code_edit: String,
}

impl EditFileTool {
    pub const NAME: &'static str = "edit_file";
    pub const DESCRIPTION: &'static str =
        "Edit a file. The code edit replaces the file content; lines marked \
         '// ... existing code ...' or '# ... existing code ...' are dropped. \
         Creates the file if it does not exist.";

    pub fn parameters() -> ToolParameters {
        ToolParameters::new()
            .required("target_file", "string", "The target file to modify")
            .required(
                "instructions",
                "string",
                "A single sentence instruction describing the edit",
            )
            .required("code_edit", "string", "The precise lines of code to write")
    }
}

fn strip_existing_code_markers(code_edit: &str) -> Option<String> {
    if !EXISTING_CODE_MARKERS.iter().any(|m| code_edit.contains(m)) {
        return None;
    }
    let kept: Vec<&str> = code_edit
        .lines()
        .filter(|line| !EXISTING_CODE_MARKERS.iter().any(|m| line.contains(m)))
        .collect();
    Some(kept.join("\n"))
}

#[async_trait]
impl ToolFunction for EditFileTool {
    async fn call(&self, args: &Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput> {
        let input: EditFileInput = parse_input(Self::NAME, args)?;
        let path = ctx.resolve_path(&input.target_file);

        let allowed = ctx
            .request_permission(
                operations::EDIT_FILE,
                details(json!({
                    "target_file": input.target_file,
                    "instructions": input.instructions,
                })),
            )
            .await?;
        if !allowed {
            return Ok(ToolOutput::error(format!(
                "Permission denied: not allowed to edit {}",
                input.target_file
            )));
        }

        if !path.exists() {
            create_parent_dirs(&path)?;
            fs::write(&path, &input.code_edit)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
            return Ok(ToolOutput::success(format!("Created file {}", input.target_file)));
        }

        let (content, message) = match strip_existing_code_markers(&input.code_edit) {
            Some(stripped) => (
                stripped,
                format!(
                    "Edited file {} based on instructions: {}",
                    input.target_file, input.instructions
                ),
            ),
            None => (
                input.code_edit.clone(),
                format!(
                    "Replaced content of {} based on instructions: {}",
                    input.target_file, input.instructions
                ),
            ),
        };

        fs::write(&path, content)
            .with_context(|| format!("Failed to write file: {}", path.display()))?;

        tracing::info!("[edit_file] Edited {}", path.display());
        Ok(ToolOutput::success(message))
    }
}

// ============================================================================
// delete_file
// ============================================================================

/// Delete a file
pub struct DeleteFileTool;

#[derive(Debug, Deserialize)]
struct DeleteFileInput {
    target_file: String,
}

impl DeleteFileTool {
    pub const NAME: &'static str = "delete_file";
    pub const DESCRIPTION: &'static str = "Delete a file at the specified path.";

    pub fn parameters() -> ToolParameters {
        ToolParameters::new().required("target_file", "string", "The path of the file to delete")
    }
}

#[async_trait]
impl ToolFunction for DeleteFileTool {
    async fn call(&self, args: &Map<String, Value>, ctx: &ToolContext) -> Result<ToolOutput> {
        let input: DeleteFileInput = parse_input(Self::NAME, args)?;
        let path = ctx.resolve_path(&input.target_file);

        if !path.is_file() {
            return Ok(ToolOutput::error(format!(
                "File {} does not exist",
                input.target_file
            )));
        }

        let allowed = ctx
            .request_permission(
                operations::DELETE_FILE,
                details(json!({ "target_file": input.target_file })),
            )
            .await?;
        if !allowed {
            return Ok(ToolOutput::error(format!(
                "Permission denied: not allowed to delete {}",
                input.target_file
            )));
        }

        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete file: {}", path.display()))?;

        tracing::info!("[delete_file] Deleted {}", path.display());
        Ok(ToolOutput::success(format!("Deleted file {}", input.target_file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{PermissionOptions, PermissionPolicy, PermissionStatus};
    use crate::tools::test_support::context_in;
    use tempfile::tempdir;

    fn args(value: Value) -> Map<String, Value> {
        details(value)
    }

    #[test]
    fn test_read_window() {
        // Short file: everything
        assert_eq!(read_window(10, None, None), (1, 10));
        // Default limit
        assert_eq!(read_window(1000, None, None), (1, 250));
        // Small limits are raised to the minimum window
        assert_eq!(read_window(1000, Some(100), Some(20)), (100, 150));
        // Offset past the end is clamped
        assert_eq!(read_window(5, Some(50), None), (5, 1));
        // Empty file
        assert_eq!(read_window(0, None, None), (1, 0));
    }

    #[tokio::test]
    async fn test_read_file_window_summaries() {
        let dir = tempdir().unwrap();
        let body: Vec<String> = (1..=400).map(|i| format!("line {}", i)).collect();
        fs::write(dir.path().join("big.txt"), body.join("\n")).unwrap();
        let ctx = context_in(dir.path(), PermissionOptions::new(), PermissionStatus::Denied);

        let result = ReadFileTool
            .call(&args(json!({ "target_file": "big.txt", "offset": 11 })), &ctx)
            .await
            .unwrap();

        assert!(!result.is_error());
        assert!(result.output.starts_with("[Lines 1-10 omitted]\nline 11\n"));
        assert!(result.output.contains("line 260\n"));
        assert!(!result.output.contains("line 261\n"));
        assert!(result.output.ends_with("[Lines 261-400 omitted]\n"));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_business_error() {
        let dir = tempdir().unwrap();
        let ctx = context_in(dir.path(), PermissionOptions::new(), PermissionStatus::Denied);

        let result = ReadFileTool
            .call(&args(json!({ "target_file": "nope.txt" })), &ctx)
            .await
            .unwrap();
        assert_eq!(result.error.as_deref(), Some("File nope.txt does not exist"));
    }

    #[tokio::test]
    async fn test_read_file_rejects_bad_arguments() {
        let dir = tempdir().unwrap();
        let ctx = context_in(dir.path(), PermissionOptions::new(), PermissionStatus::Denied);

        let err = ReadFileTool
            .call(&args(json!({ "path": "wrong-name.txt" })), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid read_file input"));
    }

    #[tokio::test]
    async fn test_create_file_granted() {
        let dir = tempdir().unwrap();
        let ctx = context_in(dir.path(), PermissionOptions::new(), PermissionStatus::Granted);

        let result = CreateFileTool
            .call(
                &args(json!({ "file_path": "nested/hello.txt", "content": "Hello World" })),
                &ctx,
            )
            .await
            .unwrap();

        assert!(!result.is_error());
        let content = fs::read_to_string(dir.path().join("nested/hello.txt")).unwrap();
        assert_eq!(content, "Hello World");

        // Second create fails without overwriting
        let again = CreateFileTool
            .call(&args(json!({ "file_path": "nested/hello.txt", "content": "x" })), &ctx)
            .await
            .unwrap();
        assert_eq!(again.error.as_deref(), Some("File nested/hello.txt already exists"));
    }

    #[tokio::test]
    async fn test_create_file_denied_writes_nothing() {
        let dir = tempdir().unwrap();
        let ctx = context_in(dir.path(), PermissionOptions::new(), PermissionStatus::Denied);

        let result = CreateFileTool
            .call(&args(json!({ "file_path": "a.txt", "content": "x" })), &ctx)
            .await
            .unwrap();

        assert!(result.error.unwrap().starts_with("Permission denied"));
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_edit_file_strips_markers() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.py"), "print('old')\n").unwrap();
        let ctx = context_in(dir.path(), PermissionOptions::new(), PermissionStatus::Granted);

        let result = EditFileTool
            .call(
                &args(json!({
                    "target_file": "main.py",
                    "instructions": "print new",
                    "code_edit": "# ... existing code ...\nprint('new')"
                })),
                &ctx,
            )
            .await
            .unwrap();

        assert!(result.output.starts_with("Edited file main.py"));
        assert_eq!(fs::read_to_string(dir.path().join("main.py")).unwrap(), "print('new')");
    }

    #[tokio::test]
    async fn test_delete_file_policy_deny() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), "data").unwrap();
        let options =
            PermissionOptions::new().with_policy(operations::DELETE_FILE, PermissionPolicy::AlwaysDeny);
        let ctx = context_in(dir.path(), options, PermissionStatus::Granted);

        let result = DeleteFileTool
            .call(&args(json!({ "target_file": "keep.txt" })), &ctx)
            .await
            .unwrap();

        assert!(result.is_error());
        assert!(dir.path().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_list_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        let ctx = context_in(dir.path(), PermissionOptions::new(), PermissionStatus::Denied);

        let result = ListDirectoryTool
            .call(&args(json!({ "relative_workspace_path": "." })), &ctx)
            .await
            .unwrap();

        assert_eq!(result.output, "[file] Cargo.toml (9 bytes)\n[dir]  src/");
    }
}
