//! Built-in tools
//!
//! - `read_file` / `list_directory` - read-only, no permission needed
//! - `create_file` / `edit_file` / `delete_file` - permission gated
//! - `run_terminal_command` - permission gated, destructive commands refused

mod file_tools;
mod terminal;

use std::sync::Arc;

pub use file_tools::{CreateFileTool, DeleteFileTool, EditFileTool, ListDirectoryTool, ReadFileTool};
pub use terminal::RunTerminalCommandTool;

use super::ToolRegistry;

/// Register every built-in tool, returning how many were added
pub fn register_default_tools(registry: &mut ToolRegistry) -> usize {
    let before = registry.len();

    registry.register(
        ReadFileTool::NAME,
        Arc::new(ReadFileTool),
        ReadFileTool::DESCRIPTION,
        ReadFileTool::parameters(),
    );
    registry.register(
        ListDirectoryTool::NAME,
        Arc::new(ListDirectoryTool),
        ListDirectoryTool::DESCRIPTION,
        ListDirectoryTool::parameters(),
    );
    registry.register(
        CreateFileTool::NAME,
        Arc::new(CreateFileTool),
        CreateFileTool::DESCRIPTION,
        CreateFileTool::parameters(),
    );
    registry.register(
        EditFileTool::NAME,
        Arc::new(EditFileTool),
        EditFileTool::DESCRIPTION,
        EditFileTool::parameters(),
    );
    registry.register(
        DeleteFileTool::NAME,
        Arc::new(DeleteFileTool),
        DeleteFileTool::DESCRIPTION,
        DeleteFileTool::parameters(),
    );
    registry.register(
        RunTerminalCommandTool::NAME,
        Arc::new(RunTerminalCommandTool),
        RunTerminalCommandTool::DESCRIPTION,
        RunTerminalCommandTool::parameters(),
    );

    registry.len() - before
}
