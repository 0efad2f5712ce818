//! Terminal front end
//!
//! - `Console` - colored terminal I/O for the REPL binary
//! - `ConsolePermissionCallback` - the default interactive permission prompt

mod console;

pub use console::{prompt_permission, Console, ConsolePermissionCallback};
