//! Permission system for side-effecting tool operations
//!
//! Each operation type (`create_file`, `run_terminal_command`, ...) resolves to
//! a policy:
//! - `AlwaysAllow`: granted without asking
//! - `AlwaysDeny`: denied without asking
//! - `Confirm`: the decision callback is consulted, every time
//!
//! Terminal commands can additionally be granted or denied by prefix, and yolo
//! mode grants everything that is not explicitly denied.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cursor_agent_sdk::permissions::{
//!     FnCallback, PermissionManager, PermissionOptions, PermissionPolicy, PermissionStatus,
//! };
//! use std::sync::Arc;
//!
//! let options = PermissionOptions::new()
//!     .with_policy("delete_file", PermissionPolicy::AlwaysDeny)
//!     .allow_command("ls");
//!
//! let manager = PermissionManager::with_callback(
//!     options,
//!     Arc::new(FnCallback::new(|_req| Ok(PermissionStatus::Granted))),
//! );
//!
//! let allowed = manager.request_permission("create_file", details).await?;
//! ```

mod callback;
mod manager;
mod policy;

pub use callback::{BlockingCallback, FnCallback, PermissionCallback};
pub use manager::PermissionManager;
pub use policy::{
    operations, PermissionOptions, PermissionPolicy, PermissionRequest, PermissionStatus,
};
