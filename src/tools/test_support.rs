//! Helpers for building tool contexts in unit tests

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::tool::ToolContext;
use crate::permissions::{
    FnCallback, PermissionManager, PermissionOptions, PermissionRequest, PermissionStatus,
};

/// Context rooted at the current directory whose callback always answers `answer`
pub fn context(options: PermissionOptions, answer: PermissionStatus) -> ToolContext {
    context_in(Path::new("."), options, answer)
}

/// Context rooted at `dir` whose callback always answers `answer`
pub fn context_in(dir: &Path, options: PermissionOptions, answer: PermissionStatus) -> ToolContext {
    let callback = Arc::new(FnCallback::new(move |_req: &PermissionRequest| Ok(answer)));
    let manager = PermissionManager::with_callback(options, callback);
    ToolContext::new(Arc::new(manager), dir, Duration::from_secs(5))
}
