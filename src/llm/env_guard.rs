//! Scoped environment variable override
//!
//! Guards for the same variable may be dropped in any order. The variable
//! always holds the value of the newest guard still alive, and goes back to
//! its value from before the first guard once the last one is gone.

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Live overrides for one variable, oldest first
struct Overrides {
    original: Option<OsString>,
    stack: Vec<(u64, OsString)>,
}

fn registry() -> MutexGuard<'static, HashMap<String, Overrides>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Overrides>>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Sets an environment variable and restores it on drop
///
/// Restoration happens on every exit path, including unwinding. A variable
/// that was unset before is removed again.
#[derive(Debug)]
pub struct EnvVarGuard {
    key: String,
    id: u64,
}

impl EnvVarGuard {
    /// Set `key` to `value` until the guard is dropped
    pub fn set(key: impl Into<String>, value: impl AsRef<str>) -> Self {
        let key = key.into();
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let value = OsString::from(value.as_ref());

        let mut registry = registry();
        let overrides = registry.entry(key.clone()).or_insert_with(|| Overrides {
            original: env::var_os(&key),
            stack: Vec::new(),
        });
        overrides.stack.push((id, value.clone()));
        env::set_var(&key, &value);
        tracing::debug!(
            "[EnvVarGuard] Set {} ({} active override(s))",
            key,
            overrides.stack.len()
        );

        Self { key, id }
    }

    /// Name of the guarded variable
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let mut registry = registry();
        let Some(overrides) = registry.get_mut(&self.key) else {
            return;
        };
        overrides.stack.retain(|(id, _)| *id != self.id);

        if let Some((_, value)) = overrides.stack.last() {
            env::set_var(&self.key, value);
            tracing::debug!("[EnvVarGuard] Released one override of {}", self.key);
            return;
        }

        match registry.remove(&self.key).and_then(|o| o.original) {
            Some(value) => env::set_var(&self.key, value),
            None => env::remove_var(&self.key),
        }
        tracing::debug!("[EnvVarGuard] Restored {}", self.key);
    }
}
