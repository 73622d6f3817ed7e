//! Process-wide entry points for the host application.
//!
//! All functions share one lazily built [`SecurityContext`] configured from
//! the environment. They run on the caller's thread.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::debug;

use crate::context::SecurityContext;
use crate::monitor::MonitorHandle;

static CONTEXT: OnceLock<Arc<SecurityContext>> = OnceLock::new();
static MONITOR: Mutex<Option<MonitorHandle>> = Mutex::new(None);

pub fn global_context() -> &'static Arc<SecurityContext> {
    CONTEXT.get_or_init(|| Arc::new(SecurityContext::from_env()))
}

/// Starts the process-wide monitor. Later calls are no-ops while it runs.
pub fn on_library_load() -> bool {
    let mut slot = MONITOR.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        debug!("library load hook already ran");
        return false;
    }
    *slot = MonitorHandle::start(global_context().clone());
    slot.is_some()
}

/// Stops the process-wide monitor, returning the iterations completed so far.
pub fn shutdown() -> u64 {
    let handle = MONITOR
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    match handle {
        Some(handle) => handle.stop(),
        None => global_context().iterations(),
    }
}

pub fn initialize_security() {
    global_context().initialize_security();
}

pub fn set_security_level(raw: i32) {
    global_context().set_security_level(raw);
}

pub fn is_being_analyzed() -> bool {
    global_context().is_being_analyzed()
}

pub fn is_running_in_emulator() -> bool {
    global_context().is_running_in_emulator()
}

pub fn has_hook_framework() -> bool {
    global_context().has_hook_framework()
}

pub fn spoof_process_name(name: &str) -> bool {
    global_context().spoof_process_name(name)
}

pub fn hide_process_info(pid: i32) -> bool {
    global_context().hide_process_info(pid)
}

pub fn status_json() -> serde_json::Result<String> {
    global_context().status().to_json()
}

pub fn protect_memory(address: usize, len: usize) -> bool {
    global_context().extensions().protect_memory(address, len)
}

pub fn secure_threads() -> bool {
    global_context().extensions().secure_threads()
}

pub fn initialize_isolation() -> bool {
    global_context().extensions().initialize_isolation()
}

pub fn initialize_protection() -> bool {
    global_context().extensions().initialize_protection()
}

pub fn hide_from_detection() -> bool {
    global_context().extensions().hide_from_detection()
}

pub fn protect_from_scanning() -> bool {
    global_context().extensions().protect_from_scanning()
}
