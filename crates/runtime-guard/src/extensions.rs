use tracing::debug;

/// Hooks for protections this crate does not implement itself.
///
/// Every method defaults to a logged no-op that reports success. Hosts with
/// real memory or thread protection override the relevant methods.
pub trait ProtectionExtensions: Send + Sync {
    fn protect_memory(&self, address: usize, len: usize) -> bool {
        debug!(address, len, "protect_memory: no protection installed");
        true
    }

    fn secure_threads(&self) -> bool {
        debug!("secure_threads: no protection installed");
        true
    }

    fn initialize_isolation(&self) -> bool {
        debug!("initialize_isolation: no protection installed");
        true
    }

    fn initialize_protection(&self) -> bool {
        debug!("initialize_protection: no protection installed");
        true
    }

    fn hide_from_detection(&self) -> bool {
        debug!("hide_from_detection: no protection installed");
        true
    }

    fn protect_from_scanning(&self) -> bool {
        debug!("protect_from_scanning: no protection installed");
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExtensions;

impl ProtectionExtensions for NoopExtensions {}
