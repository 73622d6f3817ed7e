use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rand::RngCore;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::ActionError;
use crate::hardening::ProcessControl;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterMeasure {
    BlockDebuggerAttach,
    InjectMemoryNoise,
    SpoofProcessIdentity(String),
}

impl CounterMeasure {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BlockDebuggerAttach => "block_debugger_attach",
            Self::InjectMemoryNoise => "inject_memory_noise",
            Self::SpoofProcessIdentity(_) => "spoof_process_identity",
        }
    }

    /// Runs the action. Failures are logged here and returned to the caller.
    pub fn apply(
        &self,
        control: &dyn ProcessControl,
        noise: &NoiseArena,
        noise_len: usize,
    ) -> Result<(), ActionError> {
        let result = match self {
            Self::BlockDebuggerAttach => control.deny_attach(),
            Self::InjectMemoryNoise => {
                let outstanding = noise.inject(noise_len);
                debug!(outstanding, bytes = noise_len, "memory noise injected");
                Ok(())
            }
            Self::SpoofProcessIdentity(name) => control.set_process_name(name),
        };

        match &result {
            Ok(()) => debug!(action = self.code(), "counter-measure applied"),
            Err(err) => error!(
                action = self.code(),
                error = %err,
                "counter-measure failed"
            ),
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedCounterMeasure {
    pub action: &'static str,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AppliedCounterMeasure {
    pub fn from_result(measure: &CounterMeasure, result: &Result<(), ActionError>) -> Self {
        Self {
            action: measure.code(),
            succeeded: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
        }
    }
}

/// Decoy buffers that stay allocated for the lifetime of their owner.
///
/// Every injection adds a buffer; nothing but [`NoiseArena::clear`] releases
/// them, and production paths never call it.
#[derive(Debug, Default)]
pub struct NoiseArena {
    buffers: Mutex<Vec<Box<[u8]>>>,
    retained_bytes: AtomicUsize,
}

impl NoiseArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates `len` pseudo-random bytes and returns the outstanding buffer count.
    pub fn inject(&self, len: usize) -> usize {
        let mut buffer = vec![0u8; len].into_boxed_slice();
        rand::thread_rng().fill_bytes(&mut buffer);

        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        buffers.push(buffer);
        self.retained_bytes.fetch_add(len, Ordering::AcqRel);
        buffers.len()
    }

    pub fn outstanding(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn retained_bytes(&self) -> usize {
        self.retained_bytes.load(Ordering::Acquire)
    }

    /// Releases every buffer. Test isolation only.
    pub fn clear(&self) {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.retained_bytes.store(0, Ordering::Release);
    }
}
