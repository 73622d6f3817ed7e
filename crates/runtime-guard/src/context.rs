//! The security context: shared level/monitor state plus the collaborators
//! every probe and counter-measure goes through.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::GuardConfig;
use crate::countermeasures::{AppliedCounterMeasure, CounterMeasure, NoiseArena};
use crate::extensions::{NoopExtensions, ProtectionExtensions};
use crate::hardening::{HostProcessControl, ProcessControl};
use crate::level::{self, SecurityLevel};
use crate::signals::{DetectionSignal, HostSignals, SignalCollector, SignalSnapshot};

#[derive(Debug, Clone, Copy, Default)]
struct ControlState {
    running: bool,
    level: SecurityLevel,
}

/// Outcome of one monitor iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationReport {
    pub iteration: u64,
    pub level: SecurityLevel,
    pub signals: SignalSnapshot,
    pub countermeasures: Vec<AppliedCounterMeasure>,
    pub rotated_identity: Option<String>,
    pub next_sleep: Duration,
}

impl IterationReport {
    pub fn applied_actions(&self) -> Vec<&'static str> {
        self.countermeasures.iter().map(|applied| applied.action).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityStatus {
    pub level: SecurityLevel,
    pub level_raw: u8,
    pub monitor_running: bool,
    pub iterations: u64,
    pub noise_buffers: usize,
    pub last_signals: SignalSnapshot,
    pub detected: Vec<&'static str>,
}

impl SecurityStatus {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub struct SecurityContext {
    config: GuardConfig,
    state: Mutex<ControlState>,
    iterations: AtomicU64,
    clock: Arc<dyn Clock>,
    signals: Arc<dyn SignalCollector>,
    control: Arc<dyn ProcessControl>,
    extensions: Arc<dyn ProtectionExtensions>,
    noise: NoiseArena,
    last_signals: Mutex<SignalSnapshot>,
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = *self.lock_state();
        f.debug_struct("SecurityContext")
            .field("config", &self.config)
            .field("level", &state.level)
            .field("running", &state.running)
            .field("iterations", &self.iterations())
            .field("noise_buffers", &self.noise.outstanding())
            .finish()
    }
}

pub struct SecurityContextBuilder {
    config: GuardConfig,
    clock: Option<Arc<dyn Clock>>,
    signals: Option<Arc<dyn SignalCollector>>,
    control: Option<Arc<dyn ProcessControl>>,
    extensions: Option<Arc<dyn ProtectionExtensions>>,
}

impl SecurityContextBuilder {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            clock: None,
            signals: None,
            control: None,
            extensions: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn signals(mut self, signals: Arc<dyn SignalCollector>) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn control(mut self, control: Arc<dyn ProcessControl>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn extensions(mut self, extensions: Arc<dyn ProtectionExtensions>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn build(self) -> SecurityContext {
        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock));
        let signals = self
            .signals
            .unwrap_or_else(|| Arc::new(HostSignals::new(&self.config, clock.clone())));
        SecurityContext {
            state: Mutex::new(ControlState::default()),
            iterations: AtomicU64::new(0),
            clock,
            signals,
            control: self
                .control
                .unwrap_or_else(|| Arc::new(HostProcessControl::default())),
            extensions: self.extensions.unwrap_or_else(|| Arc::new(NoopExtensions)),
            noise: NoiseArena::new(),
            last_signals: Mutex::new(SignalSnapshot::default()),
            config: self.config,
        }
    }
}

impl SecurityContext {
    pub fn new(config: GuardConfig) -> Self {
        SecurityContextBuilder::new(config).build()
    }

    pub fn from_env() -> Self {
        Self::new(GuardConfig::from_env())
    }

    pub fn builder(config: GuardConfig) -> SecurityContextBuilder {
        SecurityContextBuilder::new(config)
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn extensions(&self) -> &dyn ProtectionExtensions {
        self.extensions.as_ref()
    }

    pub fn noise(&self) -> &NoiseArena {
        &self.noise
    }

    fn lock_state(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.lock_state().level
    }

    /// Applies `raw` if it names a level (1..=3); anything else is ignored.
    pub fn set_security_level(&self, raw: i32) {
        match SecurityLevel::from_raw(raw.into()) {
            Some(level) => {
                self.lock_state().level = level;
                info!(level = level.as_raw(), "security level set");
            }
            None => debug!(raw, "ignoring out-of-range security level"),
        }
    }

    /// Blocks attach (when configured), probes for an emulator or hook
    /// framework, and picks the starting level from the result.
    pub fn initialize_security(&self) -> SecurityLevel {
        info!("initializing runtime security");
        if self.config.block_attach_on_init {
            self.apply_countermeasure(&CounterMeasure::BlockDebuggerAttach);
        }

        let emulated = self.signals.emulated();
        let hooked = self.signals.hooked();
        let level = level::initial_level(emulated, hooked);
        self.lock_state().level = level;

        if level == SecurityLevel::Maximum {
            warn!(
                emulated,
                hooked,
                "suspicious environment at startup; escalating to maximum security"
            );
        } else {
            info!(level = level.as_raw(), "runtime security initialized");
        }
        level
    }

    pub fn is_being_analyzed(&self) -> bool {
        level::is_being_analyzed(self.security_level(), self.signals.as_ref())
    }

    pub fn is_running_in_emulator(&self) -> bool {
        self.signals.emulated()
    }

    pub fn has_hook_framework(&self) -> bool {
        self.signals.hooked()
    }

    pub fn spoof_process_name(&self, name: &str) -> bool {
        self.apply_countermeasure(&CounterMeasure::SpoofProcessIdentity(name.to_string()))
            .succeeded
    }

    /// Best-effort overwrite of the visible command line with the decoy.
    ///
    /// Only the current process can be rewritten; `pid` is recorded for
    /// diagnostics. Reports `true` even when the write is refused.
    pub fn hide_process_info(&self, pid: i32) -> bool {
        match self.control.overwrite_cmdline(&self.config.decoy_cmdline) {
            Ok(()) => debug!(pid, decoy = %self.config.decoy_cmdline, "command line replaced"),
            Err(err) => error!(pid, error = %err, "command line overwrite failed"),
        }
        true
    }

    pub fn apply_countermeasure(&self, measure: &CounterMeasure) -> AppliedCounterMeasure {
        let result = measure.apply(
            self.control.as_ref(),
            &self.noise,
            self.config.noise_buffer_len,
        );
        AppliedCounterMeasure::from_result(measure, &result)
    }

    /// Evaluates the probes due on `iteration` and reacts per the current level.
    pub fn run_iteration(&self, iteration: u64) -> IterationReport {
        let mut signals = SignalSnapshot::default();
        signals.set(DetectionSignal::Traced, self.signals.traced());
        signals.set(DetectionSignal::Hooked, self.signals.hooked());
        if self.config.heavy_probes_due(iteration) {
            signals.set(DetectionSignal::Emulated, self.signals.emulated());
            signals.set(DetectionSignal::Virtualized, self.signals.virtualized());
        }
        if self.config.timing_probe_due(iteration) {
            signals.set(
                DetectionSignal::TimingAnomalous,
                self.signals.timing_anomalous(),
            );
        }

        let level = self.security_level();
        let mut countermeasures: Vec<AppliedCounterMeasure> = level
            .response_to(&signals)
            .iter()
            .map(|measure| self.apply_countermeasure(measure))
            .collect();

        let rotated_identity = self
            .config
            .identity_for_iteration(iteration)
            .map(str::to_string);
        if let Some(name) = &rotated_identity {
            countermeasures.push(
                self.apply_countermeasure(&CounterMeasure::SpoofProcessIdentity(name.clone())),
            );
        }

        self.record_signals(iteration, level, &signals);

        IterationReport {
            iteration,
            level,
            signals,
            countermeasures,
            rotated_identity,
            next_sleep: self.security_level().poll_interval(),
        }
    }

    fn record_signals(&self, iteration: u64, level: SecurityLevel, signals: &SignalSnapshot) {
        let mut last = self
            .last_signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = last.detected();
        for signal in DetectionSignal::ALL {
            if let Some(value) = signals.get(signal) {
                last.set(signal, value);
            }
        }
        let after = last.detected();
        if before == after {
            return;
        }

        let codes: Vec<&'static str> = after.iter().map(|signal| signal.code()).collect();
        if after.is_empty() {
            info!(iteration, "analysis signals cleared");
        } else {
            warn!(
                iteration,
                level = level.as_raw(),
                signals = ?codes,
                "analysis signals changed"
            );
        }
    }

    pub fn last_signals(&self) -> SignalSnapshot {
        *self
            .last_signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Acquire)
    }

    pub fn is_monitor_running(&self) -> bool {
        self.lock_state().running
    }

    /// Atomically claims the monitor slot. Returns false if already running.
    pub(crate) fn try_begin_monitor(&self) -> bool {
        let mut state = self.lock_state();
        if state.running {
            return false;
        }
        state.running = true;
        true
    }

    pub(crate) fn end_monitor(&self) {
        self.lock_state().running = false;
    }

    pub(crate) fn complete_iteration(&self) -> u64 {
        self.iterations.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn status(&self) -> SecurityStatus {
        let state = *self.lock_state();
        let last_signals = self.last_signals();
        SecurityStatus {
            level: state.level,
            level_raw: state.level.as_raw(),
            monitor_running: state.running,
            iterations: self.iterations(),
            noise_buffers: self.noise.outstanding(),
            detected: last_signals
                .detected()
                .into_iter()
                .map(DetectionSignal::code)
                .collect(),
            last_signals,
        }
    }
}
