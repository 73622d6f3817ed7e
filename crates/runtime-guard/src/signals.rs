use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cache::EnvironmentCache;
use crate::clock::Clock;
use crate::config::GuardConfig;
use crate::debugger::{detect_traced, sample_timing};
use crate::emulator::detect_emulator;
use crate::environment::{HostEnvironment, ProcessEnvironment};
use crate::hooks::detect_hook_framework;
use crate::tables::ProbeTables;
use crate::virtualization::detect_virtual_environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSignal {
    Traced,
    Hooked,
    Emulated,
    Virtualized,
    TimingAnomalous,
}

impl DetectionSignal {
    pub const ALL: [DetectionSignal; 5] = [
        Self::Traced,
        Self::Hooked,
        Self::Emulated,
        Self::Virtualized,
        Self::TimingAnomalous,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Traced => "traced",
            Self::Hooked => "hooked",
            Self::Emulated => "emulated",
            Self::Virtualized => "virtualized",
            Self::TimingAnomalous => "timing_anomalous",
        }
    }
}

/// Outcomes of one evaluation pass. `None` means the probe was not run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalSnapshot {
    pub traced: Option<bool>,
    pub hooked: Option<bool>,
    pub emulated: Option<bool>,
    pub virtualized: Option<bool>,
    pub timing_anomalous: Option<bool>,
}

impl SignalSnapshot {
    pub fn get(&self, signal: DetectionSignal) -> Option<bool> {
        match signal {
            DetectionSignal::Traced => self.traced,
            DetectionSignal::Hooked => self.hooked,
            DetectionSignal::Emulated => self.emulated,
            DetectionSignal::Virtualized => self.virtualized,
            DetectionSignal::TimingAnomalous => self.timing_anomalous,
        }
    }

    pub fn set(&mut self, signal: DetectionSignal, value: bool) {
        let slot = match signal {
            DetectionSignal::Traced => &mut self.traced,
            DetectionSignal::Hooked => &mut self.hooked,
            DetectionSignal::Emulated => &mut self.emulated,
            DetectionSignal::Virtualized => &mut self.virtualized,
            DetectionSignal::TimingAnomalous => &mut self.timing_anomalous,
        };
        *slot = Some(value);
    }

    pub fn detected(&self) -> Vec<DetectionSignal> {
        DetectionSignal::ALL
            .into_iter()
            .filter(|signal| self.get(*signal) == Some(true))
            .collect()
    }

    pub fn any_detected(&self) -> bool {
        DetectionSignal::ALL
            .into_iter()
            .any(|signal| self.get(signal) == Some(true))
    }

    /// True when timing is the only positive signal.
    pub fn only_timing_detected(&self) -> bool {
        self.detected() == [DetectionSignal::TimingAnomalous]
    }
}

/// Source of the five detection signals.
///
/// The monitor loop and the boundary calls only see this trait, so tests can
/// substitute scripted collectors for the host probes.
pub trait SignalCollector: Send + Sync {
    fn traced(&self) -> bool;
    fn hooked(&self) -> bool;
    fn emulated(&self) -> bool;
    fn virtualized(&self) -> bool;
    fn timing_anomalous(&self) -> bool;

    fn collect(&self, signal: DetectionSignal) -> bool {
        match signal {
            DetectionSignal::Traced => self.traced(),
            DetectionSignal::Hooked => self.hooked(),
            DetectionSignal::Emulated => self.emulated(),
            DetectionSignal::Virtualized => self.virtualized(),
            DetectionSignal::TimingAnomalous => self.timing_anomalous(),
        }
    }
}

/// Collectors backed by the real process environment.
pub struct HostSignals {
    env: Arc<dyn ProcessEnvironment>,
    tables: ProbeTables,
    clock: Arc<dyn Clock>,
    emulator_cache: EnvironmentCache,
    timing_iterations: u32,
    timing_threshold: Duration,
}

impl HostSignals {
    pub fn new(config: &GuardConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_environment(
            config,
            Arc::new(HostEnvironment::default()),
            ProbeTables::default(),
            clock,
        )
    }

    pub fn with_environment(
        config: &GuardConfig,
        env: Arc<dyn ProcessEnvironment>,
        tables: ProbeTables,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            env,
            tables,
            emulator_cache: EnvironmentCache::new(config.emulator_cache_ttl, clock.clone()),
            clock,
            timing_iterations: config.timing_probe_iterations,
            timing_threshold: config.timing_threshold,
        }
    }

    pub fn emulator_cache(&self) -> &EnvironmentCache {
        &self.emulator_cache
    }
}

impl SignalCollector for HostSignals {
    fn traced(&self) -> bool {
        detect_traced(self.env.as_ref(), &self.tables)
    }

    fn hooked(&self) -> bool {
        match detect_hook_framework(self.env.as_ref(), &self.tables) {
            Some(indicator) => {
                debug!(code = indicator.code(), detail = %indicator, "hook framework detected");
                true
            }
            None => false,
        }
    }

    fn emulated(&self) -> bool {
        detect_emulator(&self.emulator_cache, self.env.as_ref(), &self.tables)
    }

    fn virtualized(&self) -> bool {
        detect_virtual_environment(self.env.as_ref(), &self.tables)
    }

    fn timing_anomalous(&self) -> bool {
        let sample = sample_timing(
            self.clock.as_ref(),
            self.timing_iterations,
            self.timing_threshold,
        );
        if sample.anomalous() {
            debug!(detail = %sample, "timing anomaly observed");
        }
        sample.anomalous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_tracks_only_evaluated_signals() {
        let mut snapshot = SignalSnapshot::default();
        assert!(!snapshot.any_detected());
        snapshot.set(DetectionSignal::Traced, false);
        snapshot.set(DetectionSignal::TimingAnomalous, true);
        assert_eq!(snapshot.get(DetectionSignal::Traced), Some(false));
        assert_eq!(snapshot.get(DetectionSignal::Emulated), None);
        assert!(snapshot.any_detected());
        assert!(snapshot.only_timing_detected());

        snapshot.set(DetectionSignal::Hooked, true);
        assert!(!snapshot.only_timing_detected());
        assert_eq!(
            snapshot.detected(),
            vec![DetectionSignal::Hooked, DetectionSignal::TimingAnomalous]
        );
    }

    #[test]
    fn snapshot_serializes_with_snake_case_fields() {
        let mut snapshot = SignalSnapshot::default();
        snapshot.set(DetectionSignal::TimingAnomalous, false);
        let json = serde_json::to_value(snapshot).expect("serialize snapshot");
        assert_eq!(json["timing_anomalous"], serde_json::json!(false));
        assert!(json["emulated"].is_null());
    }
}
