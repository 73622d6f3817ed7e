#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use runtime_guard::{
    ActionError, Clock, DetectionSignal, GuardConfig, ManualClock, ProcessControl,
    ProcessEnvironment, SecurityContext, SignalCollector,
};

fn slot(signal: DetectionSignal) -> usize {
    match signal {
        DetectionSignal::Traced => 0,
        DetectionSignal::Hooked => 1,
        DetectionSignal::Emulated => 2,
        DetectionSignal::Virtualized => 3,
        DetectionSignal::TimingAnomalous => 4,
    }
}

/// Collector whose answers are set by the test. Counts every probe call.
#[derive(Debug, Default)]
pub struct ScriptedSignals {
    values: [AtomicBool; 5],
    calls: [AtomicUsize; 5],
}

impl ScriptedSignals {
    pub fn with(signals: &[DetectionSignal]) -> Self {
        let scripted = Self::default();
        for signal in signals {
            scripted.set(*signal, true);
        }
        scripted
    }

    pub fn set(&self, signal: DetectionSignal, value: bool) {
        self.values[slot(signal)].store(value, Ordering::SeqCst);
    }

    pub fn calls(&self, signal: DetectionSignal) -> usize {
        self.calls[slot(signal)].load(Ordering::SeqCst)
    }

    fn answer(&self, signal: DetectionSignal) -> bool {
        self.calls[slot(signal)].fetch_add(1, Ordering::SeqCst);
        self.values[slot(signal)].load(Ordering::SeqCst)
    }
}

impl SignalCollector for ScriptedSignals {
    fn traced(&self) -> bool {
        self.answer(DetectionSignal::Traced)
    }

    fn hooked(&self) -> bool {
        self.answer(DetectionSignal::Hooked)
    }

    fn emulated(&self) -> bool {
        self.answer(DetectionSignal::Emulated)
    }

    fn virtualized(&self) -> bool {
        self.answer(DetectionSignal::Virtualized)
    }

    fn timing_anomalous(&self) -> bool {
        self.answer(DetectionSignal::TimingAnomalous)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCall {
    DenyAttach,
    SetName(String),
    OverwriteCmdline(String),
}

/// Process control that records requests instead of issuing them.
#[derive(Debug, Default)]
pub struct RecordingControl {
    calls: Mutex<Vec<ControlCall>>,
    fail: AtomicBool,
}

impl RecordingControl {
    pub fn failing() -> Self {
        let control = Self::default();
        control.fail.store(true, Ordering::SeqCst);
        control
    }

    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().expect("control calls lock").clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ControlCall::SetName(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ControlCall, action: &'static str) -> Result<(), ActionError> {
        self.calls.lock().expect("control calls lock").push(call);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ActionError::Rejected {
                action,
                reason: "Operation not permitted".to_string(),
            });
        }
        Ok(())
    }
}

impl ProcessControl for RecordingControl {
    fn deny_attach(&self) -> Result<(), ActionError> {
        self.record(ControlCall::DenyAttach, "PR_SET_DUMPABLE")
    }

    fn set_process_name(&self, name: &str) -> Result<(), ActionError> {
        self.record(ControlCall::SetName(name.to_string()), "PR_SET_NAME")
    }

    fn overwrite_cmdline(&self, decoy: &str) -> Result<(), ActionError> {
        self.record(
            ControlCall::OverwriteCmdline(decoy.to_string()),
            "cmdline_overwrite",
        )
    }
}

/// In-memory filesystem, property store and loader.
#[derive(Debug, Default)]
pub struct FakeEnvironment {
    files: HashMap<String, String>,
    paths: HashSet<String>,
    properties: HashMap<String, String>,
    libraries: HashSet<String>,
    property_reads: AtomicUsize,
}

impl FakeEnvironment {
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.paths.insert(path.to_string());
        self
    }

    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_library(mut self, name: &str) -> Self {
        self.libraries.insert(name.to_string());
        self
    }

    pub fn property_reads(&self) -> usize {
        self.property_reads.load(Ordering::SeqCst)
    }
}

impl ProcessEnvironment for FakeEnvironment {
    fn read_to_string(&self, path: &str) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    fn path_exists(&self, path: &str) -> bool {
        self.paths.contains(path) || self.files.contains_key(path)
    }

    fn system_property(&self, name: &str) -> Option<String> {
        self.property_reads.fetch_add(1, Ordering::SeqCst);
        self.properties
            .get(name)
            .filter(|value| !value.is_empty())
            .cloned()
    }

    fn library_loadable(&self, name: &str) -> bool {
        self.libraries.contains(name)
    }
}

pub struct Harness {
    pub context: Arc<SecurityContext>,
    pub signals: Arc<ScriptedSignals>,
    pub control: Arc<RecordingControl>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(signals: ScriptedSignals) -> Harness {
    harness_with(GuardConfig::default(), signals, RecordingControl::default())
}

pub fn harness_with(
    config: GuardConfig,
    signals: ScriptedSignals,
    control: RecordingControl,
) -> Harness {
    let signals = Arc::new(signals);
    let control = Arc::new(control);
    let clock = Arc::new(ManualClock::new());
    let context = SecurityContext::builder(config)
        .signals(signals.clone())
        .control(control.clone())
        .clock(clock.clone() as Arc<dyn Clock>)
        .build();
    Harness {
        context: Arc::new(context),
        signals,
        control,
        clock,
    }
}
