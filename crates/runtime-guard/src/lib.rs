pub mod boundary;
mod cache;
mod clock;
mod config;
mod context;
mod countermeasures;
mod debugger;
mod emulator;
mod environment;
mod error;
mod extensions;
mod hardening;
mod hooks;
mod level;
mod monitor;
mod signals;
mod tables;
mod virtualization;

pub use cache::EnvironmentCache;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{
    GuardConfig, DEFAULT_DECOY_CMDLINE, DEFAULT_EMULATOR_CACHE_TTL, DEFAULT_HEAVY_PROBE_STRIDE,
    DEFAULT_IDENTITY_ROTATION, DEFAULT_IDENTITY_ROTATION_STRIDE, DEFAULT_NOISE_BUFFER_LEN,
    DEFAULT_TIMING_PROBE_ITERATIONS, DEFAULT_TIMING_PROBE_STRIDE, DEFAULT_TIMING_THRESHOLD,
};
pub use context::{
    IterationReport, SecurityContext, SecurityContextBuilder, SecurityStatus,
};
pub use countermeasures::{AppliedCounterMeasure, CounterMeasure, NoiseArena};
pub use debugger::{
    detect_traced, parse_tracer_pid, run_timing_workload, sample_timing, tracer_pid, TimingSample,
};
pub use emulator::{detect_emulator, probe_emulator, EmulatorIndicator};
pub use environment::{
    parse_property_file, HostEnvironment, ProcessEnvironment, DEFAULT_PROPERTY_FILES,
};
pub use error::ActionError;
pub use extensions::{NoopExtensions, ProtectionExtensions};
pub use hardening::{HostProcessControl, ProcessControl, DEFAULT_CMDLINE_PATH};
pub use hooks::{detect_hook_framework, scan_loaded_modules, HookIndicator};
pub use level::{
    initial_level, is_being_analyzed, SecurityLevel, ENHANCED_POLL_INTERVAL,
    MAXIMUM_POLL_INTERVAL, NORMAL_POLL_INTERVAL,
};
pub use monitor::{MonitorHandle, StopSignal, MONITOR_THREAD_NAME};
pub use signals::{DetectionSignal, HostSignals, SignalCollector, SignalSnapshot};
pub use tables::{
    ProbeTables, DEFAULT_PROBE_TABLES, EMULATOR_PATHS, EMULATOR_PROPERTIES, EMULATOR_TOKENS,
    HOOK_LIBRARIES, HOOK_MODULE_MARKERS, ROOT_MARKER_PATHS, ROOT_PROPERTIES,
    VIRTUALIZATION_PATHS,
};
pub use virtualization::{detect_virtual_environment, virtualization_marker};
