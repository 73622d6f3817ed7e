use std::time::Duration;

pub const DEFAULT_EMULATOR_CACHE_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_TIMING_THRESHOLD: Duration = Duration::from_millis(10);
pub const DEFAULT_TIMING_PROBE_ITERATIONS: u32 = 10_000;
pub const DEFAULT_HEAVY_PROBE_STRIDE: u64 = 10;
pub const DEFAULT_TIMING_PROBE_STRIDE: u64 = 5;
pub const DEFAULT_IDENTITY_ROTATION_STRIDE: u64 = 20;
pub const DEFAULT_NOISE_BUFFER_LEN: usize = 1024;
pub const DEFAULT_IDENTITY_ROTATION: [&str; 4] =
    ["system_server", "zygote", "media", "surfaceflinger"];
pub const DEFAULT_DECOY_CMDLINE: &str = "system_server";

/// Tunables for the probes, the monitor cadence and the counter-measures.
///
/// `Default` yields the built-in values; [`GuardConfig::from_env`] layers
/// `RUNTIME_GUARD_*` overrides on top. Unparseable overrides are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub emulator_cache_ttl: Duration,
    pub timing_threshold: Duration,
    pub timing_probe_iterations: u32,
    /// Emulator and virtual-environment probes run when `iteration % stride == 0`.
    pub heavy_probe_stride: u64,
    pub timing_probe_stride: u64,
    pub identity_rotation_stride: u64,
    pub noise_buffer_len: usize,
    pub identity_rotation: Vec<String>,
    pub decoy_cmdline: String,
    pub block_attach_on_init: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            emulator_cache_ttl: DEFAULT_EMULATOR_CACHE_TTL,
            timing_threshold: DEFAULT_TIMING_THRESHOLD,
            timing_probe_iterations: DEFAULT_TIMING_PROBE_ITERATIONS,
            heavy_probe_stride: DEFAULT_HEAVY_PROBE_STRIDE,
            timing_probe_stride: DEFAULT_TIMING_PROBE_STRIDE,
            identity_rotation_stride: DEFAULT_IDENTITY_ROTATION_STRIDE,
            noise_buffer_len: DEFAULT_NOISE_BUFFER_LEN,
            identity_rotation: DEFAULT_IDENTITY_ROTATION
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            decoy_cmdline: DEFAULT_DECOY_CMDLINE.to_string(),
            block_attach_on_init: true,
        }
    }
}

impl GuardConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(secs) = env_u64("RUNTIME_GUARD_EMULATOR_CACHE_TTL_SECS") {
            self.emulator_cache_ttl = Duration::from_secs(secs);
        }
        if let Some(micros) = env_u64("RUNTIME_GUARD_TIMING_THRESHOLD_MICROS") {
            self.timing_threshold = Duration::from_micros(micros);
        }
        if let Some(iterations) = env_u64("RUNTIME_GUARD_TIMING_ITERATIONS") {
            self.timing_probe_iterations = iterations.min(u32::MAX as u64) as u32;
        }
        if let Some(stride) = env_stride("RUNTIME_GUARD_HEAVY_PROBE_STRIDE") {
            self.heavy_probe_stride = stride;
        }
        if let Some(stride) = env_stride("RUNTIME_GUARD_TIMING_PROBE_STRIDE") {
            self.timing_probe_stride = stride;
        }
        if let Some(stride) = env_stride("RUNTIME_GUARD_IDENTITY_ROTATION_STRIDE") {
            self.identity_rotation_stride = stride;
        }
        if let Some(len) = env_u64("RUNTIME_GUARD_NOISE_BUFFER_BYTES") {
            self.noise_buffer_len = len as usize;
        }
        if let Some(names) = env_csv("RUNTIME_GUARD_IDENTITY_ROTATION") {
            self.identity_rotation = names;
        }
        if let Some(decoy) = env_non_empty("RUNTIME_GUARD_DECOY_CMDLINE") {
            self.decoy_cmdline = decoy;
        }
        if let Some(raw) = env_non_empty("RUNTIME_GUARD_BLOCK_ATTACH_ON_INIT") {
            self.block_attach_on_init = parse_bool(&raw);
        }
    }

    /// Identity to assume on `iteration`, if this iteration is a rotation point.
    ///
    /// Iteration 0 never rotates; the name is picked by `iteration % rotation.len()`.
    pub fn identity_for_iteration(&self, iteration: u64) -> Option<&str> {
        if iteration == 0 || self.identity_rotation.is_empty() {
            return None;
        }
        if iteration % self.identity_rotation_stride.max(1) != 0 {
            return None;
        }
        let idx = (iteration % self.identity_rotation.len() as u64) as usize;
        self.identity_rotation.get(idx).map(String::as_str)
    }

    pub fn heavy_probes_due(&self, iteration: u64) -> bool {
        iteration % self.heavy_probe_stride.max(1) == 0
    }

    pub fn timing_probe_due(&self, iteration: u64) -> bool {
        iteration % self.timing_probe_stride.max(1) == 0
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn env_u64(name: &str) -> Option<u64> {
    env_non_empty(name).and_then(|raw| raw.parse::<u64>().ok())
}

fn env_stride(name: &str) -> Option<u64> {
    env_u64(name).filter(|stride| *stride > 0)
}

fn env_csv(name: &str) -> Option<Vec<String>> {
    let raw = env_non_empty(name)?;
    let out: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "enabled" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_skips_iteration_zero_and_non_stride_iterations() {
        let config = GuardConfig::default();
        assert_eq!(config.identity_for_iteration(0), None);
        assert_eq!(config.identity_for_iteration(19), None);
        assert_eq!(config.identity_for_iteration(20), Some("system_server"));
        assert_eq!(config.identity_for_iteration(40), Some("system_server"));
    }

    #[test]
    fn rotation_index_follows_iteration_modulo_rotation_len() {
        let config = GuardConfig {
            identity_rotation_stride: 1,
            ..GuardConfig::default()
        };
        assert_eq!(config.identity_for_iteration(1), Some("zygote"));
        assert_eq!(config.identity_for_iteration(2), Some("media"));
        assert_eq!(config.identity_for_iteration(3), Some("surfaceflinger"));
        assert_eq!(config.identity_for_iteration(4), Some("system_server"));
    }

    #[test]
    fn probe_strides_include_iteration_zero() {
        let config = GuardConfig::default();
        assert!(config.heavy_probes_due(0));
        assert!(!config.heavy_probes_due(5));
        assert!(config.heavy_probes_due(10));
        assert!(config.timing_probe_due(0));
        assert!(config.timing_probe_due(5));
        assert!(!config.timing_probe_due(7));
    }

    #[test]
    fn zero_strides_do_not_panic() {
        let config = GuardConfig {
            heavy_probe_stride: 0,
            timing_probe_stride: 0,
            identity_rotation_stride: 0,
            ..GuardConfig::default()
        };
        assert!(config.heavy_probes_due(3));
        assert!(config.timing_probe_due(3));
        assert!(config.identity_for_iteration(3).is_some());
    }

    #[test]
    fn truthy_values_are_recognized() {
        assert!(parse_bool("1"));
        assert!(parse_bool(" On "));
        assert!(parse_bool("enabled"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("off"));
    }
}
