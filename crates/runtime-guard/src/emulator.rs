use std::fmt;

use tracing::debug;

use crate::cache::EnvironmentCache;
use crate::environment::ProcessEnvironment;
use crate::signals::DetectionSignal;
use crate::tables::ProbeTables;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmulatorIndicator {
    Property {
        name: &'static str,
        value: String,
        token: &'static str,
    },
    File {
        path: &'static str,
    },
}

impl EmulatorIndicator {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Property { .. } => "emulator_property",
            Self::File { .. } => "emulator_file",
        }
    }
}

impl fmt::Display for EmulatorIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property { name, value, token } => {
                write!(f, "property {}={} contains '{}'", name, value, token)
            }
            Self::File { path } => write!(f, "emulator file present: {}", path),
        }
    }
}

/// Uncached probe: properties first, then device files. First match wins.
pub fn probe_emulator(env: &dyn ProcessEnvironment, tables: &ProbeTables) -> Option<EmulatorIndicator> {
    for &name in tables.emulator_properties {
        let Some(value) = env.system_property(name) else {
            continue;
        };
        if let Some(&token) = tables
            .emulator_tokens
            .iter()
            .find(|token| value.contains(**token))
        {
            return Some(EmulatorIndicator::Property { name, value, token });
        }
    }

    for &path in tables.emulator_paths {
        if env.path_exists(path) {
            return Some(EmulatorIndicator::File { path });
        }
    }

    None
}

/// Emulator signal through the cache. Negative results are cached as well.
pub fn detect_emulator(
    cache: &EnvironmentCache,
    env: &dyn ProcessEnvironment,
    tables: &ProbeTables,
) -> bool {
    cache.get_or_compute(DetectionSignal::Emulated, || {
        match probe_emulator(env, tables) {
            Some(indicator) => {
                debug!(code = indicator.code(), detail = %indicator, "emulator detected");
                true
            }
            None => false,
        }
    })
}
