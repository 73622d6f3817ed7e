//! Instrumentation-framework and root-hiding tool detection.
//!
//! Probes run cheapest-first and stop at the first indicator: framework
//! library load, loaded-module scan, then root-tool markers.

use std::fmt;

use tracing::debug;

use crate::environment::ProcessEnvironment;
use crate::tables::ProbeTables;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookIndicator {
    FrameworkLibrary { library: &'static str },
    LoadedModule { path: String, marker: &'static str },
    RootMarkerFile { path: &'static str },
    RootProperty { name: &'static str, value: String },
}

impl HookIndicator {
    pub fn code(&self) -> &'static str {
        match self {
            Self::FrameworkLibrary { .. } => "framework_library",
            Self::LoadedModule { .. } => "loaded_module",
            Self::RootMarkerFile { .. } => "root_marker_file",
            Self::RootProperty { .. } => "root_property",
        }
    }
}

impl fmt::Display for HookIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameworkLibrary { library } => {
                write!(f, "hook framework library loadable: {}", library)
            }
            Self::LoadedModule { path, marker } => {
                write!(f, "loaded module {} matches '{}'", path, marker)
            }
            Self::RootMarkerFile { path } => write!(f, "root tool marker present: {}", path),
            Self::RootProperty { name, value } => {
                write!(f, "root tool property set: {}={}", name, value)
            }
        }
    }
}

pub fn detect_hook_framework(
    env: &dyn ProcessEnvironment,
    tables: &ProbeTables,
) -> Option<HookIndicator> {
    for &library in tables.hook_libraries {
        if env.library_loadable(library) {
            return Some(HookIndicator::FrameworkLibrary { library });
        }
    }

    match env.read_to_string(tables.maps_path) {
        Ok(maps) => {
            if let Some((path, marker)) = scan_loaded_modules(&maps, tables.hook_module_markers) {
                return Some(HookIndicator::LoadedModule { path, marker });
            }
        }
        Err(err) => {
            debug!(
                path = tables.maps_path,
                error = %err,
                "loaded-module manifest unavailable; skipping module scan"
            );
        }
    }

    detect_root_tooling(env, tables)
}

fn detect_root_tooling(env: &dyn ProcessEnvironment, tables: &ProbeTables) -> Option<HookIndicator> {
    for &path in tables.root_marker_paths {
        if env.path_exists(path) {
            return Some(HookIndicator::RootMarkerFile { path });
        }
    }
    for &name in tables.root_properties {
        if let Some(value) = env.system_property(name) {
            return Some(HookIndicator::RootProperty { name, value });
        }
    }
    None
}

/// First mapped module whose path contains one of `markers` (case-insensitive).
///
/// `maps` uses the `/proc/<pid>/maps` layout: five fixed columns followed by
/// an optional path that may itself contain spaces.
pub fn scan_loaded_modules(
    maps: &str,
    markers: &[&'static str],
) -> Option<(String, &'static str)> {
    if markers.is_empty() {
        return None;
    }
    for line in maps.lines() {
        let Some(path) = mapped_path(line) else {
            continue;
        };
        let lowered = path.to_ascii_lowercase();
        if let Some(marker) = markers.iter().find(|marker| lowered.contains(**marker)) {
            return Some((path.to_string(), *marker));
        }
    }
    None
}

fn mapped_path(line: &str) -> Option<&str> {
    let mut rest = line.trim_start();
    for _ in 0..5 {
        let end = rest.find(char::is_whitespace)?;
        rest = rest[end..].trim_start();
    }
    let path = rest.trim_end();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}
