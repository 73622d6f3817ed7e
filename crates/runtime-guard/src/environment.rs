//! Read-only view of the OS state the collectors probe.

use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROPERTY_FILES: [&str; 3] =
    ["/system/build.prop", "/vendor/build.prop", "/default.prop"];

pub trait ProcessEnvironment: Send + Sync {
    /// File contents as text. Bytes that are not UTF-8 are replaced, never fatal.
    fn read_to_string(&self, path: &str) -> io::Result<String>;

    fn path_exists(&self, path: &str) -> bool;

    /// Value of a system property; `None` when unset or empty.
    fn system_property(&self, name: &str) -> Option<String>;

    /// Whether a shared library with this name can be loaded into the process.
    fn library_loadable(&self, name: &str) -> bool;
}

/// The real process environment.
///
/// On Android properties come from the property service. Elsewhere they are
/// looked up in `build.prop`-style files, later files overriding earlier ones.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    property_files: Vec<PathBuf>,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self::with_property_files(DEFAULT_PROPERTY_FILES.iter().map(PathBuf::from).collect())
    }
}

impl HostEnvironment {
    pub fn with_property_files(property_files: Vec<PathBuf>) -> Self {
        Self { property_files }
    }

    fn property_from_files(&self, name: &str) -> Option<String> {
        let mut found = None;
        for path in &self.property_files {
            let Ok(content) = read_lossy(path) else {
                continue;
            };
            if let Some(value) = parse_property_file(&content, name) {
                found = Some(value);
            }
        }
        found
    }
}

impl ProcessEnvironment for HostEnvironment {
    fn read_to_string(&self, path: &str) -> io::Result<String> {
        read_lossy(Path::new(path))
    }

    fn path_exists(&self, path: &str) -> bool {
        std::fs::metadata(Path::new(path)).is_ok()
    }

    fn system_property(&self, name: &str) -> Option<String> {
        #[cfg(target_os = "android")]
        {
            if let Some(value) = android_property(name) {
                return Some(value);
            }
        }
        self.property_from_files(name)
    }

    fn library_loadable(&self, name: &str) -> bool {
        #[cfg(unix)]
        {
            dlopen_probe(name)
        }
        #[cfg(not(unix))]
        {
            let _ = name;
            false
        }
    }
}

/// `/proc` entries may carry arbitrary bytes (module paths, comm names).
fn read_lossy(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Last `name=value` assignment for `name` in a property file, if non-empty.
pub fn parse_property_file(content: &str, name: &str) -> Option<String> {
    let mut found = None;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() == name {
            let value = value.trim();
            found = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
    }
    found
}

#[cfg(target_os = "android")]
fn android_property(name: &str) -> Option<String> {
    use std::ffi::{CStr, CString};

    const PROP_VALUE_MAX: usize = 92;

    let key = CString::new(name).ok()?;
    let mut buf = [0 as libc::c_char; PROP_VALUE_MAX];
    // SAFETY: `key` is NUL-terminated and `buf` holds PROP_VALUE_MAX bytes as the API requires.
    let len = unsafe { libc::__system_property_get(key.as_ptr(), buf.as_mut_ptr()) };
    if len <= 0 {
        return None;
    }
    // SAFETY: the property service always NUL-terminates the value within PROP_VALUE_MAX.
    let value = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Some(value.to_string_lossy().into_owned())
}

#[cfg(unix)]
fn dlopen_probe(name: &str) -> bool {
    let Ok(c_name) = std::ffi::CString::new(name) else {
        return false;
    };
    // SAFETY: `c_name` is a valid NUL-terminated string for the duration of the call.
    let handle = unsafe { libc::dlopen(c_name.as_ptr(), libc::RTLD_NOW) };
    if handle.is_null() {
        return false;
    }
    // SAFETY: `handle` was returned by a successful dlopen and is closed exactly once.
    unsafe { libc::dlclose(handle) };
    true
}
