/// Static marker tables consulted by the signal collectors.
///
/// Collectors never hard-code paths or tokens; tests swap in their own
/// tables to exercise probe logic against fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTables {
    pub status_path: &'static str,
    pub maps_path: &'static str,
    pub hook_libraries: &'static [&'static str],
    /// Lowercase substrings matched against loaded-module paths.
    pub hook_module_markers: &'static [&'static str],
    pub root_marker_paths: &'static [&'static str],
    pub root_properties: &'static [&'static str],
    pub emulator_properties: &'static [&'static str],
    /// Case-sensitive tokens searched for in emulator property values.
    pub emulator_tokens: &'static [&'static str],
    pub emulator_paths: &'static [&'static str],
    pub virtualization_paths: &'static [&'static str],
}

pub const HOOK_LIBRARIES: &[&str] = &["libxposed_art.so", "libsubstrate.so"];

pub const HOOK_MODULE_MARKERS: &[&str] = &["frida", "gum-js-loop", "linjector"];

pub const ROOT_MARKER_PATHS: &[&str] = &[
    "/sbin/.magisk",
    "/sbin/.core",
    "/data/adb/magisk",
    "/cache/.disable_magisk",
    "/dev/.magisk.db",
];

pub const ROOT_PROPERTIES: &[&str] = &["ro.magisk.hide"];

pub const EMULATOR_PROPERTIES: &[&str] = &[
    "ro.hardware",
    "ro.product.model",
    "ro.product.manufacturer",
    "ro.kernel.qemu",
    "ro.bootloader",
    "ro.bootmode",
    "ro.build.characteristics",
];

pub const EMULATOR_TOKENS: &[&str] = &[
    "goldfish",
    "ranchu",
    "sdk",
    "sdk_gphone",
    "emulator",
    "Genymotion",
    "vbox",
    "nox",
    "bluestacks",
    "android_x86",
];

pub const EMULATOR_PATHS: &[&str] = &[
    "/dev/socket/qemud",
    "/dev/qemu_pipe",
    "/system/lib/libc_malloc_debug_qemu.so",
    "/sys/qemu_trace",
    "/system/bin/qemu-props",
    "/dev/socket/genyd",
    "/dev/socket/baseband_genyd",
];

pub const VIRTUALIZATION_PATHS: &[&str] =
    &["/.dockerenv", "/dev/lxc", "/dev/vboxguest", "/dev/vboxuser"];

pub const DEFAULT_PROBE_TABLES: ProbeTables = ProbeTables {
    status_path: "/proc/self/status",
    maps_path: "/proc/self/maps",
    hook_libraries: HOOK_LIBRARIES,
    hook_module_markers: HOOK_MODULE_MARKERS,
    root_marker_paths: ROOT_MARKER_PATHS,
    root_properties: ROOT_PROPERTIES,
    emulator_properties: EMULATOR_PROPERTIES,
    emulator_tokens: EMULATOR_TOKENS,
    emulator_paths: EMULATOR_PATHS,
    virtualization_paths: VIRTUALIZATION_PATHS,
};

impl Default for ProbeTables {
    fn default() -> Self {
        DEFAULT_PROBE_TABLES
    }
}

impl ProbeTables {
    /// Tables with every list empty; probes built on it never fire.
    pub const fn empty() -> Self {
        Self {
            status_path: "/proc/self/status",
            maps_path: "/proc/self/maps",
            hook_libraries: &[],
            hook_module_markers: &[],
            root_marker_paths: &[],
            root_properties: &[],
            emulator_properties: &[],
            emulator_tokens: &[],
            emulator_paths: &[],
            virtualization_paths: &[],
        }
    }
}
