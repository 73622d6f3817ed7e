use tracing::debug;

use crate::environment::ProcessEnvironment;
use crate::tables::ProbeTables;

/// First container or hypervisor marker present on the filesystem.
pub fn virtualization_marker(
    env: &dyn ProcessEnvironment,
    tables: &ProbeTables,
) -> Option<&'static str> {
    tables
        .virtualization_paths
        .iter()
        .copied()
        .find(|path| env.path_exists(path))
}

pub fn detect_virtual_environment(env: &dyn ProcessEnvironment, tables: &ProbeTables) -> bool {
    match virtualization_marker(env, tables) {
        Some(path) => {
            debug!(path, "virtual environment marker present");
            true
        }
        None => false,
    }
}
