use std::path::PathBuf;

use crate::error::ActionError;

pub const DEFAULT_CMDLINE_PATH: &str = "/proc/self/cmdline";

/// OS requests issued by the counter-measures.
pub trait ProcessControl: Send + Sync {
    /// Mark the process non-dumpable so tracers cannot attach.
    fn deny_attach(&self) -> Result<(), ActionError>;

    /// Rename the thread-visible process name.
    fn set_process_name(&self, name: &str) -> Result<(), ActionError>;

    /// Overwrite the externally visible argument string.
    fn overwrite_cmdline(&self, decoy: &str) -> Result<(), ActionError>;
}

#[derive(Debug, Clone)]
pub struct HostProcessControl {
    cmdline_path: PathBuf,
}

impl Default for HostProcessControl {
    fn default() -> Self {
        Self::with_cmdline_path(PathBuf::from(DEFAULT_CMDLINE_PATH))
    }
}

impl HostProcessControl {
    pub fn with_cmdline_path(cmdline_path: PathBuf) -> Self {
        Self { cmdline_path }
    }
}

impl ProcessControl for HostProcessControl {
    fn deny_attach(&self) -> Result<(), ActionError> {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            run_prctl("PR_SET_DUMPABLE", libc::PR_SET_DUMPABLE, 0)
        }
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        {
            Err(ActionError::Unsupported {
                action: "PR_SET_DUMPABLE",
            })
        }
    }

    fn set_process_name(&self, name: &str) -> Result<(), ActionError> {
        let c_name = std::ffi::CString::new(name).map_err(|err| ActionError::InvalidArgument {
            action: "PR_SET_NAME",
            detail: err.to_string(),
        })?;

        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            run_prctl(
                "PR_SET_NAME",
                libc::PR_SET_NAME,
                c_name.as_ptr() as libc::c_ulong,
            )
        }
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        {
            drop(c_name);
            Err(ActionError::Unsupported {
                action: "PR_SET_NAME",
            })
        }
    }

    fn overwrite_cmdline(&self, decoy: &str) -> Result<(), ActionError> {
        use std::io::Write;

        let mut payload = Vec::with_capacity(decoy.len() + 1);
        payload.extend_from_slice(decoy.as_bytes());
        payload.push(0);

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.cmdline_path)
            .map_err(|err| ActionError::rejected("cmdline_overwrite", err))?;
        file.write_all(&payload)
            .map_err(|err| ActionError::rejected("cmdline_overwrite", err))
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn run_prctl(
    name: &'static str,
    option: libc::c_int,
    arg2: libc::c_ulong,
) -> Result<(), ActionError> {
    // SAFETY: prctl with these options reads at most `arg2`, which callers keep valid for the call.
    let rc = unsafe { libc::prctl(option, arg2, 0, 0, 0) };
    if rc == 0 {
        return Ok(());
    }

    Err(ActionError::rejected(name, std::io::Error::last_os_error()))
}
