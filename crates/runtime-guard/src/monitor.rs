use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::context::SecurityContext;

pub const MONITOR_THREAD_NAME: &str = "runtime-guard-monitor";

/// One-shot stop request that also wakes a sleeping monitor.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.wake.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks for up to `timeout`; returns early with `true` once stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = self
            .wake
            .wait_timeout_while(stopped, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }
}

/// Owner of the background monitor thread.
///
/// At most one monitor runs per context. Dropping the handle stops the loop
/// and joins the thread.
#[derive(Debug)]
pub struct MonitorHandle {
    context: Arc<SecurityContext>,
    stop: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Starts the monitor unless one is already running for `context`.
    pub fn start(context: Arc<SecurityContext>) -> Option<Self> {
        if !context.try_begin_monitor() {
            debug!("monitor already running; start ignored");
            return None;
        }

        let stop = Arc::new(StopSignal::new());
        let loop_context = context.clone();
        let loop_stop = stop.clone();
        let spawned = thread::Builder::new()
            .name(MONITOR_THREAD_NAME.to_string())
            .spawn(move || run_monitor(&loop_context, &loop_stop));

        match spawned {
            Ok(thread) => {
                info!(
                    level = context.security_level().as_raw(),
                    "runtime monitor started"
                );
                Some(Self {
                    context,
                    stop,
                    thread: Some(thread),
                })
            }
            Err(err) => {
                context.end_monitor();
                error!(error = %err, "failed spawning runtime monitor thread");
                None
            }
        }
    }

    pub fn context(&self) -> &Arc<SecurityContext> {
        &self.context
    }

    /// Stops the loop, cutting short any poll-interval sleep, and returns
    /// the total iteration count.
    pub fn stop(mut self) -> u64 {
        self.shutdown();
        self.context.iterations()
    }

    fn shutdown(&mut self) {
        self.stop.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("runtime monitor thread panicked");
                self.context.end_monitor();
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_monitor(context: &SecurityContext, stop: &StopSignal) {
    let mut iteration = context.iterations();
    while !stop.is_stopped() {
        let report = context.run_iteration(iteration);
        context.clock().sleep_unless_stopped(report.next_sleep, stop);
        iteration = context.complete_iteration();
    }
    context.end_monitor();
    info!(iterations = iteration, "runtime monitor stopped");
}
