mod support;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use runtime_guard::{DetectionSignal, GuardConfig, MonitorHandle, SecurityContext};
use support::{harness, RecordingControl, ScriptedSignals};

fn wait_for_iterations(context: &SecurityContext, target: u64) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while context.iterations() < target {
        assert!(Instant::now() < deadline, "monitor stalled");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn concurrent_starts_produce_exactly_one_monitor() {
    let h = harness(ScriptedSignals::default());
    let barrier = Arc::new(Barrier::new(2));

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let context = h.context.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                MonitorHandle::start(context)
            })
        })
        .collect();
    let handles: Vec<MonitorHandle> = workers
        .into_iter()
        .filter_map(|worker| worker.join().expect("starter thread"))
        .collect();

    assert_eq!(handles.len(), 1);
    assert!(h.context.is_monitor_running());
    assert!(MonitorHandle::start(h.context.clone()).is_none());

    for handle in handles {
        handle.stop();
    }
    assert!(!h.context.is_monitor_running());
}

#[test]
fn monitor_iterates_until_stopped() {
    let h = harness(ScriptedSignals::with(&[DetectionSignal::Traced]));
    let handle = MonitorHandle::start(h.context.clone()).expect("monitor starts");
    wait_for_iterations(&h.context, 45);

    let completed = handle.stop();
    assert!(completed >= 45);
    assert!(!h.context.is_monitor_running());
    assert_eq!(h.clock.last_sleep(), Some(Duration::from_millis(300)));
    assert_eq!(h.clock.sleep_count(), completed);

    let names = h.control.names();
    assert!(names.len() >= 2);
    assert!(names.iter().all(|name| name == "system_server"));

    let after_stop = h.context.iterations();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(h.context.iterations(), after_stop);
}

#[test]
fn monitor_picks_up_level_changes() {
    let h = harness(ScriptedSignals::default());
    let handle = MonitorHandle::start(h.context.clone()).expect("monitor starts");
    wait_for_iterations(&h.context, 2);

    h.context.set_security_level(3);
    let seen = h.context.iterations();
    wait_for_iterations(&h.context, seen + 2);
    handle.stop();

    assert_eq!(h.clock.last_sleep(), Some(Duration::from_millis(100)));
}

#[test]
fn monitor_can_restart_after_stop_and_keeps_counting() {
    let h = harness(ScriptedSignals::default());
    let first = MonitorHandle::start(h.context.clone()).expect("first start");
    wait_for_iterations(&h.context, 3);
    let stopped_at = first.stop();

    let second = MonitorHandle::start(h.context.clone()).expect("restart");
    wait_for_iterations(&h.context, stopped_at + 3);
    assert!(second.stop() >= stopped_at + 3);
}

#[test]
fn dropping_the_handle_stops_the_monitor() {
    let h = harness(ScriptedSignals::default());
    {
        let _handle = MonitorHandle::start(h.context.clone()).expect("monitor starts");
        wait_for_iterations(&h.context, 1);
    }
    assert!(!h.context.is_monitor_running());
}

#[test]
fn detections_in_the_loop_accumulate_noise_at_maximum() {
    let h = harness(ScriptedSignals::with(&[DetectionSignal::Hooked]));
    h.context.set_security_level(3);
    let handle = MonitorHandle::start(h.context.clone()).expect("monitor starts");
    wait_for_iterations(&h.context, 5);
    let completed = handle.stop();

    assert_eq!(h.context.noise().outstanding() as u64, completed);
}

#[test]
fn stop_interrupts_the_poll_interval_sleep() {
    let context = Arc::new(
        SecurityContext::builder(GuardConfig::default())
            .signals(Arc::new(ScriptedSignals::default()))
            .control(Arc::new(RecordingControl::default()))
            .build(),
    );
    context.set_security_level(1);
    let handle = MonitorHandle::start(context.clone()).expect("monitor starts");
    wait_for_iterations(&context, 1);

    let stopping = Instant::now();
    handle.stop();
    assert!(stopping.elapsed() < Duration::from_millis(250));
    assert!(!context.is_monitor_running());
}
