//! Watchdog end to end: a blocked primary loop is reported, a
//! responsive one is not.

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crashwatch_core::monitor::{LifecycleEvent, Task, ThreadMonitor};

/// Services the "primary" loop for `lifetime`, running every scheduled
/// task as soon as it arrives.
fn run_primary_loop(rx: mpsc::Receiver<Task>, lifetime: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let deadline = Instant::now() + lifetime;
        while Instant::now() < deadline {
            if let Ok(task) = rx.recv_timeout(Duration::from_millis(10)) {
                task();
            }
        }
    })
}

#[test]
fn blocked_primary_thread_is_reported() {
    let (tx, rx) = mpsc::channel::<Task>();
    let reports: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_reports = reports.clone();

    let monitor =
        ThreadMonitor::with_threshold(Arc::new(tx.clone()), Duration::from_millis(100))
            .on_hang(move |duration| sink_reports.lock().unwrap().push(duration));

    // Queue a one-second block ahead of the first ping, then bring the
    // primary loop up.
    tx.send(Box::new(|| thread::sleep(Duration::from_secs(1))))
        .unwrap();
    let primary = run_primary_loop(rx, Duration::from_secs(3));
    monitor.start_monitoring();

    thread::sleep(Duration::from_millis(1600));
    {
        let reports = reports.lock().unwrap();
        assert!(!reports.is_empty(), "no hang report for a 1s block");
        let longest = reports.iter().copied().max().unwrap();
        assert!(
            longest >= Duration::from_millis(900),
            "longest reported hang was {:?}",
            longest
        );
    }

    // Responsive again: the report count must stay put.
    let baseline = reports.lock().unwrap().len();
    thread::sleep(Duration::from_millis(700));
    assert_eq!(reports.lock().unwrap().len(), baseline);

    monitor.stop_monitoring();
    monitor.stop_monitoring();
    primary.join().unwrap();
}

#[test]
fn responsive_primary_thread_is_not_reported() {
    let (tx, rx) = mpsc::channel::<Task>();
    let reports: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_reports = reports.clone();

    let monitor = ThreadMonitor::with_threshold(Arc::new(tx), Duration::from_millis(100))
        .on_hang(move |duration| sink_reports.lock().unwrap().push(duration));

    let primary = run_primary_loop(rx, Duration::from_millis(1200));
    monitor.start_monitoring();
    assert!(monitor.is_running());

    thread::sleep(Duration::from_millis(800));
    assert!(reports.lock().unwrap().is_empty());

    monitor.stop_monitoring();
    assert!(!monitor.is_running());
    primary.join().unwrap();
}

#[test]
fn inactive_application_sends_no_pings() {
    let (tx, rx) = mpsc::channel::<Task>();
    let reports: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_reports = reports.clone();

    let monitor = ThreadMonitor::with_threshold(Arc::new(tx), Duration::from_millis(100))
        .on_hang(move |duration| sink_reports.lock().unwrap().push(duration));
    monitor.handle_lifecycle_event(LifecycleEvent::EnteredBackground);

    // Nothing services the channel, so any ping would be diagnosed as
    // a hang; backgrounded, none may be sent.
    monitor.start_monitoring();
    thread::sleep(Duration::from_millis(500));
    assert!(reports.lock().unwrap().is_empty());
    assert!(rx.try_recv().is_err());

    monitor.stop_monitoring();
}
