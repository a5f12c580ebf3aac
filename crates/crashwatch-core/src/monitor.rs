//! Hang detection for the primary thread.
//!
//! A dedicated background thread repeatedly asks the primary thread to
//! answer a ping. When the answer does not arrive within the
//! threshold, the blocked duration is reported through the hang sink.
//! The two shared flags live in [`Locked`] containers and are never
//! held at the same time, so the two threads cannot deadlock on them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::locked::Locked;

/// Default hang threshold.
pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(4);

/// A unit of work scheduled onto the primary thread.
pub type Task = Box<dyn FnOnce() + Send>;

/// Schedules pong tasks onto the observed (primary) thread.
///
/// The primary thread must run scheduled tasks promptly whenever it is
/// responsive; the watchdog diagnoses a hang precisely when it does
/// not. Scheduling must never block the caller.
pub trait PongScheduler: Send + Sync {
    fn schedule(&self, task: Task);
}

impl PongScheduler for mpsc::Sender<Task> {
    fn schedule(&self, task: Task) {
        // A disconnected receiver means the primary loop is gone; the
        // unanswered ping will surface as a hang.
        let _ = self.send(task);
    }
}

/// Host lifecycle notifications driving the active/inactive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    BecameActive,
    WillResignActive,
    EnteredBackground,
}

/// Callback receiving the blocked duration of each detected hang.
type HangSink = Arc<dyn Fn(Duration) + Send + Sync>;

/// Counting semaphore pairing each ping with exactly one pong.
struct Semaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    fn new() -> Self {
        Self {
            count: Mutex::new(0),
            available: Condvar::new(),
        }
    }

    fn signal(&self) {
        *self.count.lock() += 1;
        self.available.notify_one();
    }

    fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.available.wait(&mut count);
        }
        *count -= 1;
    }
}

/// Watchdog that monitors the primary thread for hangs.
///
/// States: idle until [`start_monitoring`](Self::start_monitoring),
/// running while the background loop is alive, stopped after
/// [`stop_monitoring`](Self::stop_monitoring). Stopping is cooperative
/// and completes within one cycle length.
pub struct ThreadMonitor {
    threshold: Duration,
    scheduler: Arc<dyn PongScheduler>,
    hang_sink: HangSink,
    main_thread_blocked: Arc<Locked<bool>>,
    application_active: Arc<Locked<bool>>,
    semaphore: Arc<Semaphore>,
    cancel: Mutex<Option<Arc<AtomicBool>>>,
}

impl ThreadMonitor {
    /// A monitor with the default threshold.
    pub fn new(scheduler: Arc<dyn PongScheduler>) -> Self {
        Self::with_threshold(scheduler, DEFAULT_THRESHOLD)
    }

    /// A monitor reporting hangs longer than `threshold`.
    pub fn with_threshold(scheduler: Arc<dyn PongScheduler>, threshold: Duration) -> Self {
        Self {
            threshold,
            scheduler,
            hang_sink: Arc::new(|duration: Duration| {
                log::warn!(
                    "Main thread blocked for {:.2} seconds",
                    duration.as_secs_f64()
                );
            }),
            main_thread_blocked: Arc::new(Locked::new(false)),
            application_active: Arc::new(Locked::new(true)),
            semaphore: Arc::new(Semaphore::new()),
            cancel: Mutex::new(None),
        }
    }

    /// The hang threshold this monitor reports against.
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Replaces the default diagnostic hang sink. Call before
    /// [`start_monitoring`](Self::start_monitoring).
    pub fn on_hang(mut self, sink: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.hang_sink = Arc::new(sink);
        self
    }

    /// Spawns the background loop. Calling while already running spawns
    /// a second loop; callers must not invoke this concurrently from
    /// multiple sites.
    pub fn start_monitoring(&self) {
        let cancelled = Arc::new(AtomicBool::new(false));
        *self.cancel.lock() = Some(cancelled.clone());

        let threshold = self.threshold;
        let scheduler = self.scheduler.clone();
        let hang_sink = self.hang_sink.clone();
        let blocked = self.main_thread_blocked.clone();
        let active = self.application_active.clone();
        let semaphore = self.semaphore.clone();

        let spawned = thread::Builder::new()
            .name("crashwatch-watchdog".to_string())
            .spawn(move || {
                run_loop(
                    threshold, scheduler, hang_sink, blocked, active, semaphore, cancelled,
                );
            });
        if let Err(err) = spawned {
            log::error!("Failed to spawn watchdog thread: {}", err);
            *self.cancel.lock() = None;
        }
    }

    /// Cancels the background loop; it exits at its next iteration
    /// boundary. Safe to call repeatedly and during teardown.
    pub fn stop_monitoring(&self) {
        if let Some(cancelled) = self.cancel.lock().take() {
            cancelled.store(true, Ordering::SeqCst);
        }
    }

    /// True while the background loop is running.
    pub fn is_running(&self) -> bool {
        self.cancel.lock().is_some()
    }

    /// Feeds a host lifecycle event into the active/inactive state.
    /// While inactive, the watchdog waits passively and sends no pings.
    pub fn handle_lifecycle_event(&self, event: LifecycleEvent) {
        let active = matches!(event, LifecycleEvent::BecameActive);
        self.application_active.perform(|flag| *flag = active);
    }
}

impl Drop for ThreadMonitor {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

fn run_loop(
    threshold: Duration,
    scheduler: Arc<dyn PongScheduler>,
    hang_sink: HangSink,
    blocked: Arc<Locked<bool>>,
    active: Arc<Locked<bool>>,
    semaphore: Arc<Semaphore>,
    cancelled: Arc<AtomicBool>,
) {
    while !cancelled.load(Ordering::SeqCst) {
        if active.content() {
            blocked.perform(|flag| *flag = true);

            let ping_time = Instant::now();
            let pong_blocked = Arc::clone(&blocked);
            let pong_semaphore = Arc::clone(&semaphore);
            scheduler.schedule(Box::new(move || {
                // The flag flip happens before the signal, sequenced by
                // the flag's lock, so the watchdog never pairs a stale
                // cycle with this pong.
                pong_blocked.perform(|flag| *flag = false);
                pong_semaphore.signal();
            }));

            thread::sleep(threshold);

            if blocked.content() {
                // Overdue. Block until the pong actually arrives, both
                // to measure the real blocked duration and so the next
                // ping cannot be answered by this stale cycle.
                semaphore.wait();
                (hang_sink.as_ref())(ping_time.elapsed());
            } else {
                semaphore.wait();
            }
        } else {
            thread::sleep(threshold);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semaphore_counts_signals() {
        let semaphore = Arc::new(Semaphore::new());
        semaphore.signal();
        semaphore.signal();
        // Two waits must both return without blocking.
        semaphore.wait();
        semaphore.wait();
        assert_eq!(*semaphore.count.lock(), 0);
    }

    #[test]
    fn semaphore_wait_blocks_until_signal() {
        let semaphore = Arc::new(Semaphore::new());
        let waiter = {
            let semaphore = semaphore.clone();
            thread::spawn(move || {
                semaphore.wait();
            })
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());
        semaphore.signal();
        waiter.join().unwrap();
    }

    #[test]
    fn sender_scheduler_delivers_tasks() {
        let (tx, rx) = mpsc::channel::<Task>();
        let scheduler: Arc<dyn PongScheduler> = Arc::new(tx);
        let done = Arc::new(AtomicBool::new(false));
        let task_done = done.clone();
        scheduler.schedule(Box::new(move || task_done.store(true, Ordering::SeqCst)));
        rx.recv().unwrap()();
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn lifecycle_events_toggle_active_state() {
        let (tx, _rx) = mpsc::channel::<Task>();
        let monitor = ThreadMonitor::new(Arc::new(tx));
        assert!(monitor.application_active.content());
        monitor.handle_lifecycle_event(LifecycleEvent::EnteredBackground);
        assert!(!monitor.application_active.content());
        monitor.handle_lifecycle_event(LifecycleEvent::BecameActive);
        assert!(monitor.application_active.content());
        monitor.handle_lifecycle_event(LifecycleEvent::WillResignActive);
        assert!(!monitor.application_active.content());
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let (tx, _rx) = mpsc::channel::<Task>();
        let monitor = ThreadMonitor::new(Arc::new(tx));
        assert!(!monitor.is_running());
        monitor.stop_monitoring();
        monitor.stop_monitoring();
        assert!(!monitor.is_running());
    }
}
