//! Sync Task
//!
//! Background thread that periodically flushes cache contents to the store.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::error::{CacheError, Result};

/// Name given to the background thread.
pub const SYNC_THREAD_NAME: &str = "cache-sync";

// == Sync Task ==
/// Owned handle to the background sync thread.
///
/// The thread runs `cycle` once per period, measured from the start of one
/// cycle to the start of the next. The stop flag is checked after every
/// cycle; once it is set the thread runs one last cycle and exits, so writes
/// made right before shutdown still reach the store.
///
/// Dropping the handle stops and joins the thread.
#[derive(Debug)]
pub struct SyncTask {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncTask {
    /// Spawns the sync thread.
    ///
    /// `cycle` returns how many entries it flushed. Its errors and panics are
    /// logged and never end the loop.
    pub fn spawn<F>(period: Duration, mut cycle: F) -> Result<Self>
    where
        F: FnMut() -> Result<usize> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name(SYNC_THREAD_NAME.to_string())
            .spawn(move || {
                info!("Starting sync task with period of {:?}", period);

                let mut last_cycle = Duration::ZERO;
                loop {
                    if let Some(wait) = period.checked_sub(last_cycle) {
                        sleep_unless_stopped(Instant::now() + wait, &thread_stop);
                    }

                    let started = Instant::now();
                    match panic::catch_unwind(AssertUnwindSafe(&mut cycle)) {
                        Ok(Ok(flushed)) => debug!("Sync cycle flushed {} entries", flushed),
                        Ok(Err(err)) => warn!("Sync cycle failed: {}", err),
                        Err(_) => error!("Sync cycle panicked"),
                    }

                    if thread_stop.load(Ordering::Acquire) {
                        break;
                    }
                    last_cycle = started.elapsed();
                }

                info!("Sync task stopped");
            })
            .map_err(CacheError::SyncSpawn)?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    // == Shutdown ==
    /// Signals the thread to stop and waits for it to finish its last cycle.
    ///
    /// Safe to call more than once. A panic that escaped the thread is logged,
    /// never propagated.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.stop.store(true, Ordering::Release);
        handle.thread().unpark();

        if handle.join().is_err() {
            error!("Sync thread terminated with a panic");
        }
    }
}

impl Drop for SyncTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Parks until `deadline` or until the stop flag is raised.
fn sleep_unless_stopped(deadline: Instant, stop: &AtomicBool) {
    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::park_timeout(deadline - now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn counting_task(period: Duration) -> (SyncTask, Arc<AtomicUsize>) {
        let cycles = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cycles);
        let task = SyncTask::spawn(period, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        })
        .unwrap();
        (task, cycles)
    }

    #[test]
    fn test_sync_task_runs_periodically() {
        let (mut task, cycles) = counting_task(Duration::from_millis(20));

        thread::sleep(Duration::from_millis(150));
        assert!(cycles.load(Ordering::SeqCst) >= 2);

        task.shutdown();
        assert!(task.handle.is_none());
    }

    #[test]
    fn test_period_measured_between_cycle_starts() {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&starts);
        let mut task = SyncTask::spawn(Duration::from_millis(50), move || {
            recorder.lock().push(Instant::now());
            thread::sleep(Duration::from_millis(30));
            Ok(0)
        })
        .unwrap();

        thread::sleep(Duration::from_millis(400));
        let starts = starts.lock().clone();
        task.shutdown();

        assert!(starts.len() >= 3);
        let gaps: Vec<Duration> = starts.windows(2).map(|pair| pair[1] - pair[0]).collect();
        // A 30ms cycle followed by a full 50ms sleep would space starts ~80ms apart
        let shortest = gaps.iter().min().copied().unwrap();
        assert!(shortest >= Duration::from_millis(45), "gaps: {:?}", gaps);
        assert!(shortest < Duration::from_millis(75), "gaps: {:?}", gaps);
    }

    #[test]
    fn test_shutdown_runs_final_cycle_without_waiting_period() {
        let (mut task, cycles) = counting_task(Duration::from_secs(60));

        let started = Instant::now();
        task.shutdown();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(cycles.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_errors_do_not_stop_loop() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cycles);
        let mut task = SyncTask::spawn(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::QueueEmpty)
        })
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        assert!(cycles.load(Ordering::SeqCst) >= 2);
        task.shutdown();
    }

    #[test]
    fn test_panics_do_not_stop_loop() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cycles);
        let mut task = SyncTask::spawn(Duration::from_millis(10), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first cycle fails");
            }
            Ok(0)
        })
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        assert!(cycles.load(Ordering::SeqCst) >= 2);
        task.shutdown();
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (mut task, _cycles) = counting_task(Duration::from_millis(10));
        task.shutdown();
        task.shutdown();
        assert!(task.handle.is_none());
    }
}
