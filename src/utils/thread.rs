use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_warn};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Join `handle` if it finishes within `timeout`. A thread that misses the
/// deadline is detached. Returns whether the thread was joined.
pub fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration, name: &str) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            log_warn!("{name} thread did not exit within {}ms; detaching", timeout.as_millis());
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
    if let Err(join_err) = handle.join() {
        log_error!("{name} thread panicked: {join_err:?}");
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn joins_finished_thread() {
        let handle = thread::spawn(|| {});
        assert!(join_with_timeout(handle, Duration::from_secs(1), "quick"));
    }

    #[test]
    fn gives_up_on_stuck_thread() {
        let release = Arc::new(AtomicBool::new(false));
        let flag = release.clone();
        let handle = thread::spawn(move || {
            while !flag.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        });
        let started = Instant::now();
        assert!(!join_with_timeout(handle, Duration::from_millis(50), "stuck"));
        assert!(started.elapsed() < Duration::from_secs(1));
        release.store(true, Ordering::SeqCst);
    }
}
