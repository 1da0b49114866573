//! Fixed-period background tasks with their own cancellation handles.
//!
//! Each task runs its closure on a dedicated thread, sleeping with `spin_sleep` between
//! calls for low jitter at millisecond periods. If a call overruns, the missed deadlines are
//! dropped rather than caught up in a burst.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Cloneable flag to ask a task to stop from anywhere, including the task body itself.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    pub fn cancel(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

pub struct PeriodicTask {
    name: String,
    period: Duration,
    token: StopToken,
    runs: Arc<AtomicU64>,
    handle: Mutex<Option<(ThreadId, JoinHandle<()>)>>,
}

impl PeriodicTask {
    /// Starts calling `body` every `period`. The first call happens one period after start.
    pub fn spawn<F>(name: &str, period: Duration, mut body: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let token = StopToken::default();
        let runs = Arc::new(AtomicU64::new(0));
        let thread_token = token.clone();
        let thread_runs = runs.clone();
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut deadline = Instant::now() + period;
                loop {
                    let now = Instant::now();
                    if deadline > now {
                        spin_sleep::sleep(deadline - now);
                    }
                    if thread_token.is_cancelled() {
                        break;
                    }
                    body();
                    thread_runs.fetch_add(1, Ordering::Relaxed);

                    deadline += period;
                    let now = Instant::now();
                    if deadline < now {
                        let missed = ((now - deadline).as_nanos() / period.as_nanos().max(1)) as u32 + 1;
                        debug!("{}: skipping {} missed deadlines", thread_name, missed);
                        deadline += period * missed;
                    }
                }
                debug!("{} stopped", thread_name);
            })?;

        debug!("{} started with period {:?}", name, period);
        Ok(PeriodicTask {
            name: name.to_string(),
            period,
            token,
            runs,
            handle: Mutex::new(Some((handle.thread().id(), handle))),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of completed calls so far.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn token(&self) -> StopToken {
        self.token.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stops the task. Once this returns, the body is not called any more. Repeated calls
    /// are no-ops. Called from within the body, only the flag is set and the thread exits
    /// after the current call.
    pub fn stop(&self) {
        self.token.cancel();
        let Some((id, handle)) = self.handle.lock().take() else {
            return;
        };
        if id == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!("{} panicked", self.name);
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}
