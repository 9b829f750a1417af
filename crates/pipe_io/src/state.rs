//! Worker lifecycle and the condition variables worker threads park on.
//!
//! Each worker thread shares one [`Monitor`] with the device that owns it.
//! The monitor pairs a mutex-guarded [`WorkerState`] and payload with one
//! condition variable per [`WaitPoint`]. Teardown goes through
//! [`Monitor::request_cancel`], which wakes every wait point so no thread can
//! stay parked once cancellation has been requested.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Lifecycle of a worker thread.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WorkerState {
    /// No thread has been spawned yet.
    NotStarted,
    /// The thread is running its loop.
    Running,
    /// Teardown asked the thread to leave its loop.
    CancelRequested,
    /// The thread has left its loop.
    Stopped,
}

/// Every place a worker thread or its consumer can be parked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WaitPoint {
    /// The spawning thread waits for the worker to report it is running.
    Started,
    /// Reader thread waits for room in a full ring; consumers reading data
    /// signal it.
    SpaceAvailable,
    /// Reader consumers wait for bytes, EOF or an error; the writer thread
    /// waits for a filled slot.
    DataAvailable,
    /// Writers wait for the slot to be emptied by the writer thread.
    Drained,
    /// Reader thread, after EOF or an error, waits until it is cancelled.
    CancelAwaited,
}

impl WaitPoint {
    /// Every wait point, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Started,
        Self::SpaceAvailable,
        Self::DataAvailable,
        Self::Drained,
        Self::CancelAwaited,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

/// State guarded by a [`Monitor`].
#[derive(Debug)]
pub struct Guarded<T> {
    /// Lifecycle of the worker.
    pub state: WorkerState,
    /// Side-specific payload.
    pub data: T,
}

impl<T> Guarded<T> {
    /// Returns `true` while the worker loop should keep going.
    pub fn running(&self) -> bool {
        self.state == WorkerState::Running
    }

    /// Returns `true` once teardown has begun or the worker has exited.
    pub fn finished(&self) -> bool {
        matches!(
            self.state,
            WorkerState::CancelRequested | WorkerState::Stopped
        )
    }
}

/// A mutex plus one condition variable per [`WaitPoint`].
#[derive(Debug)]
pub struct Monitor<T> {
    inner: Mutex<Guarded<T>>,
    conds: [Condvar; WaitPoint::ALL.len()],
}

impl<T> Monitor<T> {
    /// Creates a monitor in [`WorkerState::NotStarted`].
    pub fn new(data: T) -> Self {
        Self {
            inner: Mutex::new(Guarded {
                state: WorkerState::NotStarted,
                data,
            }),
            conds: std::array::from_fn(|_| Condvar::new()),
        }
    }

    /// Locks the guarded state.
    pub fn lock(&self) -> MutexGuard<'_, Guarded<T>> {
        self.inner.lock().expect("pipe monitor mutex poisoned")
    }

    /// Parks on `point` until notified.
    pub fn wait<'a>(
        &self,
        guard: MutexGuard<'a, Guarded<T>>,
        point: WaitPoint,
    ) -> MutexGuard<'a, Guarded<T>> {
        self.conds[point.index()]
            .wait(guard)
            .expect("pipe monitor mutex poisoned")
    }

    /// Parks on `point` until `done` holds, `deadline` passes, or forever
    /// when `deadline` is `None`. Returns the guard and whether `done` held.
    pub fn wait_until<'a>(
        &self,
        mut guard: MutexGuard<'a, Guarded<T>>,
        point: WaitPoint,
        deadline: Option<Instant>,
        mut done: impl FnMut(&Guarded<T>) -> bool,
    ) -> (MutexGuard<'a, Guarded<T>>, bool) {
        loop {
            if done(&guard) {
                return (guard, true);
            }
            match deadline {
                None => guard = self.wait(guard, point),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return (guard, false);
                    }
                    guard = self.conds[point.index()]
                        .wait_timeout(guard, deadline - now)
                        .expect("pipe monitor mutex poisoned")
                        .0;
                }
            }
        }
    }

    /// Wakes everything parked on `point`.
    pub fn notify(&self, point: WaitPoint) {
        self.conds[point.index()].notify_all();
    }

    /// Wakes every wait point.
    pub fn notify_every_point(&self) {
        for point in WaitPoint::ALL {
            self.notify(point);
        }
    }

    /// Moves a live worker to [`WorkerState::CancelRequested`] and wakes
    /// every wait point.
    ///
    /// Returns the state observed before the call.
    pub fn request_cancel(&self) -> WorkerState {
        let previous = {
            let mut guard = self.lock();
            let previous = guard.state;
            if matches!(previous, WorkerState::NotStarted | WorkerState::Running) {
                guard.state = WorkerState::CancelRequested;
            }
            previous
        };
        self.notify_every_point();
        previous
    }

    /// Marks the worker as running unless teardown already began.
    ///
    /// Returns `false` when the worker should exit immediately.
    pub fn mark_running(&self, guard: &mut Guarded<T>) -> bool {
        if guard.state == WorkerState::NotStarted {
            guard.state = WorkerState::Running;
            self.notify(WaitPoint::Started);
            true
        } else {
            self.notify(WaitPoint::Started);
            false
        }
    }

    /// Marks the worker as stopped and wakes anyone still waiting on it.
    pub fn mark_stopped(&self, guard: &mut Guarded<T>) {
        guard.state = WorkerState::Stopped;
        self.notify_every_point();
    }
}

/// Converts a deadline expressed as an optional timeout.
pub fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.map(|timeout| Instant::now() + timeout)
}
