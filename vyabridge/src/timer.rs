//! Cancellable scheduled tasks backed by tokio.
//!
//! A [`ScheduledTask`] holds at most one running task: starting it again
//! replaces the previous one instead of stacking a second timer, and
//! cancelling an idle task is a no-op.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::error::{Error, Result};

pub struct ScheduledTask {
    name: &'static str,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledTask {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs `tick` every `period`, first tick immediately. Replaces any task
    /// already scheduled here.
    pub fn start_interval<F>(&self, period: Duration, tick: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let name = self.name;
        self.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                tick();
            }
        })?;
        debug!(task = name, period_ms = period.as_millis() as u64, "interval started");
        Ok(())
    }

    /// Runs `job` once after `delay`. Replaces any task already scheduled here.
    pub fn start_once<F>(&self, delay: Duration, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            job();
        })?;
        debug!(task = self.name, delay_ms = delay.as_millis() as u64, "one-shot scheduled");
        Ok(())
    }

    /// Stops the task if one is scheduled. Returns whether something was
    /// actually running.
    pub fn cancel(&self) -> bool {
        let previous = self.handle.lock().take();
        match previous {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                if was_running {
                    debug!(task = self.name, "cancelled");
                }
                was_running
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn spawn<Fut>(&self, future: Fut) -> Result<()>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime(self.name))?;
        let handle = runtime.spawn(future);
        let previous = self.handle.lock().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        Ok(())
    }
}

/// Runs `future` to completion on the current runtime without tracking it.
pub(crate) fn spawn_detached<Fut>(name: &'static str, future: Fut) -> Result<JoinHandle<()>>
where
    Fut: Future<Output = ()> + Send + 'static,
{
    let runtime = Handle::try_current().map_err(|_| Error::NoRuntime(name))?;
    Ok(runtime.spawn(future))
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_interval() {
        let task = ScheduledTask::new("heartbeat");
        let ticks = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&ticks);
            task.start_interval(Duration::from_millis(100), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        settle().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(100)).await;
        settle().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let task = ScheduledTask::new("idle");
        assert!(!task.cancel());

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        task.start_interval(Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        settle().await;
        assert!(task.is_running());
        assert!(task.cancel());
        assert!(!task.cancel());

        let before = ticks.load(Ordering::SeqCst);
        tokio::time::advance(Duration::from_millis(1000)).await;
        settle().await;
        assert_eq!(ticks.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_fires_once() {
        let task = ScheduledTask::new("next");
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        task.start_once(Duration::from_millis(300), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        tokio::time::advance(Duration::from_millis(299)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!task.is_running());
    }

    #[test]
    fn test_requires_runtime() {
        let task = ScheduledTask::new("orphan");
        assert!(matches!(
            task.start_once(Duration::from_millis(1), || {}),
            Err(Error::NoRuntime("orphan"))
        ));
    }
}
