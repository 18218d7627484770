//! Background tasks owned by the controller
//!
//! Both the progress sampler and the load watchdog are plain tokio tasks
//! whose handles abort the task when dropped.

use futures::future::BoxFuture;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawned task that is aborted when this handle is dropped.
#[derive(Debug)]
pub struct BackgroundTask {
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Periodic position sampler.
///
/// `tick` is invoked once per interval, starting one interval after
/// [`start`](Self::start). Returning `false` ends the loop.
#[derive(Debug, Default)]
pub struct ProgressSampler {
    task: Option<BackgroundTask>,
}

impl ProgressSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start sampling, replacing any loop already running.
    pub fn start<F>(&mut self, interval: Duration, mut tick: F)
    where
        F: FnMut() -> BoxFuture<'static, bool> + Send + 'static,
    {
        self.stop();
        self.task = Some(BackgroundTask::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !tick().await {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        self.task = None;
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: Arc<AtomicUsize>, stop_after: usize) -> impl FnMut() -> BoxFuture<'static, bool> {
        move || {
            let counter = counter.clone();
            async move { counter.fetch_add(1, Ordering::SeqCst) + 1 < stop_after }.boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut sampler = ProgressSampler::new();
        sampler.start(Duration::from_secs(1), counting(counter.clone(), usize::MAX));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(sampler.is_running());

        sampler.stop();
        assert!(!sampler.is_running());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_returning_false_ends_loop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut sampler = ProgressSampler::new();
        sampler.start(Duration::from_secs(1), counting(counter.clone(), 2));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!sampler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let mut sampler = ProgressSampler::new();
            sampler.start(Duration::from_secs(1), counting(counter.clone(), usize::MAX));
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
