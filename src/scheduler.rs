use std::time::Duration;

/// Deferred work owned by the thread that scheduled it.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Runs a task once after a delay on the current thread of control.
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask;
}

/// Handle to a scheduled task. Dropping it leaves the task running.
pub struct ScheduledTask {
    cancel: Box<dyn FnOnce()>,
}

impl ScheduledTask {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Prevents the task from running if it has not fired yet.
    pub fn cancel(self) {
        (self.cancel)()
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask").finish_non_exhaustive()
    }
}

/// Timer backed by the tokio clock. Must be used inside a `LocalSet`.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

#[cfg(not(target_arch = "wasm32"))]
impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask {
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        ScheduledTask::new(move || handle.abort())
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use tokio::task::LocalSet;

    #[tokio::test(start_paused = true)]
    async fn test_task_fires_after_delay() {
        let local = LocalSet::new();
        let fired = Rc::new(Cell::new(false));

        local
            .run_until({
                let fired = fired.clone();
                async move {
                    let flag = fired.clone();
                    let _handle = TokioScheduler.schedule(
                        Duration::from_millis(1000),
                        Box::new(move || flag.set(true)),
                    );

                    tokio::time::sleep(Duration::from_millis(999)).await;
                    assert!(!fired.get());

                    tokio::time::sleep(Duration::from_millis(2)).await;
                    assert!(fired.get());
                }
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_task_never_fires() {
        let local = LocalSet::new();
        let fired = Rc::new(Cell::new(false));

        local
            .run_until({
                let fired = fired.clone();
                async move {
                    let flag = fired.clone();
                    let handle = TokioScheduler.schedule(
                        Duration::from_millis(1000),
                        Box::new(move || flag.set(true)),
                    );
                    handle.cancel();

                    tokio::time::sleep(Duration::from_millis(5000)).await;
                    assert!(!fired.get());
                }
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_still_fires() {
        let local = LocalSet::new();
        let fired = Rc::new(Cell::new(false));

        local
            .run_until({
                let fired = fired.clone();
                async move {
                    let flag = fired.clone();
                    drop(TokioScheduler.schedule(
                        Duration::from_millis(10),
                        Box::new(move || flag.set(true)),
                    ));

                    tokio::time::sleep(Duration::from_millis(20)).await;
                    assert!(fired.get());
                }
            })
            .await;
    }
}
