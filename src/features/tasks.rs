//! Local work started from page event handlers.
//!
//! Handlers run synchronously inside `Dom::dispatch`, but some of them start
//! a bridge round trip. Those futures are queued on a shared [`LocalSet`]
//! owned by the session and make progress whenever the owner drives it with
//! [`LocalTasks::run_until`]. Queuing works with or without a running set.

use std::future::Future;
use std::rc::Rc;

use tokio::task::LocalSet;

/// Shared queue of `!Send` tasks for one page.
#[derive(Debug, Clone, Default)]
pub struct LocalTasks {
    set: Rc<LocalSet>,
}

impl LocalTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task`. It first runs the next time the set is driven.
    pub fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        // Detached; the set keeps the task alive.
        drop(self.set.spawn_local(task));
    }

    /// Run `future` to completion while queued tasks make progress.
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.set.run_until(future).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_spawn_outside_runtime_runs_later() {
        let tasks = LocalTasks::new();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        tasks.spawn(async move { flag.set(true) });
        assert!(!ran.get());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(tasks.run_until(tokio::task::yield_now()));
        assert!(ran.get());
    }

    #[tokio::test]
    async fn test_clones_share_one_queue() {
        let tasks = LocalTasks::new();
        let count = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let count = count.clone();
            tasks.clone().spawn(async move { count.set(count.get() + 1) });
        }
        tasks.run_until(tokio::task::yield_now()).await;
        assert_eq!(count.get(), 3);
    }
}
