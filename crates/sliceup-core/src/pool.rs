//! Bounded-concurrency task pool.
//!
//! Drains an ordered list of async task constructors with at most `limit`
//! tasks in flight; when a slot frees, the next constructor in list order
//! is started. Completion order is up to the tasks themselves. Outcomes
//! are isolated: a failed task is reported through `on_error` and its
//! siblings keep running. The pool never retries.

use std::future::Future;
use tokio::task::JoinSet;

/// Runs `constructors` with at most `limit` tasks concurrently in flight.
///
/// `before_launch` is consulted immediately before each constructor is
/// invoked; once it returns false no further task is started and the
/// remaining constructors are dropped unstarted (cooperative
/// cancellation without wasting a slot on a doomed request). Tasks
/// already in flight settle normally and are still reported.
///
/// Each settled task is routed to `on_success` or `on_error` in
/// completion order. Returns `Err` only if a task panics.
pub async fn run_bounded<C, Fut, T, E>(
    constructors: Vec<C>,
    limit: usize,
    mut before_launch: impl FnMut() -> bool,
    mut on_success: impl FnMut(T),
    mut on_error: impl FnMut(E),
) -> anyhow::Result<()>
where
    C: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let limit = limit.max(1);
    let mut queue = constructors.into_iter();
    let mut join_set = JoinSet::new();
    let mut stopped = false;

    loop {
        while !stopped && join_set.len() < limit {
            if !before_launch() {
                stopped = true;
                break;
            }
            let Some(make) = queue.next() else {
                break;
            };
            join_set.spawn(make());
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        match res.map_err(|e| anyhow::anyhow!("pool task join: {}", e))? {
            Ok(v) => on_success(v),
            Err(e) => on_error(e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Tracks the number of tasks in flight and the high-water mark.
    #[derive(Default)]
    struct InFlight {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl InFlight {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let in_flight = Arc::new(InFlight::default());
        let mut constructors = Vec::new();
        for i in 0..10 {
            let in_flight = Arc::clone(&in_flight);
            constructors.push(move || async move {
                in_flight.enter();
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.exit();
                Ok::<usize, String>(i)
            });
        }

        let mut done = 0;
        run_bounded(constructors, 3, || true, |_| done += 1, |_: String| {})
            .await
            .unwrap();

        assert_eq!(done, 10);
        assert!(in_flight.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn failed_task_does_not_block_siblings() {
        // Pool limit 2 over 5 tasks, task #2 (index 1) rejects: the rest
        // still run to completion.
        let mut constructors = Vec::new();
        for i in 0..5usize {
            constructors.push(move || async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if i == 1 {
                    Err(format!("task {} failed", i))
                } else {
                    Ok(i)
                }
            });
        }

        let mut ok = Vec::new();
        let mut failed = Vec::new();
        run_bounded(
            constructors,
            2,
            || true,
            |i| ok.push(i),
            |e: String| failed.push(e),
        )
        .await
        .unwrap();

        ok.sort_unstable();
        assert_eq!(ok, vec![0, 2, 3, 4]);
        assert_eq!(failed, vec!["task 1 failed".to_string()]);
    }

    #[tokio::test]
    async fn before_launch_stops_queued_tasks() {
        // Trip the predicate after the first two launches: with limit 1
        // the remaining constructors must never start.
        let started = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let mut constructors = Vec::new();
        for i in 0..6usize {
            let started = Arc::clone(&started);
            let stop = Arc::clone(&stop);
            constructors.push(move || async move {
                started.fetch_add(1, Ordering::SeqCst);
                if i == 1 {
                    stop.store(true, Ordering::SeqCst);
                }
                Ok::<usize, String>(i)
            });
        }

        let stop_check = Arc::clone(&stop);
        run_bounded(
            constructors,
            1,
            move || !stop_check.load(Ordering::SeqCst),
            |_| {},
            |_: String| {},
        )
        .await
        .unwrap();

        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn tasks_start_in_list_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut constructors = Vec::new();
        for i in 0..5usize {
            let order = Arc::clone(&order);
            constructors.push(move || {
                order.lock().unwrap().push(i);
                async move { Ok::<usize, String>(i) }
            });
        }

        run_bounded(constructors, 2, || true, |_| {}, |_: String| {})
            .await
            .unwrap();

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn empty_list_completes_immediately() {
        let constructors: Vec<fn() -> std::future::Ready<Result<(), ()>>> = Vec::new();
        run_bounded(constructors, 4, || true, |_| {}, |_| {})
            .await
            .unwrap();
    }
}
