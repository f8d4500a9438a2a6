//! Property-based tests for frame_scheduler using proptest

use frame_scheduler::pool::worker_capacity;
use frame_scheduler::prelude::*;
use frame_scheduler::Barrier;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Records its index into a shared log when run
struct Tagged {
    index: usize,
    log: Arc<parking_lot::Mutex<Vec<usize>>>,
}

impl Job for Tagged {
    fn on_run(&self, _ctx: &JobContext) {
        self.log.lock().push(self.index);
    }
}

// ============================================================================
// Capacity Policy Tests
// ============================================================================

proptest! {
    /// The pool never exceeds the cap and always leaves a core for the main thread
    #[test]
    fn test_capacity_bounds(hardware in 0usize..256, max in 1usize..64) {
        let capacity = worker_capacity(hardware, max);

        prop_assert!(capacity >= 1);
        prop_assert!(capacity <= max);
        if hardware >= 2 {
            prop_assert!(capacity < hardware);
        }
    }

    /// Config-level capacity follows the same policy
    #[test]
    fn test_config_capacity_matches_policy(hardware in 1usize..128, max in 1usize..32) {
        let config = ScheduleConfig::new()
            .with_hardware_concurrency(hardware)
            .with_max_worker_threads(max);

        prop_assert_eq!(config.worker_capacity(), worker_capacity(hardware, max));
        prop_assert!(config.validate().is_ok());
    }

    /// Any non-empty prefix and positive offset is accepted
    #[test]
    fn test_config_prefix_and_offset(prefix in "[a-z]{1,12}", offset in 1u32..1000) {
        let config = ScheduleConfig::new()
            .with_thread_name_prefix(prefix.clone())
            .with_worker_id_offset(offset);

        prop_assert!(config.validate().is_ok());
        let pool_config = config.pool_config();
        prop_assert_eq!(pool_config.thread_name_prefix, prefix);
        prop_assert_eq!(pool_config.id_offset, offset);
    }
}

// ============================================================================
// JobQueue Tests
// ============================================================================

proptest! {
    /// Popping after a flush yields jobs in push order
    #[test]
    fn test_queue_fifo(count in 0usize..200) {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let queue = JobQueue::new("fifo");
        for index in 0..count {
            queue.push(Arc::new(Tagged { index, log: Arc::clone(&log) }));
        }
        prop_assert_eq!(queue.flush(), count);

        let ctx = JobContext::new(ThreadId::MAIN);
        while let Some(job) = queue.pop() {
            job.on_run(&ctx);
        }
        prop_assert_eq!(log.lock().clone(), (0..count).collect::<Vec<_>>());
    }

    /// Jobs pushed after a flush stay staged until the next one
    #[test]
    fn test_queue_flush_isolates_batches(first in 0usize..50, second in 0usize..50) {
        let queue = JobQueue::new("batches");
        for _ in 0..first {
            queue.push(Arc::new(ClosureJob::new(|_: &JobContext| {})));
        }
        queue.flush();
        for _ in 0..second {
            queue.push(Arc::new(ClosureJob::new(|_: &JobContext| {})));
        }

        prop_assert_eq!(queue.size(), first);
        prop_assert_eq!(queue.staged_len(), second);
    }
}

// ============================================================================
// ThreadPool Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every job in a cycle runs exactly once, on a known identity
    #[test]
    fn test_cycle_runs_every_job_once(threads in 1usize..6, job_count in 0usize..300) {
        let pool = ThreadPool::with_threads(threads).expect("Failed to create pool");
        pool.init().expect("Failed to init pool");

        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(parking_lot::Mutex::new(HashSet::new()));
        let queue = Arc::new(JobQueue::new("property"));
        for _ in 0..job_count {
            let counter = Arc::clone(&counter);
            let seen = Arc::clone(&seen);
            queue.push(Arc::new(ClosureJob::new(move |ctx: &JobContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                seen.lock().insert(ctx.thread_id());
            })));
        }
        queue.flush();

        let activated = pool.run(&queue).expect("run failed");
        prop_assert_eq!(activated, job_count > 0);
        pool.join_all();

        prop_assert_eq!(counter.load(Ordering::SeqCst), job_count);
        prop_assert!(queue.is_empty());
        let ids: HashSet<_> = pool.worker_ids().into_iter().collect();
        prop_assert!(seen.lock().is_subset(&ids));
        pool.shutdown().expect("Failed to shutdown pool");
    }
}

// ============================================================================
// Barrier Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Exactly one participant is told it released the barrier
    #[test]
    fn test_barrier_single_leader(participants in 1usize..12) {
        let barrier = Arc::new(Barrier::new(participants));
        let handles: Vec<_> = (0..participants)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || barrier.wait())
            })
            .collect();

        let leaders = handles
            .into_iter()
            .map(|h| h.join().expect("participant panicked"))
            .filter(|leader| *leader)
            .count();
        prop_assert_eq!(leaders, 1);
        prop_assert_eq!(barrier.remaining(), 0);
    }
}
