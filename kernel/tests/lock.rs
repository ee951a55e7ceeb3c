//! Test de la section critique partagée entre plusieurs threads hôtes

use std::sync::Arc;
use std::thread;

use exo_sched_core::scheduler::{NoInterrupts, PriorityScheduler, SchedulerLock};

#[test]
fn test_shared_scheduler_under_contention() {
    let lock = Arc::new(SchedulerLock::new(PriorityScheduler::new(), NoInterrupts));
    let queue = lock.critical(|sched| sched.create_queue(true));

    let workers: Vec<_> = (0..4u64)
        .map(|worker| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                for round in 0..100u64 {
                    let thread = worker * 1_000 + round;
                    lock.critical(|sched| {
                        sched.set_priority(thread, round % 8).unwrap();
                        sched.wait_for_access(queue, thread).unwrap();
                        sched.check_invariants().unwrap();
                        sched.next_thread(queue).unwrap();
                    });
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let lock = Arc::try_unwrap(lock).ok().unwrap();
    let mut sched = lock.into_inner();
    sched.check_invariants().unwrap();
    while sched.next_thread(queue).unwrap().is_some() {}
    assert_eq!(sched.holder(queue).unwrap(), None);
    assert_eq!(sched.waiter_count(queue).unwrap(), 0);
}
