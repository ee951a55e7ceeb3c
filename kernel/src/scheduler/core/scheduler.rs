//! Scheduler Core - resource queues with priority donation
//!
//! One scheduler context owns every thread record and every queue. Callers
//! (locks, condition variables, join, the timer wake-up path) drive it
//! through four queue operations:
//! - `wait_for_access`: enqueue a thread behind the queue's holder
//! - `acquire`: make a thread the holder, evicting any previous holder
//! - `next_thread`: hand the resource to the best waiter
//! - `pick_best`: see who `next_thread` would choose
//!
//! and through the priority operations (`set_priority`,
//! `increase_priority`, `decrease_priority`). Every mutation takes `&mut self`;
//! callers sharing one scheduler go through `SchedulerLock` so the mutation
//! runs with interrupts disabled.

use alloc::vec::Vec;
use core::marker::PhantomData;

use hashbrown::HashMap;
use rand::SeedableRng;

use super::error::{SchedulerError, SchedulerResult};
use super::metrics::SchedulerMetrics;
use super::policy::{DonationPolicy, LotteryPolicy, StrictPolicy};
use crate::sched_error;
use crate::scheduler::config::{SchedulerConfig, SchedulerKind, DEFAULT_LOTTERY_SEED};
use crate::scheduler::priority::{Priority, PriorityRange};
use crate::scheduler::queue::{
    QueueId, QueueSnapshot, QueueTable, ResourceQueue, SchedRng, WaitQueue,
};
use crate::scheduler::thread::{
    validate_transition, QueueRelation, ThreadId, ThreadRecord, ThreadSnapshot,
};

/// Scheduler parameterized by its donation policy
pub struct Scheduler<P: DonationPolicy> {
    pub(crate) threads: HashMap<ThreadId, ThreadRecord>,
    pub(crate) queues: QueueTable<P::Waiters>,
    /// Logical clock stamping enqueue order
    clock: u64,
    rng: SchedRng,
    pub(crate) metrics: SchedulerMetrics,
    _policy: PhantomData<fn() -> P>,
}

/// Strict priority scheduler (maximum donation)
pub type PriorityScheduler = Scheduler<StrictPolicy>;

/// Lottery scheduler (additive ticket donation)
pub type LotteryScheduler = Scheduler<LotteryPolicy>;

impl<P: DonationPolicy> Scheduler<P> {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_LOTTERY_SEED)
    }

    /// Scheduler whose random draws are reproducible from `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self {
            threads: HashMap::new(),
            queues: QueueTable::new(),
            clock: 0,
            rng: SchedRng::seed_from_u64(seed),
            metrics: SchedulerMetrics::new(),
            _policy: PhantomData,
        }
    }

    pub fn kind(&self) -> SchedulerKind {
        P::KIND
    }

    pub fn range(&self) -> PriorityRange {
        P::RANGE
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    // ═══════════════════════════════════════════════════════════════
    // Queues
    // ═══════════════════════════════════════════════════════════════

    /// Create a queue; `transfers_priority` decides whether its waiters
    /// donate to its holder
    pub fn create_queue(&mut self, transfers_priority: bool) -> QueueId {
        let id = self.queues.insert(transfers_priority);
        log::debug!("created queue {} (transfer: {})", id, transfers_priority);
        id
    }

    /// Retire a queue. Only an idle queue (no holder, no waiters) can go.
    pub fn destroy_queue(&mut self, queue: QueueId) -> SchedulerResult<()> {
        let resource = self
            .queues
            .get(queue)
            .ok_or(SchedulerError::QueueNotFound { queue })?;
        if !resource.is_idle() {
            return Err(sched_error!(SchedulerError::QueueBusy {
                queue,
                holder: resource.holder(),
                waiters: resource.waiters().len(),
            }));
        }
        self.queues.remove(queue);
        log::debug!("destroyed queue {}", queue);
        Ok(())
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    pub fn holder(&self, queue: QueueId) -> SchedulerResult<Option<ThreadId>> {
        Ok(self.queue(queue)?.holder())
    }

    pub fn waiter_count(&self, queue: QueueId) -> SchedulerResult<usize> {
        Ok(self.queue(queue)?.waiters().len())
    }

    pub fn queue_snapshot(&self, queue: QueueId) -> SchedulerResult<QueueSnapshot> {
        Ok(self.queue(queue)?.snapshot())
    }

    fn queue(&self, queue: QueueId) -> SchedulerResult<&ResourceQueue<P::Waiters>> {
        self.queues
            .get(queue)
            .ok_or(SchedulerError::QueueNotFound { queue })
    }

    // ═══════════════════════════════════════════════════════════════
    // Threads
    // ═══════════════════════════════════════════════════════════════

    /// Record of `thread`, created with the default priority on first use
    fn record_mut(&mut self, thread: ThreadId) -> &mut ThreadRecord {
        self.threads
            .entry(thread)
            .or_insert_with(|| ThreadRecord::new(thread, P::RANGE.default))
    }

    pub fn thread(&self, thread: ThreadId) -> Option<&ThreadRecord> {
        self.threads.get(&thread)
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn thread_snapshot(&self, thread: ThreadId) -> Option<ThreadSnapshot> {
        self.threads.get(&thread).map(ThreadRecord::snapshot)
    }

    pub fn waiting_on(&self, thread: ThreadId) -> Option<QueueId> {
        self.threads.get(&thread).and_then(ThreadRecord::waiting_on)
    }

    pub fn held_queues(&self, thread: ThreadId) -> Vec<QueueId> {
        self.threads
            .get(&thread)
            .map(|record| record.held().collect())
            .unwrap_or_default()
    }

    // ═══════════════════════════════════════════════════════════════
    // Queue Operations
    // ═══════════════════════════════════════════════════════════════

    /// Enqueue `thread` on `queue` and let it donate to the holder
    pub fn wait_for_access(&mut self, queue: QueueId, thread: ThreadId) -> SchedulerResult<()> {
        let holder = self.queue(queue)?.holder();
        if holder == Some(thread) {
            return Err(sched_error!(SchedulerError::HolderCannotWait {
                thread_id: thread,
                queue,
            }));
        }
        if let Some(current) = self.record_mut(thread).waiting_on {
            return Err(sched_error!(SchedulerError::AlreadyWaiting {
                thread_id: thread,
                queue: current,
            }));
        }

        self.clock += 1;
        let now = self.clock;
        let record = self.record_mut(thread);
        debug_assert!(validate_transition(record.relation(queue), QueueRelation::Waiting));
        record.waiting_on = Some(queue);
        record.wait_start = now;
        let waiter = record.as_waiter();

        if let Some(resource) = self.queues.get_mut(queue) {
            resource.waiters.insert(waiter);
        }
        SchedulerMetrics::bump(&self.metrics.waits);
        log::trace!(
            "thread {} waits on queue {} (priority {})",
            thread,
            queue,
            waiter.priority
        );

        if let Some(holder) = holder {
            self.propagate_from(holder);
        }
        Ok(())
    }

    /// Make `thread` the holder of `queue`, evicting any previous holder
    pub fn acquire(&mut self, queue: QueueId, thread: ThreadId) -> SchedulerResult<()> {
        let holder = self.queue(queue)?.holder();
        if holder == Some(thread) {
            return Ok(());
        }
        if let Some(previous) = holder {
            log::debug!("thread {} evicts thread {} from queue {}", thread, previous, queue);
            SchedulerMetrics::bump(&self.metrics.evictions);
            self.relinquish(previous, queue);
        }

        let record = self.record_mut(thread);
        debug_assert!(validate_transition(record.relation(queue), QueueRelation::Held));
        let key = record.as_waiter();
        if record.waiting_on == Some(queue) {
            record.waiting_on = None;
            record.wait_start = 0;
        }
        record.held.insert(queue);

        if let Some(resource) = self.queues.get_mut(queue) {
            resource.waiters.remove(&key);
            resource.holder = Some(thread);
        }
        SchedulerMetrics::bump(&self.metrics.acquisitions);
        log::debug!("thread {} acquired queue {}", thread, queue);

        self.propagate_from(thread);
        Ok(())
    }

    /// Hand `queue` to its best waiter and return it.
    ///
    /// With no waiters the current holder releases the queue and `None` is
    /// returned: afterwards `holder(queue)` is `None`, even for a caller that
    /// only wanted to know whether anyone was waiting.
    pub fn next_thread(&mut self, queue: QueueId) -> SchedulerResult<Option<ThreadId>> {
        let Some(thread) = self.pick_best(queue)? else {
            if let Some(holder) = self.queue(queue)?.holder() {
                self.relinquish(holder, queue);
            }
            return Ok(None);
        };
        self.acquire(queue, thread)?;
        Ok(Some(thread))
    }

    /// The thread `next_thread` would return, without changing who waits or
    /// holds.
    ///
    /// On a lottery queue this is not a pure peek: the first call after the
    /// waiter set changes spends a draw (advancing the generator and bumping
    /// `lottery_draws`) and caches the winner for the following
    /// `next_thread`.
    pub fn pick_best(&mut self, queue: QueueId) -> SchedulerResult<Option<ThreadId>> {
        let resource = self
            .queues
            .get_mut(queue)
            .ok_or(SchedulerError::QueueNotFound { queue })?;
        let pick = resource.waiters.pick(&mut self.rng);
        if let Some(pick) = pick {
            if pick.drawn {
                SchedulerMetrics::bump(&self.metrics.lottery_draws);
            }
        }
        Ok(pick.map(|pick| pick.thread))
    }

    /// Withdraw `thread` from the queue it waits on, if any.
    ///
    /// The donation it supplied to that queue's holder disappears; the
    /// queues it holds itself are untouched. Returns whether it was waiting.
    pub fn cancel_wait(&mut self, thread: ThreadId) -> bool {
        let Some(record) = self.threads.get_mut(&thread) else {
            return false;
        };
        let Some(queue) = record.waiting_on else {
            return false;
        };
        debug_assert!(validate_transition(record.relation(queue), QueueRelation::Unrelated));
        let key = record.as_waiter();
        record.waiting_on = None;
        record.wait_start = 0;

        let holder = match self.queues.get_mut(queue) {
            Some(resource) => {
                resource.waiters.remove(&key);
                resource.holder
            }
            None => None,
        };
        SchedulerMetrics::bump(&self.metrics.cancellations);
        log::debug!("thread {} stopped waiting on queue {}", thread, queue);

        if let Some(holder) = holder {
            self.propagate_from(holder);
        }
        true
    }

    /// Forget `thread`: cancel its wait, release everything it holds and drop
    /// its record
    pub fn exit_thread(&mut self, thread: ThreadId) {
        self.cancel_wait(thread);
        for queue in self.held_queues(thread) {
            SchedulerMetrics::bump(&self.metrics.evictions);
            self.relinquish(thread, queue);
        }
        if self.threads.remove(&thread).is_some() {
            log::debug!("thread {} exited", thread);
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Priorities
    // ═══════════════════════════════════════════════════════════════

    pub fn priority(&self, thread: ThreadId) -> Priority {
        self.threads
            .get(&thread)
            .map_or(P::RANGE.default, ThreadRecord::priority)
    }

    pub fn effective_priority(&self, thread: ThreadId) -> Priority {
        self.threads
            .get(&thread)
            .map_or(P::RANGE.default, ThreadRecord::effective_priority)
    }

    /// Change the base priority of `thread` and propagate the effect.
    ///
    /// Setting the current value is a no-op: nothing is re-ranked and
    /// nothing propagates.
    pub fn set_priority(&mut self, thread: ThreadId, priority: Priority) -> SchedulerResult<()> {
        let range = P::RANGE;
        if !range.contains(priority) {
            return Err(sched_error!(SchedulerError::OutOfRange {
                value: priority,
                min: range.min,
                max: range.max,
            }));
        }

        let record = self.record_mut(thread);
        if record.priority() == priority {
            return Ok(());
        }
        log::debug!(
            "thread {} priority {} -> {}",
            thread,
            record.priority(),
            priority
        );
        record.set_base(priority);
        SchedulerMetrics::bump(&self.metrics.priority_changes);

        self.propagate_from(thread);
        Ok(())
    }

    /// Raise the base priority by one step; false at the top of the range
    pub fn increase_priority(&mut self, thread: ThreadId) -> bool {
        match P::RANGE.raised(self.priority(thread)) {
            Some(priority) => self.set_priority(thread, priority).is_ok(),
            None => false,
        }
    }

    /// Lower the base priority by one step; false at the bottom of the range
    pub fn decrease_priority(&mut self, thread: ThreadId) -> bool {
        match P::RANGE.lowered(self.priority(thread)) {
            Some(priority) => self.set_priority(thread, priority).is_ok(),
            None => false,
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Consistency
    // ═══════════════════════════════════════════════════════════════

    /// Verify the thread/queue graph and every effective priority
    pub fn check_invariants(&self) -> SchedulerResult<()> {
        let violated = |thread_id, reason| Err(SchedulerError::InvariantViolated { thread_id, reason });

        for record in self.threads.values() {
            let id = record.id();
            if record.effective_priority() < record.priority() {
                return violated(id, "effective priority below base priority");
            }
            if let Some(queue) = record.waiting_on() {
                let Some(resource) = self.queues.get(queue) else {
                    return violated(id, "waiting on a destroyed queue");
                };
                if !resource.waiters().contains(id) {
                    return violated(id, "missing from the queue it waits on");
                }
                if resource.holder() == Some(id) {
                    return violated(id, "waiting on a queue it holds");
                }
            }
            for queue in record.held() {
                match self.queues.get(queue) {
                    Some(resource) if resource.holder() == Some(id) => {}
                    _ => return violated(id, "holds a queue that does not name it as holder"),
                }
            }
            let expected = P::effective(record.priority(), self.donated_to(id));
            if record.effective_priority() != expected {
                return violated(id, "stale effective priority");
            }
        }

        for resource in self.queues.iter() {
            for thread in resource.waiters().threads() {
                if self.waiting_on(thread) != Some(resource.id()) {
                    return violated(thread, "queued on a queue it does not wait on");
                }
            }
            if let Some(holder) = resource.holder() {
                if !self.threads.get(&holder).map_or(false, |r| r.holds(resource.id())) {
                    return violated(holder, "holder does not list the queue as held");
                }
            }
        }
        Ok(())
    }
}

impl<P: DonationPolicy> Default for Scheduler<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: DonationPolicy> core::fmt::Debug for Scheduler<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("kind", &P::KIND)
            .field("threads", &self.threads.len())
            .field("queues", &self.queues.len())
            .field("clock", &self.clock)
            .finish()
    }
}

/// Scheduler whose discipline is chosen at runtime
#[derive(Debug)]
pub enum AnyScheduler {
    Priority(PriorityScheduler),
    Lottery(LotteryScheduler),
}

macro_rules! dispatch {
    ($self:ident, $sched:ident => $body:expr) => {
        match $self {
            AnyScheduler::Priority($sched) => $body,
            AnyScheduler::Lottery($sched) => $body,
        }
    };
}

impl AnyScheduler {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        log::info!("scheduler: {} discipline", config.kind);
        match config.kind {
            SchedulerKind::Priority => Self::Priority(PriorityScheduler::with_seed(config.lottery_seed)),
            SchedulerKind::Lottery => Self::Lottery(LotteryScheduler::with_seed(config.lottery_seed)),
        }
    }

    pub fn kind(&self) -> SchedulerKind {
        dispatch!(self, s => s.kind())
    }

    pub fn range(&self) -> PriorityRange {
        self.kind().range()
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        dispatch!(self, s => s.metrics())
    }

    pub fn create_queue(&mut self, transfers_priority: bool) -> QueueId {
        dispatch!(self, s => s.create_queue(transfers_priority))
    }

    pub fn destroy_queue(&mut self, queue: QueueId) -> SchedulerResult<()> {
        dispatch!(self, s => s.destroy_queue(queue))
    }

    pub fn holder(&self, queue: QueueId) -> SchedulerResult<Option<ThreadId>> {
        dispatch!(self, s => s.holder(queue))
    }

    pub fn queue_snapshot(&self, queue: QueueId) -> SchedulerResult<QueueSnapshot> {
        dispatch!(self, s => s.queue_snapshot(queue))
    }

    pub fn thread_snapshot(&self, thread: ThreadId) -> Option<ThreadSnapshot> {
        dispatch!(self, s => s.thread_snapshot(thread))
    }

    pub fn wait_for_access(&mut self, queue: QueueId, thread: ThreadId) -> SchedulerResult<()> {
        dispatch!(self, s => s.wait_for_access(queue, thread))
    }

    pub fn acquire(&mut self, queue: QueueId, thread: ThreadId) -> SchedulerResult<()> {
        dispatch!(self, s => s.acquire(queue, thread))
    }

    pub fn next_thread(&mut self, queue: QueueId) -> SchedulerResult<Option<ThreadId>> {
        dispatch!(self, s => s.next_thread(queue))
    }

    pub fn pick_best(&mut self, queue: QueueId) -> SchedulerResult<Option<ThreadId>> {
        dispatch!(self, s => s.pick_best(queue))
    }

    pub fn cancel_wait(&mut self, thread: ThreadId) -> bool {
        dispatch!(self, s => s.cancel_wait(thread))
    }

    pub fn exit_thread(&mut self, thread: ThreadId) {
        dispatch!(self, s => s.exit_thread(thread))
    }

    pub fn priority(&self, thread: ThreadId) -> Priority {
        dispatch!(self, s => s.priority(thread))
    }

    pub fn effective_priority(&self, thread: ThreadId) -> Priority {
        dispatch!(self, s => s.effective_priority(thread))
    }

    pub fn set_priority(&mut self, thread: ThreadId, priority: Priority) -> SchedulerResult<()> {
        dispatch!(self, s => s.set_priority(thread, priority))
    }

    pub fn increase_priority(&mut self, thread: ThreadId) -> bool {
        dispatch!(self, s => s.increase_priority(thread))
    }

    pub fn decrease_priority(&mut self, thread: ThreadId) -> bool {
        dispatch!(self, s => s.decrease_priority(thread))
    }

    pub fn check_invariants(&self) -> SchedulerResult<()> {
        dispatch!(self, s => s.check_invariants())
    }
}
