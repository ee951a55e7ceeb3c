//! Critical sections
//!
//! Every scheduler mutation must run with interrupts disabled: a timer
//! wake-up that readies a thread halfway through a propagation walk would
//! observe a half-updated donation chain. `SchedulerLock` bundles the
//! scheduler with the platform's interrupt control and only hands out
//! `&mut` access inside `critical`.

use spin::Mutex;

/// Platform interrupt control
pub trait InterruptControl {
    /// Disable interrupts, returning whether they were enabled before
    fn disable(&self) -> bool;

    /// Restore the state returned by `disable`
    fn restore(&self, was_enabled: bool);
}

/// Host/test platform without interrupts
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInterrupts;

impl InterruptControl for NoInterrupts {
    fn disable(&self) -> bool {
        false
    }

    fn restore(&self, _was_enabled: bool) {}
}

/// RAII guard for disabling/restoring interrupts
pub struct InterruptGuard<'a, I: InterruptControl> {
    control: &'a I,
    was_enabled: bool,
}

impl<'a, I: InterruptControl> InterruptGuard<'a, I> {
    pub fn new(control: &'a I) -> Self {
        let was_enabled = control.disable();
        Self { control, was_enabled }
    }

    pub fn was_enabled(&self) -> bool {
        self.was_enabled
    }
}

impl<I: InterruptControl> Drop for InterruptGuard<'_, I> {
    fn drop(&mut self) {
        self.control.restore(self.was_enabled);
    }
}

/// Scheduler shared by all threads of one process
pub struct SchedulerLock<S, I: InterruptControl = NoInterrupts> {
    inner: Mutex<S>,
    control: I,
}

impl<S, I: InterruptControl> SchedulerLock<S, I> {
    pub const fn new(scheduler: S, control: I) -> Self {
        Self {
            inner: Mutex::new(scheduler),
            control,
        }
    }

    /// Run `f` with interrupts disabled and exclusive access to the scheduler
    pub fn critical<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let _guard = InterruptGuard::new(&self.control);
        let mut scheduler = self.inner.lock();
        f(&mut scheduler)
    }

    /// Like `critical`, but gives up instead of spinning when the scheduler
    /// is already in use (e.g. from an interrupt handler)
    pub fn try_critical<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let _guard = InterruptGuard::new(&self.control);
        let mut scheduler = self.inner.try_lock()?;
        Some(f(&mut scheduler))
    }

    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[derive(Default)]
    struct FakeInterrupts {
        enabled: Cell<bool>,
        disables: Cell<u32>,
    }

    impl InterruptControl for FakeInterrupts {
        fn disable(&self) -> bool {
            self.disables.set(self.disables.get() + 1);
            self.enabled.replace(false)
        }

        fn restore(&self, was_enabled: bool) {
            self.enabled.set(was_enabled);
        }
    }

    #[test]
    fn test_critical_restores_interrupts() {
        let control = FakeInterrupts::default();
        control.enabled.set(true);
        let lock = SchedulerLock::new(0u32, control);

        let seen = lock.critical(|value| {
            *value += 1;
            *value
        });
        assert_eq!(seen, 1);
        assert!(lock.control.enabled.get());
        assert_eq!(lock.control.disables.get(), 1);
    }

    #[test]
    fn test_nested_guard_keeps_disabled() {
        let control = FakeInterrupts::default();
        control.enabled.set(true);
        {
            let outer = InterruptGuard::new(&control);
            assert!(outer.was_enabled());
            {
                let inner = InterruptGuard::new(&control);
                assert!(!inner.was_enabled());
            }
            assert!(!control.enabled.get());
        }
        assert!(control.enabled.get());
    }

    #[test]
    fn test_try_critical_when_busy() {
        let lock = SchedulerLock::new(5u32, NoInterrupts);
        let held = lock.inner.lock();
        assert_eq!(lock.try_critical(|v| *v), None);
        drop(held);
        assert_eq!(lock.try_critical(|v| *v), Some(5));
        assert_eq!(lock.into_inner(), 5);
    }
}
