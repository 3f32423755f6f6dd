//! A gate blocking threads at a checkpoint. The gate is either locked or unlocked: unlocking
//! releases every waiting thread at once, while unlock_one() banks a single admission ticket
//! letting exactly one thread through a locked gate. Tickets are counted, e.g a ticket banked
//! while nobody waits is redeemed by the next thread invoking wait().
//!
//! The state is guarded by a standard mutex paired with a condition variable. Which waiter
//! redeems a ticket is up to the condition variable, no ordering is guaranteed.
//!
//! Please note reset() does not wake anybody up: threads blocked at that point remain parked
//! until the next unlock() or unlock_one().
use slog::{Discard, Logger};
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

struct State {
    open: bool,
    tickets: usize,
    pending: usize,
}

/// Gate wrapping its open flag and ticket counter in a mutex. The condvar is used both for
/// broadcast (unlock) and single (unlock_one) wakeups.
pub struct Gate {
    state: Mutex<State>,
    signal: Condvar,
    log: Logger,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Gate")
            .field("open", &state.open)
            .field("tickets", &state.tickets)
            .field("pending", &state.pending)
            .finish()
    }
}

impl Gate {
    #[inline]
    pub fn new(locked: bool) -> Self {
        Gate::with_logger(locked, Logger::root(Discard, o!()))
    }

    /// Same as new() but traces every transition to the specified logger.
    pub fn with_logger(locked: bool, log: Logger) -> Self {
        trace!(&log, "gate created"; "open" => !locked);
        Gate {
            state: Mutex::new(State {
                open: !locked,
                tickets: 0,
                pending: 0,
            }),
            signal: Condvar::new(),
            log,
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        !self.state().open
    }

    #[inline]
    pub fn is_unlocked(&self) -> bool {
        self.state().open
    }

    /// Number of banked tickets not redeemed yet.
    #[inline]
    pub fn tickets(&self) -> usize {
        self.state().tickets
    }

    /// Number of threads currently parked in wait().
    #[inline]
    pub fn pending(&self) -> usize {
        self.state().pending
    }

    #[inline]
    pub fn lock(&self) -> () {
        self.state().open = false;
        trace!(&self.log, "gate locked");
    }

    pub fn unlock(&self) -> () {
        let pending = {
            let mut state = self.state();
            state.open = true;
            self.signal.notify_all();
            state.pending
        };
        trace!(&self.log, "gate unlocked"; "pending" => pending);
    }

    #[inline]
    pub fn unlock_one(&self) -> () {
        self.unlock_one_under(usize::MAX);
    }

    /// Banks one ticket and wakes up at most one waiting thread, unless `cap` tickets are
    /// already banked in which case nothing happens. The gate itself stays locked.
    pub fn unlock_one_under(&self, cap: usize) -> () {
        let (tickets, pending) = {
            let mut state = self.state();
            if state.tickets < cap {
                state.tickets += 1;
                self.signal.notify_one();
            }
            (state.tickets, state.pending)
        };
        trace!(&self.log, "ticket banked"; "tickets" => tickets, "pending" => pending);
    }

    /// Blocks until the gate is unlocked or a ticket can be redeemed.
    pub fn wait(&self) -> () {
        let mut state = self.state();
        if state.open {
            return;
        }

        //
        // - loop until either the gate opens or we grab a ticket
        // - the condvar may wake us up spuriously, always re-check
        //
        let mut parked = false;
        while !state.open {
            if state.tickets > 0 {
                state.tickets -= 1;

                //
                // - a single notify may have been absorbed by a thread grabbing the
                //   ticket on its way in, pass any leftover one to the next sleeper
                //
                let others = state.pending - parked as usize;
                if state.tickets > 0 && others > 0 {
                    self.signal.notify_one();
                }
                break;
            }
            if !parked {
                parked = true;
                state.pending += 1;
            }
            state = self
                .signal
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if parked {
            state.pending -= 1;
        }
        let (open, tickets) = (state.open, state.tickets);
        drop(state);
        trace!(&self.log, "gate passed"; "open" => open, "tickets" => tickets);
    }

    /// Lets the calling thread through right away if `predicate` holds, otherwise waits.
    ///
    /// The predicate runs outside of the gate's mutex and is evaluated only once. A predicate
    /// turning true right after being checked is not noticed: the thread stays parked until the
    /// next unlock() or unlock_one().
    pub fn allow_if<F>(&self, predicate: F) -> ()
    where
        F: FnOnce() -> bool,
    {
        if !predicate() {
            self.wait();
        }
    }

    pub fn reset(&self) -> () {
        {
            let mut state = self.state();
            state.open = false;
            state.tickets = 0;
        }
        trace!(&self.log, "gate reset");
    }

    //
    // - no user code ever runs while the mutex is held, a poisoned
    //   state is still consistent
    //
    #[inline]
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
