use crate::domain::account::AccountId;
use crate::domain::attempt::OperationPhase;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Phase of one account plus the token of the guard that last claimed it.
struct Slot<P> {
    phase: P,
    owner: u64,
}

struct Table<P> {
    slots: HashMap<AccountId, Slot<P>>,
    next_owner: u64,
}

impl<P> Default for Table<P> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            next_owner: 0,
        }
    }
}

type SharedTable<P> = Arc<Mutex<Table<P>>>;

fn lock<P>(table: &Mutex<Table<P>>) -> MutexGuard<'_, Table<P>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-account phase table with an "operation in flight" guard.
///
/// The lock is only held for map updates, never across an `.await`, so a
/// plain `std::sync::Mutex` is enough and lets the guard release in `Drop`.
pub struct InFlightRegistry<P: OperationPhase> {
    table: SharedTable<P>,
    interrupted_message: Arc<str>,
}

impl<P: OperationPhase> Clone for InFlightRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            interrupted_message: Arc::clone(&self.interrupted_message),
        }
    }
}

impl<P: OperationPhase + Default> InFlightRegistry<P> {
    /// `interrupted_message` is recorded when an operation is abandoned
    /// mid-flight.
    pub fn new(interrupted_message: impl Into<String>) -> Self {
        Self {
            table: Arc::default(),
            interrupted_message: Arc::from(interrupted_message.into()),
        }
    }

    /// Current phase for the account, `Default` if it never ran.
    pub fn phase(&self, account_id: &AccountId) -> P {
        lock(&self.table)
            .slots
            .get(account_id)
            .map(|slot| slot.phase.clone())
            .unwrap_or_default()
    }

    /// Marks the account as busy with `phase`, unless an operation is already
    /// in flight for it. The check and the update happen under one lock.
    pub fn try_begin(&self, account_id: &AccountId, phase: P) -> Option<InFlightGuard<P>> {
        debug_assert!(phase.is_in_flight());
        let mut table = lock(&self.table);
        if table
            .slots
            .get(account_id)
            .is_some_and(|slot| slot.phase.is_in_flight())
        {
            return None;
        }
        table.next_owner += 1;
        let owner = table.next_owner;
        let previous = table
            .slots
            .insert(account_id.clone(), Slot { phase, owner })
            .map(|slot| slot.phase)
            .unwrap_or_default();
        Some(InFlightGuard {
            table: Arc::clone(&self.table),
            account_id: account_id.clone(),
            owner,
            previous,
            interrupted_message: Arc::clone(&self.interrupted_message),
        })
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.table)
            .slots
            .values()
            .filter(|slot| slot.phase.is_in_flight())
            .count()
    }
}

/// Held for the duration of one operation on one account.
///
/// A guard only writes the account's slot while it still owns it; once a
/// later operation has claimed the account, updates and `Drop` are no-ops.
/// Dropping the guard while its phase is still in flight records the
/// interrupted phase, so the account never stays locked.
pub struct InFlightGuard<P: OperationPhase> {
    table: SharedTable<P>,
    account_id: AccountId,
    owner: u64,
    previous: P,
    interrupted_message: Arc<str>,
}

impl<P: OperationPhase> InFlightGuard<P> {
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn set(&mut self, phase: P) {
        let mut table = lock(&self.table);
        if let Some(slot) = table.slots.get_mut(&self.account_id)
            && slot.owner == self.owner
        {
            slot.phase = phase;
        }
    }

    /// Puts back the phase the account had before this guard claimed it and
    /// returns it.
    pub fn restore(&mut self) -> P {
        let previous = self.previous.clone();
        self.set(previous.clone());
        previous
    }
}

impl<P: OperationPhase> Drop for InFlightGuard<P> {
    fn drop(&mut self) {
        let mut table = lock(&self.table);
        if let Some(slot) = table.slots.get_mut(&self.account_id)
            && slot.owner == self.owner
            && slot.phase.is_in_flight()
        {
            warn!(account_id = %self.account_id, "operation ended without a result; releasing guard");
            slot.phase = slot.phase.interrupted(&self.interrupted_message);
        }
    }
}
