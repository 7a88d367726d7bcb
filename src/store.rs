use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::debug;

use crate::error::{Result, SchedulerError};
use crate::review::{CardState, Rating};
use crate::scheduler::Scheduler;

/// Storage seam for tracked items, scoped by owner. The scheduler never
/// touches storage itself; implementations persist whatever
/// [`Scheduler::schedule`] returns.
pub trait ItemStore {
    /// Current state of the owner's item.
    fn fetch(&self, owner: &str, item: &str) -> Result<CardState>;

    /// Register a new tracked item. Item ids are unique per owner; a
    /// duplicate id reports `Conflict`.
    fn insert(&self, owner: &str, item: &str, state: CardState) -> Result<()>;

    /// Replace the item's state, but only if the stored review count still
    /// matches `expected_review_count`. `Conflict` means another review
    /// landed in between; of two racing writes exactly one can succeed.
    fn update(
        &self,
        owner: &str,
        item: &str,
        expected_review_count: u32,
        state: CardState,
    ) -> Result<()>;

    /// Items due on or before `now` for one owner, ordered by due ascending.
    fn due_items(&self, owner: &str, now: DateTime<Utc>) -> Vec<(String, CardState)>;
}

/// In-memory [`ItemStore`], used by the tests and the demo. A deployment
/// implements the trait over its database with the same compare-and-swap
/// contract (a conditional `UPDATE` keyed on owner, item and review count,
/// verifying exactly one row was affected).
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<(String, String), CardState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemStore for MemoryStore {
    fn fetch(&self, owner: &str, item: &str) -> Result<CardState> {
        let items = self.items.lock().unwrap();
        items
            .get(&(owner.to_owned(), item.to_owned()))
            .cloned()
            .ok_or_else(|| SchedulerError::NotFound {
                owner: owner.to_owned(),
                item: item.to_owned(),
            })
    }

    fn insert(&self, owner: &str, item: &str, state: CardState) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        let key = (owner.to_owned(), item.to_owned());
        if items.contains_key(&key) {
            return Err(SchedulerError::Conflict {
                owner: owner.to_owned(),
                item: item.to_owned(),
            });
        }
        items.insert(key, state);
        Ok(())
    }

    fn update(
        &self,
        owner: &str,
        item: &str,
        expected_review_count: u32,
        state: CardState,
    ) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        let current = items
            .get_mut(&(owner.to_owned(), item.to_owned()))
            .ok_or_else(|| SchedulerError::NotFound {
                owner: owner.to_owned(),
                item: item.to_owned(),
            })?;
        if current.review_count != expected_review_count {
            return Err(SchedulerError::Conflict {
                owner: owner.to_owned(),
                item: item.to_owned(),
            });
        }
        *current = state;
        Ok(())
    }

    fn due_items(&self, owner: &str, now: DateTime<Utc>) -> Vec<(String, CardState)> {
        let items = self.items.lock().unwrap();
        items
            .iter()
            .filter(|((item_owner, _), state)| item_owner == owner && state.is_due(now))
            .map(|((_, item), state)| (item.clone(), state.clone()))
            .sorted_by_key(|(_, state)| state.due)
            .collect()
    }
}

/// Look up, reschedule and persist one review submission. The raw rating is
/// validated before anything else; `now` defaults to the wall clock. The
/// fetch-then-conditional-write pattern makes a concurrent submission for the
/// same item surface as `Conflict` instead of silently overwriting it.
pub fn schedule_review<S: ItemStore>(
    store: &S,
    scheduler: &Scheduler,
    owner: &str,
    item: &str,
    rating: u8,
    now: Option<DateTime<Utc>>,
) -> Result<CardState> {
    let rating = Rating::from_int(rating)?;
    let now = now.unwrap_or_else(Utc::now);
    let current = store.fetch(owner, item)?;
    let next = scheduler.schedule(&current, rating, now);
    store.update(owner, item, current.review_count, next.clone())?;
    debug!("applied review owner={owner} item={item} rating={rating} due={}", next.due);
    Ok(next)
}
