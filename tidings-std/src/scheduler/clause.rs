//! One rate budget and its counters.

use crate::config::{ClauseConfig, ClauseScope};
use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

/// Maps a call key to the counter it is charged against, or `None` when the
/// clause does not care about that key.
pub type KeyFn = Arc<dyn Fn(i64) -> Option<i64> + Send + Sync>;

/// Decides which keys a [`Clause`] applies to.
#[derive(Clone)]
pub enum Selector {
    /// Every key shares one counter.
    Global,
    /// Negative keys, one counter each.
    Conversation,
    /// Positive keys, one counter each.
    Originator,
    /// Caller-defined mapping.
    Custom(KeyFn),
}

/// The counter a key is charged against within one clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Global,
    Keyed(i64),
}

impl Selector {
    pub(crate) fn slot(&self, key: i64) -> Option<Slot> {
        match self {
            Selector::Global => Some(Slot::Global),
            Selector::Conversation => (key < 0).then_some(Slot::Keyed(key)),
            Selector::Originator => (key > 0).then_some(Slot::Keyed(key)),
            Selector::Custom(select) => select(key).map(Slot::Keyed),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Global => f.write_str("Global"),
            Selector::Conversation => f.write_str("Conversation"),
            Selector::Originator => f.write_str("Originator"),
            Selector::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<ClauseScope> for Selector {
    fn from(scope: ClauseScope) -> Self {
        match scope {
            ClauseScope::Global => Selector::Global,
            ClauseScope::Conversation => Selector::Conversation,
            ClauseScope::Originator => Selector::Originator,
        }
    }
}

/// At most `quota` weight may be committed per counter within any
/// `release_delay` window.
#[derive(Debug, Clone)]
pub struct Clause {
    quota: u32,
    release_delay: Duration,
    selector: Selector,
}

impl Clause {
    /// A clause with an explicit selector.
    pub fn new(quota: u32, release_delay: Duration, selector: Selector) -> Self {
        Self {
            quota,
            release_delay,
            selector,
        }
    }

    /// A single counter shared by every key.
    pub fn global(quota: u32, release_delay: Duration) -> Self {
        Self::new(quota, release_delay, Selector::Global)
    }

    /// A counter per conversation (negative key).
    pub fn conversation(quota: u32, release_delay: Duration) -> Self {
        Self::new(quota, release_delay, Selector::Conversation)
    }

    /// A counter per originator (positive key).
    pub fn originator(quota: u32, release_delay: Duration) -> Self {
        Self::new(quota, release_delay, Selector::Originator)
    }

    /// A counter per key returned by `select`.
    pub fn custom<F>(quota: u32, release_delay: Duration, select: F) -> Self
    where
        F: Fn(i64) -> Option<i64> + Send + Sync + 'static,
    {
        Self::new(quota, release_delay, Selector::Custom(Arc::new(select)))
    }

    /// Maximum weight per counter.
    pub fn quota(&self) -> u32 {
        self.quota
    }

    /// How long committed weight is held after [`Scheduler::done`](super::Scheduler::done).
    pub fn release_delay(&self) -> Duration {
        self.release_delay
    }

    /// The keys this clause applies to.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Whether `key` is charged against this clause at all.
    pub fn applies_to(&self, key: i64) -> bool {
        self.selector.slot(key).is_some()
    }
}

impl From<&ClauseConfig> for Clause {
    fn from(config: &ClauseConfig) -> Self {
        Self::new(config.quota, config.release_delay(), config.scope.into())
    }
}

/// Committed weight of one clause.
#[derive(Debug, Default)]
pub(crate) struct ClauseState {
    global: u32,
    keyed: HashMap<i64, u32>,
}

impl ClauseState {
    pub(crate) fn used(&self, slot: Slot) -> u32 {
        match slot {
            Slot::Global => self.global,
            Slot::Keyed(key) => self.keyed.get(&key).copied().unwrap_or(0),
        }
    }

    /// Whether `weight` more fits under `quota`. Keys the clause does not
    /// apply to are always admitted.
    pub(crate) fn admits(&self, clause: &Clause, key: i64, weight: u32) -> bool {
        match clause.selector.slot(key) {
            Some(slot) => self.used(slot).saturating_add(weight) <= clause.quota,
            None => true,
        }
    }

    pub(crate) fn commit(&mut self, clause: &Clause, key: i64, weight: u32) {
        match clause.selector.slot(key) {
            Some(Slot::Global) => self.global = self.global.saturating_add(weight),
            Some(Slot::Keyed(key)) => {
                let used = self.keyed.entry(key).or_insert(0);
                *used = used.saturating_add(weight);
            }
            None => {}
        }
    }

    /// Return `weight`, dropping keyed counters that reach zero.
    pub(crate) fn release(&mut self, slot: Slot, weight: u32) {
        match slot {
            Slot::Global => self.global = self.global.saturating_sub(weight),
            Slot::Keyed(key) => {
                if let Some(used) = self.keyed.get_mut(&key) {
                    if *used <= weight {
                        self.keyed.remove(&key);
                    } else {
                        *used -= weight;
                    }
                }
            }
        }
    }

    pub(crate) fn tracked_keys(&self) -> usize {
        self.keyed.len()
    }
}
