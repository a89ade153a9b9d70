//! The stock admission policy.

use super::clause::Clause;
use std::time::Duration;

/// Sleep between two admission attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Five clauses that must all admit a call:
///
/// | Scope | Quota | Window |
/// |-------|-------|--------|
/// | global | 30 | 1.5 s |
/// | conversation | 20 | 60.5 s |
/// | conversation | 10 | 10.5 s |
/// | originator | 100 | 30.5 s |
/// | originator | 30 | 5.5 s |
pub fn default_clauses() -> Vec<Clause> {
    vec![
        Clause::global(30, Duration::from_millis(1_500)),
        Clause::conversation(20, Duration::from_millis(60_500)),
        Clause::conversation(10, Duration::from_millis(10_500)),
        Clause::originator(100, Duration::from_millis(30_500)),
        Clause::originator(30, Duration::from_millis(5_500)),
    ]
}
