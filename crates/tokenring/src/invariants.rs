//! Debug assertion macros for ring protocol invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`); release builds
//! pay nothing for them.

// =============================================================================
// Single producer per circulation
// =============================================================================

/// Assert that at most one node holds the producer role.
///
/// **Invariant**: `active_producers ≤ 1`
///
/// Used in: `NodeStation::claim_token()` after committing the role
macro_rules! debug_assert_single_producer {
    ($node:expr, $active:expr) => {
        debug_assert!(
            $active <= 1,
            "single-producer invariant violated: node {} became producer with {} active",
            $node,
            $active
        )
    };
}

// =============================================================================
// Monotonic counters
// =============================================================================

/// Assert that a counter only moves forward.
///
/// Used in: `NodeStation::deliver()` and `NodeStation::complete_send()`
macro_rules! debug_assert_counter_advanced {
    ($name:literal, $node:expr, $old:expr, $new:expr) => {
        debug_assert!(
            $new == $old + 1,
            "{} counter of node {} went from {} to {}",
            $name,
            $node,
            $old,
            $new
        )
    };
}

// =============================================================================
// Producer bookkeeping
// =============================================================================

/// Assert that a completing producer was counted as active.
///
/// Used in: `NodeStation::complete_send()` before leaving the role
macro_rules! debug_assert_producer_active {
    ($node:expr, $active:expr) => {
        debug_assert!(
            $active > 0,
            "node {} completed a send with no active producer recorded",
            $node
        )
    };
}

pub(crate) use debug_assert_counter_advanced;
pub(crate) use debug_assert_producer_active;
pub(crate) use debug_assert_single_producer;
